//! Unlimited precision rationals

use core::fmt;
use core::ops::{
    Add,
    Div,
    Mul,
    Neg,
    Sub,
};

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{
    Signed,
    Zero,
};

use crate::{
    ArithError,
    ArithResult,
    Int,
};

/// Unlimited precision rational, kept in normalized form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Rat(BigRational);

impl Rat {
    /// The rational zero.
    pub fn zero() -> Self {
        Rat(BigRational::zero())
    }

    /// Build `numerator / denominator`.
    pub fn new(numerator: Int, denominator: Int) -> ArithResult<Self> {
        if denominator.is_zero() {
            return Err(ArithError::DivisionByZero)
        }
        Ok(Rat(BigRational::new(
            BigInt::from(numerator),
            BigInt::from(denominator),
        )))
    }

    /// Numerator of the normalized fraction.
    pub fn numerator(&self) -> Int {
        Int::from(self.0.numer().clone())
    }

    /// Denominator of the normalized fraction, always positive.
    pub fn denominator(&self) -> Int {
        Int::from(self.0.denom().clone())
    }

    /// Return true if this is zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Return true if this is strictly negative.
    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }

    /// Return true if the denominator is one.
    pub fn is_integer(&self) -> bool {
        self.0.is_integer()
    }

    /// Largest integer less than or equal to this rational.
    pub fn floor(&self) -> Int {
        Int::from(self.0.floor().to_integer())
    }

    /// Smallest integer greater than or equal to this rational.
    pub fn ceil(&self) -> Int {
        Int::from(self.0.ceil().to_integer())
    }

    /// Integer part, rounding towards zero.
    pub fn trunc(&self) -> Int {
        Int::from(self.0.trunc().to_integer())
    }
}

impl From<Int> for Rat {
    fn from(n: Int) -> Self {
        Rat(BigRational::from_integer(BigInt::from(n)))
    }
}

impl fmt::Display for Rat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

macro_rules! impl_rat_binop {
    ($trait:ident, $method:ident) => {
        impl $trait for Rat {
            type Output = Rat;

            fn $method(self, rhs: Rat) -> Rat {
                Rat(self.0.$method(rhs.0))
            }
        }

        impl $trait<&Rat> for &Rat {
            type Output = Rat;

            fn $method(self, rhs: &Rat) -> Rat {
                Rat((&self.0).$method(&rhs.0))
            }
        }
    };
}

impl_rat_binop!(Add, add);
impl_rat_binop!(Sub, sub);
impl_rat_binop!(Mul, mul);

impl Rat {
    /// Exact division.
    pub fn div_exact(&self, rhs: &Rat) -> ArithResult<Rat> {
        if rhs.is_zero() {
            return Err(ArithError::DivisionByZero)
        }
        Ok(Rat((&self.0).div(&rhs.0)))
    }
}

impl Neg for Rat {
    type Output = Rat;

    fn neg(self) -> Rat {
        Rat(-self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization() {
        let r = Rat::new(Int::from(4), Int::from(-6)).unwrap();
        assert_eq!(r.numerator(), Int::from(-2));
        assert_eq!(r.denominator(), Int::from(3));
    }

    #[test]
    fn rounding() {
        let r = Rat::new(Int::from(-7), Int::from(2)).unwrap();
        assert_eq!(r.floor(), Int::from(-4));
        assert_eq!(r.ceil(), Int::from(-3));
        assert_eq!(r.trunc(), Int::from(-3));
    }

    #[test]
    fn zero_denominator_is_reported() {
        assert_eq!(
            Rat::new(Int::one(), Int::zero()),
            Err(ArithError::DivisionByZero)
        );
    }
}

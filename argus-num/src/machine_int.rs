//! Machine integers of arbitrary bit width and signedness

use core::cmp::Ordering;
use core::fmt;

use crate::{
    ArithError,
    ArithResult,
    Int,
};

/// Signedness of a machine integer type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Signedness {
    /// Two's complement signed representation.
    Signed,
    /// Unsigned representation.
    Unsigned,
}

impl Signedness {
    /// Return true for [`Signedness::Signed`].
    pub fn is_signed(self) -> bool {
        matches!(self, Signedness::Signed)
    }
}

impl fmt::Display for Signedness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signedness::Signed => write!(f, "si"),
            Signedness::Unsigned => write!(f, "ui"),
        }
    }
}

/// Machine integer: a value interpreted at a fixed bit width and signedness.
///
/// The stored value is always the canonical mathematical interpretation, i.e.
/// it lies within `[min, max]` of the type. Arithmetic wraps modulo
/// `2^bit_width`. Binary operations require both operands to share bit width
/// and signedness; mixing types is a bug in the caller and panics.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MachineInt {
    value: Int,
    bit_width: u64,
    sign: Signedness,
}

impl MachineInt {
    /// Build a machine integer, wrapping `value` into the representable range.
    pub fn new<V: Into<Int>>(value: V, bit_width: u64, sign: Signedness) -> Self {
        assert!(bit_width >= 1, "bit width must be at least 1");
        MachineInt {
            value: wrap(value.into(), bit_width, sign),
            bit_width,
            sign,
        }
    }

    /// The zero of the given type.
    pub fn zero(bit_width: u64, sign: Signedness) -> Self {
        MachineInt::new(Int::zero(), bit_width, sign)
    }

    /// The one of the given type.
    pub fn one(bit_width: u64, sign: Signedness) -> Self {
        MachineInt::new(Int::one(), bit_width, sign)
    }

    /// Smallest value of the given type.
    pub fn min(bit_width: u64, sign: Signedness) -> Self {
        let value = match sign {
            Signedness::Signed => -Int::power_of_two(bit_width - 1),
            Signedness::Unsigned => Int::zero(),
        };
        MachineInt {
            value,
            bit_width,
            sign,
        }
    }

    /// Largest value of the given type.
    pub fn max(bit_width: u64, sign: Signedness) -> Self {
        let value = match sign {
            Signedness::Signed => Int::power_of_two(bit_width - 1) - Int::one(),
            Signedness::Unsigned => Int::power_of_two(bit_width) - Int::one(),
        };
        MachineInt {
            value,
            bit_width,
            sign,
        }
    }

    /// Bit width of the type.
    pub fn bit_width(&self) -> u64 {
        self.bit_width
    }

    /// Signedness of the type.
    pub fn sign(&self) -> Signedness {
        self.sign
    }

    /// The mathematical value.
    pub fn to_int(&self) -> Int {
        self.value.clone()
    }

    /// Convert to `u64` if the value fits.
    pub fn to_u64(&self) -> Option<u64> {
        self.value.to_u64()
    }

    /// Convert to `i64` if the value fits.
    pub fn to_i64(&self) -> Option<i64> {
        self.value.to_i64()
    }

    /// Return true if this is zero.
    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    /// Return true if this is the smallest value of its type.
    pub fn is_min(&self) -> bool {
        *self == MachineInt::min(self.bit_width, self.sign)
    }

    /// Return true if this is the largest value of its type.
    pub fn is_max(&self) -> bool {
        *self == MachineInt::max(self.bit_width, self.sign)
    }

    /// Return true if `value` is representable at the given width and sign.
    pub fn fits(value: &Int, bit_width: u64, sign: Signedness) -> bool {
        *value >= MachineInt::min(bit_width, sign).value
            && *value <= MachineInt::max(bit_width, sign).value
    }

    fn assert_compatible(&self, other: &MachineInt) {
        assert!(
            self.bit_width == other.bit_width && self.sign == other.sign,
            "incompatible machine integer types: {}{} and {}{}",
            self.sign,
            self.bit_width,
            other.sign,
            other.bit_width,
        );
    }

    /// The unsigned bit pattern of the value, in `[0, 2^bit_width)`.
    fn unsigned_repr(&self) -> Int {
        if self.value.is_negative() {
            &self.value + &Int::power_of_two(self.bit_width)
        } else {
            self.value.clone()
        }
    }

    /// The sign-extended interpretation of the bit pattern.
    fn signed_repr(&self) -> Int {
        wrap(self.value.clone(), self.bit_width, Signedness::Signed)
    }

    /// Wrapping addition.
    pub fn add(&self, other: &MachineInt) -> MachineInt {
        self.assert_compatible(other);
        MachineInt::new(&self.value + &other.value, self.bit_width, self.sign)
    }

    /// Wrapping subtraction.
    pub fn sub(&self, other: &MachineInt) -> MachineInt {
        self.assert_compatible(other);
        MachineInt::new(&self.value - &other.value, self.bit_width, self.sign)
    }

    /// Wrapping multiplication.
    pub fn mul(&self, other: &MachineInt) -> MachineInt {
        self.assert_compatible(other);
        MachineInt::new(&self.value * &other.value, self.bit_width, self.sign)
    }

    /// Wrapping negation.
    pub fn neg(&self) -> MachineInt {
        MachineInt::new(-&self.value, self.bit_width, self.sign)
    }

    /// Division rounding towards zero on the declared interpretation.
    ///
    /// The overflowing case `MIN / -1` wraps.
    pub fn div(&self, other: &MachineInt) -> ArithResult<MachineInt> {
        self.assert_compatible(other);
        let q = self.value.div_trunc(&other.value)?;
        Ok(MachineInt::new(q, self.bit_width, self.sign))
    }

    /// Remainder of [`MachineInt::div`], with the sign of the dividend.
    pub fn rem(&self, other: &MachineInt) -> ArithResult<MachineInt> {
        self.assert_compatible(other);
        let r = self.value.rem_trunc(&other.value)?;
        Ok(MachineInt::new(r, self.bit_width, self.sign))
    }

    fn shift_amount(&self, amount: &MachineInt) -> ArithResult<u64> {
        let n = amount
            .to_int()
            .to_u64()
            .ok_or(ArithError::InvalidShift)?;
        if n >= self.bit_width {
            return Err(ArithError::InvalidShift)
        }
        Ok(n)
    }

    /// Left shift, wrapping on overflow.
    pub fn shl(&self, amount: &MachineInt) -> ArithResult<MachineInt> {
        self.assert_compatible(amount);
        let n = self.shift_amount(amount)?;
        Ok(MachineInt::new(
            &self.unsigned_repr() << n,
            self.bit_width,
            self.sign,
        ))
    }

    /// Logical right shift: zeros are shifted into the high bits.
    pub fn lshr(&self, amount: &MachineInt) -> ArithResult<MachineInt> {
        self.assert_compatible(amount);
        let n = self.shift_amount(amount)?;
        Ok(MachineInt::new(
            &self.unsigned_repr() >> n,
            self.bit_width,
            self.sign,
        ))
    }

    /// Arithmetic right shift: the sign bit is replicated.
    pub fn ashr(&self, amount: &MachineInt) -> ArithResult<MachineInt> {
        self.assert_compatible(amount);
        let n = self.shift_amount(amount)?;
        Ok(MachineInt::new(
            &self.signed_repr() >> n,
            self.bit_width,
            self.sign,
        ))
    }

    /// Bitwise and.
    pub fn and(&self, other: &MachineInt) -> MachineInt {
        self.assert_compatible(other);
        MachineInt::new(
            self.unsigned_repr() & other.unsigned_repr(),
            self.bit_width,
            self.sign,
        )
    }

    /// Bitwise or.
    pub fn or(&self, other: &MachineInt) -> MachineInt {
        self.assert_compatible(other);
        MachineInt::new(
            self.unsigned_repr() | other.unsigned_repr(),
            self.bit_width,
            self.sign,
        )
    }

    /// Bitwise exclusive or.
    pub fn xor(&self, other: &MachineInt) -> MachineInt {
        self.assert_compatible(other);
        MachineInt::new(
            self.unsigned_repr() ^ other.unsigned_repr(),
            self.bit_width,
            self.sign,
        )
    }

    /// Truncate to a smaller bit width, keeping the low bits.
    pub fn trunc(&self, bit_width: u64) -> MachineInt {
        assert!(bit_width <= self.bit_width, "trunc to a larger bit width");
        MachineInt::new(self.unsigned_repr(), bit_width, self.sign)
    }

    /// Zero-extend to a larger bit width.
    pub fn zext(&self, bit_width: u64) -> MachineInt {
        assert!(bit_width >= self.bit_width, "zext to a smaller bit width");
        MachineInt::new(self.unsigned_repr(), bit_width, self.sign)
    }

    /// Sign-extend to a larger bit width.
    pub fn sext(&self, bit_width: u64) -> MachineInt {
        assert!(bit_width >= self.bit_width, "sext to a smaller bit width");
        MachineInt::new(self.signed_repr(), bit_width, self.sign)
    }

    /// Reinterpret the bit pattern under the other signedness, same width.
    pub fn sign_cast(&self, sign: Signedness) -> MachineInt {
        MachineInt::new(self.value.clone(), self.bit_width, sign)
    }

    /// General cast: resize following the source signedness, then
    /// reinterpret under the destination signedness.
    pub fn cast(&self, bit_width: u64, sign: Signedness) -> MachineInt {
        let resized = match self.bit_width.cmp(&bit_width) {
            Ordering::Greater => self.trunc(bit_width),
            Ordering::Equal => self.clone(),
            Ordering::Less => match self.sign {
                Signedness::Signed => self.sext(bit_width),
                Signedness::Unsigned => self.zext(bit_width),
            },
        };
        resized.sign_cast(sign)
    }

    /// The value plus one, or `None` on the largest value of the type.
    pub fn increment(&self) -> Option<MachineInt> {
        if self.is_max() {
            None
        } else {
            Some(MachineInt::new(
                &self.value + &Int::one(),
                self.bit_width,
                self.sign,
            ))
        }
    }

    /// The value minus one, or `None` on the smallest value of the type.
    pub fn decrement(&self) -> Option<MachineInt> {
        if self.is_min() {
            None
        } else {
            Some(MachineInt::new(
                &self.value - &Int::one(),
                self.bit_width,
                self.sign,
            ))
        }
    }
}

impl fmt::Display for MachineInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}{}", self.value, self.sign, self.bit_width)
    }
}

/// Reduce `value` modulo `2^bit_width` into the canonical range.
fn wrap(value: Int, bit_width: u64, sign: Signedness) -> Int {
    let modulus = Int::power_of_two(bit_width);
    let mut r = value
        .mod_floor(&modulus)
        .expect("modulus is a positive power of two");
    if sign.is_signed() && r >= Int::power_of_two(bit_width - 1) {
        r = r - modulus;
    }
    r
}

#[cfg(test)]
mod tests {
    use super::*;

    fn si8<V: Into<Int>>(v: V) -> MachineInt {
        MachineInt::new(v, 8, Signedness::Signed)
    }

    fn ui8<V: Into<Int>>(v: V) -> MachineInt {
        MachineInt::new(v, 8, Signedness::Unsigned)
    }

    #[test]
    fn wrapping_add() {
        assert_eq!(si8(127).add(&si8(1)), si8(-128));
        assert_eq!(ui8(255).add(&ui8(1)), ui8(0));
        assert_eq!(si8(-100).add(&si8(-100)), si8(56));
    }

    #[test]
    fn wrapping_mul() {
        assert_eq!(ui8(16).mul(&ui8(16)), ui8(0));
        assert_eq!(si8(16).mul(&si8(16)), si8(0));
        assert_eq!(si8(-128).mul(&si8(-1)), si8(-128));
    }

    #[test]
    fn division() {
        assert_eq!(si8(-7).div(&si8(2)).unwrap(), si8(-3));
        assert_eq!(si8(-7).rem(&si8(2)).unwrap(), si8(-1));
        assert_eq!(si8(1).div(&si8(0)), Err(ArithError::DivisionByZero));
        // MIN / -1 wraps
        assert_eq!(si8(-128).div(&si8(-1)).unwrap(), si8(-128));
    }

    #[test]
    fn shifts() {
        assert_eq!(ui8(0b1000_0001).lshr(&ui8(1)).unwrap(), ui8(0b0100_0000));
        assert_eq!(si8(-2).ashr(&si8(1)).unwrap(), si8(-1));
        assert_eq!(ui8(1).shl(&ui8(8)), Err(ArithError::InvalidShift));
        assert_eq!(ui8(3).shl(&ui8(7)).unwrap(), ui8(0x80));
    }

    #[test]
    fn bitwise_on_negative_values() {
        assert_eq!(si8(-1).and(&si8(0x0f)), si8(0x0f));
        assert_eq!(si8(-1).xor(&si8(-1)), si8(0));
    }

    #[test]
    fn casts() {
        assert_eq!(si8(-1).zext(16), MachineInt::new(255, 16, Signedness::Signed));
        assert_eq!(
            ui8(255).sext(16),
            MachineInt::new(65535, 16, Signedness::Unsigned)
        );
        assert_eq!(
            MachineInt::new(0x1234, 16, Signedness::Unsigned).trunc(8),
            ui8(0x34)
        );
        assert_eq!(ui8(255).sign_cast(Signedness::Signed), si8(-1));
        assert_eq!(si8(-1).cast(16, Signedness::Unsigned).to_int(), Int::from(65535));
    }

    #[test]
    fn increment_saturates_at_type_bounds() {
        assert_eq!(ui8(255).increment(), None);
        assert_eq!(si8(-128).decrement(), None);
        assert_eq!(si8(0).increment(), Some(si8(1)));
    }
}

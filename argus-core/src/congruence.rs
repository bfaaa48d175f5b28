//! Arithmetic congruences on machine integers

use core::fmt;

use argus_num::{
    Int,
    MachineInt,
    Signedness,
};

use crate::lattice::AbstractDomain;

/// Congruence `aZ + b` over a machine integer type.
///
/// A zero modulus denotes the constant `b`; otherwise the residue is
/// canonical in `[0, a)`. Wrap-around folds a congruence onto
/// `gcd(a, 2^w) Z + b`, so moduli always divide `2^bit_width`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Congruence {
    kind: Kind,
    bit_width: u64,
    sign: Signedness,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Kind {
    Bottom,
    Modular { modulus: Int, residue: Int },
}

/// Extended Euclid: returns `(g, x, y)` with `a*x + b*y == g == gcd(a, b)`.
fn extended_gcd(a: &Int, b: &Int) -> (Int, Int, Int) {
    if b.is_zero() {
        return (a.clone(), Int::one(), Int::zero())
    }
    let q = a.div_trunc(b).expect("b is non-zero");
    let r = a.rem_trunc(b).expect("b is non-zero");
    let (g, x, y) = extended_gcd(b, &r);
    let t = &x - &(&q * &y);
    (g, y, t)
}

impl Congruence {
    /// Build `modulus Z + residue`, normalizing for machine wrap-around.
    pub fn new(modulus: Int, residue: Int, bit_width: u64, sign: Signedness) -> Self {
        let modulus = modulus.abs();
        if modulus.is_zero() {
            // A constant; wrap it into the machine range.
            let value = MachineInt::new(residue, bit_width, sign).to_int();
            return Congruence {
                kind: Kind::Modular {
                    modulus,
                    residue: value,
                },
                bit_width,
                sign,
            }
        }
        let modulus = modulus.gcd(&Int::power_of_two(bit_width));
        let residue = residue
            .mod_floor(&modulus)
            .expect("modulus is non-zero");
        Congruence {
            kind: Kind::Modular { modulus, residue },
            bit_width,
            sign,
        }
    }

    /// The congruence holding every value: `1Z + 0`.
    pub fn top(bit_width: u64, sign: Signedness) -> Self {
        Congruence::new(Int::one(), Int::zero(), bit_width, sign)
    }

    /// The empty congruence.
    pub fn bottom(bit_width: u64, sign: Signedness) -> Self {
        Congruence {
            kind: Kind::Bottom,
            bit_width,
            sign,
        }
    }

    /// The congruence holding exactly `n`.
    pub fn singleton(n: &MachineInt) -> Self {
        Congruence::new(Int::zero(), n.to_int(), n.bit_width(), n.sign())
    }

    /// Bit width of the underlying type.
    pub fn bit_width(&self) -> u64 {
        self.bit_width
    }

    /// Signedness of the underlying type.
    pub fn sign(&self) -> Signedness {
        self.sign
    }

    /// The `(modulus, residue)` pair, unless bottom.
    pub fn pair(&self) -> Option<(&Int, &Int)> {
        match &self.kind {
            Kind::Bottom => None,
            Kind::Modular { modulus, residue } => Some((modulus, residue)),
        }
    }

    /// Return the unique element, if the congruence is a constant.
    pub fn as_singleton(&self) -> Option<MachineInt> {
        match &self.kind {
            Kind::Modular { modulus, residue } if modulus.is_zero() => Some(MachineInt::new(
                residue.clone(),
                self.bit_width,
                self.sign,
            )),
            _ => None,
        }
    }

    /// Return true if `n` satisfies the congruence.
    pub fn contains(&self, n: &MachineInt) -> bool {
        match &self.kind {
            Kind::Bottom => false,
            Kind::Modular { modulus, residue } => {
                if modulus.is_zero() {
                    n.to_int() == *residue
                } else {
                    (n.to_int() - residue.clone())
                        .mod_floor(modulus)
                        .expect("modulus is non-zero")
                        .is_zero()
                }
            }
        }
    }

    fn binary(
        &self,
        other: &Congruence,
        f: impl Fn(&Int, &Int, &Int, &Int) -> (Int, Int),
    ) -> Congruence {
        match (&self.kind, &other.kind) {
            (Kind::Bottom, _) | (_, Kind::Bottom) => {
                Congruence::bottom(self.bit_width, self.sign)
            }
            (
                Kind::Modular {
                    modulus: a1,
                    residue: b1,
                },
                Kind::Modular {
                    modulus: a2,
                    residue: b2,
                },
            ) => {
                let (modulus, residue) = f(a1, b1, a2, b2);
                Congruence::new(modulus, residue, self.bit_width, self.sign)
            }
        }
    }

    /// Congruence addition.
    pub fn add(&self, other: &Congruence) -> Congruence {
        self.binary(other, |a1, b1, a2, b2| (a1.gcd(a2), b1 + b2))
    }

    /// Congruence subtraction.
    pub fn sub(&self, other: &Congruence) -> Congruence {
        self.binary(other, |a1, b1, a2, b2| (a1.gcd(a2), b1 - b2))
    }

    /// Congruence negation.
    pub fn neg(&self) -> Congruence {
        match &self.kind {
            Kind::Bottom => self.clone(),
            Kind::Modular { modulus, residue } => Congruence::new(
                modulus.clone(),
                -residue,
                self.bit_width,
                self.sign,
            ),
        }
    }

    /// Congruence multiplication.
    pub fn mul(&self, other: &Congruence) -> Congruence {
        self.binary(other, |a1, b1, a2, b2| {
            let m = (a1 * a2).gcd(&(a1 * b2)).gcd(&(a2 * b1));
            (m, b1 * b2)
        })
    }

    /// Congruence division: exact only when the divisor is a constant that
    /// divides both modulus and residue evenly.
    pub fn div(&self, other: &Congruence) -> Congruence {
        let c = match other.as_singleton() {
            Some(c) if !c.is_zero() => c.to_int(),
            _ => return Congruence::top(self.bit_width, self.sign),
        };
        match &self.kind {
            Kind::Bottom => self.clone(),
            Kind::Modular { modulus, residue } => {
                let exact = residue
                    .rem_trunc(&c)
                    .expect("divisor is non-zero")
                    .is_zero()
                    && modulus
                        .rem_trunc(&c)
                        .expect("divisor is non-zero")
                        .is_zero();
                if exact {
                    Congruence::new(
                        modulus.div_trunc(&c).expect("divisor is non-zero"),
                        residue.div_trunc(&c).expect("divisor is non-zero"),
                        self.bit_width,
                        self.sign,
                    )
                } else {
                    Congruence::top(self.bit_width, self.sign)
                }
            }
        }
    }

    /// Congruence remainder: exact only for unsigned values and a constant
    /// divisor dividing the modulus evenly.
    pub fn rem(&self, other: &Congruence) -> Congruence {
        let c = match other.as_singleton() {
            Some(c) if !c.is_zero() => c.to_int().abs(),
            _ => return Congruence::top(self.bit_width, self.sign),
        };
        match &self.kind {
            Kind::Bottom => self.clone(),
            Kind::Modular { modulus, residue } => {
                let divides = modulus
                    .rem_trunc(&c)
                    .expect("divisor is non-zero")
                    .is_zero();
                if divides && self.sign == Signedness::Unsigned && !residue.is_negative() {
                    // Every element is congruent to the residue modulo c
                    Congruence::new(
                        Int::zero(),
                        residue.mod_floor(&c).expect("divisor is non-zero"),
                        self.bit_width,
                        self.sign,
                    )
                } else {
                    Congruence::top(self.bit_width, self.sign)
                }
            }
        }
    }
}

impl AbstractDomain for Congruence {
    fn is_bottom(&self) -> bool {
        matches!(self.kind, Kind::Bottom)
    }

    fn is_top(&self) -> bool {
        matches!(&self.kind, Kind::Modular { modulus, .. } if *modulus == Int::one())
    }

    fn leq(&self, other: &Self) -> bool {
        match (&self.kind, &other.kind) {
            (Kind::Bottom, _) => true,
            (_, Kind::Bottom) => false,
            (
                Kind::Modular {
                    modulus: a1,
                    residue: b1,
                },
                Kind::Modular {
                    modulus: a2,
                    residue: b2,
                },
            ) => {
                if a2.is_zero() {
                    a1.is_zero() && b1 == b2
                } else {
                    // a2 divides a1 and the residues agree modulo a2
                    a1.rem_trunc(a2).expect("a2 is non-zero").is_zero()
                        && (b1 - b2)
                            .mod_floor(a2)
                            .expect("a2 is non-zero")
                            .is_zero()
                }
            }
        }
    }

    fn join(&self, other: &Self) -> Self {
        match (&self.kind, &other.kind) {
            (Kind::Bottom, _) => other.clone(),
            (_, Kind::Bottom) => self.clone(),
            (
                Kind::Modular {
                    modulus: a1,
                    residue: b1,
                },
                Kind::Modular {
                    modulus: a2,
                    residue: b2,
                },
            ) => {
                let g = a1.gcd(a2).gcd(&(b1 - b2).abs());
                let residue = b1.clone().min(b2.clone());
                Congruence::new(g, residue, self.bit_width, self.sign)
            }
        }
    }

    fn meet(&self, other: &Self) -> Self {
        match (&self.kind, &other.kind) {
            (Kind::Bottom, _) | (_, Kind::Bottom) => {
                Congruence::bottom(self.bit_width, self.sign)
            }
            (
                Kind::Modular {
                    modulus: a1,
                    residue: b1,
                },
                Kind::Modular {
                    modulus: a2,
                    residue: b2,
                },
            ) => {
                if a1.is_zero() && a2.is_zero() {
                    if b1 == b2 {
                        self.clone()
                    } else {
                        Congruence::bottom(self.bit_width, self.sign)
                    }
                } else if a1.is_zero() {
                    if other.contains(&MachineInt::new(b1.clone(), self.bit_width, self.sign)) {
                        self.clone()
                    } else {
                        Congruence::bottom(self.bit_width, self.sign)
                    }
                } else if a2.is_zero() {
                    other.meet(self)
                } else {
                    // Chinese remainder with the extended Euclidean algorithm
                    let (g, u, _) = extended_gcd(a1, a2);
                    let diff = b2 - b1;
                    if !diff
                        .rem_trunc(&g)
                        .expect("gcd of non-zero moduli is non-zero")
                        .is_zero()
                    {
                        return Congruence::bottom(self.bit_width, self.sign)
                    }
                    let lcm = (a1 * a2)
                        .div_trunc(&g)
                        .expect("gcd of non-zero moduli is non-zero");
                    let step = diff
                        .div_trunc(&g)
                        .expect("gcd of non-zero moduli is non-zero");
                    let residue = b1 + &(a1 * &(&u * &step));
                    Congruence::new(lcm, residue, self.bit_width, self.sign)
                }
            }
        }
    }

    fn widening(&self, other: &Self) -> Self {
        // Moduli divide 2^bit_width, so join chains are finite
        self.join(other)
    }

    fn narrowing(&self, other: &Self) -> Self {
        if self.is_top() {
            other.clone()
        } else {
            self.clone()
        }
    }
}

impl fmt::Display for Congruence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            Kind::Bottom => write!(f, "_|_"),
            Kind::Modular { modulus, residue } => {
                if modulus.is_zero() {
                    write!(f, "{residue}")
                } else {
                    write!(f, "{modulus}Z+{residue}")
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(a: i64, b: i64) -> Congruence {
        Congruence::new(Int::from(a), Int::from(b), 32, Signedness::Unsigned)
    }

    fn n(v: i64) -> MachineInt {
        MachineInt::new(v, 32, Signedness::Unsigned)
    }

    #[test]
    fn canonical_residue() {
        assert_eq!(c(4, 7), c(4, 3));
        assert_eq!(c(4, -1), c(4, 3));
    }

    #[test]
    fn join_is_gcd() {
        assert_eq!(c(8, 0).join(&c(8, 4)), c(4, 0));
        assert_eq!(c(0, 3).join(&c(0, 7)), c(4, 3));
        assert_eq!(c(0, 5).join(&c(0, 5)), c(0, 5));
    }

    #[test]
    fn meet_solves_congruences() {
        // x = 0 mod 4 and x = 2 mod 8 is inconsistent
        assert!(c(4, 0).meet(&c(8, 2)).is_bottom());
        // x = 0 mod 4 and x = 4 mod 8: x = 4 mod 8
        assert_eq!(c(4, 0).meet(&c(8, 4)), c(8, 4));
        // constant against congruence
        assert_eq!(c(0, 12).meet(&c(4, 0)), c(0, 12));
        assert!(c(0, 13).meet(&c(4, 0)).is_bottom());
    }

    #[test]
    fn arithmetic() {
        assert_eq!(c(4, 1).add(&c(4, 2)), c(4, 3));
        assert_eq!(c(4, 1).sub(&c(4, 2)), c(4, 3));
        assert_eq!(c(4, 0).mul(&c(0, 3)), c(12, 0));
        assert_eq!(c(8, 4).div(&c(0, 4)), c(2, 1));
        assert_eq!(c(8, 3).rem(&c(0, 4)), c(0, 3));
        assert_eq!(c(8, 5).rem(&c(0, 4)), c(0, 1));
    }

    #[test]
    fn contains() {
        assert!(c(4, 3).contains(&n(7)));
        assert!(!c(4, 3).contains(&n(8)));
        assert!(Congruence::top(32, Signedness::Unsigned).contains(&n(123)));
    }

    #[test]
    fn order() {
        assert!(c(8, 4).leq(&c(4, 0)));
        assert!(!c(4, 0).leq(&c(8, 4)));
        assert!(c(0, 12).leq(&c(4, 0)));
        assert!(Congruence::bottom(32, Signedness::Unsigned).leq(&c(4, 0)));
    }
}

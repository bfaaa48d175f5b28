//! Reduced product of intervals and congruences

use core::fmt;

use argus_num::{
    Int,
    MachineInt,
    Signedness,
};

use crate::{
    congruence::Congruence,
    interval::{
        IntPredicate,
        Interval,
    },
    lattice::AbstractDomain,
};

/// Reduced product of an interval and a congruence.
///
/// Reduction snaps the interval endpoints inward to the nearest lattice
/// points of the congruence, so both endpoints always satisfy it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IntervalCongruence {
    interval: Interval,
    congruence: Congruence,
}

impl IntervalCongruence {
    /// Build and reduce.
    pub fn new(interval: Interval, congruence: Congruence) -> Self {
        IntervalCongruence {
            interval,
            congruence,
        }
        .reduced()
    }

    /// Lift an interval, with no congruence information.
    pub fn from_interval(interval: Interval) -> Self {
        let congruence = Congruence::top(interval.bit_width(), interval.sign());
        IntervalCongruence::new(interval, congruence)
    }

    /// Lift a congruence, with no range information.
    pub fn from_congruence(congruence: Congruence) -> Self {
        let interval = Interval::top(congruence.bit_width(), congruence.sign());
        IntervalCongruence::new(interval, congruence)
    }

    /// The value holding exactly `n`.
    pub fn singleton(n: MachineInt) -> Self {
        IntervalCongruence {
            congruence: Congruence::singleton(&n),
            interval: Interval::singleton(n),
        }
    }

    /// The value holding the whole type range.
    pub fn top(bit_width: u64, sign: Signedness) -> Self {
        IntervalCongruence {
            interval: Interval::top(bit_width, sign),
            congruence: Congruence::top(bit_width, sign),
        }
    }

    /// The empty value.
    pub fn bottom(bit_width: u64, sign: Signedness) -> Self {
        IntervalCongruence {
            interval: Interval::bottom(bit_width, sign),
            congruence: Congruence::bottom(bit_width, sign),
        }
    }

    /// Bit width of the underlying type.
    pub fn bit_width(&self) -> u64 {
        self.interval.bit_width()
    }

    /// Signedness of the underlying type.
    pub fn sign(&self) -> Signedness {
        self.interval.sign()
    }

    /// The interval component.
    pub fn interval(&self) -> &Interval {
        &self.interval
    }

    /// The congruence component.
    pub fn congruence(&self) -> &Congruence {
        &self.congruence
    }

    /// Return the unique element, if there is exactly one.
    pub fn as_singleton(&self) -> Option<&MachineInt> {
        self.interval.as_singleton()
    }

    /// Return true if the value contains zero.
    pub fn contains_zero(&self) -> bool {
        let zero = MachineInt::zero(self.bit_width(), self.sign());
        self.interval.contains_zero() && self.congruence.contains(&zero)
    }

    fn reduced(self) -> Self {
        let (w, s) = (self.bit_width(), self.sign());
        if self.interval.is_bottom() || self.congruence.is_bottom() {
            return IntervalCongruence::bottom(w, s)
        }
        if let Some(c) = self.congruence.as_singleton() {
            let interval = self.interval.meet(&Interval::singleton(c));
            if interval.is_bottom() {
                return IntervalCongruence::bottom(w, s)
            }
            return IntervalCongruence {
                interval,
                congruence: self.congruence,
            }
        }
        let (modulus, residue) = match self.congruence.pair() {
            Some((a, b)) if !a.is_zero() => (a.clone(), b.clone()),
            _ => unreachable!("constant case handled above"),
        };
        // Snap endpoints inward to the nearest congruence representatives
        let lb = self.interval.lb().to_int();
        let ub = self.interval.ub().to_int();
        let lb = &lb
            + &(&residue - &lb)
                .mod_floor(&modulus)
                .expect("modulus is non-zero");
        let ub = &ub
            - &(&ub - &residue)
                .mod_floor(&modulus)
                .expect("modulus is non-zero");
        if lb > ub {
            return IntervalCongruence::bottom(w, s)
        }
        let interval = Interval::new(MachineInt::new(lb, w, s), MachineInt::new(ub, w, s));
        let congruence = match interval.as_singleton() {
            Some(n) => Congruence::singleton(n),
            None => self.congruence,
        };
        IntervalCongruence {
            interval,
            congruence,
        }
    }

    fn map(
        &self,
        other: &IntervalCongruence,
        fi: impl Fn(&Interval, &Interval) -> Interval,
        fc: impl Fn(&Congruence, &Congruence) -> Congruence,
    ) -> IntervalCongruence {
        IntervalCongruence::new(
            fi(&self.interval, &other.interval),
            fc(&self.congruence, &other.congruence),
        )
    }

    /// Addition.
    pub fn add(&self, other: &Self) -> Self {
        self.map(other, Interval::add, Congruence::add)
    }

    /// Subtraction.
    pub fn sub(&self, other: &Self) -> Self {
        self.map(other, Interval::sub, Congruence::sub)
    }

    /// Multiplication.
    pub fn mul(&self, other: &Self) -> Self {
        self.map(other, Interval::mul, Congruence::mul)
    }

    /// Division, rounding towards zero.
    pub fn div(&self, other: &Self) -> Self {
        self.map(other, Interval::div, Congruence::div)
    }

    /// Remainder.
    pub fn rem(&self, other: &Self) -> Self {
        self.map(other, Interval::rem, Congruence::rem)
    }

    /// Negation.
    pub fn neg(&self) -> Self {
        IntervalCongruence::new(self.interval.neg(), self.congruence.neg())
    }

    /// Left shift.
    pub fn shl(&self, other: &Self) -> Self {
        let congruence = match other.as_singleton().and_then(|n| n.to_u64()) {
            Some(k) if k < self.bit_width() => {
                let factor = Congruence::new(
                    Int::zero(),
                    Int::power_of_two(k),
                    self.bit_width(),
                    self.sign(),
                );
                self.congruence.mul(&factor)
            }
            _ => Congruence::top(self.bit_width(), self.sign()),
        };
        IntervalCongruence::new(self.interval.shl(&other.interval), congruence)
    }

    /// Logical right shift.
    pub fn lshr(&self, other: &Self) -> Self {
        IntervalCongruence::from_interval(self.interval.lshr(&other.interval))
    }

    /// Arithmetic right shift.
    pub fn ashr(&self, other: &Self) -> Self {
        IntervalCongruence::from_interval(self.interval.ashr(&other.interval))
    }

    /// Bitwise and.
    pub fn and(&self, other: &Self) -> Self {
        IntervalCongruence::from_interval(self.interval.and(&other.interval))
    }

    /// Bitwise or.
    pub fn or(&self, other: &Self) -> Self {
        IntervalCongruence::from_interval(self.interval.or(&other.interval))
    }

    /// Bitwise exclusive or.
    pub fn xor(&self, other: &Self) -> Self {
        IntervalCongruence::from_interval(self.interval.xor(&other.interval))
    }

    /// General cast to another machine integer type.
    pub fn cast(&self, bit_width: u64, sign: Signedness) -> Self {
        let congruence = match self.congruence.pair() {
            Some((a, b)) => Congruence::new(a.clone(), b.clone(), bit_width, sign),
            None => Congruence::bottom(bit_width, sign),
        };
        IntervalCongruence::new(self.interval.cast(bit_width, sign), congruence)
    }

    /// Truncation to a smaller width.
    pub fn trunc(&self, bit_width: u64) -> Self {
        self.cast(bit_width, self.sign())
    }

    /// Zero extension to a larger width.
    pub fn zext(&self, bit_width: u64) -> Self {
        let congruence = match self.congruence.pair() {
            Some((a, b)) => Congruence::new(a.clone(), b.clone(), bit_width, self.sign()),
            None => Congruence::bottom(bit_width, self.sign()),
        };
        IntervalCongruence::new(self.interval.zext(bit_width), congruence)
    }

    /// Sign extension to a larger width.
    pub fn sext(&self, bit_width: u64) -> Self {
        let congruence = match self.congruence.pair() {
            Some((a, b)) => Congruence::new(a.clone(), b.clone(), bit_width, self.sign()),
            None => Congruence::bottom(bit_width, self.sign()),
        };
        IntervalCongruence::new(self.interval.sext(bit_width), congruence)
    }

    /// Shrink by one ulp on the side whose endpoint equals `n`.
    pub fn trim_bound(&self, n: &MachineInt) -> Self {
        IntervalCongruence::new(self.interval.trim_bound(n), self.congruence.clone())
    }

    /// Widening with a threshold on the interval component.
    pub fn widening_threshold(&self, other: &Self, threshold: &MachineInt) -> Self {
        // No reduction after extrapolation, so widening chains terminate
        IntervalCongruence {
            interval: self.interval.widening_threshold(&other.interval, threshold),
            congruence: self.congruence.widening(&other.congruence),
        }
    }

    /// Narrowing with a threshold on the interval component.
    pub fn narrowing_threshold(&self, other: &Self, threshold: &MachineInt) -> Self {
        IntervalCongruence::new(
            self.interval.narrowing_threshold(&other.interval, threshold),
            self.congruence.narrowing(&other.congruence),
        )
    }

    /// Refine `(lhs, rhs)` under the assumption `lhs pred rhs`.
    pub fn refine(
        pred: IntPredicate,
        lhs: &IntervalCongruence,
        rhs: &IntervalCongruence,
    ) -> (IntervalCongruence, IntervalCongruence) {
        let (li, ri) = Interval::refine(pred, &lhs.interval, &rhs.interval);
        let (lc, rc) = match pred {
            IntPredicate::Eq => {
                let both = lhs.congruence.meet(&rhs.congruence);
                (both.clone(), both)
            }
            _ => (lhs.congruence.clone(), rhs.congruence.clone()),
        };
        (
            IntervalCongruence::new(li, lc),
            IntervalCongruence::new(ri, rc),
        )
    }
}

impl AbstractDomain for IntervalCongruence {
    fn is_bottom(&self) -> bool {
        self.interval.is_bottom()
    }

    fn is_top(&self) -> bool {
        self.interval.is_top() && self.congruence.is_top()
    }

    fn leq(&self, other: &Self) -> bool {
        self.interval.leq(&other.interval) && self.congruence.leq(&other.congruence)
    }

    fn join(&self, other: &Self) -> Self {
        if self.is_bottom() {
            return other.clone()
        }
        if other.is_bottom() {
            return self.clone()
        }
        IntervalCongruence::new(
            self.interval.join(&other.interval),
            self.congruence.join(&other.congruence),
        )
    }

    fn meet(&self, other: &Self) -> Self {
        IntervalCongruence::new(
            self.interval.meet(&other.interval),
            self.congruence.meet(&other.congruence),
        )
    }

    fn widening(&self, other: &Self) -> Self {
        if self.is_bottom() {
            return other.clone()
        }
        if other.is_bottom() {
            return self.clone()
        }
        // No reduction after extrapolation, so widening chains terminate
        IntervalCongruence {
            interval: self.interval.widening(&other.interval),
            congruence: self.congruence.widening(&other.congruence),
        }
    }

    fn narrowing(&self, other: &Self) -> Self {
        IntervalCongruence::new(
            self.interval.narrowing(&other.interval),
            self.congruence.narrowing(&other.congruence),
        )
    }
}

impl fmt::Display for IntervalCongruence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} /\\ {}", self.interval, self.congruence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ic(lb: i64, ub: i64, a: i64, b: i64) -> IntervalCongruence {
        IntervalCongruence::new(
            Interval::new(
                MachineInt::new(lb, 32, Signedness::Unsigned),
                MachineInt::new(ub, 32, Signedness::Unsigned),
            ),
            Congruence::new(Int::from(a), Int::from(b), 32, Signedness::Unsigned),
        )
    }

    #[test]
    fn reduction_snaps_endpoints() {
        let x = ic(1, 10, 4, 0);
        assert_eq!(x.interval().lb().to_u64(), Some(4));
        assert_eq!(x.interval().ub().to_u64(), Some(8));
        assert!(x.interval().leq(&Interval::new(
            MachineInt::new(1, 32, Signedness::Unsigned),
            MachineInt::new(10, 32, Signedness::Unsigned),
        )));
    }

    #[test]
    fn reduction_to_bottom() {
        assert!(ic(1, 3, 4, 0).is_bottom());
    }

    #[test]
    fn reduction_to_singleton() {
        let x = ic(1, 7, 4, 0);
        assert_eq!(
            x.as_singleton(),
            Some(&MachineInt::new(4, 32, Signedness::Unsigned))
        );
        assert!(x.congruence().as_singleton().is_some());
    }

    #[test]
    fn arithmetic_keeps_both_components() {
        let x = ic(0, 100, 4, 0);
        let y = IntervalCongruence::singleton(MachineInt::new(2, 32, Signedness::Unsigned));
        let sum = x.add(&y);
        assert_eq!(sum.interval().lb().to_u64(), Some(2));
        assert_eq!(sum.interval().ub().to_u64(), Some(102));
        assert!(sum
            .congruence()
            .contains(&MachineInt::new(6, 32, Signedness::Unsigned)));
        assert!(!sum
            .congruence()
            .contains(&MachineInt::new(4, 32, Signedness::Unsigned)));
    }

    #[test]
    fn shl_tracks_alignment() {
        let x = IntervalCongruence::from_interval(Interval::new(
            MachineInt::new(0, 32, Signedness::Unsigned),
            MachineInt::new(10, 32, Signedness::Unsigned),
        ));
        let k = IntervalCongruence::singleton(MachineInt::new(2, 32, Signedness::Unsigned));
        let shifted = x.shl(&k);
        assert!(shifted
            .congruence()
            .contains(&MachineInt::new(8, 32, Signedness::Unsigned)));
        assert!(!shifted
            .congruence()
            .contains(&MachineInt::new(6, 32, Signedness::Unsigned)));
    }
}

//! Machine integer intervals

use core::fmt;

use argus_num::{
    Int,
    MachineInt,
    Signedness,
};

use crate::lattice::AbstractDomain;

/// Comparison predicates usable for interval refinement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntPredicate {
    /// Equality.
    Eq,
    /// Disequality.
    Ne,
    /// Strictly less than.
    Lt,
    /// Less than or equal.
    Le,
    /// Strictly greater than.
    Gt,
    /// Greater than or equal.
    Ge,
}

impl IntPredicate {
    /// The predicate with operands swapped.
    pub fn swap(self) -> Self {
        match self {
            IntPredicate::Eq => IntPredicate::Eq,
            IntPredicate::Ne => IntPredicate::Ne,
            IntPredicate::Lt => IntPredicate::Gt,
            IntPredicate::Le => IntPredicate::Ge,
            IntPredicate::Gt => IntPredicate::Lt,
            IntPredicate::Ge => IntPredicate::Le,
        }
    }

    /// The logical negation of the predicate.
    pub fn negate(self) -> Self {
        match self {
            IntPredicate::Eq => IntPredicate::Ne,
            IntPredicate::Ne => IntPredicate::Eq,
            IntPredicate::Lt => IntPredicate::Ge,
            IntPredicate::Le => IntPredicate::Gt,
            IntPredicate::Gt => IntPredicate::Le,
            IntPredicate::Ge => IntPredicate::Lt,
        }
    }
}

/// Interval of machine integers.
///
/// The carrier is a pair of machine integers of the same type with
/// `lb <= ub`, or bottom. Top is the full representable range, so no
/// infinite endpoints are needed. The empty interval is canonicalized to
/// `[max, min]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Interval {
    lb: MachineInt,
    ub: MachineInt,
}

impl Interval {
    /// Build `[lb, ub]`. An inverted pair yields bottom.
    pub fn new(lb: MachineInt, ub: MachineInt) -> Self {
        assert!(
            lb.bit_width() == ub.bit_width() && lb.sign() == ub.sign(),
            "interval endpoints with incompatible types"
        );
        if lb > ub {
            Interval::bottom(lb.bit_width(), lb.sign())
        } else {
            Interval { lb, ub }
        }
    }

    /// The interval holding exactly `n`.
    pub fn singleton(n: MachineInt) -> Self {
        Interval {
            lb: n.clone(),
            ub: n,
        }
    }

    /// The full range of the given machine integer type.
    pub fn top(bit_width: u64, sign: Signedness) -> Self {
        Interval {
            lb: MachineInt::min(bit_width, sign),
            ub: MachineInt::max(bit_width, sign),
        }
    }

    /// The empty interval of the given machine integer type.
    pub fn bottom(bit_width: u64, sign: Signedness) -> Self {
        Interval {
            lb: MachineInt::max(bit_width, sign),
            ub: MachineInt::min(bit_width, sign),
        }
    }

    /// Bit width of the endpoints.
    pub fn bit_width(&self) -> u64 {
        self.lb.bit_width()
    }

    /// Signedness of the endpoints.
    pub fn sign(&self) -> Signedness {
        self.lb.sign()
    }

    /// Lower bound. Meaningless when bottom.
    pub fn lb(&self) -> &MachineInt {
        &self.lb
    }

    /// Upper bound. Meaningless when bottom.
    pub fn ub(&self) -> &MachineInt {
        &self.ub
    }

    /// Return the unique element, if the interval holds exactly one.
    pub fn as_singleton(&self) -> Option<&MachineInt> {
        if self.lb == self.ub {
            Some(&self.lb)
        } else {
            None
        }
    }

    /// Return true if `n` lies within the interval.
    pub fn contains(&self, n: &MachineInt) -> bool {
        self.lb <= *n && *n <= self.ub
    }

    /// Return true if the interval contains zero.
    pub fn contains_zero(&self) -> bool {
        self.contains(&MachineInt::zero(self.bit_width(), self.sign()))
    }

    fn type_min(&self) -> MachineInt {
        MachineInt::min(self.bit_width(), self.sign())
    }

    fn type_max(&self) -> MachineInt {
        MachineInt::max(self.bit_width(), self.sign())
    }

    /// Build an interval from unbounded endpoints, going to top whenever the
    /// range does not fit the machine type, since wrap-around cannot be
    /// represented by a single interval.
    fn from_int_range(&self, lo: Int, hi: Int) -> Interval {
        let (w, s) = (self.bit_width(), self.sign());
        if MachineInt::fits(&lo, w, s) && MachineInt::fits(&hi, w, s) {
            Interval::new(MachineInt::new(lo, w, s), MachineInt::new(hi, w, s))
        } else {
            Interval::top(w, s)
        }
    }

    /// Shrink the interval by one ulp on the side whose endpoint equals `n`.
    ///
    /// Used to refine disequalities against a singleton.
    pub fn trim_bound(&self, n: &MachineInt) -> Interval {
        if self.is_bottom() {
            return self.clone()
        }
        if let Some(value) = self.as_singleton() {
            if value == n {
                return Interval::bottom(self.bit_width(), self.sign())
            }
            return self.clone()
        }
        if self.lb == *n {
            match self.lb.increment() {
                Some(lb) => Interval::new(lb, self.ub.clone()),
                None => Interval::bottom(self.bit_width(), self.sign()),
            }
        } else if self.ub == *n {
            match self.ub.decrement() {
                Some(ub) => Interval::new(self.lb.clone(), ub),
                None => Interval::bottom(self.bit_width(), self.sign()),
            }
        } else {
            self.clone()
        }
    }

    /// Widening where endpoints growing past `threshold` stop there instead
    /// of jumping to the type extremes.
    pub fn widening_threshold(&self, other: &Interval, threshold: &MachineInt) -> Interval {
        if self.is_bottom() {
            return other.clone()
        }
        if other.is_bottom() {
            return self.clone()
        }
        let lb = if other.lb >= self.lb {
            self.lb.clone()
        } else if *threshold <= other.lb {
            threshold.clone()
        } else {
            self.type_min()
        };
        let ub = if other.ub <= self.ub {
            self.ub.clone()
        } else if *threshold >= other.ub {
            threshold.clone()
        } else {
            self.type_max()
        };
        Interval::new(lb, ub)
    }

    /// Narrowing where an endpoint equal to `threshold` may also be refined.
    pub fn narrowing_threshold(&self, other: &Interval, threshold: &MachineInt) -> Interval {
        if self.is_bottom() || other.is_bottom() {
            return Interval::bottom(self.bit_width(), self.sign())
        }
        let lb = if self.lb == self.type_min() || self.lb == *threshold {
            other.lb.clone()
        } else {
            self.lb.clone()
        };
        let ub = if self.ub == self.type_max() || self.ub == *threshold {
            other.ub.clone()
        } else {
            self.ub.clone()
        };
        Interval::new(lb, ub)
    }

    /// Interval addition with machine semantics.
    pub fn add(&self, other: &Interval) -> Interval {
        if self.is_bottom() || other.is_bottom() {
            return Interval::bottom(self.bit_width(), self.sign())
        }
        self.from_int_range(
            self.lb.to_int() + other.lb.to_int(),
            self.ub.to_int() + other.ub.to_int(),
        )
    }

    /// Interval subtraction with machine semantics.
    pub fn sub(&self, other: &Interval) -> Interval {
        if self.is_bottom() || other.is_bottom() {
            return Interval::bottom(self.bit_width(), self.sign())
        }
        self.from_int_range(
            self.lb.to_int() - other.ub.to_int(),
            self.ub.to_int() - other.lb.to_int(),
        )
    }

    /// Interval negation with machine semantics.
    pub fn neg(&self) -> Interval {
        if self.is_bottom() {
            return self.clone()
        }
        self.from_int_range(-self.ub.to_int(), -self.lb.to_int())
    }

    fn corner_range(&self, other: &Interval, f: impl Fn(&Int, &Int) -> Int) -> Interval {
        let candidates = [
            f(&self.lb.to_int(), &other.lb.to_int()),
            f(&self.lb.to_int(), &other.ub.to_int()),
            f(&self.ub.to_int(), &other.lb.to_int()),
            f(&self.ub.to_int(), &other.ub.to_int()),
        ];
        let lo = candidates.iter().min().cloned().expect("non-empty");
        let hi = candidates.iter().max().cloned().expect("non-empty");
        self.from_int_range(lo, hi)
    }

    /// Interval multiplication with machine semantics.
    pub fn mul(&self, other: &Interval) -> Interval {
        if self.is_bottom() || other.is_bottom() {
            return Interval::bottom(self.bit_width(), self.sign())
        }
        self.corner_range(other, |a, b| a * b)
    }

    /// Interval division, rounding towards zero.
    ///
    /// A divisor that may be zero yields top; flagging the division is the
    /// caller's concern.
    pub fn div(&self, other: &Interval) -> Interval {
        if self.is_bottom() || other.is_bottom() {
            return Interval::bottom(self.bit_width(), self.sign())
        }
        if other.contains_zero() {
            return Interval::top(self.bit_width(), self.sign())
        }
        self.corner_range(other, |a, b| {
            a.div_trunc(b).expect("divisor interval excludes zero")
        })
    }

    /// Interval remainder, with the sign of the dividend.
    pub fn rem(&self, other: &Interval) -> Interval {
        if self.is_bottom() || other.is_bottom() {
            return Interval::bottom(self.bit_width(), self.sign())
        }
        if other.contains_zero() {
            return Interval::top(self.bit_width(), self.sign())
        }
        let zero = Int::zero();
        let mag = other
            .lb
            .to_int()
            .abs()
            .max(other.ub.to_int().abs())
            - Int::one();
        if self.lb.to_int() >= zero {
            self.from_int_range(Int::zero(), self.ub.to_int().min(mag))
        } else if self.ub.to_int() <= zero {
            self.from_int_range((-&mag).max(self.lb.to_int()), Int::zero())
        } else {
            self.from_int_range(-&mag, mag.clone())
        }
    }

    /// Interval left shift; precise only for a constant shift amount.
    pub fn shl(&self, other: &Interval) -> Interval {
        if self.is_bottom() || other.is_bottom() {
            return Interval::bottom(self.bit_width(), self.sign())
        }
        match other.as_singleton().and_then(|n| n.to_u64()) {
            Some(k) if k < self.bit_width() => self.from_int_range(
                &self.lb.to_int() << k,
                &self.ub.to_int() << k,
            ),
            _ => Interval::top(self.bit_width(), self.sign()),
        }
    }

    /// Interval logical right shift; precise only for a constant amount over
    /// an interval that does not straddle the sign bit.
    pub fn lshr(&self, other: &Interval) -> Interval {
        if self.is_bottom() || other.is_bottom() {
            return Interval::bottom(self.bit_width(), self.sign())
        }
        let k = match other.as_singleton().and_then(|n| n.to_u64()) {
            Some(k) if k < self.bit_width() => k,
            _ => return Interval::top(self.bit_width(), self.sign()),
        };
        let zero = Int::zero();
        let width = self.bit_width();
        let offset = Int::power_of_two(width);
        if self.lb.to_int() >= zero {
            self.from_int_range(&self.lb.to_int() >> k, &self.ub.to_int() >> k)
        } else if self.ub.to_int() < zero {
            // Both bit patterns have the sign bit set; shifted patterns stay
            // in order.
            self.from_int_range(
                &(self.lb.to_int() + offset.clone()) >> k,
                &(self.ub.to_int() + offset) >> k,
            )
        } else {
            Interval::top(self.bit_width(), self.sign())
        }
    }

    /// Interval arithmetic right shift; precise only for a constant amount.
    pub fn ashr(&self, other: &Interval) -> Interval {
        if self.is_bottom() || other.is_bottom() {
            return Interval::bottom(self.bit_width(), self.sign())
        }
        let k = match other.as_singleton().and_then(|n| n.to_u64()) {
            Some(k) if k < self.bit_width() => k,
            _ => return Interval::top(self.bit_width(), self.sign()),
        };
        match self.sign() {
            Signedness::Signed => {
                self.from_int_range(&self.lb.to_int() >> k, &self.ub.to_int() >> k)
            }
            Signedness::Unsigned => {
                let sign_bit = Int::power_of_two(self.bit_width() - 1);
                if self.ub.to_int() < sign_bit {
                    self.from_int_range(&self.lb.to_int() >> k, &self.ub.to_int() >> k)
                } else {
                    Interval::top(self.bit_width(), self.sign())
                }
            }
        }
    }

    /// Interval bitwise and.
    pub fn and(&self, other: &Interval) -> Interval {
        if self.is_bottom() || other.is_bottom() {
            return Interval::bottom(self.bit_width(), self.sign())
        }
        if let (Some(a), Some(b)) = (self.as_singleton(), other.as_singleton()) {
            return Interval::singleton(a.and(b))
        }
        if self.sign() == Signedness::Unsigned {
            let ub = self.ub.clone().min(other.ub.clone());
            return Interval::new(MachineInt::zero(self.bit_width(), self.sign()), ub)
        }
        Interval::top(self.bit_width(), self.sign())
    }

    /// Interval bitwise or.
    pub fn or(&self, other: &Interval) -> Interval {
        if self.is_bottom() || other.is_bottom() {
            return Interval::bottom(self.bit_width(), self.sign())
        }
        if let (Some(a), Some(b)) = (self.as_singleton(), other.as_singleton()) {
            return Interval::singleton(a.or(b))
        }
        if self.sign() == Signedness::Unsigned {
            let lb = self.lb.clone().max(other.lb.clone());
            return Interval::new(lb, self.type_max())
        }
        Interval::top(self.bit_width(), self.sign())
    }

    /// Interval bitwise exclusive or.
    pub fn xor(&self, other: &Interval) -> Interval {
        if self.is_bottom() || other.is_bottom() {
            return Interval::bottom(self.bit_width(), self.sign())
        }
        if let (Some(a), Some(b)) = (self.as_singleton(), other.as_singleton()) {
            return Interval::singleton(a.xor(b))
        }
        Interval::top(self.bit_width(), self.sign())
    }

    /// Truncate both endpoints to a smaller width; top when the interval
    /// spans a wrap boundary of the target type.
    pub fn trunc(&self, bit_width: u64) -> Interval {
        if self.is_bottom() {
            return Interval::bottom(bit_width, self.sign())
        }
        let tl = self.lb.trunc(bit_width);
        let tu = self.ub.trunc(bit_width);
        let span = self.ub.to_int() - self.lb.to_int();
        if span == tu.to_int() - tl.to_int() {
            Interval::new(tl, tu)
        } else {
            Interval::top(bit_width, self.sign())
        }
    }

    /// Zero-extend to a larger width; top when the interval straddles the
    /// sign boundary of a signed type.
    pub fn zext(&self, bit_width: u64) -> Interval {
        if self.is_bottom() {
            return Interval::bottom(bit_width, self.sign())
        }
        let zero = Int::zero();
        if self.lb.to_int() >= zero || self.ub.to_int() < zero {
            Interval::new(self.lb.zext(bit_width), self.ub.zext(bit_width))
        } else {
            Interval::top(bit_width, self.sign())
        }
    }

    /// Sign-extend to a larger width; always monotone.
    pub fn sext(&self, bit_width: u64) -> Interval {
        if self.is_bottom() {
            return Interval::bottom(bit_width, self.sign())
        }
        Interval::new(self.lb.sext(bit_width), self.ub.sext(bit_width))
    }

    /// Reinterpret under the other signedness, same width; top when the
    /// reinterpretation tears the interval apart.
    pub fn sign_cast(&self, sign: Signedness) -> Interval {
        if self.is_bottom() {
            return Interval::bottom(self.bit_width(), sign)
        }
        let wl = self.lb.sign_cast(sign);
        let wh = self.ub.sign_cast(sign);
        let span = self.ub.to_int() - self.lb.to_int();
        if span == wh.to_int() - wl.to_int() {
            Interval::new(wl, wh)
        } else {
            Interval::top(self.bit_width(), sign)
        }
    }

    /// General cast: resize following the source signedness, then
    /// reinterpret under the destination signedness.
    pub fn cast(&self, bit_width: u64, sign: Signedness) -> Interval {
        use core::cmp::Ordering;
        let resized = match self.bit_width().cmp(&bit_width) {
            Ordering::Greater => self.trunc(bit_width),
            Ordering::Equal => self.clone(),
            Ordering::Less => match self.sign() {
                Signedness::Signed => self.sext(bit_width),
                Signedness::Unsigned => self.zext(bit_width),
            },
        };
        resized.sign_cast(sign)
    }

    /// Refine `(lhs, rhs)` under the assumption `lhs pred rhs`.
    pub fn refine(pred: IntPredicate, lhs: &Interval, rhs: &Interval) -> (Interval, Interval) {
        let (w, s) = (lhs.bit_width(), lhs.sign());
        if lhs.is_bottom() || rhs.is_bottom() {
            return (Interval::bottom(w, s), Interval::bottom(w, s))
        }
        match pred {
            IntPredicate::Eq => {
                let both = lhs.meet(rhs);
                (both.clone(), both)
            }
            IntPredicate::Ne => {
                let lhs_refined = match rhs.as_singleton() {
                    Some(n) => lhs.trim_bound(n),
                    None => lhs.clone(),
                };
                let rhs_refined = match lhs.as_singleton() {
                    Some(n) => rhs.trim_bound(n),
                    None => rhs.clone(),
                };
                (lhs_refined, rhs_refined)
            }
            IntPredicate::Le => {
                let lhs_refined =
                    lhs.meet(&Interval::new(MachineInt::min(w, s), rhs.ub.clone()));
                let rhs_refined =
                    rhs.meet(&Interval::new(lhs.lb.clone(), MachineInt::max(w, s)));
                (lhs_refined, rhs_refined)
            }
            IntPredicate::Lt => match (rhs.ub.decrement(), lhs.lb.increment()) {
                (Some(ub), Some(lb)) => (
                    lhs.meet(&Interval::new(MachineInt::min(w, s), ub)),
                    rhs.meet(&Interval::new(lb, MachineInt::max(w, s))),
                ),
                // rhs cannot exceed the type minimum, or lhs the maximum:
                // the guard is unsatisfiable
                _ => (Interval::bottom(w, s), Interval::bottom(w, s)),
            },
            IntPredicate::Ge => {
                let (r, l) = Interval::refine(IntPredicate::Le, rhs, lhs);
                (l, r)
            }
            IntPredicate::Gt => {
                let (r, l) = Interval::refine(IntPredicate::Lt, rhs, lhs);
                (l, r)
            }
        }
    }
}

impl AbstractDomain for Interval {
    fn is_bottom(&self) -> bool {
        self.lb > self.ub
    }

    fn is_top(&self) -> bool {
        self.lb == self.type_min() && self.ub == self.type_max()
    }

    fn leq(&self, other: &Self) -> bool {
        if self.is_bottom() {
            return true
        }
        if other.is_bottom() {
            return false
        }
        other.lb <= self.lb && self.ub <= other.ub
    }

    fn join(&self, other: &Self) -> Self {
        if self.is_bottom() {
            return other.clone()
        }
        if other.is_bottom() {
            return self.clone()
        }
        Interval::new(
            self.lb.clone().min(other.lb.clone()),
            self.ub.clone().max(other.ub.clone()),
        )
    }

    fn meet(&self, other: &Self) -> Self {
        if self.is_bottom() || other.is_bottom() {
            return Interval::bottom(self.bit_width(), self.sign())
        }
        let lb = self.lb.clone().max(other.lb.clone());
        let ub = self.ub.clone().min(other.ub.clone());
        if lb > ub {
            Interval::bottom(self.bit_width(), self.sign())
        } else {
            Interval::new(lb, ub)
        }
    }

    fn widening(&self, other: &Self) -> Self {
        if self.is_bottom() {
            return other.clone()
        }
        if other.is_bottom() {
            return self.clone()
        }
        let lb = if other.lb >= self.lb {
            self.lb.clone()
        } else {
            self.type_min()
        };
        let ub = if other.ub <= self.ub {
            self.ub.clone()
        } else {
            self.type_max()
        };
        Interval::new(lb, ub)
    }

    fn narrowing(&self, other: &Self) -> Self {
        if self.is_bottom() || other.is_bottom() {
            return Interval::bottom(self.bit_width(), self.sign())
        }
        let lb = if self.lb == self.type_min() {
            other.lb.clone()
        } else {
            self.lb.clone()
        };
        let ub = if self.ub == self.type_max() {
            other.ub.clone()
        } else {
            self.ub.clone()
        };
        Interval::new(lb, ub)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_bottom() {
            write!(f, "_|_")
        } else {
            write!(f, "[{}, {}]", self.lb.to_int(), self.ub.to_int())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn si8(lb: i64, ub: i64) -> Interval {
        Interval::new(
            MachineInt::new(lb, 8, Signedness::Signed),
            MachineInt::new(ub, 8, Signedness::Signed),
        )
    }

    fn n8(v: i64) -> MachineInt {
        MachineInt::new(v, 8, Signedness::Signed)
    }

    #[test]
    fn join_meet() {
        let a = si8(0, 10);
        let b = si8(5, 20);
        assert_eq!(a.join(&b), si8(0, 20));
        assert_eq!(a.meet(&b), si8(5, 10));
        assert!(si8(5, 10).leq(&a.join(&b)));
        assert!(si8(0, 3).meet(&si8(4, 6)).is_bottom());
    }

    #[test]
    fn wrapping_arithmetic_goes_to_top() {
        let a = si8(100, 120);
        assert_eq!(a.add(&si8(10, 10)), Interval::top(8, Signedness::Signed));
        assert_eq!(si8(1, 2).add(&si8(3, 4)), si8(4, 6));
        assert_eq!(si8(2, 3).mul(&si8(4, 5)), si8(8, 15));
        assert_eq!(si8(50, 100).mul(&si8(2, 2)), Interval::top(8, Signedness::Signed));
    }

    #[test]
    fn division() {
        assert_eq!(si8(10, 20).div(&si8(2, 2)), si8(5, 10));
        assert_eq!(
            si8(10, 20).div(&si8(-1, 1)),
            Interval::top(8, Signedness::Signed)
        );
        // MIN / -1 overflows
        assert_eq!(
            si8(-128, -128).div(&si8(-1, -1)),
            Interval::top(8, Signedness::Signed)
        );
    }

    #[test]
    fn remainder() {
        assert_eq!(si8(10, 20).rem(&si8(4, 4)), si8(0, 3));
        assert_eq!(si8(-20, -10).rem(&si8(4, 4)), si8(-3, 0));
    }

    #[test]
    fn trim() {
        assert_eq!(si8(0, 10).trim_bound(&n8(0)), si8(1, 10));
        assert_eq!(si8(0, 10).trim_bound(&n8(10)), si8(0, 9));
        assert_eq!(si8(0, 10).trim_bound(&n8(5)), si8(0, 10));
        assert!(Interval::singleton(n8(5)).trim_bound(&n8(5)).is_bottom());
        // Idempotence
        let t = si8(0, 10).trim_bound(&n8(0));
        assert_eq!(t.trim_bound(&n8(0)), t);
    }

    #[test]
    fn widening_narrowing() {
        let a = si8(0, 10);
        let b = si8(0, 11);
        let widened = a.widening(&b);
        assert_eq!(widened, si8(0, 127));
        let narrowed = widened.narrowing(&si8(0, 20));
        assert_eq!(narrowed, si8(0, 20));
    }

    #[test]
    fn threshold_widening() {
        let a = si8(0, 10);
        let b = si8(0, 11);
        assert_eq!(a.widening_threshold(&b, &n8(16)), si8(0, 16));
        assert_eq!(a.widening_threshold(&b, &n8(5)), si8(0, 127));
    }

    #[test]
    fn refinement() {
        let x = si8(0, 100);
        let y = si8(10, 20);
        let (xr, yr) = Interval::refine(IntPredicate::Lt, &x, &y);
        assert_eq!(xr, si8(0, 19));
        assert_eq!(yr, si8(10, 20));
        let (xr, yr) = Interval::refine(IntPredicate::Eq, &x, &y);
        assert_eq!(xr, si8(10, 20));
        assert_eq!(yr, si8(10, 20));
        let (xr, _) = Interval::refine(IntPredicate::Ne, &x, &Interval::singleton(n8(0)));
        assert_eq!(xr, si8(1, 100));
    }

    #[test]
    fn casts() {
        let a = si8(-2, 3);
        assert_eq!(
            a.sext(16),
            Interval::new(
                MachineInt::new(-2, 16, Signedness::Signed),
                MachineInt::new(3, 16, Signedness::Signed)
            )
        );
        assert!(a.zext(16).is_top());
        let b = si8(1, 3);
        assert_eq!(
            b.zext(16),
            Interval::new(
                MachineInt::new(1, 16, Signedness::Signed),
                MachineInt::new(3, 16, Signedness::Signed)
            )
        );
        let c = Interval::new(
            MachineInt::new(200, 16, Signedness::Unsigned),
            MachineInt::new(300, 16, Signedness::Unsigned),
        );
        assert!(c.trunc(8).is_top());
        let d = Interval::new(
            MachineInt::new(10, 16, Signedness::Unsigned),
            MachineInt::new(20, 16, Signedness::Unsigned),
        );
        assert_eq!(
            d.trunc(8),
            Interval::new(
                MachineInt::new(10, 8, Signedness::Unsigned),
                MachineInt::new(20, 8, Signedness::Unsigned)
            )
        );
    }

    #[test]
    fn shifts() {
        assert_eq!(si8(1, 3).shl(&si8(2, 2)), si8(4, 12));
        assert_eq!(si8(40, 60).shl(&si8(2, 2)), Interval::top(8, Signedness::Signed));
        assert_eq!(si8(8, 16).ashr(&si8(2, 2)), si8(2, 4));
        assert_eq!(si8(8, 16).lshr(&si8(1, 1)), si8(4, 8));
    }
}

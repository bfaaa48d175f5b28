//! Points-to sets and pointer abstract values

use core::fmt;
use std::collections::BTreeSet;

use itertools::Itertools;

use argus_num::Signedness;

use crate::{
    interval::Interval,
    lattice::AbstractDomain,
    nullity::Nullity,
    uninitialized::Uninitialized,
};

/// Set of memory locations a pointer may reference.
///
/// Bottom is distinct from the empty set: bottom is unreachable, while the
/// empty set is a pointer that points nowhere (e.g. the null pointer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointsToSet<M: Ord + Clone + fmt::Debug> {
    /// Unreachable.
    Bottom,
    /// A finite set of targets.
    Set(BTreeSet<M>),
    /// Any address.
    Top,
}

impl<M: Ord + Clone + fmt::Debug> PointsToSet<M> {
    /// The unreachable points-to set.
    pub fn bottom() -> Self {
        PointsToSet::Bottom
    }

    /// The empty points-to set.
    pub fn empty() -> Self {
        PointsToSet::Set(BTreeSet::new())
    }

    /// The set of all addresses.
    pub fn top() -> Self {
        PointsToSet::Top
    }

    /// The set holding exactly `m`.
    pub fn singleton(m: M) -> Self {
        let mut set = BTreeSet::new();
        set.insert(m);
        PointsToSet::Set(set)
    }

    /// Return true if this is the empty set.
    pub fn is_empty(&self) -> bool {
        matches!(self, PointsToSet::Set(set) if set.is_empty())
    }

    /// Return true if `m` may be a target.
    pub fn contains(&self, m: &M) -> bool {
        match self {
            PointsToSet::Bottom => false,
            PointsToSet::Set(set) => set.contains(m),
            PointsToSet::Top => true,
        }
    }

    /// Add a target.
    pub fn add(&mut self, m: M) {
        match self {
            PointsToSet::Bottom => *self = PointsToSet::singleton(m),
            PointsToSet::Set(set) => {
                set.insert(m);
            }
            PointsToSet::Top => {}
        }
    }

    /// The finite target set, if the value is neither bottom nor top.
    pub fn as_set(&self) -> Option<&BTreeSet<M>> {
        match self {
            PointsToSet::Set(set) => Some(set),
            _ => None,
        }
    }
}

impl<M: Ord + Clone + fmt::Debug> FromIterator<M> for PointsToSet<M> {
    fn from_iter<I: IntoIterator<Item = M>>(iter: I) -> Self {
        PointsToSet::Set(iter.into_iter().collect())
    }
}

impl<M: Ord + Clone + fmt::Debug> AbstractDomain for PointsToSet<M> {
    fn is_bottom(&self) -> bool {
        matches!(self, PointsToSet::Bottom)
    }

    fn is_top(&self) -> bool {
        matches!(self, PointsToSet::Top)
    }

    fn leq(&self, other: &Self) -> bool {
        match (self, other) {
            (PointsToSet::Bottom, _) => true,
            (_, PointsToSet::Top) => true,
            (_, PointsToSet::Bottom) => false,
            (PointsToSet::Top, _) => false,
            (PointsToSet::Set(a), PointsToSet::Set(b)) => a.is_subset(b),
        }
    }

    fn join(&self, other: &Self) -> Self {
        match (self, other) {
            (PointsToSet::Bottom, x) | (x, PointsToSet::Bottom) => x.clone(),
            (PointsToSet::Top, _) | (_, PointsToSet::Top) => PointsToSet::Top,
            (PointsToSet::Set(a), PointsToSet::Set(b)) => {
                PointsToSet::Set(a.union(b).cloned().collect())
            }
        }
    }

    fn meet(&self, other: &Self) -> Self {
        match (self, other) {
            (PointsToSet::Bottom, _) | (_, PointsToSet::Bottom) => PointsToSet::Bottom,
            (PointsToSet::Top, x) | (x, PointsToSet::Top) => x.clone(),
            (PointsToSet::Set(a), PointsToSet::Set(b)) => {
                PointsToSet::Set(a.intersection(b).cloned().collect())
            }
        }
    }

    fn widening(&self, other: &Self) -> Self {
        self.join(other)
    }

    fn narrowing(&self, other: &Self) -> Self {
        self.meet(other)
    }
}

/// Abstract value of a pointer: initialization, nullity, targets and offset.
///
/// The components are kept reduced: a definitely-uninitialized pointer has no
/// target information, a definitely-null pointer has no points-to set, and a
/// contradictory combination collapses to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointerAbsValue<M: Ord + Clone + fmt::Debug> {
    uninitialized: Uninitialized,
    nullity: Nullity,
    points_to: PointsToSet<M>,
    offset: Interval,
}

impl<M: Ord + Clone + fmt::Debug> PointerAbsValue<M> {
    /// Build a pointer value and reduce it.
    pub fn new(
        uninitialized: Uninitialized,
        nullity: Nullity,
        points_to: PointsToSet<M>,
        offset: Interval,
    ) -> Self {
        let mut value = PointerAbsValue {
            uninitialized,
            nullity,
            points_to,
            offset,
        };
        value.normalize();
        value
    }

    /// The pointer about which nothing is known.
    pub fn top(bit_width: u64, sign: Signedness) -> Self {
        PointerAbsValue {
            uninitialized: Uninitialized::Top,
            nullity: Nullity::Top,
            points_to: PointsToSet::top(),
            offset: Interval::top(bit_width, sign),
        }
    }

    /// The unreachable pointer value.
    pub fn bottom(bit_width: u64, sign: Signedness) -> Self {
        PointerAbsValue {
            uninitialized: Uninitialized::Bottom,
            nullity: Nullity::Bottom,
            points_to: PointsToSet::bottom(),
            offset: Interval::bottom(bit_width, sign),
        }
    }

    /// The definitely-uninitialized pointer.
    pub fn uninitialized(bit_width: u64, sign: Signedness) -> Self {
        PointerAbsValue {
            uninitialized: Uninitialized::Uninitialized,
            nullity: Nullity::Bottom,
            points_to: PointsToSet::bottom(),
            offset: Interval::bottom(bit_width, sign),
        }
    }

    /// The null pointer.
    pub fn null(bit_width: u64, sign: Signedness) -> Self {
        PointerAbsValue {
            uninitialized: Uninitialized::Initialized,
            nullity: Nullity::Null,
            points_to: PointsToSet::bottom(),
            offset: Interval::bottom(bit_width, sign),
        }
    }

    /// A well-defined pointer to `m` with the given offsets.
    pub fn address(m: M, offset: Interval) -> Self {
        PointerAbsValue {
            uninitialized: Uninitialized::Initialized,
            nullity: Nullity::NonNull,
            points_to: PointsToSet::singleton(m),
            offset,
        }
    }

    fn set_to_bottom(&mut self) {
        let (w, s) = (self.offset.bit_width(), self.offset.sign());
        *self = PointerAbsValue::bottom(w, s);
    }

    fn normalize(&mut self) {
        let (w, s) = (self.offset.bit_width(), self.offset.sign());
        if self.uninitialized.is_bottom() {
            self.set_to_bottom();
        } else if self.uninitialized.is_uninitialized() {
            self.nullity = Nullity::Bottom;
            self.points_to = PointsToSet::bottom();
            self.offset = Interval::bottom(w, s);
        } else if self.nullity.is_bottom() {
            self.set_to_bottom();
        } else if self.nullity.is_null() {
            self.points_to = PointsToSet::bottom();
            self.offset = Interval::bottom(w, s);
        } else if self.points_to.is_bottom() || self.points_to.is_empty() {
            self.set_to_bottom();
        } else if self.offset.is_bottom() {
            self.set_to_bottom();
        }
    }

    /// The initialization component.
    pub fn uninitialized_state(&self) -> &Uninitialized {
        &self.uninitialized
    }

    /// The nullity component.
    pub fn nullity(&self) -> &Nullity {
        &self.nullity
    }

    /// The points-to component.
    pub fn points_to(&self) -> &PointsToSet<M> {
        &self.points_to
    }

    /// The offset interval.
    pub fn offset(&self) -> &Interval {
        &self.offset
    }

    /// Bit width of the offset.
    pub fn bit_width(&self) -> u64 {
        self.offset.bit_width()
    }

    /// Signedness of the offset.
    pub fn sign(&self) -> Signedness {
        self.offset.sign()
    }

    /// Shift the offset by an interval of byte displacements.
    pub fn add_offset(&self, displacement: &Interval) -> Self {
        if self.is_bottom() || self.nullity.is_null() {
            return self.clone()
        }
        PointerAbsValue::new(
            self.uninitialized,
            self.nullity,
            self.points_to.clone(),
            self.offset.add(displacement),
        )
    }

    /// Forget the offset, keeping targets.
    pub fn with_top_offset(&self) -> Self {
        if self.is_bottom() {
            return self.clone()
        }
        PointerAbsValue::new(
            self.uninitialized,
            self.nullity,
            self.points_to.clone(),
            Interval::top(self.bit_width(), self.sign()),
        )
    }
}

impl<M: Ord + Clone + fmt::Debug> AbstractDomain for PointerAbsValue<M> {
    fn is_bottom(&self) -> bool {
        // Correct because values are kept reduced
        self.uninitialized.is_bottom()
    }

    fn is_top(&self) -> bool {
        self.uninitialized.is_top()
            && self.nullity.is_top()
            && self.points_to.is_top()
            && self.offset.is_top()
    }

    fn leq(&self, other: &Self) -> bool {
        if self.is_bottom() {
            return true
        }
        if other.is_bottom() {
            return false
        }
        self.uninitialized.leq(&other.uninitialized)
            && self.nullity.leq(&other.nullity)
            && self.points_to.leq(&other.points_to)
            && self.offset.leq(&other.offset)
    }

    fn join(&self, other: &Self) -> Self {
        if self.is_bottom() {
            return other.clone()
        }
        if other.is_bottom() {
            return self.clone()
        }
        PointerAbsValue::new(
            self.uninitialized.join(&other.uninitialized),
            self.nullity.join(&other.nullity),
            self.points_to.join(&other.points_to),
            self.offset.join(&other.offset),
        )
    }

    fn meet(&self, other: &Self) -> Self {
        PointerAbsValue::new(
            self.uninitialized.meet(&other.uninitialized),
            self.nullity.meet(&other.nullity),
            self.points_to.meet(&other.points_to),
            self.offset.meet(&other.offset),
        )
    }

    fn widening(&self, other: &Self) -> Self {
        if self.is_bottom() {
            return other.clone()
        }
        if other.is_bottom() {
            return self.clone()
        }
        PointerAbsValue::new(
            self.uninitialized.join(&other.uninitialized),
            self.nullity.join(&other.nullity),
            self.points_to.widening(&other.points_to),
            self.offset.widening(&other.offset),
        )
    }

    fn narrowing(&self, other: &Self) -> Self {
        PointerAbsValue::new(
            self.uninitialized.meet(&other.uninitialized),
            self.nullity.meet(&other.nullity),
            self.points_to.narrowing(&other.points_to),
            self.offset.narrowing(&other.offset),
        )
    }
}

impl<M: Ord + Clone + fmt::Debug + fmt::Display> fmt::Display for PointerAbsValue<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_bottom() {
            return write!(f, "_|_")
        }
        match &self.points_to {
            PointsToSet::Top => write!(f, "({}, {}, T, {})", self.uninitialized, self.nullity, self.offset),
            PointsToSet::Bottom => {
                write!(f, "({}, {})", self.uninitialized, self.nullity)
            }
            PointsToSet::Set(set) => write!(
                f,
                "({}, {}, {{{}}}, {})",
                self.uninitialized,
                self.nullity,
                set.iter().join(", "),
                self.offset
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argus_num::MachineInt;

    fn off(lb: u64, ub: u64) -> Interval {
        Interval::new(
            MachineInt::new(lb, 64, Signedness::Unsigned),
            MachineInt::new(ub, 64, Signedness::Unsigned),
        )
    }

    #[test]
    fn reduction_on_uninitialized() {
        let v = PointerAbsValue::new(
            Uninitialized::Uninitialized,
            Nullity::Top,
            PointsToSet::singleton("x"),
            off(0, 4),
        );
        assert!(!v.is_bottom());
        assert!(v.nullity().is_bottom());
        assert!(v.points_to().is_bottom());
    }

    #[test]
    fn reduction_on_null() {
        let v = PointerAbsValue::new(
            Uninitialized::Initialized,
            Nullity::Null,
            PointsToSet::singleton("x"),
            off(0, 4),
        );
        assert!(!v.is_bottom());
        assert!(v.points_to().is_bottom());
    }

    #[test]
    fn empty_points_to_collapses() {
        let v = PointerAbsValue::<&str>::new(
            Uninitialized::Initialized,
            Nullity::NonNull,
            PointsToSet::empty(),
            off(0, 4),
        );
        assert!(v.is_bottom());
    }

    #[test]
    fn join_of_null_and_address() {
        let null = PointerAbsValue::<&str>::null(64, Signedness::Unsigned);
        let addr = PointerAbsValue::address("x", off(0, 0));
        let joined = null.join(&addr);
        assert!(!joined.is_bottom());
        assert_eq!(*joined.nullity(), Nullity::Top);
        assert!(joined.points_to().contains(&"x"));
        assert_eq!(joined.offset(), &off(0, 0));
    }

    #[test]
    fn add_offset() {
        let addr = PointerAbsValue::address("x", off(0, 4));
        let shifted = addr.add_offset(&off(8, 16));
        assert_eq!(shifted.offset(), &off(8, 20));
    }
}

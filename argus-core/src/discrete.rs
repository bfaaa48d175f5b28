//! Finite set lattice

use core::fmt;
use std::collections::BTreeSet;

use itertools::Itertools;

use crate::lattice::AbstractDomain;

/// Lattice of finite sets of `T`, with a distinguished top element.
///
/// Bottom is the empty set; join is union and meet is intersection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscreteDomain<T: Ord + Clone + fmt::Debug> {
    /// A finite set of elements.
    Set(BTreeSet<T>),
    /// Any element.
    Top,
}

impl<T: Ord + Clone + fmt::Debug> DiscreteDomain<T> {
    /// The empty set.
    pub fn bottom() -> Self {
        DiscreteDomain::Set(BTreeSet::new())
    }

    /// The set holding any element.
    pub fn top() -> Self {
        DiscreteDomain::Top
    }

    /// The set holding exactly `x`.
    pub fn singleton(x: T) -> Self {
        let mut set = BTreeSet::new();
        set.insert(x);
        DiscreteDomain::Set(set)
    }

    /// Add an element.
    pub fn add(&mut self, x: T) {
        if let DiscreteDomain::Set(set) = self {
            set.insert(x);
        }
    }

    /// Return true if `x` is in the set.
    pub fn contains(&self, x: &T) -> bool {
        match self {
            DiscreteDomain::Set(set) => set.contains(x),
            DiscreteDomain::Top => true,
        }
    }

    /// Number of elements, or `None` for top.
    pub fn size(&self) -> Option<usize> {
        match self {
            DiscreteDomain::Set(set) => Some(set.len()),
            DiscreteDomain::Top => None,
        }
    }

    /// Iterate over the elements of a finite set.
    ///
    /// # Panics
    ///
    /// Panics on top, which has no element list to iterate.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        match self {
            DiscreteDomain::Set(set) => set.iter(),
            DiscreteDomain::Top => panic!("iterating over the top discrete domain"),
        }
    }
}

impl<T: Ord + Clone + fmt::Debug> FromIterator<T> for DiscreteDomain<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        DiscreteDomain::Set(iter.into_iter().collect())
    }
}

impl<T: Ord + Clone + fmt::Debug> AbstractDomain for DiscreteDomain<T> {
    fn is_bottom(&self) -> bool {
        matches!(self, DiscreteDomain::Set(set) if set.is_empty())
    }

    fn is_top(&self) -> bool {
        matches!(self, DiscreteDomain::Top)
    }

    fn leq(&self, other: &Self) -> bool {
        match (self, other) {
            (_, DiscreteDomain::Top) => true,
            (DiscreteDomain::Top, _) => false,
            (DiscreteDomain::Set(a), DiscreteDomain::Set(b)) => a.is_subset(b),
        }
    }

    fn join(&self, other: &Self) -> Self {
        match (self, other) {
            (DiscreteDomain::Top, _) | (_, DiscreteDomain::Top) => DiscreteDomain::Top,
            (DiscreteDomain::Set(a), DiscreteDomain::Set(b)) => {
                DiscreteDomain::Set(a.union(b).cloned().collect())
            }
        }
    }

    fn meet(&self, other: &Self) -> Self {
        match (self, other) {
            (DiscreteDomain::Top, _) => other.clone(),
            (_, DiscreteDomain::Top) => self.clone(),
            (DiscreteDomain::Set(a), DiscreteDomain::Set(b)) => {
                DiscreteDomain::Set(a.intersection(b).cloned().collect())
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

impl<T: Ord + Clone + fmt::Debug + fmt::Display> fmt::Display for DiscreteDomain<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscreteDomain::Top => write!(f, "T"),
            DiscreteDomain::Set(set) => {
                write!(f, "{{{}}}", set.iter().join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_operations() {
        let a: DiscreteDomain<u32> = [1, 2, 3].into_iter().collect();
        let b: DiscreteDomain<u32> = [2, 3, 4].into_iter().collect();
        assert_eq!(a.join(&b), [1, 2, 3, 4].into_iter().collect());
        assert_eq!(a.meet(&b), [2, 3].into_iter().collect());
        assert!(a.meet(&b).leq(&a));
        assert!(a.leq(&a.join(&b)));
    }

    #[test]
    fn top_absorbs() {
        let a: DiscreteDomain<u32> = [1].into_iter().collect();
        assert!(a.join(&DiscreteDomain::top()).is_top());
        assert_eq!(a.meet(&DiscreteDomain::top()), a);
        assert!(DiscreteDomain::<u32>::bottom().is_bottom());
    }
}

//! Separate domain: pointwise lifting of a value domain over variables

use core::fmt;

use crate::{
    lattice::AbstractDomain,
    patricia::PatriciaTree,
};

/// Key into a separate domain.
///
/// Implemented by variable descriptors with a stable unique index.
pub trait SeparateKey: Copy {
    /// The index used to address the backing tree.
    fn index(self) -> u64;
}

impl SeparateKey for u64 {
    fn index(self) -> u64 {
        self
    }
}

/// Map from variables to abstract values, missing bindings meaning top.
///
/// Backed by a persistent patricia tree so snapshots are cheap. Binding a
/// bottom value collapses the whole domain to bottom; binding top drops the
/// key.
#[derive(Debug, Clone)]
pub struct SeparateDomain<V: AbstractDomain> {
    tree: PatriciaTree<V>,
    bottom: bool,
}

impl<V: AbstractDomain> SeparateDomain<V> {
    /// The domain with no information.
    pub fn top() -> Self {
        SeparateDomain {
            tree: PatriciaTree::new(),
            bottom: false,
        }
    }

    /// The unreachable domain.
    pub fn bottom() -> Self {
        SeparateDomain {
            tree: PatriciaTree::new(),
            bottom: true,
        }
    }

    /// The value bound to `key`; `None` means top.
    ///
    /// Meaningless when the domain is bottom.
    pub fn get<K: SeparateKey>(&self, key: K) -> Option<&V> {
        self.tree.get(key.index())
    }

    /// Bind `key` to `value`.
    pub fn set<K: SeparateKey>(&mut self, key: K, value: V) {
        if self.bottom {
            return
        }
        if value.is_bottom() {
            *self = SeparateDomain::bottom();
        } else if value.is_top() {
            self.tree = self.tree.remove(key.index());
        } else {
            self.tree = self.tree.insert(key.index(), value);
        }
    }

    /// Refine the binding of `key` by meeting it with `value`.
    pub fn refine<K: SeparateKey>(&mut self, key: K, value: V) {
        if self.bottom {
            return
        }
        let refined = match self.get(key) {
            Some(current) => current.meet(&value),
            None => value,
        };
        self.set(key, refined);
    }

    /// Drop all information about `key`.
    pub fn forget<K: SeparateKey>(&mut self, key: K) {
        if self.bottom {
            return
        }
        self.tree = self.tree.remove(key.index());
    }

    /// Iterate over the explicit bindings.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &V)> {
        self.tree.iter()
    }

    /// Number of explicit bindings.
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Return true if there are no explicit bindings.
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Widening with a caller-chosen extrapolation, e.g. threshold widening.
    pub fn widening_by(&self, other: &Self, f: impl Fn(&V, &V) -> V) -> Self {
        if self.bottom {
            return other.clone()
        }
        if other.bottom {
            return self.clone()
        }
        self.intersection_merge(other, f)
    }

    /// Narrowing with a caller-chosen refinement.
    pub fn narrowing_by(&self, other: &Self, f: impl Fn(&V, &V) -> V) -> Self {
        if self.bottom || other.bottom {
            return SeparateDomain::bottom()
        }
        self.union_merge(other, |a, b| {
            let refined = f(a, b);
            if refined.is_bottom() {
                None
            } else {
                Some(refined)
            }
        })
    }

    /// Pointwise merge keeping only keys bound on both sides.
    fn intersection_merge(&self, other: &Self, f: impl Fn(&V, &V) -> V) -> Self {
        let mut tree = PatriciaTree::new();
        for (key, lhs) in self.tree.iter() {
            if let Some(rhs) = other.tree.get(key) {
                let merged = f(lhs, rhs);
                if !merged.is_top() {
                    tree = tree.insert(key, merged);
                }
            }
        }
        SeparateDomain {
            tree,
            bottom: false,
        }
    }

    /// Pointwise merge keeping keys bound on either side; `None` from the
    /// merge function collapses the result to bottom.
    fn union_merge(&self, other: &Self, f: impl Fn(&V, &V) -> Option<V>) -> Self {
        let mut tree = self.tree.clone();
        for (key, rhs) in other.tree.iter() {
            let merged = match self.tree.get(key) {
                Some(lhs) => match f(lhs, rhs) {
                    Some(v) => v,
                    None => return SeparateDomain::bottom(),
                },
                None => rhs.clone(),
            };
            if merged.is_bottom() {
                return SeparateDomain::bottom()
            }
            tree = tree.insert(key, merged);
        }
        SeparateDomain {
            tree,
            bottom: false,
        }
    }
}

impl<V: AbstractDomain> PartialEq for SeparateDomain<V> {
    fn eq(&self, other: &Self) -> bool {
        self.leq(other) && other.leq(self)
    }
}

impl<V: AbstractDomain> AbstractDomain for SeparateDomain<V> {
    fn is_bottom(&self) -> bool {
        self.bottom
    }

    fn is_top(&self) -> bool {
        !self.bottom && self.tree.is_empty()
    }

    fn leq(&self, other: &Self) -> bool {
        if self.bottom {
            return true
        }
        if other.bottom {
            return false
        }
        // Missing bindings are top, and stored values are never top, so
        // every binding of `other` must be matched in `self`.
        other.tree.iter().all(|(key, rhs)| match self.tree.get(key) {
            Some(lhs) => lhs.leq(rhs),
            None => false,
        })
    }

    fn join(&self, other: &Self) -> Self {
        if self.bottom {
            return other.clone()
        }
        if other.bottom {
            return self.clone()
        }
        self.intersection_merge(other, |a, b| a.join(b))
    }

    fn meet(&self, other: &Self) -> Self {
        if self.bottom || other.bottom {
            return SeparateDomain::bottom()
        }
        self.union_merge(other, |a, b| {
            let met = a.meet(b);
            if met.is_bottom() {
                None
            } else {
                Some(met)
            }
        })
    }

    fn widening(&self, other: &Self) -> Self {
        if self.bottom {
            return other.clone()
        }
        if other.bottom {
            return self.clone()
        }
        self.intersection_merge(other, |a, b| a.widening(b))
    }

    fn narrowing(&self, other: &Self) -> Self {
        if self.bottom || other.bottom {
            return SeparateDomain::bottom()
        }
        self.union_merge(other, |a, b| {
            let narrowed = a.narrowing(b);
            if narrowed.is_bottom() {
                None
            } else {
                Some(narrowed)
            }
        })
    }
}

impl<V: AbstractDomain + fmt::Display> fmt::Display for SeparateDomain<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bottom {
            return write!(f, "_|_")
        }
        write!(f, "{{")?;
        for (i, (key, value)) in self.tree.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "v{key} -> {value}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::Interval;
    use argus_num::{
        MachineInt,
        Signedness,
    };

    fn iv(lb: i64, ub: i64) -> Interval {
        Interval::new(
            MachineInt::new(lb, 32, Signedness::Signed),
            MachineInt::new(ub, 32, Signedness::Signed),
        )
    }

    #[test]
    fn missing_keys_are_top() {
        let mut env: SeparateDomain<Interval> = SeparateDomain::top();
        assert!(env.get(1u64).is_none());
        env.set(1u64, iv(0, 10));
        assert_eq!(env.get(1u64), Some(&iv(0, 10)));
        env.set(1u64, Interval::top(32, Signedness::Signed));
        assert!(env.get(1u64).is_none());
    }

    #[test]
    fn bottom_value_collapses() {
        let mut env: SeparateDomain<Interval> = SeparateDomain::top();
        env.set(1u64, Interval::bottom(32, Signedness::Signed));
        assert!(env.is_bottom());
    }

    #[test]
    fn join_intersects_keys() {
        let mut a: SeparateDomain<Interval> = SeparateDomain::top();
        a.set(1u64, iv(0, 10));
        a.set(2u64, iv(5, 5));
        let mut b: SeparateDomain<Interval> = SeparateDomain::top();
        b.set(1u64, iv(5, 20));
        let joined = a.join(&b);
        assert_eq!(joined.get(1u64), Some(&iv(0, 20)));
        // 2 is top in b, so it is dropped
        assert!(joined.get(2u64).is_none());
    }

    #[test]
    fn meet_unions_keys() {
        let mut a: SeparateDomain<Interval> = SeparateDomain::top();
        a.set(1u64, iv(0, 10));
        let mut b: SeparateDomain<Interval> = SeparateDomain::top();
        b.set(1u64, iv(5, 20));
        b.set(2u64, iv(1, 2));
        let met = a.meet(&b);
        assert_eq!(met.get(1u64), Some(&iv(5, 10)));
        assert_eq!(met.get(2u64), Some(&iv(1, 2)));
        let mut c: SeparateDomain<Interval> = SeparateDomain::top();
        c.set(1u64, iv(50, 60));
        assert!(a.meet(&c).is_bottom());
    }

    #[test]
    fn order() {
        let mut a: SeparateDomain<Interval> = SeparateDomain::top();
        a.set(1u64, iv(0, 10));
        a.set(2u64, iv(0, 1));
        let mut b: SeparateDomain<Interval> = SeparateDomain::top();
        b.set(1u64, iv(0, 20));
        assert!(a.leq(&b));
        assert!(!b.leq(&a));
        assert!(SeparateDomain::<Interval>::bottom().leq(&a));
    }

    #[test]
    fn refinement() {
        let mut a: SeparateDomain<Interval> = SeparateDomain::top();
        a.set(1u64, iv(0, 10));
        a.refine(1u64, iv(5, 30));
        assert_eq!(a.get(1u64), Some(&iv(5, 10)));
        a.forget(1u64);
        assert!(a.get(1u64).is_none());
    }
}

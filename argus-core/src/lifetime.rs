//! Allocation lifetime lattice

use core::fmt;

use crate::lattice::AbstractDomain;

/// Whether a dynamically allocated memory location is still live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifetime {
    /// Unreachable.
    Bottom,
    /// Definitely allocated.
    Allocated,
    /// Definitely deallocated.
    Deallocated,
    /// May or may not have been deallocated.
    Top,
}

impl Lifetime {
    /// Return true for [`Lifetime::Allocated`].
    pub fn is_allocated(&self) -> bool {
        matches!(self, Lifetime::Allocated)
    }

    /// Return true for [`Lifetime::Deallocated`].
    pub fn is_deallocated(&self) -> bool {
        matches!(self, Lifetime::Deallocated)
    }
}

impl AbstractDomain for Lifetime {
    fn is_bottom(&self) -> bool {
        matches!(self, Lifetime::Bottom)
    }

    fn is_top(&self) -> bool {
        matches!(self, Lifetime::Top)
    }

    fn leq(&self, other: &Self) -> bool {
        matches!(
            (self, other),
            (Lifetime::Bottom, _)
                | (_, Lifetime::Top)
                | (Lifetime::Allocated, Lifetime::Allocated)
                | (Lifetime::Deallocated, Lifetime::Deallocated)
        )
    }

    fn join(&self, other: &Self) -> Self {
        match (self, other) {
            (Lifetime::Bottom, x) | (x, Lifetime::Bottom) => *x,
            (x, y) if x == y => *x,
            _ => Lifetime::Top,
        }
    }

    fn meet(&self, other: &Self) -> Self {
        match (self, other) {
            (Lifetime::Top, x) | (x, Lifetime::Top) => *x,
            (x, y) if x == y => *x,
            _ => Lifetime::Bottom,
        }
    }

    fn widening(&self, other: &Self) -> Self {
        self.join(other)
    }

    fn narrowing(&self, other: &Self) -> Self {
        self.meet(other)
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifetime::Bottom => write!(f, "_|_"),
            Lifetime::Allocated => write!(f, "allocated"),
            Lifetime::Deallocated => write!(f, "deallocated"),
            Lifetime::Top => write!(f, "T"),
        }
    }
}

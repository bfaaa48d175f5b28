//! Nullity lattice

use core::fmt;

use crate::lattice::AbstractDomain;

/// Whether a pointer value is null.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Nullity {
    /// Unreachable.
    Bottom,
    /// Definitely the null pointer.
    Null,
    /// Definitely not the null pointer.
    NonNull,
    /// May or may not be null.
    Top,
}

impl Nullity {
    /// Return true for [`Nullity::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Nullity::Null)
    }

    /// Return true for [`Nullity::NonNull`].
    pub fn is_non_null(&self) -> bool {
        matches!(self, Nullity::NonNull)
    }
}

impl AbstractDomain for Nullity {
    fn is_bottom(&self) -> bool {
        matches!(self, Nullity::Bottom)
    }

    fn is_top(&self) -> bool {
        matches!(self, Nullity::Top)
    }

    fn leq(&self, other: &Self) -> bool {
        matches!(
            (self, other),
            (Nullity::Bottom, _) | (_, Nullity::Top) | (Nullity::Null, Nullity::Null)
                | (Nullity::NonNull, Nullity::NonNull)
        )
    }

    fn join(&self, other: &Self) -> Self {
        match (self, other) {
            (Nullity::Bottom, x) | (x, Nullity::Bottom) => *x,
            (x, y) if x == y => *x,
            _ => Nullity::Top,
        }
    }

    fn meet(&self, other: &Self) -> Self {
        match (self, other) {
            (Nullity::Top, x) | (x, Nullity::Top) => *x,
            (x, y) if x == y => *x,
            _ => Nullity::Bottom,
        }
    }

    fn widening(&self, other: &Self) -> Self {
        self.join(other)
    }

    fn narrowing(&self, other: &Self) -> Self {
        self.meet(other)
    }
}

impl fmt::Display for Nullity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Nullity::Bottom => write!(f, "_|_"),
            Nullity::Null => write!(f, "null"),
            Nullity::NonNull => write!(f, "non-null"),
            Nullity::Top => write!(f, "T"),
        }
    }
}

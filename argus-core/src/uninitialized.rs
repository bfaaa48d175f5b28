//! Initialization lattice

use core::fmt;

use crate::lattice::AbstractDomain;

/// Whether a value has been written before being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Uninitialized {
    /// Unreachable.
    Bottom,
    /// Definitely uninitialized.
    Uninitialized,
    /// Definitely initialized.
    Initialized,
    /// May or may not be initialized.
    Top,
}

impl Uninitialized {
    /// Return true for [`Uninitialized::Uninitialized`].
    pub fn is_uninitialized(&self) -> bool {
        matches!(self, Uninitialized::Uninitialized)
    }

    /// Return true for [`Uninitialized::Initialized`].
    pub fn is_initialized(&self) -> bool {
        matches!(self, Uninitialized::Initialized)
    }
}

impl AbstractDomain for Uninitialized {
    fn is_bottom(&self) -> bool {
        matches!(self, Uninitialized::Bottom)
    }

    fn is_top(&self) -> bool {
        matches!(self, Uninitialized::Top)
    }

    fn leq(&self, other: &Self) -> bool {
        matches!(
            (self, other),
            (Uninitialized::Bottom, _)
                | (_, Uninitialized::Top)
                | (Uninitialized::Uninitialized, Uninitialized::Uninitialized)
                | (Uninitialized::Initialized, Uninitialized::Initialized)
        )
    }

    fn join(&self, other: &Self) -> Self {
        match (self, other) {
            (Uninitialized::Bottom, x) | (x, Uninitialized::Bottom) => *x,
            (x, y) if x == y => *x,
            _ => Uninitialized::Top,
        }
    }

    fn meet(&self, other: &Self) -> Self {
        match (self, other) {
            (Uninitialized::Top, x) | (x, Uninitialized::Top) => *x,
            (x, y) if x == y => *x,
            _ => Uninitialized::Bottom,
        }
    }

    fn widening(&self, other: &Self) -> Self {
        self.join(other)
    }

    fn narrowing(&self, other: &Self) -> Self {
        self.meet(other)
    }
}

impl fmt::Display for Uninitialized {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Uninitialized::Bottom => write!(f, "_|_"),
            Uninitialized::Uninitialized => write!(f, "uninitialized"),
            Uninitialized::Initialized => write!(f, "initialized"),
            Uninitialized::Top => write!(f, "T"),
        }
    }
}

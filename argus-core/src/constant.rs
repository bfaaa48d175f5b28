//! Constant propagation lattice

use core::fmt;

use argus_num::{
    MachineInt,
    Signedness,
};

use crate::lattice::AbstractDomain;

/// The flat lattice of machine integer constants.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Constant {
    kind: Kind,
    bit_width: u64,
    sign: Signedness,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Kind {
    Bottom,
    Value(MachineInt),
    Top,
}

impl Constant {
    /// The unreachable constant.
    pub fn bottom(bit_width: u64, sign: Signedness) -> Self {
        Constant {
            kind: Kind::Bottom,
            bit_width,
            sign,
        }
    }

    /// The unknown constant.
    pub fn top(bit_width: u64, sign: Signedness) -> Self {
        Constant {
            kind: Kind::Top,
            bit_width,
            sign,
        }
    }

    /// The known constant `n`.
    pub fn singleton(n: MachineInt) -> Self {
        let (bit_width, sign) = (n.bit_width(), n.sign());
        Constant {
            kind: Kind::Value(n),
            bit_width,
            sign,
        }
    }

    /// The constant value, if known.
    pub fn as_singleton(&self) -> Option<&MachineInt> {
        match &self.kind {
            Kind::Value(n) => Some(n),
            _ => None,
        }
    }

    fn binary(&self, other: &Self, f: impl Fn(&MachineInt, &MachineInt) -> MachineInt) -> Self {
        match (&self.kind, &other.kind) {
            (Kind::Bottom, _) | (_, Kind::Bottom) => {
                Constant::bottom(self.bit_width, self.sign)
            }
            (Kind::Value(a), Kind::Value(b)) => Constant::singleton(f(a, b)),
            _ => Constant::top(self.bit_width, self.sign),
        }
    }

    /// Addition.
    pub fn add(&self, other: &Self) -> Self {
        self.binary(other, MachineInt::add)
    }

    /// Subtraction.
    pub fn sub(&self, other: &Self) -> Self {
        self.binary(other, MachineInt::sub)
    }

    /// Multiplication.
    pub fn mul(&self, other: &Self) -> Self {
        self.binary(other, MachineInt::mul)
    }
}

impl AbstractDomain for Constant {
    fn is_bottom(&self) -> bool {
        matches!(self.kind, Kind::Bottom)
    }

    fn is_top(&self) -> bool {
        matches!(self.kind, Kind::Top)
    }

    fn leq(&self, other: &Self) -> bool {
        match (&self.kind, &other.kind) {
            (Kind::Bottom, _) => true,
            (_, Kind::Top) => true,
            (Kind::Value(a), Kind::Value(b)) => a == b,
            _ => false,
        }
    }

    fn join(&self, other: &Self) -> Self {
        match (&self.kind, &other.kind) {
            (Kind::Bottom, _) => other.clone(),
            (_, Kind::Bottom) => self.clone(),
            (Kind::Value(a), Kind::Value(b)) if a == b => self.clone(),
            _ => Constant::top(self.bit_width, self.sign),
        }
    }

    fn meet(&self, other: &Self) -> Self {
        match (&self.kind, &other.kind) {
            (Kind::Top, _) => other.clone(),
            (_, Kind::Top) => self.clone(),
            (Kind::Value(a), Kind::Value(b)) if a == b => self.clone(),
            _ => Constant::bottom(self.bit_width, self.sign),
        }
    }

    fn widening(&self, other: &Self) -> Self {
        self.join(other)
    }

    fn narrowing(&self, other: &Self) -> Self {
        self.meet(other)
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            Kind::Bottom => write!(f, "_|_"),
            Kind::Value(n) => write!(f, "{}", n.to_int()),
            Kind::Top => write!(f, "T"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn k(v: i64) -> Constant {
        Constant::singleton(MachineInt::new(v, 32, Signedness::Signed))
    }

    #[test]
    fn flat_lattice() {
        assert_eq!(k(1).join(&k(1)), k(1));
        assert!(k(1).join(&k(2)).is_top());
        assert!(k(1).meet(&k(2)).is_bottom());
        assert!(k(1).leq(&Constant::top(32, Signedness::Signed)));
        assert!(Constant::bottom(32, Signedness::Signed).leq(&k(1)));
    }

    #[test]
    fn arithmetic() {
        assert_eq!(k(2).add(&k(3)), k(5));
        assert!(k(2).add(&Constant::top(32, Signedness::Signed)).is_top());
    }
}

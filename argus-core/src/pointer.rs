//! Pointer abstract values and constraint solving

mod solver;
mod value;

pub use solver::{
    ConstraintSystem,
    PointerConstraint,
    RValue,
};
pub use value::{
    PointerAbsValue,
    PointsToSet,
};

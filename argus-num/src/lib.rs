//! Number kernel for the Argus analyzer.
//!
//! Unbounded integers and rationals, machine integers of arbitrary bit width
//! and signedness with modular overflow, and bounds extended with infinities.

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(unused_must_use)]

mod bound;
mod error;
mod int;
mod machine_int;
mod rat;

pub use bound::Bound;
pub use error::ArithError;
pub use int::Int;
pub use machine_int::{
    MachineInt,
    Signedness,
};
pub use rat::Rat;

/// Result alias for fallible arithmetic.
pub type ArithResult<T> = core::result::Result<T, ArithError>;

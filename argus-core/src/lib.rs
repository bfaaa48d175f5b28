//! Core abstract interpretation library for the Argus analyzer.
//!
//! Lattice-structured abstract domains and their combinators, relational
//! numeric domains, a pointer constraint solver, and a weak-topological-order
//! driven fixpoint iterator.

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(unused_must_use)]

pub mod congruence;
pub mod constant;
pub mod dbm;
pub mod discrete;
pub mod fixpoint;
pub mod graph;
pub mod interval;
pub mod interval_congruence;
pub mod lattice;
pub mod lifetime;
pub mod nullity;
pub mod patricia;
pub mod pointer;
pub mod product;
pub mod separate;
pub mod uninitialized;
pub mod var_pack;
pub mod wto;

pub use congruence::Congruence;
pub use constant::Constant;
pub use dbm::Dbm;
pub use discrete::DiscreteDomain;
pub use interval::Interval;
pub use interval_congruence::IntervalCongruence;
pub use lattice::AbstractDomain;
pub use lifetime::Lifetime;
pub use nullity::Nullity;
pub use patricia::PatriciaTree;
pub use pointer::{
    PointerAbsValue,
    PointsToSet,
};
pub use separate::SeparateDomain;
pub use uninitialized::Uninitialized;

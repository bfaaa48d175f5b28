//! Abstract domain contract

use core::fmt;

/// Contract shared by every abstract domain.
///
/// An abstract domain is a lattice of abstract values with a widening
/// operator guaranteeing termination of increasing iteration sequences and a
/// narrowing operator refining a post fixpoint.
///
/// Bottom and top constructors are inherent to each domain because most
/// carriers need a typing context (bit width and signedness) to build them.
///
/// Laws, for all `a`, `b`, `c`:
/// * `join`/`meet` are commutative, associative and idempotent;
/// * `a.leq(b)` iff `a.join(b) == b`;
/// * bottom is the least element, top the greatest;
/// * for any chain `a0.leq(a1)`, `a1.leq(a2)`, ..., the sequence
///   `b_k = b_{k-1}.widening(a_k)` stabilizes in finitely many steps.
pub trait AbstractDomain: Clone + PartialEq + fmt::Debug {
    /// Return true if this is the empty set of concrete states.
    fn is_bottom(&self) -> bool;

    /// Return true if this holds no information.
    fn is_top(&self) -> bool;

    /// Partial order: inclusion of concretizations.
    fn leq(&self, other: &Self) -> bool;

    /// Least upper bound.
    fn join(&self, other: &Self) -> Self;

    /// Greatest lower bound.
    fn meet(&self, other: &Self) -> Self;

    /// Widening: an upper bound that converges on increasing chains.
    fn widening(&self, other: &Self) -> Self;

    /// Narrowing: a refinement of `self` using `other`, converging on
    /// decreasing chains.
    fn narrowing(&self, other: &Self) -> Self;
}

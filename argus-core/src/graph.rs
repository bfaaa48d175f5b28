//! Control-flow graph abstraction

use core::fmt;
use core::hash::Hash;

/// A rooted directed graph over copyable node indices.
///
/// Implementors store their structure as arenas of nodes addressed by index,
/// which keeps cyclic graphs free of ownership cycles.
pub trait Graph {
    /// The node index type.
    type Node: Copy + Eq + Ord + Hash + fmt::Debug;

    /// The unique entry node.
    fn entry(&self) -> Self::Node;

    /// Every node of the graph.
    fn nodes(&self) -> Vec<Self::Node>;

    /// Forward edges of `node`.
    fn successors(&self, node: Self::Node) -> Vec<Self::Node>;

    /// Backward edges of `node`.
    fn predecessors(&self, node: Self::Node) -> Vec<Self::Node>;
}

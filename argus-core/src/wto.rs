//! Weak topological ordering
//!
//! Bourdoncle's recursive strategy: a nested decomposition of the graph into
//! vertices and cycles, where every cycle is entered through its head. The
//! fixpoint iterator stabilizes each cycle before moving past it.

use core::fmt;

use hashbrown::HashMap;

use crate::graph::Graph;

/// A component of a weak topological ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WtoComponent<N> {
    /// A single vertex outside any cycle at this nesting level.
    Vertex(N),
    /// A cycle with a distinguished head.
    Cycle(WtoCycle<N>),
}

/// A cycle of a weak topological ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WtoCycle<N> {
    head: N,
    components: Vec<WtoComponent<N>>,
}

impl<N: Copy> WtoCycle<N> {
    /// The head of the cycle: its single entry point.
    pub fn head(&self) -> N {
        self.head
    }

    /// The nested components of the cycle body, head excluded.
    pub fn components(&self) -> &[WtoComponent<N>] {
        &self.components
    }
}

/// The chain of cycle heads a node is nested under, outermost first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WtoNesting<N> {
    heads: Vec<N>,
}

impl<N> Default for WtoNesting<N> {
    fn default() -> Self {
        WtoNesting { heads: Vec::new() }
    }
}

impl<N: Copy + Eq> WtoNesting<N> {
    /// Return true if the node is inside the cycle headed at `head`.
    pub fn within(&self, head: N) -> bool {
        self.heads.contains(&head)
    }

    /// The cycle heads, outermost first.
    pub fn heads(&self) -> &[N] {
        &self.heads
    }
}

/// A weak topological ordering of a graph.
pub struct Wto<N> {
    components: Vec<WtoComponent<N>>,
    nesting: HashMap<N, WtoNesting<N>>,
}

impl<N: Copy + Eq + core::hash::Hash + fmt::Debug> Wto<N> {
    /// Compute the weak topological ordering of `graph`.
    pub fn build<G: Graph<Node = N>>(graph: &G) -> Self {
        let mut builder = Builder {
            graph,
            dfn: HashMap::new(),
            stack: Vec::new(),
            num: 0,
        };
        let mut components = Vec::new();
        builder.visit(graph.entry(), &mut components);
        components.reverse();
        let mut wto = Wto {
            components,
            nesting: HashMap::new(),
        };
        let mut heads = Vec::new();
        Self::collect_nesting(&wto.components.clone(), &mut heads, &mut wto.nesting);
        wto
    }

    fn collect_nesting(
        components: &[WtoComponent<N>],
        heads: &mut Vec<N>,
        nesting: &mut HashMap<N, WtoNesting<N>>,
    ) {
        for component in components {
            match component {
                WtoComponent::Vertex(v) => {
                    nesting.insert(*v, WtoNesting {
                        heads: heads.clone(),
                    });
                }
                WtoComponent::Cycle(cycle) => {
                    // The head is not nested within its own cycle; this is
                    // what separates back edges from external edges
                    nesting.insert(cycle.head, WtoNesting {
                        heads: heads.clone(),
                    });
                    heads.push(cycle.head);
                    Self::collect_nesting(&cycle.components, heads, nesting);
                    heads.pop();
                }
            }
        }
    }

    /// The top-level components, in order.
    pub fn components(&self) -> &[WtoComponent<N>] {
        &self.components
    }

    /// The nesting of `node`.
    pub fn nesting(&self, node: N) -> WtoNesting<N> {
        self.nesting.get(&node).cloned().unwrap_or_default()
    }
}

const DFN_MAX: u64 = u64::MAX;

struct Builder<'a, G: Graph> {
    graph: &'a G,
    dfn: HashMap<G::Node, u64>,
    stack: Vec<G::Node>,
    num: u64,
}

impl<'a, G: Graph> Builder<'a, G> {
    fn dfn(&self, v: G::Node) -> u64 {
        self.dfn.get(&v).copied().unwrap_or(0)
    }

    /// Bourdoncle's visit; appends components in reverse order.
    fn visit(&mut self, v: G::Node, partition: &mut Vec<WtoComponent<G::Node>>) -> u64 {
        self.stack.push(v);
        self.num += 1;
        let number = self.num;
        self.dfn.insert(v, number);
        let mut head = number;
        let mut loop_detected = false;
        for succ in self.graph.successors(v) {
            let min = if self.dfn(succ) == 0 {
                self.visit(succ, partition)
            } else {
                self.dfn(succ)
            };
            if min <= head {
                head = min;
                loop_detected = true;
            }
        }
        if head == self.dfn(v) {
            self.dfn.insert(v, DFN_MAX);
            let mut element = self.stack.pop().expect("visit stack is never empty here");
            if loop_detected {
                while element != v {
                    self.dfn.insert(element, 0);
                    element = self.stack.pop().expect("stack holds the cycle body");
                }
                partition.push(WtoComponent::Cycle(self.component(v)));
            } else {
                partition.push(WtoComponent::Vertex(v));
            }
        }
        head
    }

    fn component(&mut self, v: G::Node) -> WtoCycle<G::Node> {
        let mut partition = Vec::new();
        for succ in self.graph.successors(v) {
            if self.dfn(succ) == 0 {
                self.visit(succ, &mut partition);
            }
        }
        partition.reverse();
        WtoCycle {
            head: v,
            components: partition,
        }
    }
}

impl<N: Copy + fmt::Debug> fmt::Display for Wto<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn fmt_components<N: Copy + fmt::Debug>(
            components: &[WtoComponent<N>],
            f: &mut fmt::Formatter<'_>,
        ) -> fmt::Result {
            for (i, component) in components.iter().enumerate() {
                if i > 0 {
                    write!(f, " ")?;
                }
                match component {
                    WtoComponent::Vertex(v) => write!(f, "{v:?}")?,
                    WtoComponent::Cycle(cycle) => {
                        write!(f, "({:?}", cycle.head)?;
                        if !cycle.components.is_empty() {
                            write!(f, " ")?;
                            fmt_components(&cycle.components, f)?;
                        }
                        write!(f, ")")?;
                    }
                }
            }
            Ok(())
        }
        fmt_components(&self.components, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestGraph {
        entry: u32,
        edges: Vec<(u32, u32)>,
    }

    impl Graph for TestGraph {
        type Node = u32;

        fn entry(&self) -> u32 {
            self.entry
        }

        fn nodes(&self) -> Vec<u32> {
            let mut nodes: Vec<u32> = self
                .edges
                .iter()
                .flat_map(|&(a, b)| [a, b])
                .collect();
            nodes.push(self.entry);
            nodes.sort_unstable();
            nodes.dedup();
            nodes
        }

        fn successors(&self, node: u32) -> Vec<u32> {
            self.edges
                .iter()
                .filter(|&&(a, _)| a == node)
                .map(|&(_, b)| b)
                .collect()
        }

        fn predecessors(&self, node: u32) -> Vec<u32> {
            self.edges
                .iter()
                .filter(|&&(_, b)| b == node)
                .map(|&(a, _)| a)
                .collect()
        }
    }

    #[test]
    fn straight_line() {
        let g = TestGraph {
            entry: 1,
            edges: vec![(1, 2), (2, 3)],
        };
        let wto = Wto::build(&g);
        assert_eq!(
            wto.components(),
            &[
                WtoComponent::Vertex(1),
                WtoComponent::Vertex(2),
                WtoComponent::Vertex(3)
            ]
        );
    }

    #[test]
    fn simple_loop() {
        // 1 -> 2 -> 3 -> 2, 3 -> 4
        let g = TestGraph {
            entry: 1,
            edges: vec![(1, 2), (2, 3), (3, 2), (3, 4)],
        };
        let wto = Wto::build(&g);
        assert_eq!(wto.components().len(), 3);
        match &wto.components()[1] {
            WtoComponent::Cycle(cycle) => {
                assert_eq!(cycle.head(), 2);
                assert_eq!(cycle.components(), &[WtoComponent::Vertex(3)]);
            }
            other => panic!("expected a cycle, got {other:?}"),
        }
        assert!(wto.nesting(3).within(2));
        assert!(!wto.nesting(4).within(2));
        assert!(!wto.nesting(2).within(2));
    }

    #[test]
    fn nested_loops() {
        // Bourdoncle's running example:
        // 1 -> 2 -> 3 -> 4 -> 5 -> 6 -> 7 -> 8
        // 5 -> 4 (inner cycle), 7 -> 3 (outer cycle), 7 -> 2? no
        let g = TestGraph {
            entry: 1,
            edges: vec![
                (1, 2),
                (2, 3),
                (3, 4),
                (4, 5),
                (5, 6),
                (6, 7),
                (7, 8),
                (5, 4),
                (7, 3),
            ],
        };
        let wto = Wto::build(&g);
        let rendered = format!("{wto}");
        assert_eq!(rendered, "1 2 (3 (4 5) 6 7) 8");
        assert!(wto.nesting(5).within(4));
        assert!(wto.nesting(5).within(3));
        assert!(!wto.nesting(6).within(4));
        assert!(wto.nesting(6).within(3));
    }
}

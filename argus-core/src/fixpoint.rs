//! Interleaved forward fixpoint iteration
//!
//! Runs an increasing iteration sequence with widening followed by a
//! decreasing sequence with narrowing on every cycle of the weak topological
//! ordering, innermost cycles first.

use hashbrown::HashMap;
use tracing::debug;

use crate::{
    graph::Graph,
    lattice::AbstractDomain,
    wto::{
        Wto,
        WtoComponent,
        WtoCycle,
    },
};

/// How to extrapolate at a cycle head during the increasing sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WideningStrategy {
    /// Use the widening operator; always terminates.
    #[default]
    Widen,
    /// Use joins; terminates only on domains with no infinite ascending
    /// chains.
    Join,
}

/// How to refine at a cycle head during the decreasing sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NarrowingStrategy {
    /// Use the narrowing operator.
    #[default]
    Narrow,
    /// Use meets; bound the iterations to terminate.
    Meet,
}

/// Tuning of the iteration sequences.
#[derive(Debug, Clone)]
pub struct FixpointParameters {
    /// Iterations of plain joins before the first widening.
    pub widening_delay: u32,
    /// Widen every n-th iteration after the delay, joining in between.
    pub widening_period: u32,
    /// Extrapolation operator.
    pub widening_strategy: WideningStrategy,
    /// Refinement operator.
    pub narrowing_strategy: NarrowingStrategy,
    /// Cap on decreasing iterations; `None` iterates to stability.
    pub max_narrowing_iterations: Option<u32>,
}

impl Default for FixpointParameters {
    fn default() -> Self {
        FixpointParameters {
            widening_delay: 1,
            widening_period: 1,
            widening_strategy: WideningStrategy::default(),
            narrowing_strategy: NarrowingStrategy::default(),
            max_narrowing_iterations: None,
        }
    }
}

/// The client of a fixpoint iteration: transfer functions and hooks.
pub trait FixpointEngine<G: Graph> {
    /// The abstract domain iterated over.
    type Domain: AbstractDomain;

    /// The unreachable invariant.
    fn bottom(&self) -> Self::Domain;

    /// Run the transfer function of a node.
    fn analyze_node(&mut self, node: G::Node, pre: Self::Domain) -> Self::Domain;

    /// Apply edge-specific refinement to the invariant flowing along
    /// `src -> dst`.
    fn analyze_edge(&mut self, src: G::Node, dst: G::Node, post: &Self::Domain) -> Self::Domain {
        let _ = (src, dst);
        post.clone()
    }

    /// Widening at `head`, honoring per-cycle threshold hints.
    fn widen_with_hint(
        &self,
        head: G::Node,
        before: &Self::Domain,
        after: &Self::Domain,
    ) -> Self::Domain {
        let _ = head;
        before.widening(after)
    }

    /// Narrowing at `head`, honoring per-cycle threshold hints.
    fn narrow_with_hint(
        &self,
        head: G::Node,
        before: &Self::Domain,
        after: &Self::Domain,
    ) -> Self::Domain {
        let _ = head;
        before.narrowing(after)
    }

    /// Stop the decreasing sequence at `head`?
    fn is_decreasing_iterations_fixpoint(
        &self,
        head: G::Node,
        before: &Self::Domain,
        after: &Self::Domain,
    ) -> bool {
        let _ = head;
        before.leq(after)
    }

    /// Cooperative cancellation; a cancelled iteration stops early, leaving
    /// the not-yet-stabilized invariants as they are.
    fn is_cancelled(&self) -> bool {
        false
    }

    /// Hook invoked on every stabilized pre-invariant.
    fn process_pre(&mut self, node: G::Node, invariant: &Self::Domain) {
        let _ = (node, invariant);
    }

    /// Hook invoked on every stabilized post-invariant.
    fn process_post(&mut self, node: G::Node, invariant: &Self::Domain) {
        let _ = (node, invariant);
    }
}

/// Interleaved forward fixpoint iterator over one control-flow graph.
///
/// The iterator owns the pre and post invariant tables; the engine owns the
/// transfer functions. A `run` stabilizes every component of the weak
/// topological ordering in order, then replays the `process_pre` and
/// `process_post` hooks over the final tables.
pub struct FixpointIterator<'a, G: Graph, E: FixpointEngine<G>> {
    graph: &'a G,
    params: FixpointParameters,
    wto: Wto<G::Node>,
    pre: HashMap<G::Node, E::Domain>,
    post: HashMap<G::Node, E::Domain>,
}

impl<'a, G: Graph, E: FixpointEngine<G>> FixpointIterator<'a, G, E> {
    /// Build an iterator for `graph`, computing its weak topological order.
    pub fn new(graph: &'a G, params: FixpointParameters) -> Self {
        FixpointIterator {
            graph,
            params,
            wto: Wto::build(graph),
            pre: HashMap::new(),
            post: HashMap::new(),
        }
    }

    /// The weak topological ordering of the graph.
    pub fn wto(&self) -> &Wto<G::Node> {
        &self.wto
    }

    /// The stabilized invariant before `node`.
    pub fn pre(&self, node: G::Node) -> Option<&E::Domain> {
        self.pre.get(&node)
    }

    /// The stabilized invariant after `node`.
    pub fn post(&self, node: G::Node) -> Option<&E::Domain> {
        self.post.get(&node)
    }

    fn set_pre(&mut self, node: G::Node, invariant: E::Domain) {
        self.pre.insert(node, invariant);
    }

    fn set_post(&mut self, node: G::Node, invariant: E::Domain) {
        self.post.insert(node, invariant);
    }

    fn get_pre(&self, engine: &E, node: G::Node) -> E::Domain {
        self.pre.get(&node).cloned().unwrap_or_else(|| engine.bottom())
    }

    fn get_post(&self, engine: &E, node: G::Node) -> E::Domain {
        self.post.get(&node).cloned().unwrap_or_else(|| engine.bottom())
    }

    /// Run the iteration from the given entry invariant.
    pub fn run(&mut self, engine: &mut E, init: E::Domain) {
        self.set_pre(self.graph.entry(), init);
        for component in self.wto.components().to_vec() {
            self.visit_component(engine, &component);
            if engine.is_cancelled() {
                return
            }
        }
        self.process(engine);
    }

    /// Replay the hooks over the stabilized invariants, in iteration order.
    fn process(&mut self, engine: &mut E) {
        fn walk<N: Copy>(components: &[WtoComponent<N>], out: &mut Vec<N>) {
            for component in components {
                match component {
                    WtoComponent::Vertex(v) => out.push(*v),
                    WtoComponent::Cycle(cycle) => {
                        out.push(cycle.head());
                        walk(cycle.components(), out);
                    }
                }
            }
        }
        let mut order = Vec::new();
        walk(self.wto.components(), &mut order);
        for node in order {
            let pre = self.get_pre(engine, node);
            let post = self.get_post(engine, node);
            engine.process_pre(node, &pre);
            engine.process_post(node, &post);
        }
    }

    fn visit_component(&mut self, engine: &mut E, component: &WtoComponent<G::Node>) {
        match component {
            WtoComponent::Vertex(v) => self.visit_vertex(engine, *v),
            WtoComponent::Cycle(cycle) => self.visit_cycle(engine, cycle),
        }
    }

    fn visit_vertex(&mut self, engine: &mut E, node: G::Node) {
        let pre = if node == self.graph.entry() {
            self.get_pre(engine, node)
        } else {
            let pre = self.merge_predecessors(engine, node);
            self.set_pre(node, pre.clone());
            pre
        };
        let post = engine.analyze_node(node, pre);
        self.set_post(node, post);
    }

    /// Join the contributions of every predecessor.
    fn merge_predecessors(&self, engine: &mut E, node: G::Node) -> E::Domain {
        let mut merged = engine.bottom();
        for pred in self.graph.predecessors(node) {
            let post = self.get_post(engine, pred);
            let refined = engine.analyze_edge(pred, node, &post);
            merged = merged.join(&refined);
        }
        merged
    }

    fn visit_cycle(&mut self, engine: &mut E, cycle: &WtoCycle<G::Node>) {
        let head = cycle.head();
        let nesting_external: Vec<G::Node> = self
            .graph
            .predecessors(head)
            .into_iter()
            .filter(|&prev| !self.wto.nesting(prev).within(head))
            .collect();
        let nesting_internal: Vec<G::Node> = self
            .graph
            .predecessors(head)
            .into_iter()
            .filter(|&prev| self.wto.nesting(prev).within(head))
            .collect();

        let mut pre = {
            let mut merged = engine.bottom();
            for &prev in &nesting_external {
                let post = self.get_post(engine, prev);
                let refined = engine.analyze_edge(prev, head, &post);
                merged = merged.join(&refined);
            }
            merged
        };

        // Increasing sequence with extrapolation
        let mut iteration: u32 = 1;
        loop {
            if engine.is_cancelled() {
                return
            }
            self.set_pre(head, pre.clone());
            let post = engine.analyze_node(head, pre.clone());
            self.set_post(head, post);
            for component in cycle.components().to_vec() {
                self.visit_component(engine, &component);
            }
            let new_pre = self.cycle_entry_state(engine, head, &nesting_external, &nesting_internal);
            if new_pre.leq(&pre) {
                // Post fixpoint reached
                debug!(head = ?head, iteration, "increasing sequence stabilized");
                self.set_pre(head, new_pre.clone());
                pre = new_pre;
                break
            }
            pre = self.extrapolate(engine, head, iteration, &pre, &new_pre);
            iteration = iteration.saturating_add(1);
        }

        // Decreasing sequence with refinement
        let mut iteration: u32 = 1;
        loop {
            if engine.is_cancelled() {
                return
            }
            let post = engine.analyze_node(head, pre.clone());
            self.set_post(head, post);
            for component in cycle.components().to_vec() {
                self.visit_component(engine, &component);
            }
            let new_pre = self.cycle_entry_state(engine, head, &nesting_external, &nesting_internal);
            if engine.is_decreasing_iterations_fixpoint(head, &pre, &new_pre) {
                break
            }
            pre = self.refine(engine, head, iteration, &pre, &new_pre);
            self.set_pre(head, pre.clone());
            if let Some(max) = self.params.max_narrowing_iterations {
                if iteration >= max {
                    break
                }
            }
            iteration = iteration.saturating_add(1);
        }
    }

    /// The head invariant rebuilt from its external and back-edge
    /// predecessors.
    fn cycle_entry_state(
        &mut self,
        engine: &mut E,
        head: G::Node,
        external: &[G::Node],
        internal: &[G::Node],
    ) -> E::Domain {
        let mut merged = engine.bottom();
        for &prev in external.iter().chain(internal) {
            let post = self.get_post(engine, prev);
            let refined = engine.analyze_edge(prev, head, &post);
            merged = merged.join(&refined);
        }
        merged
    }

    fn extrapolate(
        &self,
        engine: &E,
        head: G::Node,
        iteration: u32,
        before: &E::Domain,
        after: &E::Domain,
    ) -> E::Domain {
        if iteration <= self.params.widening_delay {
            return before.join(after)
        }
        let since_delay = iteration - self.params.widening_delay;
        let period = self.params.widening_period.max(1);
        if since_delay % period != 0 {
            return before.join(after)
        }
        match self.params.widening_strategy {
            WideningStrategy::Widen => engine.widen_with_hint(head, before, after),
            WideningStrategy::Join => before.join(after),
        }
    }

    fn refine(
        &self,
        engine: &E,
        head: G::Node,
        iteration: u32,
        before: &E::Domain,
        after: &E::Domain,
    ) -> E::Domain {
        if iteration == 1 {
            return before.meet(after)
        }
        match self.params.narrowing_strategy {
            NarrowingStrategy::Narrow => engine.narrow_with_hint(head, before, after),
            NarrowingStrategy::Meet => before.meet(after),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::Interval;
    use argus_num::{
        MachineInt,
        Signedness,
    };

    struct LoopGraph;

    // 1: x = 0
    // 2: loop head
    // 3: body, guarded x <= 9, then x = x + 1
    // 4: exit, guarded x >= 10
    impl Graph for LoopGraph {
        type Node = u32;

        fn entry(&self) -> u32 {
            1
        }

        fn nodes(&self) -> Vec<u32> {
            vec![1, 2, 3, 4]
        }

        fn successors(&self, node: u32) -> Vec<u32> {
            match node {
                1 => vec![2],
                2 => vec![3, 4],
                3 => vec![2],
                _ => vec![],
            }
        }

        fn predecessors(&self, node: u32) -> Vec<u32> {
            match node {
                2 => vec![1, 3],
                3 => vec![2],
                4 => vec![2],
                _ => vec![],
            }
        }
    }

    struct CounterEngine;

    fn num(v: i64) -> MachineInt {
        MachineInt::new(v, 32, Signedness::Signed)
    }

    impl FixpointEngine<LoopGraph> for CounterEngine {
        type Domain = Interval;

        fn bottom(&self) -> Interval {
            Interval::bottom(32, Signedness::Signed)
        }

        fn analyze_node(&mut self, node: u32, pre: Interval) -> Interval {
            match node {
                1 => Interval::singleton(num(0)),
                2 => pre,
                3 => {
                    let guarded = pre.meet(&Interval::new(num(i32::MIN.into()), num(9)));
                    guarded.add(&Interval::singleton(num(1)))
                }
                _ => pre.meet(&Interval::new(num(10), num(i32::MAX.into()))),
            }
        }
    }

    #[test]
    fn counter_loop_stabilizes() {
        let graph = LoopGraph;
        let mut engine = CounterEngine;
        let mut iterator = FixpointIterator::new(&graph, FixpointParameters::default());
        iterator.run(&mut engine, Interval::top(32, Signedness::Signed));

        let head = iterator.pre(2).unwrap();
        assert_eq!(head.lb().to_i64(), Some(0));
        assert_eq!(head.ub().to_i64(), Some(10));

        let exit = iterator.post(4).unwrap();
        assert_eq!(exit.lb().to_i64(), Some(10));
        assert_eq!(exit.ub().to_i64(), Some(10));
    }

    struct JoinStrategyEngine(CounterEngine);

    impl FixpointEngine<LoopGraph> for JoinStrategyEngine {
        type Domain = Interval;

        fn bottom(&self) -> Interval {
            self.0.bottom()
        }

        fn analyze_node(&mut self, node: u32, pre: Interval) -> Interval {
            self.0.analyze_node(node, pre)
        }
    }

    #[test]
    fn join_strategy_reaches_the_exact_fixpoint() {
        let graph = LoopGraph;
        let mut engine = JoinStrategyEngine(CounterEngine);
        let params = FixpointParameters {
            widening_strategy: WideningStrategy::Join,
            ..FixpointParameters::default()
        };
        let mut iterator = FixpointIterator::new(&graph, params);
        iterator.run(&mut engine, Interval::top(32, Signedness::Signed));
        // With joins only, the head converges to [0, 10] without overshoot
        let head = iterator.pre(2).unwrap();
        assert_eq!(head.ub().to_i64(), Some(10));
    }
}

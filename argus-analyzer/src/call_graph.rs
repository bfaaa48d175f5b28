//! Call graph topology
//!
//! Strongly connected components of the call graph, their condensation, and
//! a topological order over it. The orchestrator uses the order to analyze
//! unrelated components independently and to report the recursive
//! components the inliner will over-approximate.

use std::collections::BTreeSet;

use hashbrown::HashMap;

use argus_ar::{
    Bundle,
    Constant,
    FunctionId,
    Operand,
    Statement,
};

/// The direct call graph of a bundle.
///
/// Indirect calls contribute no edges; the inliner resolves them
/// flow-sensitively instead.
pub struct CallGraph {
    nodes: Vec<FunctionId>,
    edges: HashMap<FunctionId, BTreeSet<FunctionId>>,
}

impl CallGraph {
    /// Build the call graph of `bundle`.
    pub fn build(bundle: &Bundle) -> Self {
        let mut nodes = Vec::new();
        let mut edges: HashMap<FunctionId, BTreeSet<FunctionId>> = HashMap::new();
        for function in bundle.functions() {
            nodes.push(function.id);
            let Some(body) = &function.body else {
                continue
            };
            let callees = edges.entry(function.id).or_default();
            for (_, statement) in body.statements() {
                let call = match statement {
                    Statement::Call(call) | Statement::Invoke(call) => call,
                    _ => continue,
                };
                if let Operand::Constant(Constant::FunctionAddress(callee)) = &call.callee {
                    callees.insert(*callee);
                }
            }
        }
        CallGraph { nodes, edges }
    }

    /// The callees of `function`.
    pub fn callees(&self, function: FunctionId) -> impl Iterator<Item = FunctionId> + '_ {
        self.edges
            .get(&function)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// Strongly connected components reachable from `roots`, in reverse
    /// topological order of the condensation (callees before callers).
    pub fn sccs(&self, roots: &[FunctionId]) -> Vec<Vec<FunctionId>> {
        Tarjan::new(self).run(roots)
    }

    /// Components reachable from `roots`, in topological order of the
    /// condensation: callers before their callees.
    pub fn topological_components(&self, roots: &[FunctionId]) -> Vec<Vec<FunctionId>> {
        let mut components = self.sccs(roots);
        components.reverse();
        components
    }

    /// Return true if the component is recursive: more than one member, or
    /// one member calling itself.
    pub fn is_recursive(&self, component: &[FunctionId]) -> bool {
        match component {
            [] => false,
            [single] => self
                .edges
                .get(single)
                .is_some_and(|callees| callees.contains(single)),
            _ => true,
        }
    }

    /// Every node of the graph.
    pub fn nodes(&self) -> &[FunctionId] {
        &self.nodes
    }
}

/// Iterative Tarjan over the call graph.
struct Tarjan<'a> {
    graph: &'a CallGraph,
    index: HashMap<FunctionId, u32>,
    lowlink: HashMap<FunctionId, u32>,
    on_stack: BTreeSet<FunctionId>,
    stack: Vec<FunctionId>,
    next_index: u32,
    components: Vec<Vec<FunctionId>>,
}

impl<'a> Tarjan<'a> {
    fn new(graph: &'a CallGraph) -> Self {
        Tarjan {
            graph,
            index: HashMap::new(),
            lowlink: HashMap::new(),
            on_stack: BTreeSet::new(),
            stack: Vec::new(),
            next_index: 0,
            components: Vec::new(),
        }
    }

    fn run(mut self, roots: &[FunctionId]) -> Vec<Vec<FunctionId>> {
        for &root in roots {
            if !self.index.contains_key(&root) {
                self.visit(root);
            }
        }
        self.components
    }

    fn visit(&mut self, root: FunctionId) {
        // Explicit work stack: (node, resume position in its callee list)
        let mut work: Vec<(FunctionId, usize)> = vec![(root, 0)];
        while let Some((node, position)) = work.pop() {
            if position == 0 {
                self.index.insert(node, self.next_index);
                self.lowlink.insert(node, self.next_index);
                self.next_index += 1;
                self.stack.push(node);
                self.on_stack.insert(node);
            }
            let callees: Vec<FunctionId> = self.graph.callees(node).collect();
            let mut descended = false;
            for (i, callee) in callees.iter().enumerate().skip(position) {
                match self.index.get(callee) {
                    None => {
                        work.push((node, i + 1));
                        work.push((*callee, 0));
                        descended = true;
                        break
                    }
                    Some(&callee_index) => {
                        if self.on_stack.contains(callee) {
                            let low = (*self.lowlink.get(&node).expect("visited"))
                                .min(callee_index);
                            self.lowlink.insert(node, low);
                        }
                    }
                }
            }
            if descended {
                continue
            }
            // All callees handled: close the node
            if self.lowlink[&node] == self.index[&node] {
                let mut component = Vec::new();
                loop {
                    let member = self.stack.pop().expect("scc stack is non-empty");
                    self.on_stack.remove(&member);
                    component.push(member);
                    if member == node {
                        break
                    }
                }
                component.sort_unstable();
                self.components.push(component);
            }
            // Propagate the lowlink to the parent, if any
            if let Some(&(parent, _)) = work.last() {
                let low = self.lowlink[&parent].min(self.lowlink[&node]);
                self.lowlink.insert(parent, low);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argus_ar::{
        CallStatement,
        Code,
        DataLayout,
        FunctionType,
        Type,
    };

    fn call(bundle: &Bundle, code: &mut Code, callee: FunctionId) {
        let block = code.entry_block();
        let _ = bundle;
        code.push(
            block,
            Statement::Call(CallStatement {
                result: None,
                callee: Operand::Constant(Constant::FunctionAddress(callee)),
                arguments: vec![],
            }),
        );
    }

    fn fn_type() -> FunctionType {
        FunctionType {
            return_type: Type::Void,
            parameters: vec![],
            variadic: false,
        }
    }

    #[test]
    fn scc_of_mutual_recursion() {
        let mut bundle = Bundle::new(DataLayout::lp64());
        let a = bundle.add_function("a", fn_type());
        let b = bundle.add_function("b", fn_type());
        let c = bundle.add_function("c", fn_type());

        // a -> b, b -> a (recursive pair), a -> c
        let mut code_a = Code::new();
        call(&bundle, &mut code_a, b);
        call(&bundle, &mut code_a, c);
        bundle.set_body(a, code_a);
        let mut code_b = Code::new();
        call(&bundle, &mut code_b, a);
        bundle.set_body(b, code_b);
        bundle.set_body(c, Code::new());

        let graph = CallGraph::build(&bundle);
        let components = graph.topological_components(&[a]);
        assert_eq!(components.len(), 2);
        assert_eq!(components[0], vec![a, b]);
        assert_eq!(components[1], vec![c]);
        assert!(graph.is_recursive(&components[0]));
        assert!(!graph.is_recursive(&components[1]));
    }

    #[test]
    fn self_recursion() {
        let mut bundle = Bundle::new(DataLayout::lp64());
        let f = bundle.add_function("f", fn_type());
        let mut code = Code::new();
        call(&bundle, &mut code, f);
        bundle.set_body(f, code);

        let graph = CallGraph::build(&bundle);
        let components = graph.sccs(&[f]);
        assert_eq!(components, vec![vec![f]]);
        assert!(graph.is_recursive(&components[0]));
    }
}

//! Function bodies: basic blocks and the control-flow graph

use argus_core::graph::Graph;

use crate::statement::Statement;

/// Index of a basic block within its function body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BasicBlockId(pub u32);

/// A basic block: a statement list plus its edges.
#[derive(Debug, Clone, Default)]
pub struct BasicBlock {
    statements: Vec<Statement>,
    successors: Vec<BasicBlockId>,
    predecessors: Vec<BasicBlockId>,
}

impl BasicBlock {
    /// The statements, in execution order.
    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// Forward edges.
    pub fn successors(&self) -> &[BasicBlockId] {
        &self.successors
    }

    /// Backward edges.
    pub fn predecessors(&self) -> &[BasicBlockId] {
        &self.predecessors
    }
}

/// A stable reference to a statement within a function body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StatementRef {
    /// The containing block.
    pub block: BasicBlockId,
    /// Index within the block.
    pub index: u32,
}

/// A function body: an arena of basic blocks with a unique entry.
#[derive(Debug, Clone)]
pub struct Code {
    blocks: Vec<BasicBlock>,
    entry: BasicBlockId,
    exit: Option<BasicBlockId>,
}

impl Code {
    /// Build an empty body with a fresh entry block.
    pub fn new() -> Self {
        Code {
            blocks: vec![BasicBlock::default()],
            entry: BasicBlockId(0),
            exit: None,
        }
    }

    /// The entry block.
    pub fn entry_block(&self) -> BasicBlockId {
        self.entry
    }

    /// The exit block, if designated.
    pub fn exit_block(&self) -> Option<BasicBlockId> {
        self.exit
    }

    /// Designate the exit block.
    pub fn set_exit(&mut self, block: BasicBlockId) {
        self.exit = Some(block);
    }

    /// Append a fresh, empty block.
    pub fn add_block(&mut self) -> BasicBlockId {
        let id = BasicBlockId(u32::try_from(self.blocks.len()).expect("block count fits u32"));
        self.blocks.push(BasicBlock::default());
        id
    }

    /// The block data of `id`.
    pub fn block(&self, id: BasicBlockId) -> &BasicBlock {
        &self.blocks[id.0 as usize]
    }

    /// Append a statement to `block`, returning its reference.
    pub fn push(&mut self, block: BasicBlockId, statement: Statement) -> StatementRef {
        let statements = &mut self.blocks[block.0 as usize].statements;
        let index = u32::try_from(statements.len()).expect("statement count fits u32");
        statements.push(statement);
        StatementRef { block, index }
    }

    /// Add an edge from `src` to `dst`.
    pub fn link(&mut self, src: BasicBlockId, dst: BasicBlockId) {
        if !self.blocks[src.0 as usize].successors.contains(&dst) {
            self.blocks[src.0 as usize].successors.push(dst);
            self.blocks[dst.0 as usize].predecessors.push(src);
        }
    }

    /// The statement behind a reference.
    pub fn statement(&self, at: StatementRef) -> &Statement {
        &self.blocks[at.block.0 as usize].statements[at.index as usize]
    }

    /// Every block id, in arena order.
    pub fn blocks(&self) -> impl Iterator<Item = BasicBlockId> + '_ {
        (0..self.blocks.len()).map(|i| BasicBlockId(i as u32))
    }

    /// Every statement of the body with its reference.
    pub fn statements(&self) -> impl Iterator<Item = (StatementRef, &Statement)> {
        self.blocks().flat_map(move |block| {
            self.block(block)
                .statements()
                .iter()
                .enumerate()
                .map(move |(index, statement)| {
                    (
                        StatementRef {
                            block,
                            index: index as u32,
                        },
                        statement,
                    )
                })
        })
    }
}

impl Default for Code {
    fn default() -> Self {
        Code::new()
    }
}

impl Graph for Code {
    type Node = BasicBlockId;

    fn entry(&self) -> BasicBlockId {
        self.entry
    }

    fn nodes(&self) -> Vec<BasicBlockId> {
        self.blocks().collect()
    }

    fn successors(&self, node: BasicBlockId) -> Vec<BasicBlockId> {
        self.block(node).successors().to_vec()
    }

    fn predecessors(&self, node: BasicBlockId) -> Vec<BasicBlockId> {
        self.block(node).predecessors().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::Statement;

    #[test]
    fn arena_and_edges() {
        let mut code = Code::new();
        let entry = code.entry_block();
        let body = code.add_block();
        let exit = code.add_block();
        code.link(entry, body);
        code.link(body, body);
        code.link(body, exit);
        code.set_exit(exit);

        assert_eq!(code.successors(entry), vec![body]);
        assert_eq!(code.successors(body), vec![body, exit]);
        assert_eq!(code.predecessors(body), vec![entry, body]);

        let at = code.push(body, Statement::Unreachable);
        assert_eq!(at.block, body);
        assert!(matches!(code.statement(at), Statement::Unreachable));
        assert_eq!(code.statements().count(), 1);
    }
}

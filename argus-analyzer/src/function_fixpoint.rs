//! Per-function fixpoint
//!
//! One `FunctionFixpoint` drives the interleaved iterator of `argus-core`
//! over a function body, executing statements through the symbolic executor
//! and routing calls through the inliner. Each instance owns its invariant
//! tables and an optional cache of callee fixpoints.
//!
//! An analysis is two-phased: the fixpoint stabilizes every block first,
//! then an optional checks pass replays each block from its stabilized
//! pre-invariant, handing every statement to the checkers and descending
//! into callees so they get checked under their final entry states.

use std::time::Instant;

use hashbrown::HashMap;
use tracing::debug_span;

use argus_ar::{
    BasicBlockId,
    Code,
    Statement,
    StatementRef,
};
use argus_core::{
    fixpoint::{
        FixpointEngine,
        FixpointIterator,
    },
    lattice::AbstractDomain,
};
use argus_num::Int;

use crate::{
    analysis::AnalysisContext,
    call_context::{
        CallContextRef,
        Site,
    },
    checker::CheckContext,
    execution_engine::ExecutionEngine,
    inliner,
    value::Invariant,
};

struct CacheEntry {
    entry: Invariant,
    exit: Invariant,
}

/// The stabilized result of one function analysis.
pub struct FunctionAnalysis {
    /// The invariant at function exit, both flows included.
    pub exit: Invariant,
    /// The stabilized invariant at every basic block entry.
    pub block_pre: HashMap<BasicBlockId, Invariant>,
}

/// The engine of one function's fixpoint iteration.
pub struct FunctionFixpoint<'a> {
    ctx: &'a AnalysisContext,
    function: argus_ar::FunctionId,
    context: CallContextRef,
    call_stack: Vec<argus_ar::FunctionId>,
    thresholds: Vec<Int>,
    cache: HashMap<(StatementRef, argus_ar::FunctionId), CacheEntry>,
    checks: bool,
    replaying: bool,
    deadline: Option<Instant>,
}

impl<'a> FunctionFixpoint<'a> {
    /// The shared analysis context.
    pub fn ctx(&self) -> &'a AnalysisContext {
        self.ctx
    }

    /// The analyzed function.
    pub fn function(&self) -> argus_ar::FunctionId {
        self.function
    }

    /// The calling context of this analysis.
    pub fn context(&self) -> &CallContextRef {
        &self.context
    }

    /// The functions currently being analyzed up the inlining stack.
    pub fn call_stack(&self) -> &[argus_ar::FunctionId] {
        &self.call_stack
    }

    /// Whether callees created now should run their own checks pass.
    pub(crate) fn checks_for_children(&self) -> bool {
        self.checks && self.replaying
    }

    /// A cached callee exit reusable for `entry`, if any.
    ///
    /// A hit requires the entry invariant to be included in the cached one.
    /// Anything else, including growth by widening, invalidates the entry.
    /// The checks replay never uses the cache: it must descend.
    pub(crate) fn cached_exit(
        &mut self,
        site: Site,
        callee: argus_ar::FunctionId,
        entry: &Invariant,
    ) -> Option<Invariant> {
        if !self.ctx.options.use_fixpoint_cache || self.replaying {
            return None
        }
        let key = (site.statement, callee);
        match self.cache.get(&key) {
            Some(cached) if entry.leq(&cached.entry) => Some(cached.exit.clone()),
            Some(_) => {
                self.cache.remove(&key);
                None
            }
            None => None,
        }
    }

    pub(crate) fn store_cached_exit(
        &mut self,
        site: Site,
        callee: argus_ar::FunctionId,
        entry: Invariant,
        exit: Invariant,
    ) {
        if !self.ctx.options.use_fixpoint_cache || self.replaying {
            return
        }
        self.cache
            .insert((site.statement, callee), CacheEntry { entry, exit });
    }

    /// Integer constants compared against in the body, used as widening
    /// hints for its cycles.
    fn mine_thresholds(code: &Code) -> Vec<Int> {
        let mut thresholds: Vec<Int> = Vec::new();
        for (_, statement) in code.statements() {
            if let Statement::Comparison(cmp) = statement {
                for operand in [&cmp.left, &cmp.right] {
                    if let argus_ar::Operand::Constant(argus_ar::Constant::Int(n)) = operand {
                        thresholds.push(n.to_int());
                    }
                }
            }
        }
        thresholds.sort();
        thresholds.dedup();
        thresholds
    }

    /// Execute one statement, routing calls through the inliner.
    pub fn transfer(&mut self, site: Site, statement: &Statement, inv: Invariant) -> Invariant {
        match statement {
            Statement::Call(call) => inliner::exec_call(self, site, call, false, inv),
            Statement::Invoke(call) => inliner::exec_call(self, site, call, true, inv),
            _ => {
                let mut engine = ExecutionEngine::new(
                    self.ctx,
                    self.function,
                    self.context.clone(),
                    inv,
                );
                engine.exec(site, statement);
                engine.into_inv()
            }
        }
    }

    /// Replay one block from its stabilized pre-invariant, checking every
    /// statement.
    fn replay_block(&mut self, code: &Code, block: BasicBlockId, pre: Invariant) {
        let statements = code.block(block).statements().to_vec();
        let mut inv = pre;
        for (index, statement) in statements.iter().enumerate() {
            if self.is_cancelled() {
                return
            }
            let site = Site {
                function: self.function,
                statement: StatementRef {
                    block,
                    index: index as u32,
                },
            };
            {
                let mut db = self.ctx.report.lock();
                let mut check_ctx =
                    CheckContext::new(self.ctx, site, &self.context, &mut db);
                for checker in &self.ctx.checkers {
                    checker.check(&mut check_ctx, statement, &inv);
                }
            }
            inv = self.transfer(site, statement, inv);
        }
    }

    /// Run the fixpoint of `function` from the given entry invariant; when
    /// `checks` is set, follow up with the checks pass.
    pub fn analyze(
        ctx: &'a AnalysisContext,
        function: argus_ar::FunctionId,
        context: CallContextRef,
        call_stack: Vec<argus_ar::FunctionId>,
        entry: Invariant,
        checks: bool,
    ) -> FunctionAnalysis {
        let bundle = &ctx.bundle;
        let function_data = bundle.function(function);
        let span = debug_span!("function_fixpoint", function = %function_data.name);
        let _guard = span.enter();
        ctx.progress.enter_function(&function_data.name, &context);

        let code = function_data
            .body
            .as_ref()
            .expect("the inliner never descends into declarations");

        let mut thresholds = Self::mine_thresholds(code);
        for hint in &ctx.options.widening_hints {
            thresholds.push(hint.clone());
        }
        thresholds.sort();
        thresholds.dedup();

        let mut engine = FunctionFixpoint {
            ctx,
            function,
            context,
            call_stack,
            thresholds,
            cache: HashMap::new(),
            checks,
            replaying: false,
            deadline: ctx
                .options
                .function_timeout
                .map(|budget| Instant::now() + budget),
        };
        let mut iterator = FixpointIterator::new(code, ctx.fixpoint_parameters());
        iterator.run(&mut engine, entry);

        let width = bundle.data_layout().pointer_bit_width;
        let mut exit = Invariant::bottom(width);
        for block in code.blocks() {
            let is_sink = code.block(block).successors().is_empty()
                || code.exit_block() == Some(block);
            if !is_sink {
                continue
            }
            if let Some(post) = iterator.post(block) {
                exit = exit.join(post);
            }
        }

        let mut block_pre = HashMap::new();
        for block in code.blocks() {
            if let Some(pre) = iterator.pre(block) {
                block_pre.insert(block, pre.clone());
            }
        }

        if checks && !engine.is_cancelled() {
            engine.replaying = true;
            for block in code.blocks() {
                let pre = block_pre
                    .get(&block)
                    .cloned()
                    .unwrap_or_else(|| Invariant::bottom(width));
                engine.replay_block(code, block, pre);
            }
            engine.replaying = false;
        }

        ctx.progress.leave_function(&function_data.name);
        FunctionAnalysis { exit, block_pre }
    }
}

impl<'a> FixpointEngine<Code> for FunctionFixpoint<'a> {
    type Domain = Invariant;

    fn bottom(&self) -> Invariant {
        Invariant::bottom(self.ctx.bundle.data_layout().pointer_bit_width)
    }

    fn analyze_node(&mut self, node: BasicBlockId, pre: Invariant) -> Invariant {
        let code = self
            .ctx
            .bundle
            .function(self.function)
            .body
            .as_ref()
            .expect("analyzed functions have bodies");
        let statements = code.block(node).statements().to_vec();
        let mut inv = pre;
        for (index, statement) in statements.iter().enumerate() {
            if self.is_cancelled() {
                return inv
            }
            let site = Site {
                function: self.function,
                statement: StatementRef {
                    block: node,
                    index: index as u32,
                },
            };
            inv = self.transfer(site, statement, inv);
        }
        inv
    }

    fn widen_with_hint(
        &self,
        head: BasicBlockId,
        before: &Invariant,
        after: &Invariant,
    ) -> Invariant {
        self.ctx.progress.cycle_widening(self.function, head);
        if self.thresholds.is_empty() {
            before.widening(after)
        } else {
            before.widening_thresholds(after, &self.thresholds)
        }
    }

    fn is_cancelled(&self) -> bool {
        self.ctx.is_cancelled()
            || self
                .deadline
                .is_some_and(|deadline| Instant::now() > deadline)
    }
}

//! Analysis orchestration
//!
//! Resolves entry points, derives per-function fixpoint parameters, runs the
//! interprocedural analysis for each entry point (in parallel when there are
//! several) and collects checker results into the report database.

use std::collections::BTreeMap;
use std::panic::{
    catch_unwind,
    AssertUnwindSafe,
};
use std::sync::atomic::{
    AtomicBool,
    Ordering,
};
use std::sync::Arc;
use std::time::{
    Duration,
    Instant,
};

use parking_lot::Mutex;
use rayon::prelude::*;
use tracing::{
    error,
    warn,
};

use argus_ar::Bundle;
use argus_core::fixpoint::{
    FixpointParameters,
    NarrowingStrategy,
    WideningStrategy,
};
use argus_num::Int;

use crate::{
    call_context::CallContextFactory,
    call_graph::CallGraph,
    checker::{
        default_checkers,
        Checker,
    },
    error::AnalyzerError,
    execution_engine::ExecutionEngine,
    function_fixpoint::FunctionFixpoint,
    literal::LiteralFactory,
    memory_location::MemoryFactory,
    pointer_analysis::{
        self,
        PointerSummary,
    },
    progress::{
        ProgressHandle,
        ProgressLogger,
        ProgressMode,
    },
    report::{
        CheckStatus,
        ReportDb,
    },
    value::Invariant,
    variable::{
        VariableFactory,
        VariableRef,
    },
};

/// How many abstract dimensions the analysis tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Precision {
    /// Scalar variables only.
    Register,
    /// Scalars plus pointer targets and offsets.
    Pointer,
    /// Everything, including memory cells.
    #[default]
    Memory,
}

/// Configuration of one analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    /// Functions to start from.
    pub entry_points: Vec<String>,
    /// Reuse callee fixpoints at call sites when the entry state shrinks.
    pub use_fixpoint_cache: bool,
    /// Stream every executed statement at debug level.
    pub trace_ar_statements: bool,
    /// Tracked abstract dimensions.
    pub precision: Precision,
    /// Iterations of plain joins before the first widening.
    pub widening_delay: u32,
    /// Widen every n-th iteration after the delay.
    pub widening_period: u32,
    /// Extrapolation operator.
    pub widening_strategy: WideningStrategy,
    /// Refinement operator.
    pub narrowing_strategy: NarrowingStrategy,
    /// Cap on decreasing iterations.
    pub narrowing_iterations: Option<u32>,
    /// Extra widening thresholds, besides the constants mined per function.
    pub widening_hints: Vec<Int>,
    /// Progress rendering.
    pub progress: ProgressMode,
    /// Wall-clock budget per function fixpoint.
    pub function_timeout: Option<Duration>,
    /// Wall-clock budget for the whole run.
    pub global_timeout: Option<Duration>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        AnalysisOptions {
            entry_points: vec!["main".to_owned()],
            use_fixpoint_cache: false,
            trace_ar_statements: false,
            precision: Precision::default(),
            widening_delay: 1,
            widening_period: 1,
            widening_strategy: WideningStrategy::default(),
            narrowing_strategy: NarrowingStrategy::default(),
            narrowing_iterations: None,
            widening_hints: Vec::new(),
            progress: ProgressMode::default(),
            function_timeout: None,
            global_timeout: None,
        }
    }
}

/// Shared state of one analysis run.
pub struct AnalysisContext {
    /// The analyzed bundle.
    pub bundle: Arc<Bundle>,
    /// The run configuration.
    pub options: AnalysisOptions,
    /// Shared variable descriptors.
    pub variables: Arc<VariableFactory>,
    /// Shared memory location descriptors.
    pub memories: Arc<MemoryFactory>,
    /// Shared calling contexts.
    pub contexts: Arc<CallContextFactory>,
    /// Shared literal translation.
    pub literals: Arc<LiteralFactory>,
    /// Progress sink.
    pub progress: ProgressHandle,
    pub(crate) checkers: Vec<Box<dyn Checker>>,
    pub(crate) report: Mutex<ReportDb>,
    pointer_summary: Option<PointerSummary>,
    cancel: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl AnalysisContext {
    /// Build the shared state: factories, the whole-bundle pointer
    /// pre-analysis, and the checker battery.
    pub fn new(
        bundle: Arc<Bundle>,
        options: AnalysisOptions,
        progress: ProgressHandle,
        checkers: Vec<Box<dyn Checker>>,
    ) -> Self {
        let width = bundle.data_layout().pointer_bit_width;
        let variables = Arc::new(VariableFactory::new(width));
        let memories = Arc::new(MemoryFactory::new());
        let literals = Arc::new(LiteralFactory::new(
            Arc::clone(&variables),
            Arc::clone(&memories),
        ));
        let pointer_summary = match options.precision {
            Precision::Register => None,
            _ => Some(pointer_analysis::analyze(&bundle, &literals)),
        };
        let deadline = options.global_timeout.map(|budget| Instant::now() + budget);
        AnalysisContext {
            bundle,
            options,
            variables,
            memories,
            contexts: Arc::new(CallContextFactory::new()),
            literals,
            progress,
            checkers,
            report: Mutex::new(ReportDb::new()),
            pointer_summary,
            cancel: Arc::new(AtomicBool::new(false)),
            deadline,
        }
    }

    /// Request cooperative cancellation.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Return true once the run is cancelled or past its deadline.
    pub fn is_cancelled(&self) -> bool {
        if self.cancel.load(Ordering::SeqCst) {
            return true
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() > deadline {
                self.cancel.store(true, Ordering::SeqCst);
                return true
            }
        }
        false
    }

    /// Candidates for an indirect call, from the pointer pre-analysis.
    pub(crate) fn function_pointer_targets(
        &self,
        var: &VariableRef,
    ) -> Option<Vec<argus_ar::FunctionId>> {
        self.pointer_summary
            .as_ref()
            .and_then(|summary| summary.function_targets(var))
    }

    /// The iteration parameters derived from the options.
    pub fn fixpoint_parameters(&self) -> FixpointParameters {
        FixpointParameters {
            widening_delay: self.options.widening_delay,
            widening_period: self.options.widening_period.max(1),
            widening_strategy: self.options.widening_strategy,
            narrowing_strategy: self.options.narrowing_strategy,
            max_narrowing_iterations: self.options.narrowing_iterations,
        }
    }
}

/// The outcome of one analysis run.
pub struct AnalysisReport {
    /// Every checker result.
    pub db: ReportDb,
    /// Totals per checker and verdict.
    pub summary: BTreeMap<(String, CheckStatus), u64>,
    /// Whether the run was cancelled before completion.
    pub cancelled: bool,
}

fn resolve_entry_points(
    bundle: &Bundle,
    options: &AnalysisOptions,
) -> Result<Vec<argus_ar::FunctionId>, AnalyzerError> {
    let mut entries = Vec::new();
    for name in &options.entry_points {
        let id = bundle
            .function_by_name(name)
            .ok_or_else(|| AnalyzerError::UnknownEntryPoint { name: name.clone() })?;
        if bundle.function(id).is_declaration() {
            return Err(AnalyzerError::EntryPointIsDeclaration { name: name.clone() })
        }
        entries.push(id);
    }
    Ok(entries)
}

fn analyze_entry_point(ctx: &AnalysisContext, entry: argus_ar::FunctionId) {
    let width = ctx.bundle.data_layout().pointer_bit_width;
    let mut engine = ExecutionEngine::new(
        ctx,
        entry,
        ctx.contexts.empty(),
        Invariant::entry(width),
    );
    engine.initialize_globals();
    let init = engine.into_inv();
    let _ = FunctionFixpoint::analyze(ctx, entry, ctx.contexts.empty(), Vec::new(), init, true);
}

/// Run the analyzer over `bundle` with the default checkers.
pub fn run(bundle: Arc<Bundle>, options: AnalysisOptions) -> Result<AnalysisReport, AnalyzerError> {
    run_with_checkers(bundle, options, default_checkers())
}

/// Run the analyzer with a caller-chosen checker battery.
pub fn run_with_checkers(
    bundle: Arc<Bundle>,
    options: AnalysisOptions,
    checkers: Vec<Box<dyn Checker>>,
) -> Result<AnalysisReport, AnalyzerError> {
    let (progress, logger) = ProgressLogger::start(options.progress);
    let ctx = AnalysisContext::new(bundle, options, progress, checkers);
    let entries = resolve_entry_points(&ctx.bundle, &ctx.options)?;

    // Warn about the components the inliner will over-approximate
    let graph = CallGraph::build(&ctx.bundle);
    for component in graph.topological_components(&entries) {
        if graph.is_recursive(&component) {
            let names: Vec<&str> = component
                .iter()
                .map(|f| ctx.bundle.function(*f).name.as_str())
                .collect();
            warn!(
                functions = names.join(", "),
                "recursive call graph component; summaries are over-approximated"
            );
        }
    }

    // Analyze entry points; a fault in one aborts only that entry point
    let analyze = |&entry: &argus_ar::FunctionId| {
        let outcome = catch_unwind(AssertUnwindSafe(|| analyze_entry_point(&ctx, entry)));
        if outcome.is_err() {
            error!(
                entry = %ctx.bundle.function(entry).name,
                "analysis of entry point aborted by a fatal fault"
            );
        }
    };
    if entries.len() > 1 {
        entries.par_iter().for_each(analyze);
    } else {
        entries.iter().for_each(analyze);
    }

    let db = {
        let mut db = ctx.report.lock();
        db.commit();
        std::mem::take(&mut *db)
    };
    let summary = db.summary();
    let cancelled = ctx.is_cancelled();
    if let Some(logger) = logger {
        logger.shutdown();
    }
    Ok(AnalysisReport {
        db,
        summary,
        cancelled,
    })
}

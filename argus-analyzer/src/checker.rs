//! Checkers
//!
//! A checker inspects one statement under its stabilized pre-invariant and
//! renders a verdict: ok, warning, error or unreachable. Verdicts are rows
//! in the report database, never exceptions.

mod buffer_overflow;
mod dead_code;
mod division_by_zero;
mod double_free;
mod null_dereference;
mod uninitialized;

pub use buffer_overflow::BufferOverflowChecker;
pub use dead_code::DeadCodeChecker;
pub use division_by_zero::DivisionByZeroChecker;
pub use double_free::DoubleFreeChecker;
pub use null_dereference::NullDereferenceChecker;
pub use uninitialized::UninitializedVariableChecker;

use argus_ar::{
    Operand,
    Statement,
};
use argus_core::{
    interval::Interval,
    uninitialized::Uninitialized,
};
use argus_num::{
    MachineInt,
    Signedness,
};

use crate::{
    analysis::AnalysisContext,
    call_context::{
        CallContextRef,
        Site,
    },
    literal::{
        Literal,
        ScalarLit,
    },
    report::{
        CheckResult,
        CheckStatus,
        ReportDb,
    },
    value::{
        AbstractEnvironment,
        Invariant,
        PointerInfo,
    },
};

/// Everything a checker sees at one statement.
pub struct CheckContext<'a> {
    /// The shared analysis context.
    pub analysis: &'a AnalysisContext,
    /// The statement position.
    pub site: Site,
    /// The calling context of the enclosing analysis.
    pub call_context: &'a CallContextRef,
    db: &'a mut ReportDb,
}

impl<'a> CheckContext<'a> {
    pub(crate) fn new(
        analysis: &'a AnalysisContext,
        site: Site,
        call_context: &'a CallContextRef,
        db: &'a mut ReportDb,
    ) -> Self {
        CheckContext {
            analysis,
            site,
            call_context,
            db,
        }
    }

    /// Persist one verdict.
    pub fn emit(
        &mut self,
        checker: &'static str,
        status: CheckStatus,
        operands: &[String],
        info: serde_json::Value,
    ) {
        let function = self.analysis.bundle.function(self.site.function);
        let context_id = self.db.call_context_id(&self.call_context.to_string());
        let operand_ids = operands
            .iter()
            .map(|text| self.db.operand_id(text))
            .collect();
        self.db.insert(CheckResult {
            checker: checker.to_owned(),
            status,
            function: function.name.clone(),
            statement: (
                self.site.function.0,
                self.site.statement.block.0,
                self.site.statement.index,
            ),
            call_context: context_id,
            operands: operand_ids,
            info,
        });
    }

    /// Translate an operand.
    pub fn literal(&self, operand: &Operand) -> Literal {
        self.analysis.literals.get(&self.analysis.bundle, operand)
    }

    /// The interval of a scalar under `env`, at the given typing.
    pub fn int_interval(
        &self,
        env: &AbstractEnvironment,
        scalar: &ScalarLit,
        bit_width: u64,
        sign: Signedness,
    ) -> Interval {
        match scalar {
            ScalarLit::IntConstant(n) => {
                Interval::singleton(n.clone().cast(bit_width, sign))
            }
            ScalarLit::IntVar(v) => env.numeric().get(v).cast(bit_width, sign).interval().clone(),
            _ => Interval::top(bit_width, sign),
        }
    }

    /// The pointer view of a scalar under `env`: targets, offsets,
    /// initialization.
    pub fn pointer_view(
        &self,
        env: &AbstractEnvironment,
        scalar: &ScalarLit,
    ) -> Option<(PointerInfo, Interval, Uninitialized)> {
        let width = self.analysis.bundle.data_layout().pointer_bit_width;
        match scalar {
            ScalarLit::PointerVar(v) => {
                let offset = env.offset_interval(&self.analysis.variables, v);
                Some((env.pointer_info(v), offset, env.uninit(v)))
            }
            ScalarLit::AddressOf(m) => Some((
                PointerInfo::address(m.clone()),
                Interval::singleton(MachineInt::zero(width, Signedness::Unsigned)),
                Uninitialized::Initialized,
            )),
            ScalarLit::Null => Some((
                PointerInfo::null(),
                Interval::singleton(MachineInt::zero(width, Signedness::Unsigned)),
                Uninitialized::Initialized,
            )),
            _ => None,
        }
    }

    /// A short display text for an operand.
    pub fn operand_text(&self, operand: &Operand) -> String {
        match self.literal(operand) {
            Literal::Scalar(ScalarLit::IntVar(v))
            | Literal::Scalar(ScalarLit::FloatVar(v))
            | Literal::Scalar(ScalarLit::PointerVar(v)) => v.to_string(),
            Literal::Scalar(ScalarLit::IntConstant(n)) => n.to_int().to_string(),
            Literal::Scalar(ScalarLit::Null) => "null".to_owned(),
            Literal::Scalar(ScalarLit::Undefined) => "undef".to_owned(),
            Literal::Scalar(ScalarLit::AddressOf(m)) => format!("&{m}"),
            Literal::Scalar(ScalarLit::FloatConstant { .. }) => "fp".to_owned(),
            Literal::Aggregate(_) => "aggregate".to_owned(),
            Literal::VoidVar(v) => v.to_string(),
        }
    }
}

/// The checker contract.
///
/// For every reachable statement the checker sees a normalized invariant;
/// exception flow is observable through the two flows of [`Invariant`].
pub trait Checker: Send + Sync {
    /// Short stable name, used as the report key.
    fn name(&self) -> &'static str;

    /// One-line description.
    fn description(&self) -> &'static str;

    /// Render verdicts for one statement.
    fn check(&self, ctx: &mut CheckContext<'_>, statement: &Statement, inv: &Invariant);
}

/// The default checker battery.
pub fn default_checkers() -> Vec<Box<dyn Checker>> {
    vec![
        Box::new(DeadCodeChecker),
        Box::new(UninitializedVariableChecker),
        Box::new(DivisionByZeroChecker),
        Box::new(NullDereferenceChecker),
        Box::new(DoubleFreeChecker),
        Box::new(BufferOverflowChecker),
    ]
}

//! Double free

use argus_ar::{
    Constant,
    Operand,
    Statement,
};
use argus_core::{
    lattice::AbstractDomain,
    lifetime::Lifetime,
    pointer::PointsToSet,
};

use crate::{
    checker::{
        CheckContext,
        Checker,
    },
    literal::Literal,
    report::CheckStatus,
    value::Invariant,
};

/// The deallocating libc entry points.
const FREE_FUNCTIONS: &[&str] = &["free", "realloc"];

/// Flags calls that release an allocation that may already be dead.
pub struct DoubleFreeChecker;

impl Checker for DoubleFreeChecker {
    fn name(&self) -> &'static str {
        "dfa"
    }

    fn description(&self) -> &'static str {
        "double free analysis"
    }

    fn check(&self, ctx: &mut CheckContext<'_>, statement: &Statement, inv: &Invariant) {
        if inv.normal.is_bottom() {
            return
        }
        let call = match statement {
            Statement::Call(call) | Statement::Invoke(call) => call,
            _ => return,
        };
        let Operand::Constant(Constant::FunctionAddress(callee)) = &call.callee else {
            return
        };
        let name = &ctx.analysis.bundle.function(*callee).name;
        if !FREE_FUNCTIONS.contains(&name.as_str()) {
            return
        }
        let Some(argument) = call.arguments.first() else {
            return
        };
        let Literal::Scalar(scalar) = ctx.literal(argument) else {
            return
        };
        let Some((info, _, _)) = ctx.pointer_view(&inv.normal, &scalar) else {
            return
        };
        if info.nullity.is_null() {
            // free(NULL) is well-defined
            ctx.emit(
                self.name(),
                CheckStatus::Ok,
                &[ctx.operand_text(argument)],
                serde_json::Value::Null,
            );
            return
        }
        let PointsToSet::Set(targets) = &info.points_to else {
            return
        };
        let mut status = CheckStatus::Ok;
        let mut released = Vec::new();
        for memory in targets {
            if !memory.is_dyn_alloc() {
                continue
            }
            released.push(memory.to_string());
            match inv.normal.lifetime(memory) {
                Lifetime::Deallocated => {
                    status = CheckStatus::Error;
                }
                Lifetime::Top if status == CheckStatus::Ok => {
                    status = CheckStatus::Warning;
                }
                _ => {}
            }
        }
        if released.is_empty() {
            return
        }
        ctx.emit(
            self.name(),
            status,
            &[ctx.operand_text(argument)],
            serde_json::json!({ "allocations": released }),
        );
    }
}

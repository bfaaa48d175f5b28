//! Null and invalid dereferences

use argus_ar::{
    Operand,
    Statement,
};
use argus_core::{
    lattice::AbstractDomain,
    nullity::Nullity,
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

/// Flags dereferences through null or possibly-null pointers.
pub struct NullDereferenceChecker;

/// The pointer operands a statement dereferences.
fn dereferenced(statement: &Statement) -> Vec<&Operand> {
    match statement {
        Statement::Load { pointer, .. } | Statement::Store { pointer, .. } => vec![pointer],
        Statement::MemCopy { dest, src, .. } | Statement::MemMove { dest, src, .. } => {
            vec![dest, src]
        }
        Statement::MemSet { dest, .. } => vec![dest],
        _ => vec![],
    }
}

impl Checker for NullDereferenceChecker {
    fn name(&self) -> &'static str {
        "nullity"
    }

    fn description(&self) -> &'static str {
        "null dereference analysis"
    }

    fn check(&self, ctx: &mut CheckContext<'_>, statement: &Statement, inv: &Invariant) {
        if inv.normal.is_bottom() {
            return
        }
        for operand in dereferenced(statement) {
            let Literal::Scalar(scalar) = ctx.literal(operand) else {
                continue
            };
            let Some((info, _, uninit)) = ctx.pointer_view(&inv.normal, &scalar) else {
                continue
            };
            if uninit.is_uninitialized() {
                // The uninitialized checker reports this access
                continue
            }
            let status = match info.nullity {
                Nullity::Null => CheckStatus::Error,
                Nullity::Top => CheckStatus::Warning,
                Nullity::NonNull => {
                    if info.points_to.is_top() {
                        CheckStatus::Warning
                    } else {
                        CheckStatus::Ok
                    }
                }
                Nullity::Bottom => continue,
            };
            ctx.emit(
                self.name(),
                status,
                &[ctx.operand_text(operand)],
                serde_json::json!({ "nullity": info.nullity.to_string() }),
            );
        }
    }
}

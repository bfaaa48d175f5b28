//! Buffer overflow

use argus_ar::{
    Operand,
    Statement,
};
use argus_core::{
    lattice::AbstractDomain,
    pointer::PointsToSet,
};
use argus_num::Int;

use crate::{
    checker::{
        CheckContext,
        Checker,
    },
    literal::Literal,
    report::CheckStatus,
    value::Invariant,
};

/// Flags memory accesses that may run past the target allocation.
pub struct BufferOverflowChecker;

impl Checker for BufferOverflowChecker {
    fn name(&self) -> &'static str {
        "boa"
    }

    fn description(&self) -> &'static str {
        "buffer overflow analysis"
    }

    fn check(&self, ctx: &mut CheckContext<'_>, statement: &Statement, inv: &Invariant) {
        if inv.normal.is_bottom() {
            return
        }
        let (pointer, access_size) = match statement {
            Statement::Load { result, pointer } => {
                let ty = &ctx.analysis.bundle.var(*result).ty;
                (pointer, ctx.analysis.bundle.data_layout().size_in_bytes(ty))
            }
            Statement::Store { pointer, value } => {
                let ty = ctx.analysis.bundle.operand_type(value);
                (
                    pointer,
                    ctx.analysis.bundle.data_layout().size_in_bytes(&ty),
                )
            }
            _ => return,
        };
        let Literal::Scalar(scalar) = ctx.literal(pointer) else {
            return
        };
        let Some((info, offset, _)) = ctx.pointer_view(&inv.normal, &scalar) else {
            return
        };
        let PointsToSet::Set(targets) = &info.points_to else {
            return
        };
        if offset.is_bottom() {
            return
        }

        let mut status: Option<CheckStatus> = None;
        for memory in targets {
            let size_var = ctx.analysis.variables.alloc_size_var(memory.id());
            let size = inv.normal.numeric().get(&size_var);
            let size = size.interval();
            if size.is_top() || size.is_bottom() {
                continue
            }
            // The access covers [offset, offset + access_size)
            let end_max = offset.ub().to_int() + Int::from(access_size);
            let end_min = offset.lb().to_int() + Int::from(access_size);
            let verdict = if end_min > size.ub().to_int() {
                CheckStatus::Error
            } else if end_max > size.lb().to_int() {
                CheckStatus::Warning
            } else {
                CheckStatus::Ok
            };
            status = Some(match status {
                None => verdict,
                Some(previous) => previous.max(verdict),
            });
        }
        let Some(status) = status else {
            return
        };
        ctx.emit(
            self.name(),
            status,
            &[ctx.operand_text(pointer)],
            serde_json::json!({
                "offset": offset.to_string(),
                "access_size": access_size,
            }),
        );
    }
}

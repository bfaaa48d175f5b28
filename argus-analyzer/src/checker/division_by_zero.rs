//! Division by zero

use argus_ar::{
    BinaryOp,
    Statement,
};
use argus_core::lattice::AbstractDomain;

use crate::{
    checker::{
        CheckContext,
        Checker,
    },
    literal::Literal,
    report::CheckStatus,
    value::Invariant,
};

/// Flags integer divisions whose divisor may be zero.
pub struct DivisionByZeroChecker;

impl Checker for DivisionByZeroChecker {
    fn name(&self) -> &'static str {
        "dbz"
    }

    fn description(&self) -> &'static str {
        "division by zero analysis"
    }

    fn check(&self, ctx: &mut CheckContext<'_>, statement: &Statement, inv: &Invariant) {
        if inv.normal.is_bottom() {
            return
        }
        let Statement::Binary {
            op, right, result, ..
        } = statement
        else {
            return
        };
        if !matches!(
            op,
            BinaryOp::SDiv | BinaryOp::UDiv | BinaryOp::SRem | BinaryOp::URem
        ) {
            return
        }
        let Literal::Scalar(divisor) = ctx.literal(right) else {
            return
        };
        let var = ctx.analysis.bundle.var(*result);
        let Some((bit_width, sign)) = var.ty.int_parts() else {
            return
        };
        let interval = ctx.int_interval(&inv.normal, &divisor, bit_width, sign);
        let status = if interval.is_bottom() {
            return
        } else if interval.as_singleton().is_some_and(|n| n.is_zero()) {
            CheckStatus::Error
        } else if interval.contains_zero() {
            CheckStatus::Warning
        } else {
            CheckStatus::Ok
        };
        ctx.emit(
            self.name(),
            status,
            &[ctx.operand_text(right)],
            serde_json::json!({ "divisor": interval.to_string() }),
        );
    }
}

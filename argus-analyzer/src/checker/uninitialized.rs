//! Uninitialized variable reads

use argus_ar::{
    Operand,
    Statement,
};
use argus_core::lattice::AbstractDomain;

use crate::{
    checker::{
        CheckContext,
        Checker,
    },
    literal::{
        Literal,
        ScalarLit,
    },
    report::CheckStatus,
    value::Invariant,
};

/// Flags reads of definitely-uninitialized scalars.
pub struct UninitializedVariableChecker;

/// The operands a statement actually reads.
fn read_operands(statement: &Statement) -> Vec<&Operand> {
    match statement {
        Statement::Binary { left, right, .. } => vec![left, right],
        Statement::Comparison(cmp) => vec![&cmp.left, &cmp.right],
        Statement::Conversion { operand, .. } => vec![operand],
        Statement::PointerShift {
            pointer, offsets, ..
        } => {
            let mut operands = vec![pointer];
            operands.extend(offsets.iter().map(|(_, operand)| operand));
            operands
        }
        Statement::Load { pointer, .. } => vec![pointer],
        Statement::Store { pointer, value } => vec![pointer, value],
        Statement::MemCopy { dest, src, length }
        | Statement::MemMove { dest, src, length } => vec![dest, src, length],
        Statement::MemSet {
            dest,
            value,
            length,
        } => vec![dest, value, length],
        Statement::Call(call) | Statement::Invoke(call) => {
            let mut operands = vec![&call.callee];
            operands.extend(call.arguments.iter());
            operands
        }
        Statement::Return { operand } => operand.iter().collect(),
        _ => vec![],
    }
}

impl Checker for UninitializedVariableChecker {
    fn name(&self) -> &'static str {
        "uva"
    }

    fn description(&self) -> &'static str {
        "uninitialized variable analysis"
    }

    fn check(&self, ctx: &mut CheckContext<'_>, statement: &Statement, inv: &Invariant) {
        if inv.normal.is_bottom() {
            return
        }
        for operand in read_operands(statement) {
            let Literal::Scalar(scalar) = ctx.literal(operand) else {
                continue
            };
            let var = match &scalar {
                ScalarLit::IntVar(v) | ScalarLit::FloatVar(v) | ScalarLit::PointerVar(v) => v,
                ScalarLit::Undefined => {
                    ctx.emit(
                        self.name(),
                        CheckStatus::Error,
                        &[ctx.operand_text(operand)],
                        serde_json::json!({ "kind": "undefined constant" }),
                    );
                    continue
                }
                _ => continue,
            };
            if inv.normal.uninit(var).is_uninitialized() {
                ctx.emit(
                    self.name(),
                    CheckStatus::Error,
                    &[ctx.operand_text(operand)],
                    serde_json::json!({ "kind": "uninitialized read" }),
                );
            }
        }
    }
}

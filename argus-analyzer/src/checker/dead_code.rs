//! Unreachable statement detection

use argus_ar::Statement;
use argus_core::lattice::AbstractDomain;

use crate::{
    checker::{
        CheckContext,
        Checker,
    },
    report::CheckStatus,
    value::Invariant,
};

/// Flags statements whose normal flow is unreachable.
pub struct DeadCodeChecker;

impl Checker for DeadCodeChecker {
    fn name(&self) -> &'static str {
        "dca"
    }

    fn description(&self) -> &'static str {
        "dead code analysis"
    }

    fn check(&self, ctx: &mut CheckContext<'_>, statement: &Statement, inv: &Invariant) {
        let _ = statement;
        if inv.normal.is_bottom() {
            ctx.emit(
                self.name(),
                CheckStatus::Unreachable,
                &[],
                serde_json::Value::Null,
            );
        }
    }
}

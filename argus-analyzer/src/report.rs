//! The report database
//!
//! Checker results accumulate in memory as structured rows, with interned
//! side tables for memory locations, calling contexts and operand texts.
//! Rows are committed in bounded batches, mirroring the transactional
//! contract of an on-disk backend.

use std::collections::BTreeMap;

use serde::{
    Deserialize,
    Serialize,
};

/// Maximum rows per commit batch.
const MAX_ROWS_PER_COMMIT: usize = 8192;

/// Verdict of one check at one statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CheckStatus {
    /// The property provably holds.
    Ok,
    /// The property may be violated.
    Warning,
    /// The property is provably violated on every execution reaching the
    /// statement.
    Error,
    /// The statement is unreachable.
    Unreachable,
}

/// One checker result row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    /// Name of the checker that produced the row.
    pub checker: String,
    /// The verdict.
    pub status: CheckStatus,
    /// Analyzed function name.
    pub function: String,
    /// Statement position: function index, block index, statement index.
    pub statement: (u32, u32, u32),
    /// Interned id of the calling context.
    pub call_context: u64,
    /// Interned ids of the operands involved.
    pub operands: Vec<u64>,
    /// Free-form structured payload.
    pub info: serde_json::Value,
}

/// An interning side table mapping display texts to stable ids.
#[derive(Debug, Default)]
struct SideTable {
    ids: BTreeMap<String, u64>,
    rows: Vec<String>,
}

impl SideTable {
    fn intern(&mut self, text: &str) -> u64 {
        if let Some(&id) = self.ids.get(text) {
            return id
        }
        let id = self.rows.len() as u64;
        self.rows.push(text.to_owned());
        self.ids.insert(text.to_owned(), id);
        id
    }
}

/// In-memory report database with batched commits.
#[derive(Debug, Default)]
pub struct ReportDb {
    committed: Vec<CheckResult>,
    pending: Vec<CheckResult>,
    memory_locations: SideTable,
    call_contexts: SideTable,
    operands: SideTable,
}

impl ReportDb {
    /// An empty database.
    pub fn new() -> Self {
        ReportDb::default()
    }

    /// Intern a memory location display text.
    pub fn memory_location_id(&mut self, text: &str) -> u64 {
        self.memory_locations.intern(text)
    }

    /// Intern a calling context display text.
    pub fn call_context_id(&mut self, text: &str) -> u64 {
        self.call_contexts.intern(text)
    }

    /// Intern an operand display text.
    pub fn operand_id(&mut self, text: &str) -> u64 {
        self.operands.intern(text)
    }

    /// Queue a row; batches are committed transparently when full.
    pub fn insert(&mut self, row: CheckResult) {
        self.pending.push(row);
        if self.pending.len() >= MAX_ROWS_PER_COMMIT {
            self.commit();
        }
    }

    /// Flush pending rows.
    pub fn commit(&mut self) {
        self.committed.append(&mut self.pending);
    }

    /// Every committed row.
    pub fn rows(&self) -> &[CheckResult] {
        &self.committed
    }

    /// Committed rows for one checker at one statement.
    pub fn find(&self, checker: &str, statement: (u32, u32, u32)) -> Vec<&CheckResult> {
        self.committed
            .iter()
            .filter(|row| row.checker == checker && row.statement == statement)
            .collect()
    }

    /// Totals per checker and status.
    pub fn summary(&self) -> BTreeMap<(String, CheckStatus), u64> {
        let mut totals = BTreeMap::new();
        for row in &self.committed {
            *totals
                .entry((row.checker.clone(), row.status))
                .or_insert(0u64) += 1;
        }
        totals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(checker: &str, status: CheckStatus) -> CheckResult {
        CheckResult {
            checker: checker.to_owned(),
            status,
            function: "main".to_owned(),
            statement: (0, 0, 0),
            call_context: 0,
            operands: vec![],
            info: serde_json::Value::Null,
        }
    }

    #[test]
    fn batching() {
        let mut db = ReportDb::new();
        db.insert(row("dbz", CheckStatus::Ok));
        assert!(db.rows().is_empty());
        db.commit();
        assert_eq!(db.rows().len(), 1);

        for _ in 0..MAX_ROWS_PER_COMMIT {
            db.insert(row("dbz", CheckStatus::Warning));
        }
        // The full batch was committed automatically
        assert!(db.rows().len() > 1);
    }

    #[test]
    fn interning_is_stable() {
        let mut db = ReportDb::new();
        let a = db.call_context_id("main/f");
        let b = db.call_context_id("main/f");
        let c = db.call_context_id("main/g");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn summary_totals() {
        let mut db = ReportDb::new();
        db.insert(row("dbz", CheckStatus::Error));
        db.insert(row("dbz", CheckStatus::Error));
        db.insert(row("uva", CheckStatus::Ok));
        db.commit();
        let summary = db.summary();
        assert_eq!(summary[&("dbz".to_owned(), CheckStatus::Error)], 2);
        assert_eq!(summary[&("uva".to_owned(), CheckStatus::Ok)], 1);
    }
}

//! Outcome reporting for a reconciliation run.

use std::fmt;

use rowsync_store::{insert_sql, DeleteStatement, Row, UpdateStatement};
use serde::{Deserialize, Serialize};

/// One statement the run planned, recorded in live and dry-run mode
/// alike. In dry-run mode these are the only trace of the run.
#[derive(Debug, Clone)]
pub enum PlannedOperation {
    /// An update of one matched snapshot row.
    Update(UpdateStatement),
    /// An insert of one unmatched desired row.
    Insert {
        /// Target table.
        table: String,
        /// The row as inserted, defaults applied.
        row: Row,
    },
    /// A delete of one unmatched snapshot row.
    Delete(DeleteStatement),
}

impl fmt::Display for PlannedOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Update(statement) => {
                let (sql, args) = statement.to_sql();
                write!(f, "{sql} -- args: {args:?}")
            }
            Self::Insert { table, row } => {
                let (sql, args) = insert_sql(table, row);
                write!(f, "{sql} -- args: {args:?}")
            }
            Self::Delete(statement) => {
                let (sql, args) = statement.to_sql();
                write!(f, "{sql} -- args: {args:?}")
            }
        }
    }
}

/// Counters for one reconciliation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileSummary {
    /// Snapshot rows read.
    pub snapshot_rows: usize,
    /// Desired-to-current match records found.
    pub matches: usize,
    /// Updates planned (rows with at least one differing field).
    pub updates_planned: usize,
    /// Updates applied.
    pub updated: usize,
    /// Inserts planned.
    pub inserts_planned: usize,
    /// Inserts applied.
    pub inserted: usize,
    /// Delete statements planned.
    pub deletes_planned: usize,
    /// Delete statements executed. With multiple keys a removed row
    /// counts once per key, redundant statements included.
    pub deleted: usize,
    /// Updates or inserts skipped on a constraint violation.
    pub constraint_violations: usize,
}

impl fmt::Display for ReconcileSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "snapshot={} matches={} updated={}/{} inserted={}/{} deleted={}/{} violations={}",
            self.snapshot_rows,
            self.matches,
            self.updated,
            self.updates_planned,
            self.inserted,
            self.inserts_planned,
            self.deleted,
            self.deletes_planned,
            self.constraint_violations
        )
    }
}

/// Result of a reconciliation run.
#[derive(Debug, Default)]
pub struct ReconcileOutcome {
    /// Run counters.
    pub summary: ReconcileSummary,
    /// Every statement the run planned, in execution order.
    pub operations: Vec<PlannedOperation>,
    /// Desired rows that matched nothing, when requested. Defaults
    /// have been applied to them.
    pub unmatched_desired: Option<Vec<Row>>,
    /// Whether the run was a dry run.
    pub dry_run: bool,
}

//! Run summaries

use im_core::{Assignment, LegacyKey};
use serde::{Serialize, Serializer};
use std::time::Duration;

fn as_millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// Outcome of one primary backfill run over a table
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    /// Table migrated
    pub table: String,

    /// Rows read from the pending set
    pub rows_scanned: usize,

    /// Rows whose identifier was written by this run
    pub rows_updated: usize,

    /// Rows skipped because their conditional write matched nothing
    pub rows_skipped: usize,

    /// Rows that already carried an identifier when the run started
    pub already_assigned: usize,

    /// Rows pending when the run started (what a dry run would update)
    pub pending_before: usize,

    /// Rows still pending when the run ended
    pub remaining: usize,

    /// No row of the table is left without an identifier
    pub complete: bool,

    /// Batches committed
    pub batches: usize,

    /// Wall-clock time of the run
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,

    /// Whether this was a dry run
    pub dry_run: bool,

    /// Would-be assignments collected by a dry run
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sample: Vec<Assignment>,

    /// Legacy keys whose conditional write was a conflict
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<LegacyKey>,
}

impl Summary {
    pub(crate) fn new(table: &str, dry_run: bool) -> Self {
        Self {
            table: table.to_string(),
            rows_scanned: 0,
            rows_updated: 0,
            rows_skipped: 0,
            already_assigned: 0,
            pending_before: 0,
            remaining: 0,
            complete: false,
            batches: 0,
            elapsed: Duration::ZERO,
            dry_run,
            sample: Vec::new(),
            conflicts: Vec::new(),
        }
    }
}

/// Outcome of one dependent-cursor pass
#[derive(Debug, Clone, Serialize)]
pub struct DependentSummary {
    /// Dependent table
    pub table: String,

    /// Parent table whose identifiers were copied
    pub parent: String,

    /// Rows with a reference but no cursor when the pass started
    pub pending_before: usize,

    /// Rows read from the resolvable set
    pub rows_scanned: usize,

    /// Cursors written by this pass
    pub rows_updated: usize,

    /// Rows skipped because their conditional write matched nothing
    pub rows_skipped: usize,

    /// Rows with a reference but no cursor after the pass
    pub unresolved: usize,

    /// Unresolved rows whose reference matches no parent row
    pub orphaned: usize,

    /// Unresolved rows whose parent has no identifier yet
    pub awaiting_parent: usize,

    /// Batches committed
    pub batches: usize,

    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,

    pub dry_run: bool,
}

impl DependentSummary {
    pub(crate) fn new(table: &str, parent: &str, dry_run: bool) -> Self {
        Self {
            table: table.to_string(),
            parent: parent.to_string(),
            pending_before: 0,
            rows_scanned: 0,
            rows_updated: 0,
            rows_skipped: 0,
            unresolved: 0,
            orphaned: 0,
            awaiting_parent: 0,
            batches: 0,
            elapsed: Duration::ZERO,
            dry_run,
        }
    }
}

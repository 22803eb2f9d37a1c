//! Store trait definition

use crate::error::DbResult;
use async_trait::async_trait;
use im_core::{
    Assignment, DependentRow, DependentTable, KeyKind, LegacyKey, PendingRow, SqlIdent,
    TargetTable,
};

/// Type and nullability of a column as reported by `information_schema`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    /// Type name as the database spells it (`INTEGER`, `uuid`, ...)
    pub data_type: String,
    /// Whether the column accepts NULL
    pub nullable: bool,
}

/// Result of applying one batch of conditional writes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Rows whose target went from NULL to the assigned value
    pub updated: usize,
    /// Rows whose conditional write matched nothing (already assigned, or gone)
    pub conflicts: Vec<LegacyKey>,
}

/// Where one column of a table gets its conditional writes.
#[derive(Debug, Clone, Copy)]
pub struct WriteTarget<'a> {
    pub table: &'a SqlIdent,
    pub key: &'a SqlIdent,
    pub key_kind: KeyKind,
    pub column: &'a SqlIdent,
}

impl<'a> WriteTarget<'a> {
    /// The identifier column of a target table.
    pub fn identifier(t: &'a TargetTable) -> Self {
        Self {
            table: &t.name,
            key: &t.key,
            key_kind: t.key_type,
            column: &t.target,
        }
    }

    /// The cursor column of a dependent table.
    pub fn cursor(dep: &'a DependentTable) -> Self {
        Self {
            table: &dep.name,
            key: &dep.key,
            key_kind: dep.key_type,
            column: &dep.cursor,
        }
    }
}

/// Counts describing how far a dependent table's cursor pass has progressed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DependentCounts {
    /// Rows with a reference but no cursor yet
    pub pending: usize,
    /// Pending rows whose reference matches no parent row
    pub orphaned: usize,
    /// Pending rows whose parent has not been assigned an identifier yet
    pub awaiting_parent: usize,
}

/// Database operations the backfill needs.
///
/// Every method is a single statement except [`apply_assignments`], which
/// runs all writes of one batch inside one transaction and rolls the whole
/// batch back on any error.
///
/// [`apply_assignments`]: IdStore::apply_assignments
#[async_trait]
pub trait IdStore: Send + Sync {
    /// Database type identifier for logging
    fn db_type(&self) -> &'static str;

    /// Execute multiple SQL statements
    async fn execute_batch(&self, sql: &str) -> DbResult<()>;

    /// Execute query returning row count
    async fn query_count(&self, sql: &str) -> DbResult<usize>;

    /// Look up a column, `None` if the table or column does not exist
    async fn column_info(&self, table: &SqlIdent, column: &SqlIdent)
        -> DbResult<Option<ColumnInfo>>;

    /// Number of rows in a table
    async fn count_total(&self, table: &SqlIdent) -> DbResult<usize>;

    /// Number of rows whose target is NULL
    async fn count_pending(&self, target: &TargetTable) -> DbResult<usize>;

    /// Number of identifier values assigned to more than one row
    async fn count_duplicates(&self, target: &TargetTable) -> DbResult<usize>;

    /// Number of rows whose identifier sorts before its predecessor in
    /// creation order
    async fn count_out_of_order(&self, target: &TargetTable) -> DbResult<usize>;

    /// Up to `limit` rows whose target is NULL, in creation order, skipping
    /// the first `offset`
    async fn fetch_pending(
        &self,
        target: &TargetTable,
        limit: usize,
        offset: usize,
    ) -> DbResult<Vec<PendingRow>>;

    /// Apply conditional writes (`SET column = id WHERE key = k AND column IS NULL`)
    /// in one transaction
    async fn apply_assignments(
        &self,
        target: WriteTarget<'_>,
        assignments: &[Assignment],
    ) -> DbResult<BatchOutcome>;

    /// Up to `limit` dependent rows that can be resolved now, ordered by key
    async fn fetch_dependent_pending(
        &self,
        dep: &DependentTable,
        parent: &TargetTable,
        limit: usize,
        offset: usize,
    ) -> DbResult<Vec<DependentRow>>;

    /// Progress counts for a dependent table
    async fn dependent_counts(
        &self,
        dep: &DependentTable,
        parent: &TargetTable,
    ) -> DbResult<DependentCounts>;
}

//! Fixtures shared by the job tests

use async_trait::async_trait;
use im_core::{
    Assignment, DependentRow, DependentTable, LegacyKey, PendingRow, SqlIdent, TargetTable,
};
use im_db::{
    BatchOutcome, ColumnInfo, DbError, DbResult, DependentCounts, DuckDbBackend, IdStore,
    WriteTarget,
};
use std::sync::Mutex;

pub fn ident(s: &str) -> SqlIdent {
    SqlIdent::parse(s).unwrap()
}

pub fn messages() -> TargetTable {
    TargetTable::new(ident("group_messages"), ident("id"), ident("public_id"))
        .with_created_at(ident("created_at"))
}

pub fn channel_members() -> DependentTable {
    DependentTable {
        name: ident("channel_members"),
        key: ident("id"),
        key_type: Default::default(),
        reference: ident("last_seen_message_id"),
        cursor: ident("last_seen_public_id"),
        parent: ident("group_messages"),
    }
}

/// Five messages; 1 and 2 share a millisecond, 3 was created after 4.
pub const MESSAGES_SQL: &str = "
    CREATE TABLE group_messages (id INTEGER PRIMARY KEY, created_at TIMESTAMP, public_id UUID);
    INSERT INTO group_messages VALUES
        (1, TIMESTAMP '2025-01-01 00:00:00.000', NULL),
        (2, TIMESTAMP '2025-01-01 00:00:00.000', NULL),
        (3, TIMESTAMP '2025-01-01 00:00:00.005', NULL),
        (4, TIMESTAMP '2025-01-01 00:00:00.003', NULL),
        (5, TIMESTAMP '2025-01-01 00:00:00.010', NULL);";

/// Creation order of the rows in [`MESSAGES_SQL`].
pub const CREATION_ORDER: [i64; 5] = [1, 2, 4, 3, 5];

pub const MEMBERS_SQL: &str = "
    CREATE TABLE channel_members (id INTEGER PRIMARY KEY, last_seen_message_id INTEGER, last_seen_public_id UUID);
    INSERT INTO channel_members VALUES (10, 1, NULL), (11, 3, NULL), (12, 99, NULL), (13, NULL, NULL);";

/// A DuckDB store that records batches and can misbehave on request.
pub struct ProbeStore {
    pub inner: DuckDbBackend,
    /// Sizes of the batches handed to `apply_assignments`
    pub batches: Mutex<Vec<usize>>,
    /// SQL run right before the first batch is applied
    pub interfere: Mutex<Option<String>>,
    /// 1-based batch number that fails without writing
    pub fail_on_batch: Option<usize>,
}

impl ProbeStore {
    pub async fn seeded(sql: &str) -> Self {
        let inner = DuckDbBackend::in_memory().unwrap();
        inner.execute_batch(sql).await.unwrap();
        Self {
            inner,
            batches: Mutex::new(Vec::new()),
            interfere: Mutex::new(None),
            fail_on_batch: None,
        }
    }

    pub async fn messages() -> Self {
        Self::seeded(MESSAGES_SQL).await
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().unwrap().clone()
    }

    /// `(id, public_id)` of every row of `table`, ordered by id
    pub fn ids(&self, table: &str, column: &str) -> Vec<(i64, Option<String>)> {
        let keys = self
            .inner
            .query_strings(&format!("SELECT CAST(id AS VARCHAR) FROM {table} ORDER BY id"))
            .unwrap();
        let values = self
            .inner
            .query_strings(&format!(
                "SELECT CAST({column} AS VARCHAR) FROM {table} ORDER BY id"
            ))
            .unwrap();
        keys.into_iter()
            .map(|k| k.unwrap().parse().unwrap())
            .zip(values)
            .collect()
    }

    pub fn public_ids(&self) -> Vec<(i64, Option<String>)> {
        self.ids("group_messages", "public_id")
    }
}

#[async_trait]
impl IdStore for ProbeStore {
    fn db_type(&self) -> &'static str {
        "probe"
    }

    async fn execute_batch(&self, sql: &str) -> DbResult<()> {
        self.inner.execute_batch(sql).await
    }

    async fn query_count(&self, sql: &str) -> DbResult<usize> {
        self.inner.query_count(sql).await
    }

    async fn column_info(
        &self,
        table: &SqlIdent,
        column: &SqlIdent,
    ) -> DbResult<Option<ColumnInfo>> {
        self.inner.column_info(table, column).await
    }

    async fn count_total(&self, table: &SqlIdent) -> DbResult<usize> {
        self.inner.count_total(table).await
    }

    async fn count_pending(&self, target: &TargetTable) -> DbResult<usize> {
        self.inner.count_pending(target).await
    }

    async fn count_duplicates(&self, target: &TargetTable) -> DbResult<usize> {
        self.inner.count_duplicates(target).await
    }

    async fn count_out_of_order(&self, target: &TargetTable) -> DbResult<usize> {
        self.inner.count_out_of_order(target).await
    }

    async fn fetch_pending(
        &self,
        target: &TargetTable,
        limit: usize,
        offset: usize,
    ) -> DbResult<Vec<PendingRow>> {
        self.inner.fetch_pending(target, limit, offset).await
    }

    async fn apply_assignments(
        &self,
        target: WriteTarget<'_>,
        assignments: &[Assignment],
    ) -> DbResult<BatchOutcome> {
        let batch = {
            let mut batches = self.batches.lock().unwrap();
            batches.push(assignments.len());
            batches.len()
        };
        if self.fail_on_batch == Some(batch) {
            return Err(DbError::ExecutionError("injected failure".to_string()));
        }
        let interfere = self.interfere.lock().unwrap().take();
        if let Some(sql) = interfere {
            self.inner.execute_batch(&sql).await?;
        }
        self.inner.apply_assignments(target, assignments).await
    }

    async fn fetch_dependent_pending(
        &self,
        dep: &DependentTable,
        parent: &TargetTable,
        limit: usize,
        offset: usize,
    ) -> DbResult<Vec<DependentRow>> {
        self.inner
            .fetch_dependent_pending(dep, parent, limit, offset)
            .await
    }

    async fn dependent_counts(
        &self,
        dep: &DependentTable,
        parent: &TargetTable,
    ) -> DbResult<DependentCounts> {
        self.inner.dependent_counts(dep, parent).await
    }
}

pub fn int_keys(keys: &[LegacyKey]) -> Vec<i64> {
    keys.iter()
        .map(|k| match k {
            LegacyKey::Int(n) => *n,
            LegacyKey::Uuid(u) => panic!("unexpected uuid key {u}"),
        })
        .collect()
}

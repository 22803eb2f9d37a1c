//! DuckDB store backend implementation

use crate::decode::{millis_to_datetime, parse_uuid, RawKey};
use crate::error::{DbError, DbResult};
use crate::sql::Dialect;
use crate::traits::{BatchOutcome, ColumnInfo, DependentCounts, IdStore, WriteTarget};
use async_trait::async_trait;
use duckdb::{params, Connection};
use im_core::{
    Assignment, DependentRow, DependentTable, KeyKind, LegacyKey, PendingRow, SqlIdent,
    TargetTable,
};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const DIALECT: Dialect = Dialect::DuckDb;

/// DuckDB store backend
pub struct DuckDbBackend {
    conn: Mutex<Connection>,
}

impl DuckDbBackend {
    /// Create a new in-memory DuckDB connection
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create a new DuckDB connection from a file path
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| DbError::ConnectionError(format!("{}: {}", e, path.display())))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path == ":memory:" {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))
    }

    fn scalar_count(&self, sql: &str) -> DbResult<usize> {
        log::debug!("{}", sql);
        let conn = self.lock()?;
        let count: i64 = conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count.max(0) as usize)
    }

    /// Query the first column of every row as optional text.
    ///
    /// Meant for inspection and tests; the SQL is executed as given.
    pub fn query_strings(&self, sql: &str) -> DbResult<Vec<Option<String>>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map([], |row| row.get::<_, Option<String>>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn read_key(row: &duckdb::Row<'_>, idx: usize, kind: KeyKind) -> duckdb::Result<RawKey> {
    match kind {
        KeyKind::Integer => row.get::<_, i64>(idx).map(RawKey::Int),
        KeyKind::Uuid => row.get::<_, String>(idx).map(RawKey::Text),
    }
}

/// Run `body` between `BEGIN TRANSACTION` and `COMMIT`, rolling back on error.
fn with_transaction<F, T>(conn: &Connection, body: F) -> DbResult<T>
where
    F: FnOnce(&Connection) -> DbResult<T>,
{
    conn.execute_batch("BEGIN TRANSACTION")
        .map_err(|e| DbError::TransactionError(format!("BEGIN failed: {e}")))?;

    let result = body(conn);

    match &result {
        Ok(_) => {
            if let Err(commit_err) = conn.execute_batch("COMMIT") {
                let _ = conn.execute_batch("ROLLBACK");
                return Err(DbError::TransactionError(format!(
                    "COMMIT failed: {commit_err}"
                )));
            }
        }
        Err(_) => {
            let _ = conn.execute_batch("ROLLBACK");
        }
    }
    result
}

#[async_trait]
impl IdStore for DuckDbBackend {
    fn db_type(&self) -> &'static str {
        "duckdb"
    }

    async fn execute_batch(&self, sql: &str) -> DbResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(sql)?;
        Ok(())
    }

    async fn query_count(&self, sql: &str) -> DbResult<usize> {
        self.scalar_count(&format!("SELECT COUNT(*) FROM ({})", sql))
    }

    async fn column_info(
        &self,
        table: &SqlIdent,
        column: &SqlIdent,
    ) -> DbResult<Option<ColumnInfo>> {
        let sql = DIALECT.column_info(table);
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = match table.schema() {
            Some(schema) => stmt.query(params![table.name(), column.as_str(), schema])?,
            None => stmt.query(params![table.name(), column.as_str()])?,
        };
        match rows.next()? {
            Some(row) => {
                let data_type: String = row.get(0)?;
                let is_nullable: String = row.get(1)?;
                Ok(Some(ColumnInfo {
                    data_type,
                    nullable: is_nullable.eq_ignore_ascii_case("YES"),
                }))
            }
            None => Ok(None),
        }
    }

    async fn count_total(&self, table: &SqlIdent) -> DbResult<usize> {
        self.scalar_count(&DIALECT.count_total(table))
    }

    async fn count_pending(&self, target: &TargetTable) -> DbResult<usize> {
        self.scalar_count(&DIALECT.count_pending(target))
    }

    async fn count_duplicates(&self, target: &TargetTable) -> DbResult<usize> {
        self.scalar_count(&DIALECT.count_duplicates(target))
    }

    async fn count_out_of_order(&self, target: &TargetTable) -> DbResult<usize> {
        self.scalar_count(&DIALECT.count_out_of_order(target))
    }

    async fn fetch_pending(
        &self,
        target: &TargetTable,
        limit: usize,
        offset: usize,
    ) -> DbResult<Vec<PendingRow>> {
        let sql = DIALECT.select_pending(target, limit, offset);
        log::debug!("{}", sql);
        let raw = {
            let conn = self.lock()?;
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((read_key(row, 0, target.key_type)?, row.get::<_, Option<i64>>(1)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        raw.into_iter()
            .map(|(key, ms)| {
                Ok(PendingRow {
                    key: key.decode(target.key.as_str())?,
                    created_at: millis_to_datetime(ms),
                })
            })
            .collect()
    }

    async fn apply_assignments(
        &self,
        target: WriteTarget<'_>,
        assignments: &[Assignment],
    ) -> DbResult<BatchOutcome> {
        let sql = DIALECT.update_if_null(target.table, target.key, target.key_kind, target.column);
        log::debug!("{} ({} rows)", sql, assignments.len());
        let conn = self.lock()?;

        with_transaction(&conn, |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let mut outcome = BatchOutcome::default();
            for a in assignments {
                let id = a.id.to_string();
                let affected = match a.key {
                    LegacyKey::Int(k) => stmt.execute(params![id, k])?,
                    LegacyKey::Uuid(u) => stmt.execute(params![id, u.to_string()])?,
                };
                if affected == 0 {
                    outcome.conflicts.push(a.key);
                } else {
                    outcome.updated += affected;
                }
            }
            Ok(outcome)
        })
    }

    async fn fetch_dependent_pending(
        &self,
        dep: &DependentTable,
        parent: &TargetTable,
        limit: usize,
        offset: usize,
    ) -> DbResult<Vec<DependentRow>> {
        let sql = DIALECT.select_dependent_pending(dep, parent, limit, offset);
        log::debug!("{}", sql);
        let raw = {
            let conn = self.lock()?;
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((read_key(row, 0, dep.key_type)?, row.get::<_, String>(1)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        raw.into_iter()
            .map(|(key, parent_id)| {
                Ok(DependentRow {
                    key: key.decode(dep.key.as_str())?,
                    parent_id: parse_uuid(parent.target.as_str(), &parent_id)?,
                })
            })
            .collect()
    }

    async fn dependent_counts(
        &self,
        dep: &DependentTable,
        parent: &TargetTable,
    ) -> DbResult<DependentCounts> {
        Ok(DependentCounts {
            pending: self.scalar_count(&DIALECT.count_dependent_pending(dep))?,
            orphaned: self.scalar_count(&DIALECT.count_dependent_orphaned(dep, parent))?,
            awaiting_parent: self.scalar_count(&DIALECT.count_dependent_awaiting(dep, parent))?,
        })
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;

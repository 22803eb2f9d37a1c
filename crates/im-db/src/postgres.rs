//! PostgreSQL store backend implementation

use crate::decode::{millis_to_datetime, parse_uuid, RawKey};
use crate::error::{DbError, DbResult};
use crate::sql::Dialect;
use crate::traits::{BatchOutcome, ColumnInfo, DependentCounts, IdStore, WriteTarget};
use async_trait::async_trait;
use im_core::{
    Assignment, DependentRow, DependentTable, KeyKind, LegacyKey, PendingRow, SqlIdent,
    TargetTable,
};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::time::Duration;

const DIALECT: Dialect = Dialect::Postgres;

/// PostgreSQL store backend.
///
/// Holds a single-connection pool: the backfill is strictly sequential and
/// each batch borrows the connection for exactly one transaction.
pub struct PostgresBackend {
    pool: PgPool,
}

impl PostgresBackend {
    /// Connect to a `postgres://` URL
    pub async fn connect(url: &str) -> DbResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(10))
            .connect(url)
            .await
            .map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self { pool })
    }

    async fn scalar_count(&self, sql: &str) -> DbResult<usize> {
        log::debug!("{}", sql);
        let count: i64 = sqlx::query_scalar(sql).fetch_one(&self.pool).await?;
        Ok(count.max(0) as usize)
    }
}

fn read_key(row: &PgRow, idx: usize, kind: KeyKind) -> DbResult<RawKey> {
    Ok(match kind {
        KeyKind::Integer => RawKey::Int(row.try_get::<i64, _>(idx)?),
        KeyKind::Uuid => RawKey::Text(row.try_get::<String, _>(idx)?),
    })
}

#[async_trait]
impl IdStore for PostgresBackend {
    fn db_type(&self) -> &'static str {
        "postgres"
    }

    async fn execute_batch(&self, sql: &str) -> DbResult<()> {
        sqlx::raw_sql(sql).execute(&self.pool).await?;
        Ok(())
    }

    async fn query_count(&self, sql: &str) -> DbResult<usize> {
        self.scalar_count(&format!("SELECT COUNT(*) FROM ({}) AS q", sql))
            .await
    }

    async fn column_info(
        &self,
        table: &SqlIdent,
        column: &SqlIdent,
    ) -> DbResult<Option<ColumnInfo>> {
        let sql = DIALECT.column_info(table);
        let mut query = sqlx::query(&sql).bind(table.name()).bind(column.as_str());
        if let Some(schema) = table.schema() {
            query = query.bind(schema);
        }
        let row = query.fetch_optional(&self.pool).await?;
        match row {
            Some(row) => {
                let data_type: String = row.try_get(0)?;
                let is_nullable: String = row.try_get(1)?;
                Ok(Some(ColumnInfo {
                    data_type,
                    nullable: is_nullable.eq_ignore_ascii_case("YES"),
                }))
            }
            None => Ok(None),
        }
    }

    async fn count_total(&self, table: &SqlIdent) -> DbResult<usize> {
        self.scalar_count(&DIALECT.count_total(table)).await
    }

    async fn count_pending(&self, target: &TargetTable) -> DbResult<usize> {
        self.scalar_count(&DIALECT.count_pending(target)).await
    }

    async fn count_duplicates(&self, target: &TargetTable) -> DbResult<usize> {
        self.scalar_count(&DIALECT.count_duplicates(target)).await
    }

    async fn count_out_of_order(&self, target: &TargetTable) -> DbResult<usize> {
        self.scalar_count(&DIALECT.count_out_of_order(target)).await
    }

    async fn fetch_pending(
        &self,
        target: &TargetTable,
        limit: usize,
        offset: usize,
    ) -> DbResult<Vec<PendingRow>> {
        let sql = DIALECT.select_pending(target, limit, offset);
        log::debug!("{}", sql);
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| {
                let key = read_key(row, 0, target.key_type)?.decode(target.key.as_str())?;
                let ms: Option<i64> = row.try_get(1)?;
                Ok(PendingRow {
                    key,
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

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionError(format!("BEGIN failed: {e}")))?;

        let mut outcome = BatchOutcome::default();
        for a in assignments {
            let query = sqlx::query(&sql).bind(a.id.to_string());
            let query = match a.key {
                LegacyKey::Int(k) => query.bind(k),
                LegacyKey::Uuid(u) => query.bind(u.to_string()),
            };
            // Dropping `tx` on error rolls the batch back
            let affected = query.execute(&mut *tx).await?.rows_affected();
            if affected == 0 {
                outcome.conflicts.push(a.key);
            } else {
                outcome.updated += affected as usize;
            }
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionError(format!("COMMIT failed: {e}")))?;
        Ok(outcome)
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
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| {
                let key = read_key(row, 0, dep.key_type)?.decode(dep.key.as_str())?;
                let parent_id: String = row.try_get(1)?;
                Ok(DependentRow {
                    key,
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
            pending: self
                .scalar_count(&DIALECT.count_dependent_pending(dep))
                .await?,
            orphaned: self
                .scalar_count(&DIALECT.count_dependent_orphaned(dep, parent))
                .await?,
            awaiting_parent: self
                .scalar_count(&DIALECT.count_dependent_awaiting(dep, parent))
                .await?,
        })
    }
}

#[cfg(test)]
#[path = "postgres_test.rs"]
mod tests;

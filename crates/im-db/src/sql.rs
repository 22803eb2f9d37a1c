//! SQL text for the backfill statements.
//!
//! Both backends run the same statements; only placeholder syntax and the
//! epoch-milliseconds expression differ. Identifiers come in as validated
//! [`SqlIdent`]s and are always quoted. Values are always bound, except
//! `LIMIT`/`OFFSET` which are formatted from integers.
//!
//! UUID values cross the driver boundary as text (`CAST(.. AS VARCHAR)` on
//! the way out, `CAST(? AS UUID)` on the way in) so neither driver needs a
//! native UUID mapping.

use im_core::{DependentTable, KeyKind, SqlIdent, TargetTable};

/// SQL dialect of a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// `?` placeholders, `epoch_ms()`
    DuckDb,
    /// `$n` placeholders, `FLOOR(EXTRACT(EPOCH FROM ..) * 1000)`
    Postgres,
}

impl Dialect {
    /// Placeholder for the `n`th (1-based) bound parameter.
    fn param(self, n: usize) -> String {
        match self {
            Dialect::DuckDb => "?".to_string(),
            Dialect::Postgres => format!("${}", n),
        }
    }

    fn uuid_param(self, n: usize) -> String {
        format!("CAST({} AS UUID)", self.param(n))
    }

    fn key_param(self, kind: KeyKind, n: usize) -> String {
        match kind {
            KeyKind::Integer => self.param(n),
            KeyKind::Uuid => self.uuid_param(n),
        }
    }

    fn key_select(self, kind: KeyKind, expr: &str) -> String {
        match kind {
            KeyKind::Integer => format!("CAST({} AS BIGINT)", expr),
            KeyKind::Uuid => format!("CAST({} AS VARCHAR)", expr),
        }
    }

    fn epoch_ms(self, expr: &str) -> String {
        match self {
            Dialect::DuckDb => format!("CAST(epoch_ms({}) AS BIGINT)", expr),
            // Truncate like epoch_ms(); a plain cast to BIGINT rounds
            Dialect::Postgres => {
                format!("CAST(FLOOR(EXTRACT(EPOCH FROM {}) * 1000) AS BIGINT)", expr)
            }
        }
    }

    /// Look up a column's type and nullability.
    ///
    /// Binds `(table_name, column_name)` and, when `table` is
    /// schema-qualified, the schema as a third parameter.
    pub fn column_info(self, table: &SqlIdent) -> String {
        let schema = match table.schema() {
            Some(_) => self.param(3),
            None => "current_schema()".to_string(),
        };
        format!(
            "SELECT CAST(data_type AS VARCHAR), CAST(is_nullable AS VARCHAR) \
             FROM information_schema.columns \
             WHERE table_name = {} AND column_name = {} AND table_schema = {}",
            self.param(1),
            self.param(2),
            schema
        )
    }

    /// Ordering that makes assigned timestamps follow creation order.
    fn pending_order(self, t: &TargetTable) -> String {
        match &t.created_at {
            Some(c) => format!("{} ASC NULLS LAST, {} ASC", c.quoted(), t.key.quoted()),
            None => format!("{} ASC", t.key.quoted()),
        }
    }

    /// Rows whose target is NULL, as `(key, created_at_ms)`.
    pub fn select_pending(self, t: &TargetTable, limit: usize, offset: usize) -> String {
        let created = match &t.created_at {
            Some(c) => self.epoch_ms(&c.quoted()),
            None => "CAST(NULL AS BIGINT)".to_string(),
        };
        format!(
            "SELECT {}, {} FROM {} WHERE {} IS NULL ORDER BY {} LIMIT {} OFFSET {}",
            self.key_select(t.key_type, &t.key.quoted()),
            created,
            t.name.quoted(),
            t.target.quoted(),
            self.pending_order(t),
            limit,
            offset
        )
    }

    /// Conditional write binding `(new_id, key)`.
    pub fn update_if_null(
        self,
        table: &SqlIdent,
        key: &SqlIdent,
        key_kind: KeyKind,
        target: &SqlIdent,
    ) -> String {
        format!(
            "UPDATE {} SET {} = {} WHERE {} = {} AND {} IS NULL",
            table.quoted(),
            target.quoted(),
            self.uuid_param(1),
            key.quoted(),
            self.key_param(key_kind, 2),
            target.quoted()
        )
    }

    /// Row count of a table.
    pub fn count_total(self, table: &SqlIdent) -> String {
        format!("SELECT COUNT(*) FROM {}", table.quoted())
    }

    /// Rows still lacking an identifier.
    pub fn count_pending(self, t: &TargetTable) -> String {
        format!(
            "SELECT COUNT(*) FROM {} WHERE {} IS NULL",
            t.name.quoted(),
            t.target.quoted()
        )
    }

    /// Identifier values held by more than one row.
    pub fn count_duplicates(self, t: &TargetTable) -> String {
        format!(
            "SELECT COUNT(*) FROM (SELECT {target} FROM {table} WHERE {target} IS NOT NULL \
             GROUP BY {target} HAVING COUNT(*) > 1) AS dup",
            target = t.target.quoted(),
            table = t.name.quoted()
        )
    }

    /// Rows whose identifier sorts before the previous row's in creation order.
    pub fn count_out_of_order(self, t: &TargetTable) -> String {
        format!(
            "SELECT COUNT(*) FROM (SELECT CAST({target} AS VARCHAR) AS cur, \
             CAST(LAG({target}) OVER (ORDER BY {order}) AS VARCHAR) AS prev \
             FROM {table} WHERE {target} IS NOT NULL) AS ordered \
             WHERE prev IS NOT NULL AND cur < prev",
            target = t.target.quoted(),
            order = self.pending_order(t),
            table = t.name.quoted()
        )
    }

    /// Dependent rows whose cursor is NULL and whose parent already carries
    /// an identifier, as `(dependent_key, parent_id)`.
    pub fn select_dependent_pending(
        self,
        dep: &DependentTable,
        parent: &TargetTable,
        limit: usize,
        offset: usize,
    ) -> String {
        format!(
            "SELECT {}, CAST(p.{} AS VARCHAR) FROM {} AS d JOIN {} AS p ON p.{} = d.{} \
             WHERE d.{} IS NULL AND p.{} IS NOT NULL ORDER BY d.{} ASC LIMIT {} OFFSET {}",
            self.key_select(dep.key_type, &format!("d.{}", dep.key.quoted())),
            parent.target.quoted(),
            dep.name.quoted(),
            parent.name.quoted(),
            parent.key.quoted(),
            dep.reference.quoted(),
            dep.cursor.quoted(),
            parent.target.quoted(),
            dep.key.quoted(),
            limit,
            offset
        )
    }

    /// Dependent rows with a reference but no cursor yet.
    pub fn count_dependent_pending(self, dep: &DependentTable) -> String {
        format!(
            "SELECT COUNT(*) FROM {} WHERE {} IS NULL AND {} IS NOT NULL",
            dep.name.quoted(),
            dep.cursor.quoted(),
            dep.reference.quoted()
        )
    }

    /// Dependent rows whose reference matches no parent row at all.
    pub fn count_dependent_orphaned(self, dep: &DependentTable, parent: &TargetTable) -> String {
        format!(
            "SELECT COUNT(*) FROM {} AS d WHERE d.{} IS NULL AND d.{} IS NOT NULL \
             AND NOT EXISTS (SELECT 1 FROM {} AS p WHERE p.{} = d.{})",
            dep.name.quoted(),
            dep.cursor.quoted(),
            dep.reference.quoted(),
            parent.name.quoted(),
            parent.key.quoted(),
            dep.reference.quoted()
        )
    }

    /// Dependent rows whose parent exists but has no identifier yet.
    pub fn count_dependent_awaiting(self, dep: &DependentTable, parent: &TargetTable) -> String {
        format!(
            "SELECT COUNT(*) FROM {} AS d JOIN {} AS p ON p.{} = d.{} \
             WHERE d.{} IS NULL AND p.{} IS NULL",
            dep.name.quoted(),
            parent.name.quoted(),
            parent.key.quoted(),
            dep.reference.quoted(),
            dep.cursor.quoted(),
            parent.target.quoted()
        )
    }
}

#[cfg(test)]
#[path = "sql_test.rs"]
mod tests;

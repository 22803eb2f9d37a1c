//! Column checks run before any row is read

use crate::error::{JobError, JobResult};
use im_core::{DependentTable, KeyKind, SqlIdent, TargetTable};
use im_db::{ColumnInfo, IdStore};

async fn require_column(
    store: &dyn IdStore,
    table: &SqlIdent,
    column: &SqlIdent,
) -> JobResult<ColumnInfo> {
    store
        .column_info(table, column)
        .await?
        .ok_or_else(|| JobError::schema(table, format!("column '{}' does not exist", column)))
}

fn require_kind(
    table: &SqlIdent,
    column: &SqlIdent,
    info: &ColumnInfo,
    expected: KeyKind,
) -> JobResult<()> {
    let found = KeyKind::from_data_type(&info.data_type).map_err(|_| {
        JobError::schema(
            table,
            format!(
                "column '{}' has type {}, expected {}",
                column, info.data_type, expected
            ),
        )
    })?;
    if found != expected {
        return Err(JobError::schema(
            table,
            format!(
                "column '{}' has type {}, expected {}",
                column, info.data_type, expected
            ),
        ));
    }
    Ok(())
}

/// Key, target and creation columns of a target table exist with usable types.
pub(crate) async fn check_target(store: &dyn IdStore, t: &TargetTable) -> JobResult<()> {
    let target = require_column(store, &t.name, &t.target).await?;
    require_kind(&t.name, &t.target, &target, KeyKind::Uuid)?;
    if !target.nullable {
        log::debug!(
            "{}.{} is already NOT NULL; nothing can be pending",
            t.name,
            t.target
        );
    }

    let key = require_column(store, &t.name, &t.key).await?;
    require_kind(&t.name, &t.key, &key, t.key_type)?;

    if let Some(created_at) = &t.created_at {
        require_column(store, &t.name, created_at).await?;
    }
    Ok(())
}

/// Columns of a dependent table and its parent's identifier column exist.
pub(crate) async fn check_dependent(
    store: &dyn IdStore,
    dep: &DependentTable,
    parent: &TargetTable,
) -> JobResult<()> {
    let parent_target = require_column(store, &parent.name, &parent.target).await?;
    require_kind(&parent.name, &parent.target, &parent_target, KeyKind::Uuid)?;

    let key = require_column(store, &dep.name, &dep.key).await?;
    require_kind(&dep.name, &dep.key, &key, dep.key_type)?;

    let reference = require_column(store, &dep.name, &dep.reference).await?;
    require_kind(&dep.name, &dep.reference, &reference, parent.key_type)?;

    let cursor = require_column(store, &dep.name, &dep.cursor).await?;
    require_kind(&dep.name, &dep.cursor, &cursor, KeyKind::Uuid)?;
    Ok(())
}

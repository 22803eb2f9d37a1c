//! Status command implementation

use anyhow::Result;
use im_db::DependentCounts;
use serde::Serialize;

use crate::cli::{GlobalArgs, TableArgs};
use crate::commands::common::print_json;
use crate::context::RuntimeContext;

#[derive(Debug, Serialize)]
struct TableStatus {
    table: String,
    total: usize,
    assigned: usize,
    pending: usize,
    duplicates: usize,
}

#[derive(Debug, Serialize)]
struct DependentStatus {
    table: String,
    parent: String,
    #[serde(flatten)]
    counts: DependentCountsJson,
}

#[derive(Debug, Serialize)]
struct DependentCountsJson {
    pending: usize,
    orphaned: usize,
    awaiting_parent: usize,
}

impl From<DependentCounts> for DependentCountsJson {
    fn from(c: DependentCounts) -> Self {
        Self {
            pending: c.pending,
            orphaned: c.orphaned,
            awaiting_parent: c.awaiting_parent,
        }
    }
}

#[derive(Debug, Serialize)]
struct StatusReport {
    tables: Vec<TableStatus>,
    dependents: Vec<DependentStatus>,
    /// No configured table has a NULL or duplicated identifier left
    ready: bool,
}

/// Execute the status command
pub async fn execute(args: &TableArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = RuntimeContext::new(global, args.table.as_deref()).await?;
    let report = collect(&ctx).await?;

    if global.json {
        return print_json(&report);
    }

    println!(
        "{:<32} {:>12} {:>12} {:>12} {:>12}",
        "TABLE", "TOTAL", "ASSIGNED", "PENDING", "DUPLICATES"
    );
    for t in &report.tables {
        println!(
            "{:<32} {:>12} {:>12} {:>12} {:>12}",
            t.table, t.total, t.assigned, t.pending, t.duplicates
        );
    }
    for d in &report.dependents {
        println!(
            "{:<32} cursors pending {} ({} orphaned, {} awaiting {})",
            d.table, d.counts.pending, d.counts.orphaned, d.counts.awaiting_parent, d.parent
        );
    }
    if report.ready {
        println!("Ready to finalize: every identifier is assigned and unique");
    } else if report.tables.iter().any(|t| t.duplicates > 0) {
        println!("Not ready to finalize: duplicate identifiers, see `idmig verify`");
    } else {
        println!("Not ready to finalize: run `idmig backfill`");
    }
    Ok(())
}

async fn collect(ctx: &RuntimeContext) -> Result<StatusReport> {
    let store = ctx.store.as_ref();
    let mut tables = Vec::new();
    for t in &ctx.config.tables {
        let total = store.count_total(&t.name).await?;
        let pending = store.count_pending(t).await?;
        tables.push(TableStatus {
            table: t.name.to_string(),
            total,
            assigned: total.saturating_sub(pending),
            pending,
            duplicates: store.count_duplicates(t).await?,
        });
    }

    let mut dependents = Vec::new();
    for dep in &ctx.config.dependents {
        let Some(parent) = ctx.config.parent_of(dep) else {
            continue;
        };
        dependents.push(DependentStatus {
            table: dep.name.to_string(),
            parent: parent.name.to_string(),
            counts: store.dependent_counts(dep, parent).await?.into(),
        });
    }

    let ready = tables.iter().all(|t| t.pending == 0 && t.duplicates == 0);
    Ok(StatusReport {
        tables,
        dependents,
        ready,
    })
}

//! Backfill command implementation

use anyhow::{Context, Result};
use im_backfill::{BackfillJob, BackfillOptions, DependentSummary, Summary};
use serde::Serialize;
use std::io::IsTerminal;

use crate::cli::{BackfillArgs, GlobalArgs};
use crate::commands::common::{print_json, BarProgress};
use crate::context::RuntimeContext;

/// Everything one `idmig backfill` invocation did
#[derive(Debug, Serialize)]
struct BackfillReport {
    tables: Vec<Summary>,
    dependents: Vec<DependentSummary>,
}

/// Execute the backfill command
pub async fn execute(args: &BackfillArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = RuntimeContext::new(global, args.table.as_deref()).await?;
    let options = options_for(args, &ctx)?;

    let progress = BarProgress::new(!global.json && std::io::stderr().is_terminal());
    let mut job = BackfillJob::new(ctx.store.as_ref()).with_observer(&progress);
    let mut report = BackfillReport {
        tables: Vec::new(),
        dependents: Vec::new(),
    };

    for table in &ctx.config.tables {
        let summary = job
            .run(table, &options)
            .await
            .with_context(|| format!("Backfill of {} failed", table.name))?;
        if !global.json {
            print_summary(&summary);
        }
        report.tables.push(summary);

        if args.skip_dependents {
            continue;
        }
        for dep in ctx.config.dependents_of(table.name.as_str()) {
            let summary = job
                .resolve_dependents(dep, table, &options)
                .await
                .with_context(|| format!("Resolving cursors of {} failed", dep.name))?;
            if !global.json {
                print_dependent_summary(&summary);
            }
            report.dependents.push(summary);
        }
    }

    if global.json {
        print_json(&report)?;
    }
    Ok(())
}

/// Options from the config file, overridden by flags
fn options_for(args: &BackfillArgs, ctx: &RuntimeContext) -> Result<BackfillOptions> {
    let mut options = BackfillOptions::from_config(&ctx.config);
    if let Some(batch_size) = args.batch_size {
        options.batch_size = batch_size;
    }
    if let Some(sample_size) = args.sample_size {
        options.sample_size = sample_size;
    }
    options.dry_run = args.dry_run;
    options.max_batches = args.max_batches;
    options.validate()?;
    Ok(options)
}

fn print_summary(summary: &Summary) {
    if summary.dry_run {
        println!(
            "{}: dry run, would update {} rows ({} already assigned)",
            summary.table, summary.pending_before, summary.already_assigned
        );
        for a in &summary.sample {
            println!("  {:>12} -> {}", a.key.to_string(), a.id);
        }
        return;
    }

    println!(
        "{}: {} updated, {} skipped, {} batches in {:.2}s",
        summary.table,
        summary.rows_updated,
        summary.rows_skipped,
        summary.batches,
        summary.elapsed.as_secs_f64()
    );
    if summary.complete {
        println!("  complete: every row has an identifier");
    } else {
        println!("  {} rows remaining; run again to continue", summary.remaining);
    }
}

fn print_dependent_summary(summary: &DependentSummary) {
    if summary.dry_run {
        println!(
            "{}: dry run, {} cursors pending ({} orphaned, {} awaiting {})",
            summary.table,
            summary.pending_before,
            summary.orphaned,
            summary.awaiting_parent,
            summary.parent
        );
        return;
    }
    println!(
        "{}: {} cursors resolved, {} unresolved ({} orphaned, {} awaiting {})",
        summary.table,
        summary.rows_updated,
        summary.unresolved,
        summary.orphaned,
        summary.awaiting_parent,
        summary.parent
    );
}

#[cfg(test)]
#[path = "backfill_test.rs"]
mod tests;

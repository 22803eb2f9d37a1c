//! Verify command implementation

use anyhow::{Context, Result};
use im_backfill::{BackfillJob, VerifyReport};
use serde::Serialize;

use crate::cli::{GlobalArgs, TableArgs};
use crate::commands::common::{print_json, ExitCode, EXIT_FAILURE};
use crate::context::RuntimeContext;

#[derive(Debug, Serialize)]
struct VerifyOutput {
    #[serde(flatten)]
    report: VerifyReport,
    ready_to_finalize: bool,
    ordered: bool,
}

/// Execute the verify command.
///
/// Exits with code 1 when any table still has NULL or duplicate identifiers.
pub async fn execute(args: &TableArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = RuntimeContext::new(global, args.table.as_deref()).await?;
    let job = BackfillJob::new(ctx.store.as_ref());

    let mut outputs = Vec::new();
    for table in &ctx.config.tables {
        let report = job
            .verify(table)
            .await
            .with_context(|| format!("Verification of {} failed", table.name))?;
        outputs.push(VerifyOutput {
            ready_to_finalize: report.ready_to_finalize(),
            ordered: report.is_ordered(),
            report,
        });
    }

    if global.json {
        print_json(&outputs)?;
    } else {
        for o in &outputs {
            print_report(o);
        }
    }

    if outputs.iter().all(|o| o.ready_to_finalize) {
        Ok(())
    } else {
        Err(ExitCode(EXIT_FAILURE).into())
    }
}

fn print_report(o: &VerifyOutput) {
    let r = &o.report;
    let mark = if o.ready_to_finalize { "✓" } else { "✗" };
    println!(
        "{} {}: {} rows, {} NULL, {} duplicate, {} out of order",
        mark, r.table, r.total, r.nulls, r.duplicates, r.out_of_order
    );
    if !o.ordered {
        println!("  identifier order differs from creation order (informational)");
    }
}

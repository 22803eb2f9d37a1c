//! Dependent-cursor pass
//!
//! Copies a parent's new identifier into cursor columns that still point at
//! the parent's legacy key. Only rows whose parent already carries an
//! identifier are selected, so references to missing parents stay NULL and
//! are reported rather than retried.

use crate::error::{JobError, JobResult};
use crate::job::BackfillJob;
use crate::options::BackfillOptions;
use crate::progress::BatchProgress;
use crate::schema;
use crate::summary::DependentSummary;
use im_core::{Assignment, DependentTable, TargetTable};
use im_db::WriteTarget;
use std::time::Instant;

impl BackfillJob<'_> {
    /// Resolve the cursor column of `dep` against `parent`.
    pub async fn resolve_dependents(
        &mut self,
        dep: &DependentTable,
        parent: &TargetTable,
        options: &BackfillOptions,
    ) -> JobResult<DependentSummary> {
        options.validate()?;
        if dep.parent != parent.name.as_str() {
            return Err(JobError::InvalidOptions(format!(
                "dependent '{}' belongs to '{}', not '{}'",
                dep.name, dep.parent, parent.name
            )));
        }
        let started = Instant::now();
        schema::check_dependent(self.store, dep, parent).await?;

        let parent_pending = self.store.count_pending(parent).await?;
        if parent_pending > 0 {
            log::warn!(
                "{}: parent {} still has {} rows without an identifier; resolving what is possible",
                dep.name,
                parent.name,
                parent_pending
            );
        }

        let mut summary =
            DependentSummary::new(dep.name.as_str(), parent.name.as_str(), options.dry_run);
        let before = self.store.dependent_counts(dep, parent).await?;
        summary.pending_before = before.pending;

        if options.dry_run {
            let resolvable = before
                .pending
                .saturating_sub(before.orphaned + before.awaiting_parent);
            log::info!(
                "{}: dry run, would resolve {} of {} cursors",
                dep.name,
                resolvable,
                before.pending
            );
        } else {
            self.observer.on_start(dep.name.as_str(), before.pending);
            let written = self
                .write_dependent_batches(dep, parent, options, &mut summary)
                .await;
            self.observer.on_finish(dep.name.as_str());
            written?;
        }

        let after = if options.dry_run {
            before
        } else {
            self.store.dependent_counts(dep, parent).await?
        };
        summary.unresolved = after.pending;
        summary.orphaned = after.orphaned;
        summary.awaiting_parent = after.awaiting_parent;
        summary.elapsed = started.elapsed();

        if after.orphaned > 0 {
            log::warn!(
                "{}: {} cursors reference rows missing from {} and stay NULL",
                dep.name,
                after.orphaned,
                parent.name
            );
        }
        if after.awaiting_parent > 0 && !options.dry_run {
            log::warn!(
                "{}: {} cursors wait for {} to be backfilled",
                dep.name,
                after.awaiting_parent,
                parent.name
            );
        }
        log::info!(
            "{}: {} cursors resolved, {} unresolved",
            dep.name,
            summary.rows_updated,
            summary.unresolved
        );
        Ok(summary)
    }

    async fn write_dependent_batches(
        &mut self,
        dep: &DependentTable,
        parent: &TargetTable,
        options: &BackfillOptions,
        summary: &mut DependentSummary,
    ) -> JobResult<()> {
        loop {
            if options.batch_limit_reached(summary.batches) {
                break;
            }

            let rows = self
                .store
                .fetch_dependent_pending(dep, parent, options.batch_size, 0)
                .await?;
            let (first, last) = match (rows.first(), rows.last()) {
                (Some(first), Some(last)) => (first.key, last.key),
                _ => break,
            };
            let batch = summary.batches + 1;
            let assignments: Vec<Assignment> = rows
                .iter()
                .map(|row| Assignment {
                    key: row.key,
                    id: row.parent_id,
                })
                .collect();

            let outcome = self
                .store
                .apply_assignments(WriteTarget::cursor(dep), &assignments)
                .await
                .map_err(|source| JobError::BatchWrite {
                    batch,
                    first_key: first,
                    last_key: last,
                    source,
                })?;

            for key in &outcome.conflicts {
                log::info!("{}: cursor of row {} already set, skipped", dep.name, key);
            }

            summary.batches = batch;
            summary.rows_scanned += rows.len();
            summary.rows_updated += outcome.updated;
            summary.rows_skipped += outcome.conflicts.len();

            log::info!(
                "{}: batch {} committed, {} of {} cursors resolved",
                dep.name,
                batch,
                summary.rows_updated,
                summary.pending_before
            );
            self.observer.on_batch(&BatchProgress {
                table: dep.name.as_str(),
                batch,
                rows_in_batch: outcome.updated,
                rows_done: summary.rows_updated,
                rows_total: summary.pending_before,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "dependents_test.rs"]
mod tests;

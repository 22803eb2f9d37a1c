//! Primary backfill pass
//!
//! Each batch selects the oldest rows whose identifier is still NULL, derives
//! a UUIDv7 from each row's creation time, and writes the whole batch in one
//! transaction with conditional updates. The NULL predicate is the only
//! checkpoint: an interrupted run resumes by running again.

use crate::error::{JobError, JobResult};
use crate::options::BackfillOptions;
use crate::progress::{BatchProgress, NoProgress, ProgressObserver};
use crate::schema;
use crate::summary::Summary;
use im_core::{Assignment, PendingRow, TargetTable, UuidV7Generator};
use im_db::{IdStore, WriteTarget};
use std::time::Instant;

/// The identifier migration job.
///
/// Holds one generator for its lifetime so identifiers stay strictly
/// increasing across batches of the same run.
pub struct BackfillJob<'a> {
    pub(crate) store: &'a dyn IdStore,
    pub(crate) generator: UuidV7Generator,
    pub(crate) observer: &'a dyn ProgressObserver,
}

impl<'a> BackfillJob<'a> {
    pub fn new(store: &'a dyn IdStore) -> Self {
        Self {
            store,
            generator: UuidV7Generator::new(),
            observer: &NoProgress,
        }
    }

    /// Report batch progress to `observer`
    pub fn with_observer(mut self, observer: &'a dyn ProgressObserver) -> Self {
        self.observer = observer;
        self
    }

    /// Backfill the identifier column of `target`.
    ///
    /// Runs until no pending row is left, `max_batches` batches have been
    /// committed, or (dry run) the sample is full. A failed batch is rolled
    /// back and reported as [`JobError::BatchWrite`]; batches before it stay
    /// committed.
    pub async fn run(
        &mut self,
        target: &TargetTable,
        options: &BackfillOptions,
    ) -> JobResult<Summary> {
        options.validate()?;
        let started = Instant::now();
        schema::check_target(self.store, target).await?;

        let total = self.store.count_total(&target.name).await?;
        let pending_before = self.store.count_pending(target).await?;

        let mut summary = Summary::new(target.name.as_str(), options.dry_run);
        summary.pending_before = pending_before;
        summary.already_assigned = total.saturating_sub(pending_before);

        log::info!(
            "{}: {} rows total, {} already assigned, {} pending",
            target.name,
            total,
            summary.already_assigned,
            pending_before
        );

        if options.dry_run {
            self.dry_run(target, options, &mut summary).await?;
        } else {
            self.observer.on_start(target.name.as_str(), pending_before);
            let written = self.write_batches(target, options, &mut summary).await;
            self.observer.on_finish(target.name.as_str());
            written?;
            summary.remaining = self.store.count_pending(target).await?;
        }

        summary.complete = summary.remaining == 0;
        summary.elapsed = started.elapsed();
        log::info!(
            "{}: {} updated, {} skipped in {} batches ({} remaining, {:.2}s)",
            target.name,
            summary.rows_updated,
            summary.rows_skipped,
            summary.batches,
            summary.remaining,
            summary.elapsed.as_secs_f64()
        );
        Ok(summary)
    }

    fn assign(&mut self, rows: &[PendingRow]) -> Vec<Assignment> {
        rows.iter()
            .map(|row| Assignment {
                key: row.key,
                id: self.generator.generate_for(row.created_at),
            })
            .collect()
    }

    async fn write_batches(
        &mut self,
        target: &TargetTable,
        options: &BackfillOptions,
        summary: &mut Summary,
    ) -> JobResult<()> {
        loop {
            if options.batch_limit_reached(summary.batches) {
                log::info!(
                    "{}: stopping after {} batches as requested",
                    target.name,
                    summary.batches
                );
                break;
            }

            let rows = self.store.fetch_pending(target, options.batch_size, 0).await?;
            let (first, last) = match (rows.first(), rows.last()) {
                (Some(first), Some(last)) => (first.key, last.key),
                _ => break,
            };
            let batch = summary.batches + 1;
            let assignments = self.assign(&rows);

            let outcome = self
                .store
                .apply_assignments(WriteTarget::identifier(target), &assignments)
                .await
                .map_err(|source| JobError::BatchWrite {
                    batch,
                    first_key: first,
                    last_key: last,
                    source,
                })?;

            for key in &outcome.conflicts {
                log::info!(
                    "{}: row {} was assigned concurrently, skipped",
                    target.name,
                    key
                );
            }

            summary.batches = batch;
            summary.rows_scanned += rows.len();
            summary.rows_updated += outcome.updated;
            summary.rows_skipped += outcome.conflicts.len();
            summary.conflicts.extend(outcome.conflicts);

            log::info!(
                "{}: batch {} committed (keys {}..={}), {} of {} rows migrated",
                target.name,
                batch,
                first,
                last,
                summary.rows_updated,
                summary.pending_before
            );
            self.observer.on_batch(&BatchProgress {
                table: target.name.as_str(),
                batch,
                rows_in_batch: outcome.updated,
                rows_done: summary.rows_updated,
                rows_total: summary.pending_before,
            });
        }
        Ok(())
    }

    async fn dry_run(
        &mut self,
        target: &TargetTable,
        options: &BackfillOptions,
        summary: &mut Summary,
    ) -> JobResult<()> {
        // Nothing is written, so offset paging sees a stable pending set
        let mut offset = 0;
        while summary.sample.len() < options.sample_size {
            let limit = options
                .batch_size
                .min(options.sample_size - summary.sample.len());
            let rows = self.store.fetch_pending(target, limit, offset).await?;
            if rows.is_empty() {
                break;
            }
            offset += rows.len();
            summary.rows_scanned += rows.len();
            let assignments = self.assign(&rows);
            summary.sample.extend(assignments);
        }

        for a in &summary.sample {
            log::info!("{}: would assign {} -> {}", target.name, a.key, a.id);
        }
        summary.remaining = summary.pending_before;
        log::info!(
            "{}: dry run, would update {} rows",
            target.name,
            summary.pending_before
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "job_test.rs"]
mod tests;

//! Shared helpers for CLI commands

use im_backfill::{BatchProgress, JobError, ProgressObserver};
use im_db::DbError;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::cell::RefCell;
use std::fmt;

/// Structured exit code error.
///
/// Use `return Err(ExitCode(N).into())` instead of `std::process::exit(N)`
/// so that RAII destructors run and cleanup happens properly.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Control flow only; main prints nothing for it
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// Verification failed or any error without a more specific code
pub(crate) const EXIT_FAILURE: i32 = 1;
/// The database could not be reached
pub(crate) const EXIT_CONNECTION: i32 = 2;
/// A configured table or column is missing or mistyped
pub(crate) const EXIT_SCHEMA: i32 = 3;
/// A batch was rolled back
pub(crate) const EXIT_BATCH_WRITE: i32 = 4;

/// Process exit code for an error returned by a command.
pub(crate) fn exit_code_for(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if let Some(ExitCode(code)) = cause.downcast_ref::<ExitCode>() {
            return *code;
        }
        if let Some(job) = cause.downcast_ref::<JobError>() {
            return match job {
                JobError::Connection(_) => EXIT_CONNECTION,
                JobError::Schema { .. } => EXIT_SCHEMA,
                JobError::BatchWrite { .. } => EXIT_BATCH_WRITE,
                JobError::InvalidOptions(_) | JobError::Query(_) => EXIT_FAILURE,
            };
        }
        if let Some(db) = cause.downcast_ref::<DbError>() {
            return match db {
                e if e.is_connection() => EXIT_CONNECTION,
                DbError::TableNotFound(_) => EXIT_SCHEMA,
                _ => EXIT_FAILURE,
            };
        }
    }
    EXIT_FAILURE
}

/// Print a value as pretty JSON on stdout.
pub(crate) fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Terminal progress bar driven by committed batches.
///
/// One bar per table; hidden when stderr is not a terminal.
pub(crate) struct BarProgress {
    enabled: bool,
    bar: RefCell<Option<ProgressBar>>,
}

impl BarProgress {
    pub(crate) fn new(enabled: bool) -> Self {
        Self {
            enabled,
            bar: RefCell::new(None),
        }
    }
}

impl ProgressObserver for BarProgress {
    fn on_start(&self, table: &str, rows_total: usize) {
        if !self.enabled || rows_total == 0 {
            return;
        }
        let pb = ProgressBar::new(rows_total as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb.set_message(table.to_string());
        *self.bar.borrow_mut() = Some(pb);
    }

    fn on_batch(&self, progress: &BatchProgress<'_>) {
        if let Some(pb) = self.bar.borrow().as_ref() {
            pb.set_position(progress.rows_done as u64);
            pb.set_message(format!(
                "{} batch {} (+{})",
                progress.table, progress.batch, progress.rows_in_batch
            ));
        }
    }

    fn on_finish(&self, _table: &str) {
        if let Some(pb) = self.bar.borrow_mut().take() {
            pb.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use im_core::LegacyKey;

    #[test]
    fn test_exit_codes() {
        let err = anyhow::Error::from(ExitCode(1));
        assert_eq!(exit_code_for(&err), 1);

        let err = anyhow::Error::from(JobError::Connection(DbError::ConnectionError(
            "refused".into(),
        )))
        .context("backfill failed");
        assert_eq!(exit_code_for(&err), EXIT_CONNECTION);

        let err = anyhow::Error::from(JobError::Schema {
            table: "group_messages".into(),
            message: "column 'public_id' does not exist".into(),
        });
        assert_eq!(exit_code_for(&err), EXIT_SCHEMA);

        let err = anyhow::Error::from(JobError::BatchWrite {
            batch: 3,
            first_key: LegacyKey::Int(1),
            last_key: LegacyKey::Int(9),
            source: DbError::ExecutionError("boom".into()),
        });
        assert_eq!(exit_code_for(&err), EXIT_BATCH_WRITE);

        let err = anyhow::Error::from(DbError::ConnectionError("refused".into()))
            .context("Failed to connect to database");
        assert_eq!(exit_code_for(&err), EXIT_CONNECTION);

        assert_eq!(exit_code_for(&anyhow::anyhow!("other")), EXIT_FAILURE);
    }

    #[test]
    fn test_disabled_bar_ignores_batches() {
        let progress = BarProgress::new(false);
        progress.on_start("group_messages", 10);
        progress.on_batch(&BatchProgress {
            table: "group_messages",
            batch: 1,
            rows_in_batch: 5,
            rows_done: 5,
            rows_total: 10,
        });
        progress.on_finish("group_messages");
        assert!(progress.bar.borrow().is_none());
    }

    #[test]
    fn test_bar_tracks_batches_and_clears() {
        let progress = BarProgress::new(true);
        progress.on_start("group_messages", 10);
        progress.on_batch(&BatchProgress {
            table: "group_messages",
            batch: 2,
            rows_in_batch: 4,
            rows_done: 9,
            rows_total: 10,
        });
        {
            let bar = progress.bar.borrow();
            let pb = bar.as_ref().unwrap();
            assert_eq!(pb.position(), 9);
            assert_eq!(pb.message(), "group_messages batch 2 (+4)");
        }
        progress.on_finish("group_messages");
        assert!(progress.bar.borrow().is_none());
    }
}

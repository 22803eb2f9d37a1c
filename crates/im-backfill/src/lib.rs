//! im-backfill - Identifier migration job for idmig
//!
//! Backfills a nullable UUIDv7 column on a live table in bounded, resumable
//! batches, then points dependent cursor columns at the new identifiers.

pub mod dependents;
pub mod error;
pub mod job;
pub mod options;
pub mod progress;
pub(crate) mod schema;
pub mod summary;
#[cfg(test)]
pub(crate) mod test_support;
pub mod verify;

pub use error::{JobError, JobResult};
pub use job::BackfillJob;
pub use options::BackfillOptions;
pub use progress::{BatchProgress, NoProgress, ProgressObserver};
pub use summary::{DependentSummary, Summary};
pub use verify::VerifyReport;

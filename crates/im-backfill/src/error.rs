//! Error types for im-backfill

use im_core::{CoreError, LegacyKey};
use im_db::DbError;
use thiserror::Error;

/// Backfill job errors
#[derive(Error, Debug)]
pub enum JobError {
    /// The database could not be reached (J001)
    #[error("[J001] Connection failed: {0}")]
    Connection(#[source] DbError),

    /// A configured table or column is missing or has the wrong type (J002)
    #[error("[J002] Schema error on {table}: {message}")]
    Schema { table: String, message: String },

    /// A batch failed and was rolled back; earlier batches stay committed (J003)
    #[error("[J003] Batch {batch} (keys {first_key}..={last_key}) rolled back: {source}")]
    BatchWrite {
        batch: usize,
        first_key: LegacyKey,
        last_key: LegacyKey,
        #[source]
        source: DbError,
    },

    /// Options rejected before touching the database (J004)
    #[error("[J004] Invalid options: {0}")]
    InvalidOptions(String),

    /// A read outside any batch failed (J005)
    #[error("[J005] Query failed: {0}")]
    Query(#[source] DbError),
}

/// Result type alias for JobError
pub type JobResult<T> = Result<T, JobError>;

impl JobError {
    pub(crate) fn schema(table: impl ToString, message: impl Into<String>) -> Self {
        JobError::Schema {
            table: table.to_string(),
            message: message.into(),
        }
    }
}

impl From<DbError> for JobError {
    fn from(err: DbError) -> Self {
        match err {
            e if e.is_connection() => JobError::Connection(e),
            DbError::TableNotFound(msg) => JobError::Schema {
                table: "<query>".to_string(),
                message: msg,
            },
            e => JobError::Query(e),
        }
    }
}

impl From<CoreError> for JobError {
    fn from(err: CoreError) -> Self {
        JobError::InvalidOptions(err.to_string())
    }
}

//! Error types for im-db

use thiserror::Error;

/// Database operation errors
#[derive(Error, Debug)]
pub enum DbError {
    /// Connection error (D001)
    #[error("[D001] Database connection failed: {0}")]
    ConnectionError(String),

    /// Query execution error (D002)
    #[error("[D002] SQL execution failed: {0}")]
    ExecutionError(String),

    /// Table not found (D003)
    #[error("[D003] Table or view not found: {0}")]
    TableNotFound(String),

    /// Transaction management error (D004)
    #[error("[D004] Transaction failed: {0}")]
    TransactionError(String),

    /// Unsupported connection URL (D005)
    #[error("[D005] Unsupported database URL '{url}': {reason}")]
    UnsupportedUrl { url: String, reason: String },

    /// Mutex poisoned (D006)
    #[error("[D006] Database mutex poisoned: {0}")]
    MutexPoisoned(String),

    /// A value read back from the database could not be decoded (D007)
    #[error("[D007] Invalid value in column {column}: {message}")]
    InvalidValue { column: String, message: String },
}

/// Result type alias for DbError
pub type DbResult<T> = Result<T, DbError>;

impl DbError {
    /// Whether the error means the database could not be reached at all.
    pub fn is_connection(&self) -> bool {
        matches!(self, DbError::ConnectionError(_) | DbError::UnsupportedUrl { .. })
    }
}

impl From<duckdb::Error> for DbError {
    fn from(err: duckdb::Error) -> Self {
        // duckdb::Error does not expose structured variants for catalog
        // errors, so classify by message.
        let msg = err.to_string();
        if msg.contains("Table with name")
            || msg.contains("Table or view with name")
            || (msg.contains("Catalog Error") && msg.contains("Table") && msg.contains("not found"))
        {
            DbError::TableNotFound(msg)
        } else {
            DbError::ExecutionError(msg)
        }
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Configuration(_) => DbError::ConnectionError(err.to_string()),
            sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
                // undefined_table
                Some("42P01") => DbError::TableNotFound(db_err.message().to_string()),
                // invalid_authorization_specification / invalid_password
                Some("28000") | Some("28P01") => DbError::ConnectionError(err.to_string()),
                _ => DbError::ExecutionError(err.to_string()),
            },
            _ => DbError::ExecutionError(err.to_string()),
        }
    }
}

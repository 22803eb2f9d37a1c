//! Error types for im-core

use thiserror::Error;

/// Core error type for idmig
#[derive(Error, Debug)]
pub enum CoreError {
    /// C001: Configuration file not found
    #[error("[C001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// C002: Failed to parse configuration file
    #[error("[C002] Failed to parse config: {message}")]
    ConfigParseError { message: String },

    /// C003: Invalid configuration value
    #[error("[C003] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// C004: Identifier is not a plain SQL name
    #[error("[C004] Invalid SQL identifier '{ident}': {reason}")]
    InvalidIdent { ident: String, reason: String },

    /// C005: Unsupported key column type
    #[error("[C005] Unsupported key type '{found}' (expected integer or uuid)")]
    UnsupportedKeyType { found: String },

    /// IO error with file path context
    #[error("IO error on {path}: {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;

impl From<serde_yaml::Error> for CoreError {
    fn from(err: serde_yaml::Error) -> Self {
        CoreError::ConfigParseError {
            message: err.to_string(),
        }
    }
}

//! Open a store from a connection URL

use crate::duckdb::DuckDbBackend;
use crate::error::{DbError, DbResult};
use crate::traits::IdStore;

/// Backend selected by a connection URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreUrl {
    /// `postgres://` or `postgresql://`
    Postgres(String),
    /// `duckdb://<path>`, `duckdb::memory:`, `:memory:` or a bare file path
    DuckDb(String),
}

impl StoreUrl {
    /// Classify a URL without connecting
    pub fn parse(url: &str) -> DbResult<Self> {
        let url = url.trim();
        if url.is_empty() {
            return Err(DbError::UnsupportedUrl {
                url: String::new(),
                reason: "empty connection URL".to_string(),
            });
        }
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            return Ok(StoreUrl::Postgres(url.to_string()));
        }
        if let Some(path) = url.strip_prefix("duckdb://") {
            return Self::duckdb_path(url, path);
        }
        if let Some(path) = url.strip_prefix("duckdb:") {
            return Self::duckdb_path(url, path);
        }
        if let Some((scheme, _)) = url.split_once("://") {
            return Err(DbError::UnsupportedUrl {
                url: url.to_string(),
                reason: format!("unknown scheme '{}'", scheme),
            });
        }
        Ok(StoreUrl::DuckDb(url.to_string()))
    }

    fn duckdb_path(url: &str, path: &str) -> DbResult<Self> {
        if path.is_empty() {
            return Err(DbError::UnsupportedUrl {
                url: url.to_string(),
                reason: "missing DuckDB path".to_string(),
            });
        }
        Ok(StoreUrl::DuckDb(path.to_string()))
    }
}

/// Connect to the store named by `url`.
///
/// Fails with [`DbError::ConnectionError`] when the database cannot be
/// reached, and [`DbError::UnsupportedUrl`] for schemes this build cannot
/// open.
pub async fn connect(url: &str) -> DbResult<Box<dyn IdStore>> {
    match StoreUrl::parse(url)? {
        StoreUrl::DuckDb(path) => {
            log::debug!("Opening DuckDB database at {}", path);
            Ok(Box::new(DuckDbBackend::new(&path)?))
        }
        StoreUrl::Postgres(url) => connect_postgres(&url).await,
    }
}

#[cfg(feature = "postgres")]
async fn connect_postgres(url: &str) -> DbResult<Box<dyn IdStore>> {
    log::debug!("Connecting to PostgreSQL");
    Ok(Box::new(crate::postgres::PostgresBackend::connect(url).await?))
}

#[cfg(not(feature = "postgres"))]
async fn connect_postgres(url: &str) -> DbResult<Box<dyn IdStore>> {
    Err(DbError::UnsupportedUrl {
        url: url.to_string(),
        reason: "built without the `postgres` feature".to_string(),
    })
}

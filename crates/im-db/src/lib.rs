//! im-db - Database abstraction layer for idmig
//!
//! This crate provides the `IdStore` trait and implementations for DuckDB
//! and (behind the default `postgres` feature) PostgreSQL.

pub mod connect;
pub(crate) mod decode;
pub mod duckdb;
pub mod error;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod sql;
pub mod traits;

pub use connect::{connect, StoreUrl};
pub use duckdb::DuckDbBackend;
pub use error::{DbError, DbResult};
#[cfg(feature = "postgres")]
pub use postgres::PostgresBackend;
pub use sql::Dialect;
pub use traits::{BatchOutcome, ColumnInfo, DependentCounts, IdStore, WriteTarget};

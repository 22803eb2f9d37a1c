//! im-core - Core library for idmig
//!
//! This crate provides configuration parsing, validated SQL identifiers,
//! table descriptors, and the UUIDv7 generator shared by the store backends
//! and the backfill job.

pub mod config;
pub mod error;
pub mod ident;
pub mod key;
pub mod table;
pub mod uuidv7;

pub use config::Config;
pub use error::{CoreError, CoreResult};
pub use ident::SqlIdent;
pub use key::{KeyKind, LegacyKey};
pub use table::{Assignment, DependentRow, DependentTable, PendingRow, TargetTable};
pub use uuidv7::UuidV7Generator;

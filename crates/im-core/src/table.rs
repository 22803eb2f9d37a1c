//! Table descriptors and the typed rows the backfill moves around.

use crate::ident::SqlIdent;
use crate::key::{KeyKind, LegacyKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A table whose target identifier column gets backfilled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetTable {
    /// Table name (optionally `schema.table`)
    pub name: SqlIdent,

    /// Legacy primary key column
    #[serde(default = "default_key")]
    pub key: SqlIdent,

    /// Storage kind of the legacy key
    #[serde(default)]
    pub key_type: KeyKind,

    /// Nullable column receiving the new identifier
    #[serde(default = "default_target")]
    pub target: SqlIdent,

    /// Creation timestamp column, if the table has one
    #[serde(default)]
    pub created_at: Option<SqlIdent>,
}

/// A table holding a cursor that points into a parent's identifier space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DependentTable {
    /// Table name (optionally `schema.table`)
    pub name: SqlIdent,

    /// Own primary key column
    #[serde(default = "default_key")]
    pub key: SqlIdent,

    /// Storage kind of the own primary key
    #[serde(default)]
    pub key_type: KeyKind,

    /// Column referencing the parent's legacy key
    pub reference: SqlIdent,

    /// Nullable column receiving the parent's new identifier
    pub cursor: SqlIdent,

    /// Name of the parent entry in `tables`
    pub parent: SqlIdent,
}

fn default_key() -> SqlIdent {
    SqlIdent::from_static("id")
}

fn default_target() -> SqlIdent {
    SqlIdent::from_static("public_id")
}

impl TargetTable {
    /// Build a descriptor with an integer key.
    pub fn new(name: SqlIdent, key: SqlIdent, target: SqlIdent) -> Self {
        Self {
            name,
            key,
            key_type: KeyKind::Integer,
            target,
            created_at: None,
        }
    }

    /// Set the creation timestamp column.
    pub fn with_created_at(mut self, column: SqlIdent) -> Self {
        self.created_at = Some(column);
        self
    }

    /// Set the legacy key kind.
    pub fn with_key_type(mut self, kind: KeyKind) -> Self {
        self.key_type = kind;
        self
    }
}

/// A row whose target column is still NULL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRow {
    pub key: LegacyKey,
    pub created_at: Option<DateTime<Utc>>,
}

/// A dependent row whose referenced parent already carries a new identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependentRow {
    pub key: LegacyKey,
    pub parent_id: Uuid,
}

/// One conditional write: set the target of `key` to `id` if it is still NULL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Assignment {
    pub key: LegacyKey,
    pub id: Uuid,
}

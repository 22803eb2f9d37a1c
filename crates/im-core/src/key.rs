//! Legacy primary key values and their column kinds.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Storage kind of a legacy key column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum KeyKind {
    /// Any integer column (SMALLINT / INTEGER / BIGINT and aliases)
    #[default]
    Integer,
    /// A UUID column
    Uuid,
}

impl KeyKind {
    /// Classify a column type name as reported by `information_schema`.
    pub fn from_data_type(data_type: &str) -> CoreResult<Self> {
        match data_type.trim().to_ascii_lowercase().as_str() {
            "smallint" | "integer" | "bigint" | "int" | "int2" | "int4" | "int8" | "hugeint"
            | "tinyint" | "ubigint" | "uinteger" | "usmallint" | "utinyint" => Ok(KeyKind::Integer),
            "uuid" => Ok(KeyKind::Uuid),
            other => Err(CoreError::UnsupportedKeyType {
                found: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyKind::Integer => write!(f, "integer"),
            KeyKind::Uuid => write!(f, "uuid"),
        }
    }
}

/// A legacy primary key value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum LegacyKey {
    /// Integer surrogate key
    Int(i64),
    /// Pre-existing UUID key
    Uuid(Uuid),
}

impl fmt::Display for LegacyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LegacyKey::Int(n) => write!(f, "{}", n),
            LegacyKey::Uuid(u) => write!(f, "{}", u),
        }
    }
}

impl From<i64> for LegacyKey {
    fn from(n: i64) -> Self {
        LegacyKey::Int(n)
    }
}

impl From<Uuid> for LegacyKey {
    fn from(u: Uuid) -> Self {
        LegacyKey::Uuid(u)
    }
}

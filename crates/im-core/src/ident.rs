//! Validated SQL identifiers.
//!
//! Table and column names come from configuration and end up spliced into
//! generated SQL, so they are restricted to plain names (`[A-Za-z_][A-Za-z0-9_]*`),
//! optionally schema-qualified as `schema.table`, and always emitted quoted.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum identifier length accepted (PostgreSQL's NAMEDATALEN - 1).
pub const MAX_IDENT_LEN: usize = 63;

/// A validated, possibly schema-qualified SQL identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SqlIdent(String);

impl SqlIdent {
    /// Parse and validate an identifier.
    pub fn parse(name: &str) -> CoreResult<Self> {
        let parts: Vec<&str> = name.split('.').collect();
        if parts.len() > 2 {
            return Err(invalid(name, "at most one '.' (schema.table) is allowed"));
        }
        for part in &parts {
            validate_part(name, part)?;
        }
        Ok(Self(name.to_string()))
    }

    /// Wrap a name known to be valid at compile time.
    pub(crate) fn from_static(name: &'static str) -> Self {
        debug_assert!(Self::parse(name).is_ok(), "invalid static identifier");
        Self(name.to_string())
    }

    /// Return the identifier as written.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Schema qualifier, if the identifier has one.
    pub fn schema(&self) -> Option<&str> {
        self.0.rsplit_once('.').map(|(schema, _)| schema)
    }

    /// Unqualified name (the part after the last `.`).
    pub fn name(&self) -> &str {
        self.0.rsplit_once('.').map_or(self.0.as_str(), |(_, name)| name)
    }

    /// Quoted form for use in SQL, e.g. `"staging"."orders"`.
    pub fn quoted(&self) -> String {
        self.0
            .split('.')
            .map(|part| format!("\"{}\"", part))
            .collect::<Vec<_>>()
            .join(".")
    }
}

fn invalid(ident: &str, reason: &str) -> CoreError {
    CoreError::InvalidIdent {
        ident: ident.to_string(),
        reason: reason.to_string(),
    }
}

fn validate_part(ident: &str, part: &str) -> CoreResult<()> {
    let mut chars = part.chars();
    match chars.next() {
        None => return Err(invalid(ident, "empty name component")),
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        Some(_) => return Err(invalid(ident, "must start with a letter or '_'")),
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(invalid(ident, "only ASCII letters, digits and '_' are allowed"));
    }
    if part.len() > MAX_IDENT_LEN {
        return Err(invalid(ident, "name component longer than 63 characters"));
    }
    Ok(())
}

impl fmt::Display for SqlIdent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SqlIdent {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for SqlIdent {
    type Error = CoreError;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl<'de> Deserialize<'de> for SqlIdent {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        SqlIdent::parse(&s).map_err(serde::de::Error::custom)
    }
}

impl PartialEq<str> for SqlIdent {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for SqlIdent {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
#[path = "ident_test.rs"]
mod tests;

//! Decoding of raw column values shared by the backends.

use crate::error::{DbError, DbResult};
use chrono::{DateTime, Utc};
use im_core::LegacyKey;
use uuid::Uuid;

/// A key as read from the driver, before UUID text is parsed.
#[derive(Debug)]
pub(crate) enum RawKey {
    Int(i64),
    Text(String),
}

impl RawKey {
    pub(crate) fn decode(self, column: &str) -> DbResult<LegacyKey> {
        match self {
            RawKey::Int(n) => Ok(LegacyKey::Int(n)),
            RawKey::Text(s) => parse_uuid(column, &s).map(LegacyKey::Uuid),
        }
    }
}

/// Parse a UUID read back as text.
pub(crate) fn parse_uuid(column: &str, text: &str) -> DbResult<Uuid> {
    Uuid::parse_str(text).map_err(|e| DbError::InvalidValue {
        column: column.to_string(),
        message: format!("'{}' is not a UUID: {}", text, e),
    })
}

/// Epoch milliseconds to a UTC timestamp; out-of-range values become `None`.
pub(crate) fn millis_to_datetime(ms: Option<i64>) -> Option<DateTime<Utc>> {
    ms.and_then(DateTime::from_timestamp_millis)
}

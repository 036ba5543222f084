//! Wire format of a task's due date (`limit`).
//!
//! Due dates cross the wire as UTC instants with second precision:
//! `YYYY-MM-DDTHH:MM:SSZ`. Sub-second precision is truncated when
//! formatting, so an instant survives a round-trip only up to the second.
//! Parsing is lenient and accepts any RFC 3339 instant (fractional seconds,
//! numeric offsets), normalized to UTC.

use chrono::{DateTime, SubsecRound, Utc};

/// `strftime` pattern used when sending a due date.
pub const WIRE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Error returned when a due date string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid due date {value:?}: {reason}")]
pub struct LimitError {
    /// The rejected input.
    pub value: String,
    /// Parser diagnostic.
    pub reason: String,
}

/// Formats an instant in the wire format, dropping sub-second precision.
#[must_use]
pub fn format(limit: &DateTime<Utc>) -> String {
    limit.format(WIRE_FORMAT).to_string()
}

/// Parses an RFC 3339 instant into UTC.
///
/// # Errors
///
/// Returns [`LimitError`] if `value` is not a valid RFC 3339 timestamp.
pub fn parse(value: &str) -> Result<DateTime<Utc>, LimitError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| LimitError {
            value: value.to_string(),
            reason: e.to_string(),
        })
}

/// Returns `limit` with the precision it will have after a round-trip.
#[must_use]
pub fn truncate(limit: DateTime<Utc>) -> DateTime<Utc> {
    limit.trunc_subsecs(0)
}

/// Serde adapter for `Option<DateTime<Utc>>` fields in wire format.
///
/// Use with `#[serde(default, with = "tasklist_proto::limit::option")]`.
/// `null` and the empty string both read as `None`.
pub mod option {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serializes a present due date in wire format, `None` as `null`.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(limit) => serializer.serialize_some(&super::format(limit)),
            None => serializer.serialize_none(),
        }
    }

    /// Deserializes an optional RFC 3339 string.
    ///
    /// # Errors
    ///
    /// Fails if the string is present but not a valid instant.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref() {
            None | Some("") => Ok(None),
            Some(value) => super::parse(value)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}

/// Serde adapter for `Option<Option<DateTime<Utc>>>` update fields.
///
/// Use with `#[serde(default, with = "tasklist_proto::limit::patch",
/// skip_serializing_if = "Option::is_none")]`. An absent key is `None`
/// (leave the due date alone), `null` or `""` is `Some(None)` (clear it).
pub mod patch {
    use chrono::{DateTime, Utc};
    use serde::{Deserializer, Serializer};

    /// Serializes `Some(None)` as `null` and `Some(Some(_))` in wire format.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    #[allow(clippy::ref_option, clippy::option_option)]
    pub fn serialize<S: Serializer>(
        value: &Option<Option<DateTime<Utc>>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(limit) => super::option::serialize(limit, serializer),
            None => serializer.serialize_none(),
        }
    }

    /// Deserializes a present key; absence is handled by `#[serde(default)]`.
    ///
    /// # Errors
    ///
    /// Fails if the string is present but not a valid instant.
    #[allow(clippy::option_option)]
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Option<DateTime<Utc>>>, D::Error> {
        super::option::deserialize(deserializer).map(Some)
    }
}

//! Due-date helpers for task limits.
//!
//! Limits are stored as UTC instants. These helpers turn them into what a
//! person reads or types: time left until the limit, local calendar-day
//! checks, and the `YYYY-MM-DDTHH:MM` local input format the CLI accepts.
//! Each local-time helper has an `_in` variant taking an explicit zone.

use std::fmt;

use chrono::{DateTime, Local, NaiveDateTime, TimeDelta, TimeZone, Utc};

/// Format of a local date-time typed by the user.
pub const INPUT_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Format of a limit shown to the user.
pub const DISPLAY_FORMAT: &str = "%Y/%m/%d %H:%M";

/// Errors from parsing a local date-time.
#[derive(Debug, thiserror::Error)]
pub enum DueError {
    /// The input is not `YYYY-MM-DDTHH:MM`.
    #[error("invalid date {input:?}, expected YYYY-MM-DDTHH:MM: {source}")]
    Format {
        /// What was typed.
        input: String,
        /// Parser error.
        source: chrono::ParseError,
    },

    /// The local time does not exist (skipped by a DST change).
    #[error("{input} does not exist in the local time zone")]
    Nonexistent {
        /// What was typed.
        input: String,
    },
}

/// Whole days, hours and minutes between now and a limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRemaining {
    /// The limit is in the past.
    pub overdue: bool,
    /// Whole days.
    pub days: i64,
    /// Hours past the whole days.
    pub hours: i64,
    /// Minutes past the whole hours.
    pub minutes: i64,
}

impl fmt::Display for TimeRemaining {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.overdue {
            write!(f, "overdue by ")?;
        }
        if self.days > 0 {
            write!(f, "{}d {}h {}m", self.days, self.hours, self.minutes)?;
        } else if self.hours > 0 {
            write!(f, "{}h {}m", self.hours, self.minutes)?;
        } else {
            write!(f, "{}m", self.minutes)?;
        }
        if !self.overdue {
            write!(f, " left")?;
        }
        Ok(())
    }
}

/// Time between `now` and `limit`, rounded down to the minute.
#[must_use]
pub fn time_remaining(limit: DateTime<Utc>, now: DateTime<Utc>) -> TimeRemaining {
    let diff = limit - now;
    let overdue = diff < TimeDelta::zero();
    let total_minutes = diff.num_minutes().abs();
    TimeRemaining {
        overdue,
        days: total_minutes / (24 * 60),
        hours: (total_minutes / 60) % 24,
        minutes: total_minutes % 60,
    }
}

/// Whether `a` and `b` fall on the same calendar day in `tz`.
#[must_use]
pub fn is_same_day_in<Tz: TimeZone>(a: DateTime<Utc>, b: DateTime<Utc>, tz: &Tz) -> bool {
    a.with_timezone(tz).date_naive() == b.with_timezone(tz).date_naive()
}

/// Whether `a` and `b` fall on the same local calendar day.
#[must_use]
pub fn is_same_local_day(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    is_same_day_in(a, b, &Local)
}

/// `limit` as `YYYY-MM-DDTHH:MM` in `tz`.
#[must_use]
pub fn format_input_in<Tz>(limit: DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    limit.with_timezone(tz).format(INPUT_FORMAT).to_string()
}

/// `limit` as local `YYYY-MM-DDTHH:MM`.
#[must_use]
pub fn format_local_input(limit: DateTime<Utc>) -> String {
    format_input_in(limit, &Local)
}

/// Parses `YYYY-MM-DDTHH:MM` as a time in `tz`.
///
/// An ambiguous time (repeated by a DST change) resolves to the earlier
/// instant.
///
/// # Errors
///
/// Returns [`DueError::Format`] for malformed input and
/// [`DueError::Nonexistent`] for a time `tz` skips.
pub fn parse_input_in<Tz: TimeZone>(input: &str, tz: &Tz) -> Result<DateTime<Utc>, DueError> {
    let naive = NaiveDateTime::parse_from_str(input.trim(), INPUT_FORMAT).map_err(|source| {
        DueError::Format {
            input: input.to_string(),
            source,
        }
    })?;
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|t| t.with_timezone(&Utc))
        .ok_or_else(|| DueError::Nonexistent {
            input: input.to_string(),
        })
}

/// Parses local `YYYY-MM-DDTHH:MM`.
///
/// # Errors
///
/// See [`parse_input_in`].
pub fn parse_local_input(input: &str) -> Result<DateTime<Utc>, DueError> {
    parse_input_in(input, &Local)
}

/// `limit` as `YYYY/MM/DD HH:MM` in `tz`.
#[must_use]
pub fn format_display_in<Tz>(limit: DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    limit.with_timezone(tz).format(DISPLAY_FORMAT).to_string()
}

/// `limit` as local `YYYY/MM/DD HH:MM`.
#[must_use]
pub fn format_display(limit: DateTime<Utc>) -> String {
    format_display_in(limit, &Local)
}

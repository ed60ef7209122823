//! Time types for calendar events.
//!
//! This module provides [`EventTime`] for representing event start/end times
//! (which may be either a zoned timestamp or an all-day date), [`TimeWindow`]
//! for defining query ranges, and helpers for resolving the display zone.

use std::cmp::Ordering;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Returned when a time zone name is not a known IANA identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown time zone: {name}")]
pub struct UnknownTimeZone {
    /// The name that failed to resolve.
    pub name: String,
}

/// Longest look-ahead accepted for a rolling window: one year.
pub const MAX_WINDOW_HOURS: u32 = 24 * 365;

/// Returned when a rolling window cannot be represented.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("a {hours}-hour window starting at {start} is out of range (at most {MAX_WINDOW_HOURS} hours)")]
pub struct WindowOutOfRange {
    pub start: DateTime<Utc>,
    pub hours: u32,
}

/// Resolves an IANA time zone identifier (e.g. `"America/New_York"`).
pub fn parse_timezone(name: &str) -> Result<Tz, UnknownTimeZone> {
    name.trim().parse::<Tz>().map_err(|_| UnknownTimeZone {
        name: name.to_string(),
    })
}

/// Returns the civil date of `instant` as observed in `tz`.
pub fn civil_date<Tz2: TimeZone>(instant: DateTime<Utc>, tz: &Tz2) -> NaiveDate {
    instant.with_timezone(tz).date_naive()
}

/// Represents the time of a calendar event.
///
/// Calendar events can have two types of times:
/// - **DateTime**: A specific point in time, kept with the offset of the
///   zone it was converted into (the display zone after normalization)
/// - **AllDay**: A date without a specific time, never converted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum EventTime {
    /// A specific datetime with its UTC offset.
    DateTime(DateTime<FixedOffset>),
    /// An all-day event date (no specific time).
    AllDay(NaiveDate),
}

impl EventTime {
    /// Creates a new `EventTime::DateTime` from a UTC datetime.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self::DateTime(dt.fixed_offset())
    }

    /// Creates a new `EventTime::DateTime` from a datetime in any timezone.
    ///
    /// The offset in effect at that instant is preserved.
    pub fn from_zoned<Z: TimeZone>(dt: DateTime<Z>) -> Self {
        Self::DateTime(dt.fixed_offset())
    }

    /// Creates a new `EventTime::AllDay` from a date.
    pub fn from_date(date: NaiveDate) -> Self {
        Self::AllDay(date)
    }

    /// Returns `true` if this is an all-day event time.
    pub fn is_all_day(&self) -> bool {
        matches!(self, Self::AllDay(_))
    }

    /// Returns the datetime if this is a `DateTime` variant.
    pub fn as_datetime(&self) -> Option<&DateTime<FixedOffset>> {
        match self {
            Self::DateTime(dt) => Some(dt),
            Self::AllDay(_) => None,
        }
    }

    /// Returns the date if this is an `AllDay` variant.
    pub fn as_date(&self) -> Option<&NaiveDate> {
        match self {
            Self::AllDay(d) => Some(d),
            Self::DateTime(_) => None,
        }
    }

    /// Converts to a UTC datetime for comparison purposes.
    ///
    /// For all-day events, returns midnight UTC on that date.
    pub fn to_utc_datetime(&self) -> DateTime<Utc> {
        match self {
            Self::DateTime(dt) => dt.with_timezone(&Utc),
            Self::AllDay(date) => date.and_time(chrono::NaiveTime::MIN).and_utc(),
        }
    }
}

impl PartialOrd for EventTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_utc_datetime().cmp(&other.to_utc_datetime())
    }
}

/// A time window for querying calendar events.
///
/// Represents a half-open interval `[start, end)` in UTC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Start of the window (inclusive).
    pub start: DateTime<Utc>,
    /// End of the window (exclusive).
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a new time window.
    ///
    /// # Panics
    ///
    /// Panics if `start` is after `end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        assert!(start <= end, "TimeWindow start must be <= end");
        Self { start, end }
    }

    /// Creates a rolling window starting at `now` and lasting `hours`.
    ///
    /// Windows longer than [`MAX_WINDOW_HOURS`], or ending past the range
    /// chrono can represent, are rejected.
    pub fn rolling_hours(now: DateTime<Utc>, hours: u32) -> Result<Self, WindowOutOfRange> {
        let out_of_range = || WindowOutOfRange { start: now, hours };
        if hours > MAX_WINDOW_HOURS {
            return Err(out_of_range());
        }
        let end = now
            .checked_add_signed(Duration::hours(i64::from(hours)))
            .ok_or_else(out_of_range)?;
        Ok(Self::new(now, end))
    }
}

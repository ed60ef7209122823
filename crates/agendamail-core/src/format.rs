//! Display labels for normalized events.
//!
//! Every label here is a pure function of its inputs. Callers pass the civil
//! "today" explicitly; nothing in this module reads the clock.

use chrono::{DateTime, Datelike, NaiveDate, TimeZone};

/// The time label used for all-day events.
pub const ALL_DAY_LABEL: &str = "All day";

/// The date label used for events on the reference date.
pub const TODAY_LABEL: &str = "Today";

/// Formats a clock time in 12-hour form without a leading zero (`9:05 AM`).
pub fn clock_12h<Tz: TimeZone>(dt: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    dt.format("%-I:%M %p").to_string()
}

/// Formats the `"<start> - <end>"` label of a timed event.
pub fn time_range_label<Tz: TimeZone>(start: &DateTime<Tz>, end: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("{} - {}", clock_12h(start), clock_12h(end))
}

/// Buckets a civil date relative to `today`.
///
/// - same date: `Today`
/// - the following date: `Tomorrow, February 6`
/// - anything else: `Thursday, February 6`
pub fn date_label(date: NaiveDate, today: NaiveDate) -> String {
    if date == today {
        TODAY_LABEL.to_string()
    } else if today.succ_opt() == Some(date) {
        format!("Tomorrow, {} {}", date.format("%B"), date.day())
    } else {
        format!("{}, {} {}", date.format("%A"), date.format("%B"), date.day())
    }
}

/// Formats a long calendar date (`February 05, 2025`).
pub fn long_date(date: NaiveDate) -> String {
    date.format("%B %d, %Y").to_string()
}

/// Escapes text for HTML display.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

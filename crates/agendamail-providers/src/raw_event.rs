//! Raw event type from calendar sources.
//!
//! This module defines [`RawEvent`], the event record as a calendar source
//! hands it over before normalization. Start and end times are kept as the
//! vendor sent them ([`RawEventTime`]) and narrowed into a [`RawSchedule`]
//! at the normalizer boundary, which is where malformed data is reported.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{Boundary, MalformedEventError, MalformedReason};

/// A start or end descriptor as sent by the calendar source.
///
/// A descriptor carrying `date` is all-day, whether or not `date_time` is
/// also set. `date_time` is normally RFC 3339 with an offset; a local time without an
/// offset is resolved through `time_zone`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEventTime {
    /// A bare calendar date, `YYYY-MM-DD`.
    pub date: Option<String>,
    /// A timestamp.
    pub date_time: Option<String>,
    /// IANA zone the timestamp was created in.
    pub time_zone: Option<String>,
}

impl RawEventTime {
    /// Creates a timed descriptor.
    pub fn date_time(value: impl Into<String>) -> Self {
        Self {
            date_time: Some(value.into()),
            ..Self::default()
        }
    }

    /// Creates an all-day descriptor.
    pub fn date(value: impl Into<String>) -> Self {
        Self {
            date: Some(value.into()),
            ..Self::default()
        }
    }

    /// Builder method to set the zone.
    pub fn with_time_zone(mut self, zone: impl Into<String>) -> Self {
        self.time_zone = Some(zone.into());
        self
    }

    /// Returns true if a bare date is present; it wins over a timestamp.
    pub fn is_all_day(&self) -> bool {
        self.date.is_some()
    }

    /// Returns true if neither a date nor a timestamp is present.
    pub fn is_empty(&self) -> bool {
        self.date_time.is_none() && self.date.is_none()
    }

    fn parse_date(&self, boundary: Boundary) -> Result<Option<NaiveDate>, MalformedReason> {
        self.date
            .as_deref()
            .map(|value| {
                NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
                    MalformedReason::Unparsable {
                        boundary,
                        value: value.to_string(),
                    }
                })
            })
            .transpose()
    }

    fn parse_instant(
        &self,
        boundary: Boundary,
    ) -> Result<Option<DateTime<FixedOffset>>, MalformedReason> {
        let Some(value) = self.date_time.as_deref().map(str::trim) else {
            return Ok(None);
        };
        if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
            return Ok(Some(dt));
        }

        let unparsable = || MalformedReason::Unparsable {
            boundary,
            value: value.to_string(),
        };
        let naive = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
            .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M"))
            .map_err(|_| unparsable())?;
        let zone_name = self.time_zone.as_deref().ok_or_else(unparsable)?;
        let zone: Tz = zone_name
            .parse()
            .map_err(|_| MalformedReason::UnknownZone {
                boundary,
                zone: zone_name.to_string(),
            })?;

        zone.from_local_datetime(&naive)
            .earliest()
            .map(|dt| Some(dt.fixed_offset()))
            .ok_or_else(|| MalformedReason::NonexistentLocalTime {
                boundary,
                value: value.to_string(),
                zone: zone_name.to_string(),
            })
    }
}

/// The validated schedule of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawSchedule {
    /// An event with a start and end instant.
    Timed {
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    },
    /// An event spanning whole days. `end` is exclusive when present.
    AllDay {
        date: NaiveDate,
        end: Option<NaiveDate>,
    },
}

/// An attendee of a calendar event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAttendee {
    /// The attendee's email address.
    pub email: String,
    /// The attendee's display name, if available.
    pub display_name: Option<String>,
    /// Whether this entry is the authenticated user.
    pub is_self: bool,
}

impl RawAttendee {
    /// Creates a new attendee with the given email.
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            display_name: None,
            is_self: false,
        }
    }

    /// Marks the attendee as the authenticated user.
    pub fn myself(mut self) -> Self {
        self.is_self = true;
        self
    }
}

/// Conference data associated with an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawConferenceData {
    /// The conference solution name (e.g., "Google Meet", "Zoom Meeting").
    pub solution_name: Option<String>,
    /// Entry points for joining the conference, in source order.
    pub entry_points: Vec<RawEntryPoint>,
}

/// An entry point for joining a conference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEntryPoint {
    /// The type of entry point (e.g., "video", "phone", "sip", "more").
    pub entry_point_type: String,
    /// The URI for this entry point.
    pub uri: Option<String>,
    /// A label for this entry point.
    pub label: Option<String>,
}

impl RawEntryPoint {
    pub fn new(entry_point_type: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            entry_point_type: entry_point_type.into(),
            uri: Some(uri.into()),
            label: None,
        }
    }

    /// Returns the URI if this is a video entry point with a non-blank URI.
    pub fn video_uri(&self) -> Option<&str> {
        if self.entry_point_type != "video" {
            return None;
        }
        self.uri.as_deref().filter(|uri| !uri.trim().is_empty())
    }
}

/// A raw calendar event from a source.
///
/// Produced by the event source, consumed once by the normalizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Unique identifier for the event within the source.
    pub id: String,
    /// When the event starts.
    pub start: RawEventTime,
    /// When the event ends.
    pub end: RawEventTime,
    /// The event title/summary.
    pub summary: Option<String>,
    /// The event description (may contain HTML).
    pub description: Option<String>,
    /// The event location.
    pub location: Option<String>,
    /// The event status (e.g., "confirmed", "tentative", "cancelled").
    pub status: Option<String>,
    /// List of event attendees, in source order.
    #[serde(default)]
    pub attendees: Vec<RawAttendee>,
    /// Conference data (video meeting info).
    pub conference_data: Option<RawConferenceData>,
    /// A direct link to view this event in the calendar UI.
    pub html_link: Option<String>,
}

impl RawEvent {
    /// Creates a new raw event with the minimum required fields.
    pub fn new(id: impl Into<String>, start: RawEventTime, end: RawEventTime) -> Self {
        Self {
            id: id.into(),
            start,
            end,
            summary: None,
            description: None,
            location: None,
            status: None,
            attendees: Vec::new(),
            conference_data: None,
            html_link: None,
        }
    }

    /// Narrows the start/end descriptors into a [`RawSchedule`].
    ///
    /// An event is all-day iff its start is a bare date, whatever the end
    /// looks like. Timed events need a timed end.
    pub fn schedule(&self) -> Result<RawSchedule, MalformedEventError> {
        self.narrow_schedule()
            .map_err(|reason| MalformedEventError::new(&self.id, reason))
    }

    fn narrow_schedule(&self) -> Result<RawSchedule, MalformedReason> {
        if self.start.is_empty() {
            return Err(MalformedReason::Missing(Boundary::Start));
        }

        if self.start.is_all_day() {
            let date = self
                .start
                .parse_date(Boundary::Start)?
                .ok_or(MalformedReason::Missing(Boundary::Start))?;
            let end = self.end.parse_date(Boundary::End)?;
            return Ok(RawSchedule::AllDay { date, end });
        }

        let start = self
            .start
            .parse_instant(Boundary::Start)?
            .ok_or(MalformedReason::Missing(Boundary::Start))?;
        let end = match self.end.parse_instant(Boundary::End)? {
            Some(end) => end,
            None if self.end.is_all_day() => return Err(MalformedReason::DateOnlyEnd),
            None => return Err(MalformedReason::Missing(Boundary::End)),
        };
        Ok(RawSchedule::Timed { start, end })
    }

    /// Returns true if the event is cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.status
            .as_ref()
            .is_some_and(|s| s.eq_ignore_ascii_case("cancelled"))
    }

    /// Returns true if this is an all-day event.
    pub fn is_all_day(&self) -> bool {
        self.start.is_all_day()
    }

    /// Builder method to set the summary.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Builder method to set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Builder method to set the location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Builder method to set the HTML link.
    pub fn with_html_link(mut self, html_link: impl Into<String>) -> Self {
        self.html_link = Some(html_link.into());
        self
    }

    /// Builder method to set conference data.
    pub fn with_conference_data(mut self, conference_data: RawConferenceData) -> Self {
        self.conference_data = Some(conference_data);
        self
    }

    /// Builder method to add an attendee.
    pub fn with_attendee(mut self, attendee: RawAttendee) -> Self {
        self.attendees.push(attendee);
        self
    }

    /// Builder method to set the status.
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }
}

//! Event types for calendar events.
//!
//! This module provides core types for representing calendar events:
//! - [`NormalizedEvent`]: A provider-agnostic, display-ready event
//! - [`EventLink`]: The resolved meeting link of an event
//! - [`LinkKind`]: The video conferencing service behind a link

use serde::{Deserialize, Serialize};

use crate::time::EventTime;

/// Placeholder title for events without a usable summary.
pub const UNTITLED_EVENT: &str = "(No title)";

/// The kind of meeting link.
///
/// Detected from the resolved URL for display purposes only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    GoogleMeet,
    Zoom,
    Teams,
    Jitsi,
    Webex,
    /// Any other URL
    Other,
}

impl LinkKind {
    /// Returns a human-readable name for this link kind.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::GoogleMeet => "Google Meet",
            Self::Zoom => "Zoom",
            Self::Teams => "Microsoft Teams",
            Self::Jitsi => "Jitsi",
            Self::Webex => "Cisco Webex",
            Self::Other => "Link",
        }
    }
}

/// Where a meeting link was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkSource {
    /// A structured video entry point from the conferencing metadata.
    ConferenceData,
    /// The first URL in the free-text description.
    Description,
}

/// The meeting link of an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLink {
    /// The detected service.
    pub kind: LinkKind,
    /// The URL, exactly as selected.
    pub url: String,
    /// Which tier the link was resolved from.
    pub source: LinkSource,
}

impl EventLink {
    /// Creates a new EventLink, detecting the kind from the URL.
    pub fn new(url: impl Into<String>, source: LinkSource) -> Self {
        let url = url.into();
        Self {
            kind: crate::links::detect_link_kind(&url),
            url,
            source,
        }
    }
}

/// A normalized calendar event.
///
/// Built once per raw record and never mutated afterwards. Timed events carry
/// their times already converted into the display zone; all-day events carry
/// bare dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedEvent {
    /// Unique identifier for the event (provider-specific).
    pub id: String,
    /// The event title, or [`UNTITLED_EVENT`].
    pub title: String,
    /// When the event starts.
    pub start: EventTime,
    /// When the event ends. All-day events may omit their end.
    pub end: Option<EventTime>,
    /// `Today`, `Tomorrow, <Month> <Day>` or `<Weekday>, <Month> <Day>`.
    pub date_label: String,
    /// `All day` or `<start> - <end>`.
    pub time_label: String,
    /// The location, if the source had a non-blank one.
    pub location: Option<String>,
    /// Attendee emails in source order, excluding the authenticated user.
    pub attendees: Vec<String>,
    /// The resolved meeting link.
    pub meeting_link: Option<EventLink>,
    /// URL to view this event in the calendar.
    pub calendar_url: Option<String>,
}

impl NormalizedEvent {
    /// Returns true if this is an all-day event.
    pub fn is_all_day(&self) -> bool {
        self.start.is_all_day()
    }

    /// Returns the meeting URL, if any.
    pub fn meeting_url(&self) -> Option<&str> {
        self.meeting_link.as_ref().map(|l| l.url.as_str())
    }

    /// Returns the location, or an empty string.
    pub fn location_or_empty(&self) -> &str {
        self.location.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample() -> NormalizedEvent {
        NormalizedEvent {
            id: "evt-1".into(),
            title: "Offsite".into(),
            start: EventTime::from_date(NaiveDate::from_ymd_opt(2025, 2, 5).unwrap()),
            end: None,
            date_label: "Today".into(),
            time_label: "All day".into(),
            location: None,
            attendees: vec!["ana@example.com".into()],
            meeting_link: Some(EventLink::new(
                "https://meet.google.com/abc-defg-hij",
                LinkSource::ConferenceData,
            )),
            calendar_url: None,
        }
    }

    #[test]
    fn link_kind_is_detected_on_construction() {
        let link = EventLink::new("https://zoom.us/j/1", LinkSource::Description);
        assert_eq!(link.kind, LinkKind::Zoom);
        assert_eq!(link.kind.display_name(), "Zoom");
    }

    #[test]
    fn accessors() {
        let event = sample();
        assert!(event.is_all_day());
        assert_eq!(event.location_or_empty(), "");
        assert_eq!(
            event.meeting_url(),
            Some("https://meet.google.com/abc-defg-hij")
        );
    }

    #[test]
    fn serde_roundtrip() {
        let event = sample();
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"kind\":\"google_meet\""));
        assert!(json.contains("\"source\":\"conference_data\""));
        let parsed: NormalizedEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }
}

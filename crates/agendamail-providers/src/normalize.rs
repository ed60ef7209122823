//! RawEvent to NormalizedEvent conversion pipeline.
//!
//! The normalization process:
//! 1. Narrows the raw start/end into a [`RawSchedule`]
//! 2. Converts timed events into the display zone; all-day dates stay as-is
//! 3. Buckets the start date against the reference date and formats labels
//! 4. Filters attendees and resolves a single meeting link
//!
//! Nothing here reads the clock or logs. The caller pins the reference
//! instant once per batch so every event buckets against the same "today".

use agendamail_core::format::{ALL_DAY_LABEL, date_label, time_range_label};
use agendamail_core::links::first_url_in_text;
use agendamail_core::{
    EventLink, EventTime, LinkSource, NormalizedEvent, UNTITLED_EVENT, civil_date,
};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::MalformedEventError;
use crate::raw_event::{RawEvent, RawSchedule};

/// What a batch does with a record whose start/end cannot be resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedPolicy {
    /// Drop the record, keep it in [`NormalizedBatch::rejected`], deliver the rest.
    #[default]
    Skip,
    /// Fail the whole batch on the first malformed record.
    Abort,
}

/// The result of normalizing one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedBatch {
    /// Normalized events, in source order.
    pub events: Vec<NormalizedEvent>,
    /// Records dropped under [`MalformedPolicy::Skip`].
    pub rejected: Vec<MalformedEventError>,
}

/// Converts a [`RawEvent`] to a [`NormalizedEvent`].
///
/// # Errors
///
/// Returns [`MalformedEventError`] only when the start/end data is missing or
/// unparsable. Absent optional fields degrade to defaults.
pub fn normalize(
    raw: &RawEvent,
    display_tz: &Tz,
    reference: DateTime<Utc>,
) -> Result<NormalizedEvent, MalformedEventError> {
    let today = civil_date(reference, display_tz);

    let (start, end, date_label, time_label) = match raw.schedule()? {
        RawSchedule::Timed { start, end } => {
            let start = start.with_timezone(display_tz);
            let end = end.with_timezone(display_tz);
            let day = date_label(start.date_naive(), today);
            let range = time_range_label(&start, &end);
            (
                EventTime::from_zoned(start),
                Some(EventTime::from_zoned(end)),
                day,
                range,
            )
        }
        RawSchedule::AllDay { date, end } => (
            EventTime::from_date(date),
            end.map(EventTime::from_date),
            date_label(date, today),
            ALL_DAY_LABEL.to_string(),
        ),
    };

    Ok(NormalizedEvent {
        id: raw.id.clone(),
        title: effective_title(raw),
        start,
        end,
        date_label,
        time_label,
        location: raw
            .location
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string),
        attendees: other_attendees(raw),
        meeting_link: resolve_meeting_link(raw),
        calendar_url: raw.html_link.clone(),
    })
}

/// Normalizes a batch of raw events, preserving their order.
///
/// Cancelled events are dropped. Malformed events are handled per `policy`.
pub fn normalize_batch(
    raws: &[RawEvent],
    display_tz: &Tz,
    reference: DateTime<Utc>,
    policy: MalformedPolicy,
) -> Result<NormalizedBatch, MalformedEventError> {
    let mut batch = NormalizedBatch::default();

    for raw in raws.iter().filter(|e| !e.is_cancelled()) {
        match normalize(raw, display_tz, reference) {
            Ok(event) => batch.events.push(event),
            Err(err) if policy == MalformedPolicy::Skip => batch.rejected.push(err),
            Err(err) => return Err(err),
        }
    }

    Ok(batch)
}

fn effective_title(raw: &RawEvent) -> String {
    raw.summary
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(UNTITLED_EVENT)
        .to_string()
}

/// Attendee emails in source order, without the authenticated user.
fn other_attendees(raw: &RawEvent) -> Vec<String> {
    raw.attendees
        .iter()
        .filter(|a| !a.is_self)
        .map(|a| a.email.trim())
        .filter(|email| !email.is_empty())
        .map(str::to_string)
        .collect()
}

/// Picks at most one meeting link.
///
/// The first video entry point of the conference data wins whatever its
/// domain; only when there is none is the description scanned, and then the
/// first well-formed URL is taken.
fn resolve_meeting_link(raw: &RawEvent) -> Option<EventLink> {
    let structured = raw
        .conference_data
        .iter()
        .flat_map(|conf| &conf.entry_points)
        .find_map(|ep| ep.video_uri());

    match structured {
        Some(uri) => Some(EventLink::new(uri, LinkSource::ConferenceData)),
        None => raw
            .description
            .as_deref()
            .and_then(first_url_in_text)
            .map(|url| EventLink::new(url, LinkSource::Description)),
    }
}

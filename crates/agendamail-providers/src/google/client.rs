//! Google Calendar API client.
//!
//! Low-level HTTP access to the Calendar API v3 events and calendar-list
//! endpoints: request building, status mapping, pagination and conversion
//! to [`RawEvent`].

use std::time::Duration;

use agendamail_core::TimeWindow;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::raw_event::{RawAttendee, RawConferenceData, RawEntryPoint, RawEvent, RawEventTime};

/// Base URL for Google Calendar API v3.
const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Google Calendar API client.
#[derive(Debug)]
pub struct GoogleCalendarClient {
    http_client: reqwest::Client,
    access_token: String,
}

impl GoogleCalendarClient {
    /// Creates a new Google Calendar client with the given access token.
    pub fn new(access_token: impl Into<String>, timeout: Duration) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("agendamail/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProviderError::internal("failed to create HTTP client").with_source(e))?;

        Ok(Self {
            http_client,
            access_token: access_token.into(),
        })
    }

    /// Lists the events of a calendar that overlap `window`, ordered by start
    /// time, with recurring events expanded.
    pub async fn list_events(
        &self,
        calendar_id: &str,
        window: &TimeWindow,
        max_results: Option<usize>,
    ) -> ProviderResult<Vec<RawEvent>> {
        let mut all_events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .list_events_page(calendar_id, window, max_results, page_token.as_deref())
                .await?;

            all_events.extend(page.items.into_iter().filter_map(convert_event));

            if let Some(max) = max_results
                && all_events.len() >= max
            {
                all_events.truncate(max);
                break;
            }

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!("fetched {} events from calendar {}", all_events.len(), calendar_id);
        Ok(all_events)
    }

    /// Fetches a single page of events.
    async fn list_events_page(
        &self,
        calendar_id: &str,
        window: &TimeWindow,
        max_results: Option<usize>,
        page_token: Option<&str>,
    ) -> ProviderResult<EventListResponse> {
        let url = format!(
            "{}/calendars/{}/events",
            CALENDAR_API_BASE,
            urlencoding::encode(calendar_id)
        );

        let mut request = self
            .http_client
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&[
                ("timeMin", window.start.to_rfc3339()),
                ("timeMax", window.end.to_rfc3339()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
            ]);

        if let Some(max) = max_results {
            request = request.query(&[("maxResults", max.to_string())]);
        }

        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token.to_string())]);
        }

        let body = send(request).await?;
        parse_event_list(&body)
    }

    /// Lists the calendars visible to the authorized account.
    pub async fn list_calendars(&self) -> ProviderResult<Vec<CalendarListEntry>> {
        let url = format!("{}/users/me/calendarList", CALENDAR_API_BASE);
        let mut calendars = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.http_client.get(&url).bearer_auth(&self.access_token);
            if let Some(token) = page_token.as_deref() {
                request = request.query(&[("pageToken", token)]);
            }

            let page = parse_calendar_list(&send(request).await?)?;
            calendars.extend(page.items);

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!("found {} calendars", calendars.len());
        Ok(calendars)
    }
}

/// Sends a request and returns the body of a successful response.
async fn send(request: reqwest::RequestBuilder) -> ProviderResult<String> {
    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            ProviderError::network("request timeout")
        } else if e.is_connect() {
            ProviderError::network(format!("connection failed: {}", e))
        } else {
            ProviderError::network(format!("request failed: {}", e))
        }
    })?;

    let status = response.status();
    let retry_after = response
        .headers()
        .get("Retry-After")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok());

    let body = response
        .text()
        .await
        .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

    match status_error(status, retry_after, &body) {
        Some(err) => Err(err),
        None => Ok(body),
    }
}

/// Maps a non-success HTTP status to a provider error.
fn status_error(
    status: reqwest::StatusCode,
    retry_after: Option<u64>,
    body: &str,
) -> Option<ProviderError> {
    match status {
        s if s.is_success() => None,
        reqwest::StatusCode::UNAUTHORIZED => Some(ProviderError::authentication(
            "access token expired or invalid",
        )),
        reqwest::StatusCode::FORBIDDEN => {
            Some(ProviderError::authorization("access denied to calendar"))
        }
        reqwest::StatusCode::TOO_MANY_REQUESTS => Some(ProviderError::rate_limited(format!(
            "rate limit exceeded{}",
            retry_after
                .map(|s| format!(", retry after {} seconds", s))
                .unwrap_or_default()
        ))),
        s => Some(ProviderError::server(format!("API error ({}): {}", s, body))),
    }
}

fn parse_event_list(body: &str) -> ProviderResult<EventListResponse> {
    serde_json::from_str(body)
        .map_err(|e| ProviderError::invalid_response(format!("failed to parse response: {}", e)))
}

fn parse_calendar_list(body: &str) -> ProviderResult<CalendarListResponse> {
    serde_json::from_str(body).map_err(|e| {
        ProviderError::invalid_response(format!("failed to parse calendar list: {}", e))
    })
}

/// Converts a Google Calendar API event to a RawEvent.
///
/// Cancelled events and events without an id are dropped. Times are passed
/// through untouched; the normalizer validates them.
fn convert_event(event: ApiEvent) -> Option<RawEvent> {
    if event.status.as_deref() == Some("cancelled") {
        return None;
    }

    let Some(id) = event.id else {
        warn!("skipping event without id");
        return None;
    };

    let attendees = event
        .attendees
        .unwrap_or_default()
        .into_iter()
        .filter_map(|a| {
            Some(RawAttendee {
                email: a.email?,
                display_name: a.display_name,
                is_self: a.is_self.unwrap_or(false),
            })
        })
        .collect();

    let conference_data = event.conference_data.map(|cd| RawConferenceData {
        solution_name: cd.conference_solution.map(|cs| cs.name),
        entry_points: cd
            .entry_points
            .unwrap_or_default()
            .into_iter()
            .map(|ep| RawEntryPoint {
                entry_point_type: ep.entry_point_type,
                uri: ep.uri,
                label: ep.label,
            })
            .collect(),
    });

    let mut raw_event = RawEvent::new(id, event.start.into(), event.end.into());
    raw_event.summary = event.summary;
    raw_event.description = event.description;
    raw_event.location = event.location;
    raw_event.status = event.status;
    raw_event.html_link = event.html_link;
    raw_event.attendees = attendees;
    raw_event.conference_data = conference_data;

    Some(raw_event)
}

/// Response from the events.list endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    #[serde(default)]
    items: Vec<ApiEvent>,
    next_page_token: Option<String>,
}

/// Response from the calendarList.list endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarListResponse {
    #[serde(default)]
    items: Vec<CalendarListEntry>,
    next_page_token: Option<String>,
}

/// A calendar the account can read.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarListEntry {
    /// The value to put in `calendar.id`.
    pub id: String,
    #[serde(default)]
    pub summary: String,
    pub description: Option<String>,
    #[serde(default)]
    pub primary: bool,
    /// `owner`, `writer`, `reader` or `freeBusyReader`.
    pub access_role: Option<String>,
    pub time_zone: Option<String>,
}

/// A single event from the Google Calendar API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEvent {
    id: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    location: Option<String>,
    #[serde(default)]
    start: ApiEventTime,
    #[serde(default)]
    end: ApiEventTime,
    html_link: Option<String>,
    status: Option<String>,
    attendees: Option<Vec<ApiAttendee>>,
    conference_data: Option<ApiConferenceData>,
}

/// Event time from the API.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEventTime {
    date: Option<String>,
    date_time: Option<String>,
    time_zone: Option<String>,
}

impl From<ApiEventTime> for RawEventTime {
    fn from(time: ApiEventTime) -> Self {
        Self {
            date: time.date,
            date_time: time.date_time,
            time_zone: time.time_zone,
        }
    }
}

/// Attendee from the API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiAttendee {
    email: Option<String>,
    display_name: Option<String>,
    #[serde(rename = "self")]
    is_self: Option<bool>,
}

/// Conference data from the API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiConferenceData {
    conference_solution: Option<ApiConferenceSolution>,
    entry_points: Option<Vec<ApiEntryPoint>>,
}

#[derive(Debug, Deserialize)]
struct ApiConferenceSolution {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEntryPoint {
    entry_point_type: String,
    uri: Option<String>,
    label: Option<String>,
}

//! Meeting URL extraction and classification.
//!
//! This module provides functionality to:
//! - Find the first well-formed HTTP(S) URL in free text (event descriptions)
//! - Classify a URL by video conferencing service for display
//!
//! Classification never influences which URL is selected.
//!
//! # Example
//!
//! ```
//! use agendamail_core::links::{detect_link_kind, first_url_in_text};
//! use agendamail_core::LinkKind;
//!
//! let url = first_url_in_text("join: https://zoom.us/j/123 now").unwrap();
//! assert_eq!(url, "https://zoom.us/j/123");
//! assert_eq!(detect_link_kind(&url), LinkKind::Zoom);
//! ```

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::event::LinkKind;

/// Regex for extracting URLs from text; a match ends at whitespace, a double
/// quote or an angle bracket.
static URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s<>"]+"#).expect("Invalid URL regex"));

/// Regex for detecting Zoom meeting URLs (including Zoom for Government).
static ZOOM_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://([^/]*\.)?(zoom\.us|zoomgov\.com)(/|$)").expect("Invalid Zoom regex")
});

/// Regex for detecting Google Meet URLs.
static MEET_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://meet\.google\.com(/|$)").expect("Invalid Meet regex"));

/// Regex for detecting Microsoft Teams meeting URLs.
static TEAMS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://teams\.(microsoft\.com|live\.com)(/|$)").expect("Invalid Teams regex")
});

/// Regex for detecting Jitsi Meet URLs.
static JITSI_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://meet\.jit\.si(/|$)").expect("Invalid Jitsi regex"));

/// Regex for detecting Cisco Webex URLs.
static WEBEX_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://([^/]*\.)?webex\.com(/|$)").expect("Invalid Webex regex")
});

/// Returns the first well-formed HTTP(S) URL in `text`.
///
/// Candidates that do not parse as a URL with a host are skipped.
pub fn first_url_in_text(text: &str) -> Option<String> {
    URL_REGEX
        .find_iter(text)
        .map(|m| m.as_str())
        .find(|candidate| is_well_formed(candidate))
        .map(str::to_string)
}

fn is_well_formed(candidate: &str) -> bool {
    Url::parse(candidate)
        .map(|url| url.host_str().is_some_and(|h| !h.is_empty()))
        .unwrap_or(false)
}

/// Classifies a meeting URL by service.
pub fn detect_link_kind(url: &str) -> LinkKind {
    let lower = url.to_lowercase();
    if ZOOM_REGEX.is_match(&lower) {
        LinkKind::Zoom
    } else if MEET_REGEX.is_match(&lower) {
        LinkKind::GoogleMeet
    } else if TEAMS_REGEX.is_match(&lower) {
        LinkKind::Teams
    } else if JITSI_REGEX.is_match(&lower) {
        LinkKind::Jitsi
    } else if WEBEX_REGEX.is_match(&lower) {
        LinkKind::Webex
    } else {
        LinkKind::Other
    }
}

//! Core types: time, events, display labels, meeting links, tracing

pub mod event;
pub mod format;
pub mod links;
pub mod time;
pub mod tracing;

pub use event::{EventLink, LinkKind, LinkSource, NormalizedEvent, UNTITLED_EVENT};
pub use format::{ALL_DAY_LABEL, TODAY_LABEL, clock_12h, date_label, html_escape, long_date, time_range_label};
pub use links::{detect_link_kind, first_url_in_text};
pub use time::{
    EventTime, MAX_WINDOW_HOURS, TimeWindow, UnknownTimeZone, WindowOutOfRange, civil_date,
    parse_timezone,
};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};

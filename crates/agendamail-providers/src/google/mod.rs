//! Google Calendar source.
//!
//! Reads one calendar through the Calendar API v3 using a stored
//! authorized-user token. [`OAuthClient::authorize`] runs the interactive
//! consent step that creates the token file; the scheduled job only loads
//! it, refreshes it when expired and writes it back.
//!
//! # Example
//!
//! ```ignore
//! use agendamail_providers::google::{GoogleConfig, GoogleProvider};
//!
//! let config = GoogleConfig::new(GoogleConfig::default_token_path())
//!     .with_calendar_id("primary");
//! let provider = GoogleProvider::new(config);
//!
//! let window = TimeWindow::rolling_hours(now, 48)?;
//! let events = provider.fetch_events(window).await?;
//! ```

mod client;
mod config;
mod oauth;
mod provider;
mod tokens;

pub use client::{CalendarListEntry, GoogleCalendarClient};
pub use config::{GoogleConfig, OAuthCredentials};
pub use oauth::{CALENDAR_READONLY_SCOPE, OAuthClient, PkceFlow, RefreshedToken};
pub use provider::{GoogleProvider, StoredCredentials};
pub use tokens::{TokenInfo, TokenStorage};

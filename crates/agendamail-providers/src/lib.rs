//! Calendar sources and the event normalizer.
//!
//! - [`CalendarProvider`] - lists raw events for a time window
//! - [`CredentialProvider`] - supplies access tokens to a source
//! - [`RawEvent`] - vendor-neutral event record as fetched
//! - [`normalize`] / [`normalize_batch`] - turn raw records into display-ready events
//! - [`ProviderError`] / [`MalformedEventError`] - source and record failures
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  Google API     │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐   CredentialProvider
//! │ GoogleProvider  │◄── StoredCredentials
//! └────────┬────────┘
//!          │ CalendarProvider
//!          ▼
//!   ┌─────────────┐
//!   │  RawEvent   │
//!   └──────┬──────┘
//!          │ normalize_batch()
//!          ▼
//! ┌──────────────────┐
//! │ NormalizedEvent  │
//! └──────────────────┘
//! ```

pub mod error;
pub mod google;
pub mod normalize;
pub mod provider;
pub mod raw_event;

// Re-export main types at crate root
pub use error::{
    Boundary, MalformedEventError, MalformedReason, ProviderError, ProviderErrorCode,
    ProviderResult,
};
pub use normalize::{MalformedPolicy, NormalizedBatch, normalize, normalize_batch};
pub use provider::{AccessToken, BoxFuture, CalendarProvider, CredentialProvider};
pub use raw_event::{
    RawAttendee, RawConferenceData, RawEntryPoint, RawEvent, RawEventTime, RawSchedule,
};

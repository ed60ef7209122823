//! Calendar source and credential traits.
//!
//! - [`CalendarProvider`]: lists raw events in a time window
//! - [`CredentialProvider`]: hands out a valid access token, refreshing as needed

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use agendamail_core::TimeWindow;

use crate::error::ProviderResult;
use crate::raw_event::RawEvent;

/// A boxed future for async trait methods.
///
/// Boxed futures keep the traits object-safe.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// An OAuth access token. Its value is never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the bearer value.
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Supplies access tokens for a calendar source.
///
/// Implementations refresh expired tokens internally; callers never inspect
/// what is behind the token.
pub trait CredentialProvider: Send + Sync {
    /// Returns a token valid for at least the next request.
    fn access_token(&self) -> BoxFuture<'_, ProviderResult<AccessToken>>;
}

/// A source of calendar events.
///
/// # Example Implementation
///
/// ```ignore
/// impl CalendarProvider for GoogleProvider {
///     fn name(&self) -> &str { "google" }
///
///     fn fetch_events(&self, window: TimeWindow) -> BoxFuture<'_, ProviderResult<Vec<RawEvent>>> {
///         Box::pin(async move {
///             // Fetch from Google Calendar API
///             Ok(events)
///         })
///     }
/// }
/// ```
pub trait CalendarProvider: Send + Sync {
    /// Returns the name/type of this provider (e.g., "google").
    fn name(&self) -> &str;

    /// Fetches the events starting in `window`, ordered by start time.
    ///
    /// Recurring events arrive expanded into instances. Pagination is handled
    /// internally.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` on network errors, authentication failures, etc.
    fn fetch_events(&self, window: TimeWindow) -> BoxFuture<'_, ProviderResult<Vec<RawEvent>>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ProviderError, ProviderErrorCode};
    use crate::raw_event::RawEventTime;
    use chrono::{TimeZone, Utc};

    struct FixedProvider(Vec<RawEvent>);

    impl CalendarProvider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        fn fetch_events(
            &self,
            _window: TimeWindow,
        ) -> BoxFuture<'_, ProviderResult<Vec<RawEvent>>> {
            let events = self.0.clone();
            Box::pin(async move { Ok(events) })
        }
    }

    struct Revoked;

    impl CredentialProvider for Revoked {
        fn access_token(&self) -> BoxFuture<'_, ProviderResult<AccessToken>> {
            Box::pin(async { Err(ProviderError::authentication("token revoked")) })
        }
    }

    #[test]
    fn access_token_is_redacted() {
        let token = AccessToken::new("ya29.secret");
        assert_eq!(token.secret(), "ya29.secret");
        assert_eq!(format!("{token:?}"), "AccessToken(***)");
    }

    #[tokio::test]
    async fn providers_are_object_safe() {
        let event = RawEvent::new(
            "evt-1",
            RawEventTime::date_time("2025-02-05T10:00:00Z"),
            RawEventTime::date_time("2025-02-05T11:00:00Z"),
        );
        let provider: Box<dyn CalendarProvider> = Box::new(FixedProvider(vec![event.clone()]));
        let now = Utc.with_ymd_and_hms(2025, 2, 5, 9, 0, 0).unwrap();

        let events = provider
            .fetch_events(TimeWindow::rolling_hours(now, 48).unwrap())
            .await
            .unwrap();
        assert_eq!(provider.name(), "fixed");
        assert_eq!(events, vec![event]);

        let credentials: Box<dyn CredentialProvider> = Box::new(Revoked);
        let err = credentials.access_token().await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::AuthenticationFailed);
    }
}

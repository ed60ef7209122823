//! Google Calendar provider implementation.
//!
//! [`StoredCredentials`] implements [`CredentialProvider`] on top of the token
//! file; [`GoogleProvider`] implements [`CalendarProvider`] for one calendar.

use std::sync::Arc;
use std::time::Duration;

use agendamail_core::TimeWindow;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{AccessToken, BoxFuture, CalendarProvider, CredentialProvider};
use crate::raw_event::RawEvent;

use super::client::{CalendarListEntry, GoogleCalendarClient};
use super::config::{GoogleConfig, OAuthCredentials};
use super::oauth::OAuthClient;
use super::tokens::{TokenInfo, TokenStorage};

/// Access tokens backed by the authorized-user token file.
///
/// The file is read on first use and cached. Expired tokens are refreshed
/// with the client credentials stored in the file, or the fallback ones,
/// and the refreshed token is written back.
pub struct StoredCredentials {
    storage: TokenStorage,
    fallback: Option<OAuthCredentials>,
    timeout: Duration,
    cache: Mutex<Option<TokenInfo>>,
}

impl StoredCredentials {
    pub fn new(storage: TokenStorage, fallback: Option<OAuthCredentials>, timeout: Duration) -> Self {
        Self {
            storage,
            fallback,
            timeout,
            cache: Mutex::new(None),
        }
    }

    /// Builds the credential source described by a Google configuration.
    pub fn from_config(config: &GoogleConfig) -> Self {
        Self::new(
            TokenStorage::new(&config.token_path),
            config.credentials.clone(),
            config.timeout,
        )
    }

    async fn valid_token(&self) -> ProviderResult<AccessToken> {
        let mut cache = self.cache.lock().await;
        let mut tokens = match cache.take() {
            Some(tokens) => tokens,
            None => self.storage.load()?,
        };

        if tokens.is_expired() {
            let Some(refresh_token) = tokens.refresh_token.clone() else {
                return Err(ProviderError::authentication(
                    "access token expired and no refresh token is stored; run `agendamail auth google --force`",
                ));
            };

            let credentials = tokens
                .client_credentials()
                .or_else(|| self.fallback.clone())
                .ok_or_else(|| {
                    ProviderError::configuration(
                        "no OAuth client credentials available to refresh the access token",
                    )
                })?;

            debug!("refreshing expired access token");
            let oauth = OAuthClient::new(credentials, self.timeout)?;
            let refreshed = oauth.refresh(&refresh_token).await?;
            tokens.update_access_token(refreshed.access_token, refreshed.expires_in, Utc::now());
            self.storage.save(&tokens)?;
        }

        let token = AccessToken::new(&tokens.access_token);
        *cache = Some(tokens);
        Ok(token)
    }
}

impl CredentialProvider for StoredCredentials {
    fn access_token(&self) -> BoxFuture<'_, ProviderResult<AccessToken>> {
        Box::pin(self.valid_token())
    }
}

/// Google Calendar provider.
pub struct GoogleProvider {
    config: GoogleConfig,
    credentials: Arc<dyn CredentialProvider>,
}

impl GoogleProvider {
    /// Creates a provider that reads tokens from the configured token file.
    pub fn new(config: GoogleConfig) -> Self {
        let credentials = Arc::new(StoredCredentials::from_config(&config));
        Self::with_credentials(config, credentials)
    }

    /// Creates a provider with an explicit credential source.
    pub fn with_credentials(config: GoogleConfig, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            config,
            credentials,
        }
    }

    /// Returns the provider configuration.
    pub fn config(&self) -> &GoogleConfig {
        &self.config
    }

    /// Lists the calendars the stored token can read.
    pub async fn list_calendars(&self) -> ProviderResult<Vec<CalendarListEntry>> {
        self.calendars()
            .await
            .map_err(|e| e.with_provider(self.name()))
    }

    async fn calendars(&self) -> ProviderResult<Vec<CalendarListEntry>> {
        let token = self.credentials.access_token().await?;
        let client = GoogleCalendarClient::new(token.secret(), self.config.timeout)?;
        client.list_calendars().await
    }

    async fn fetch(&self, window: TimeWindow) -> ProviderResult<Vec<RawEvent>> {
        let token = self.credentials.access_token().await?;
        let client = GoogleCalendarClient::new(token.secret(), self.config.timeout)?;
        let events = client
            .list_events(&self.config.calendar_id, &window, self.config.max_results)
            .await?;
        info!(
            "fetched {} events from {} between {} and {}",
            events.len(),
            self.config.calendar_id,
            window.start,
            window.end
        );
        Ok(events)
    }
}

impl CalendarProvider for GoogleProvider {
    fn name(&self) -> &str {
        "google"
    }

    fn fetch_events(&self, window: TimeWindow) -> BoxFuture<'_, ProviderResult<Vec<RawEvent>>> {
        Box::pin(async move {
            self.fetch(window)
                .await
                .map_err(|e| e.with_provider(self.name()))
        })
    }
}

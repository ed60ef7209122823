//! Google Calendar source configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ProviderError, ProviderResult};

/// OAuth 2.0 client credentials, needed to refresh access tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthCredentials {
    /// The OAuth 2.0 client ID from Google Cloud Console.
    pub client_id: String,
    /// The OAuth 2.0 client secret from Google Cloud Console.
    pub client_secret: String,
}

/// Structure of Google's OAuth credentials JSON file.
///
/// Supports multiple formats:
/// 1. Google Cloud Console format with "installed" or "web" section
/// 2. Flat format with client_id and client_secret at root level
#[derive(Debug, Deserialize)]
struct GoogleCredentialsFile {
    installed: Option<NestedCredentials>,
    web: Option<NestedCredentials>,
    client_id: Option<String>,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NestedCredentials {
    client_id: String,
    client_secret: String,
}

impl OAuthCredentials {
    /// Creates new OAuth credentials.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Loads OAuth credentials from a Google Cloud Console JSON file.
    ///
    /// A missing file is reported as a missing prerequisite.
    pub fn from_file(path: impl AsRef<Path>) -> ProviderResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ProviderError::missing_prerequisite(format!(
                "credentials file not found at {}",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProviderError::configuration(format!("failed to read credentials file: {}", e))
        })?;
        Self::from_json(&content)
    }

    /// Parses OAuth credentials from a Google credentials JSON string.
    pub fn from_json(json: &str) -> ProviderResult<Self> {
        let file: GoogleCredentialsFile = serde_json::from_str(json).map_err(|e| {
            ProviderError::configuration(format!("failed to parse credentials JSON: {}", e))
        })?;

        if let Some(creds) = file.installed.or(file.web) {
            return Ok(Self::new(creds.client_id, creds.client_secret));
        }

        if let (Some(client_id), Some(client_secret)) = (file.client_id, file.client_secret) {
            return Ok(Self::new(client_id, client_secret));
        }

        Err(ProviderError::configuration(
            "credentials file must contain 'installed'/'web' section or 'client_id'/'client_secret' at root level",
        ))
    }
}

/// Configuration for the Google Calendar source.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    /// The calendar to read, `primary` by default.
    pub calendar_id: String,

    /// Path of the authorized-user token file.
    pub token_path: PathBuf,

    /// Client credentials used when the token file does not carry its own.
    pub credentials: Option<OAuthCredentials>,

    /// Upper bound on the number of events fetched.
    pub max_results: Option<usize>,

    /// Request timeout.
    pub timeout: Duration,
}

impl GoogleConfig {
    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Creates a configuration for the given token file.
    pub fn new(token_path: impl Into<PathBuf>) -> Self {
        Self {
            calendar_id: "primary".to_string(),
            token_path: token_path.into(),
            credentials: None,
            max_results: None,
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Returns the default token path, `~/.config/agendamail/token.json`.
    pub fn default_token_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("agendamail")
            .join("token.json")
    }

    /// Sets the calendar to read.
    pub fn with_calendar_id(mut self, id: impl Into<String>) -> Self {
        self.calendar_id = id.into();
        self
    }

    /// Sets the fallback client credentials.
    pub fn with_credentials(mut self, credentials: OAuthCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Caps the number of fetched events.
    pub fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = Some(max);
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;

    #[test]
    fn config_defaults_and_builders() {
        let config = GoogleConfig::new("/tmp/token.json");
        assert_eq!(config.calendar_id, "primary");
        assert!(config.credentials.is_none());
        assert_eq!(config.timeout, Duration::from_secs(30));

        let config = config
            .with_calendar_id("team@example.com")
            .with_max_results(50)
            .with_timeout(Duration::from_secs(5))
            .with_credentials(OAuthCredentials::new("id", "secret"));
        assert_eq!(config.calendar_id, "team@example.com");
        assert_eq!(config.max_results, Some(50));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.credentials.unwrap().client_id, "id");
    }

    #[test]
    fn default_token_path_is_under_agendamail() {
        let path = GoogleConfig::default_token_path();
        assert!(path.ends_with("agendamail/token.json"));
    }

    #[test]
    fn credentials_from_json_installed() {
        let json = r#"{
            "installed": {
                "client_id": "test-id.apps.googleusercontent.com",
                "client_secret": "test-secret",
                "project_id": "my-project"
            }
        }"#;

        let creds = OAuthCredentials::from_json(json).unwrap();
        assert_eq!(creds.client_id, "test-id.apps.googleusercontent.com");
        assert_eq!(creds.client_secret, "test-secret");
    }

    #[test]
    fn credentials_from_json_web() {
        let json = r#"{"web": {"client_id": "web-id", "client_secret": "web-secret"}}"#;
        let creds = OAuthCredentials::from_json(json).unwrap();
        assert_eq!(creds, OAuthCredentials::new("web-id", "web-secret"));
    }

    #[test]
    fn credentials_from_authorized_user_file() {
        let json = r#"{
            "client_id": "flat-id.apps.googleusercontent.com",
            "client_secret": "flat-secret",
            "token": "some-token",
            "refresh_token": "some-refresh-token"
        }"#;

        let creds = OAuthCredentials::from_json(json).unwrap();
        assert_eq!(creds.client_id, "flat-id.apps.googleusercontent.com");
    }

    #[test]
    fn credentials_from_json_invalid() {
        let err = OAuthCredentials::from_json(r#"{ "other": {} }"#).unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::ConfigurationError);
        assert!(err.message().contains("client_id"));

        let err = OAuthCredentials::from_json("not json").unwrap_err();
        assert!(err.message().contains("parse"));
    }

    #[test]
    fn credentials_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = OAuthCredentials::from_file(dir.path().join("credentials.json")).unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::MissingPrerequisite);
    }
}

//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/agendamail/config.toml` by default. Every section is optional.
//!
//! Secret values (`smtp.password`, `google.client_id`, `google.client_secret`)
//! support secret references:
//! - `pass::path/in/store` resolved via `pass show`
//! - `env::VAR_NAME` resolved from the environment
//! - plain text used as-is
//!
//! A handful of environment variables override the file, see
//! [`ClientConfig::apply_env_overrides`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use agendamail_core::{MAX_WINDOW_HOURS, TracingConfig, TracingOutputFormat, parse_timezone};
use agendamail_mailer::{MAX_ATTEMPTS, RetryPolicy, SmtpSecurity};
use agendamail_providers::MalformedPolicy;
use agendamail_providers::google::{GoogleConfig, OAuthCredentials};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::Level;

use crate::error::{AppError, AppResult};
use crate::secret;

const REDACTED: &str = "***";

/// Configuration for the agendamail batch job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Which calendar to read and how far ahead.
    pub calendar: CalendarSettings,

    /// Google credentials and token location.
    pub google: GoogleSettings,

    /// Outgoing mail server.
    pub smtp: SmtpSettings,

    /// Recipient and retry behaviour.
    pub delivery: DeliverySettings,

    /// Handling of records with unusable start/end data.
    pub normalize: NormalizeSettings,

    /// Log output.
    pub logging: LoggingSettings,
}

/// Calendar selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarSettings {
    /// Calendar to read.
    pub calendar_id: String,

    /// Look-ahead window in hours.
    pub window_hours: u32,

    /// IANA zone used for labels.
    pub timezone: String,

    /// Upper bound on fetched events.
    pub max_results: Option<usize>,
}

impl Default for CalendarSettings {
    fn default() -> Self {
        Self {
            calendar_id: "primary".to_string(),
            window_hours: 48,
            timezone: "America/New_York".to_string(),
            max_results: None,
        }
    }
}

/// Google Calendar access.
///
/// OAuth client credentials are only needed to refresh an expired token and
/// may also be stored inside the token file itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleSettings {
    /// Google Cloud Console credentials JSON.
    pub credentials_file: Option<PathBuf>,

    /// Authorized-user token file.
    pub token_path: Option<PathBuf>,

    /// OAuth client ID (supports `pass::` and `env::` prefixes).
    pub client_id: Option<String>,

    /// OAuth client secret (supports `pass::` and `env::` prefixes).
    pub client_secret: Option<String>,

    /// HTTP timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for GoogleSettings {
    fn default() -> Self {
        Self {
            credentials_file: None,
            token_path: None,
            client_id: None,
            client_secret: None,
            timeout_secs: GoogleConfig::DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Outgoing SMTP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub security: SmtpSecurity,

    /// Account name, also used as the sender address.
    pub username: Option<String>,

    /// Account password (supports `pass::` and `env::` prefixes).
    pub password: Option<String>,

    /// Display name of the sender.
    pub from_name: String,

    pub timeout_secs: u64,
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            host: "smtp.gmail.com".to_string(),
            port: 587,
            security: SmtpSecurity::Starttls,
            username: None,
            password: None,
            from_name: "Calendar Digest".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Recipient and retry behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliverySettings {
    /// Address the digest is sent to.
    pub recipient: Option<String>,

    /// Name used in the greeting.
    pub recipient_name: String,

    pub max_attempts: u32,

    /// Wait before the second attempt; doubles after each failure.
    pub base_delay_secs: u64,
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self {
            recipient: None,
            recipient_name: "there".to_string(),
            max_attempts: MAX_ATTEMPTS,
            base_delay_secs: agendamail_mailer::DEFAULT_BASE_DELAY.as_secs(),
        }
    }
}

/// Normalization settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeSettings {
    /// `skip` drops malformed records, `abort` fails the batch.
    pub on_malformed: MalformedPolicy,
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// trace, debug, info, warn or error.
    pub level: String,

    /// compact, pretty or json.
    pub format: String,

    /// Also append log lines to this file.
    pub file: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
            file: None,
        }
    }
}

/// Configuration with secrets resolved and values checked.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub timezone: Tz,
    pub window_hours: u32,
    pub google: GoogleConfig,
    pub on_malformed: MalformedPolicy,
    pub recipient_name: String,
    /// `None` in dry-run mode.
    pub delivery: Option<DeliveryConfig>,
}

/// Everything needed to send the digest.
#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    pub smtp: agendamail_mailer::SmtpSettings,
    pub from_name: String,
    pub from_address: String,
    pub recipient: String,
    pub retry: RetryPolicy,
}

impl ClientConfig {
    /// Loads configuration from `path`, or from the default path if it exists.
    ///
    /// Without an explicit path and without a default file, defaults are used
    /// so that the environment alone can configure a run.
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let path = Self::default_path();
                if path.exists() {
                    Self::load_from(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("failed to read config {}: {}", path.display(), e))
        })?;
        toml::from_str(&content).map_err(|e| {
            AppError::Config(format!("failed to parse config {}: {}", path.display(), e))
        })
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("agendamail")
    }

    /// Overrides file values with environment variables.
    ///
    /// | variable          | setting                 |
    /// |-------------------|-------------------------|
    /// | `CALENDAR_ID`     | `calendar.calendar_id`  |
    /// | `TIMEZONE`        | `calendar.timezone`     |
    /// | `SMTP_USER`       | `smtp.username`         |
    /// | `SMTP_PASSWORD`   | `smtp.password`         |
    /// | `RECIPIENT_EMAIL` | `delivery.recipient`    |
    /// | `LOG_LEVEL`       | `logging.level`         |
    ///
    /// Empty values are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("CALENDAR_ID") {
            self.calendar.calendar_id = v;
        }
        if let Some(v) = get("TIMEZONE") {
            self.calendar.timezone = v;
        }
        if let Some(v) = get("SMTP_USER") {
            self.smtp.username = Some(v);
        }
        if let Some(v) = get("SMTP_PASSWORD") {
            self.smtp.password = Some(v);
        }
        if let Some(v) = get("RECIPIENT_EMAIL") {
            self.delivery.recipient = Some(v);
        }
        if let Some(v) = get("LOG_LEVEL") {
            self.logging.level = v;
        }
    }

    /// Checks everything a sending run needs.
    pub fn validate(&self) -> AppResult<()> {
        self.validate_calendar()?;
        self.validate_delivery()
    }

    fn validate_calendar(&self) -> AppResult<()> {
        self.timezone()?;
        if !(1..=MAX_WINDOW_HOURS).contains(&self.calendar.window_hours) {
            return Err(AppError::Config(format!(
                "calendar.window_hours must be between 1 and {}, got {}",
                MAX_WINDOW_HOURS, self.calendar.window_hours
            )));
        }
        if self.calendar.max_results == Some(0) {
            return Err(AppError::Config(
                "calendar.max_results must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_delivery(&self) -> AppResult<()> {
        if is_blank(&self.delivery.recipient) {
            return Err(AppError::Config(
                "delivery.recipient is not set (or set RECIPIENT_EMAIL)".to_string(),
            ));
        }
        if is_blank(&self.smtp.username) {
            return Err(AppError::Config(
                "smtp.username is not set (or set SMTP_USER)".to_string(),
            ));
        }
        if is_blank(&self.smtp.password) {
            return Err(AppError::Config(
                "smtp.password is not set (or set SMTP_PASSWORD)".to_string(),
            ));
        }
        if !(1..=MAX_ATTEMPTS).contains(&self.delivery.max_attempts) {
            return Err(AppError::Config(format!(
                "delivery.max_attempts must be between 1 and {}, got {}",
                MAX_ATTEMPTS, self.delivery.max_attempts
            )));
        }
        if self.smtp.port == 0 {
            return Err(AppError::Config("smtp.port must not be 0".to_string()));
        }
        Ok(())
    }

    /// Parses the display time zone.
    pub fn timezone(&self) -> AppResult<Tz> {
        parse_timezone(&self.calendar.timezone).map_err(|e| AppError::Config(e.to_string()))
    }

    /// Validates the configuration and resolves secrets.
    ///
    /// A dry run skips everything delivery-related.
    pub fn resolve(&self, dry_run: bool) -> AppResult<ResolvedConfig> {
        self.validate_calendar()?;

        let delivery = if dry_run {
            None
        } else {
            self.validate_delivery()?;
            Some(self.delivery_config()?)
        };

        Ok(ResolvedConfig {
            timezone: self.timezone()?,
            window_hours: self.calendar.window_hours,
            google: self.google_config()?,
            on_malformed: self.normalize.on_malformed,
            recipient_name: self.delivery.recipient_name.clone(),
            delivery,
        })
    }

    /// Token file location, `google.token_path` or the per-user default.
    pub fn token_path(&self) -> PathBuf {
        self.google
            .token_path
            .clone()
            .unwrap_or_else(GoogleConfig::default_token_path)
    }

    /// Builds the Google provider configuration.
    pub fn google_config(&self) -> AppResult<GoogleConfig> {
        let mut config = GoogleConfig::new(self.token_path())
            .with_calendar_id(&self.calendar.calendar_id)
            .with_timeout(Duration::from_secs(self.google.timeout_secs));

        if let Some(max) = self.calendar.max_results {
            config = config.with_max_results(max);
        }
        if let Some(credentials) = self.google.resolve_credentials()? {
            config = config.with_credentials(credentials);
        }
        Ok(config)
    }

    fn delivery_config(&self) -> AppResult<DeliveryConfig> {
        let username = resolve_required("smtp.username", &self.smtp.username)?;
        let password = resolve_required("smtp.password", &self.smtp.password)?;
        let recipient = resolve_required("delivery.recipient", &self.delivery.recipient)?;

        Ok(DeliveryConfig {
            smtp: agendamail_mailer::SmtpSettings {
                host: self.smtp.host.clone(),
                port: self.smtp.port,
                security: self.smtp.security,
                username: username.clone(),
                password,
                timeout: Duration::from_secs(self.smtp.timeout_secs),
            },
            from_name: self.smtp.from_name.clone(),
            from_address: username,
            recipient,
            retry: RetryPolicy::new(
                self.delivery.max_attempts,
                Duration::from_secs(self.delivery.base_delay_secs),
            ),
        })
    }

    /// Builds the tracing configuration. `--debug` wins over the file.
    pub fn tracing_config(&self, debug: bool) -> AppResult<TracingConfig> {
        let config = if debug {
            TracingConfig::cli_debug()
        } else {
            let level: Level = self.logging.level.parse().map_err(|_| {
                AppError::Config(format!("unknown log level: {}", self.logging.level))
            })?;
            let format: TracingOutputFormat =
                self.logging.format.parse().map_err(AppError::Config)?;
            TracingConfig::default().with_level(level).with_format(format)
        };

        Ok(match self.logging.file {
            Some(ref path) => config.with_log_file(path),
            None => config,
        })
    }

    /// Returns a copy with literal secrets masked. References are kept.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        for value in [
            &mut config.smtp.password,
            &mut config.google.client_secret,
        ] {
            if let Some(v) = value.as_mut()
                && !secret::is_reference(v)
            {
                *v = REDACTED.to_string();
            }
        }
        config
    }
}

impl GoogleSettings {
    /// Resolves the fallback OAuth client credentials.
    ///
    /// Inline `client_id`/`client_secret` win over `credentials_file`. Returns
    /// `None` when neither is configured.
    pub fn resolve_credentials(&self) -> AppResult<Option<OAuthCredentials>> {
        match (self.client_id.as_deref(), self.client_secret.as_deref()) {
            (Some(raw_id), Some(raw_secret)) => {
                let id = secret::resolve(raw_id).map_err(|e| {
                    AppError::Config(format!("failed to resolve google.client_id: {}", e))
                })?;
                let secret = secret::resolve(raw_secret).map_err(|e| {
                    AppError::Config(format!("failed to resolve google.client_secret: {}", e))
                })?;
                Ok(Some(OAuthCredentials::new(id, secret)))
            }
            (Some(_), None) => Err(AppError::Config(
                "google.client_secret is missing while google.client_id is set".to_string(),
            )),
            (None, Some(_)) => Err(AppError::Config(
                "google.client_id is missing while google.client_secret is set".to_string(),
            )),
            (None, None) => match self.credentials_file {
                Some(ref path) => Ok(Some(OAuthCredentials::from_file(path)?)),
                None => Ok(None),
            },
        }
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|v| v.trim().is_empty())
}

fn resolve_required(field: &str, value: &Option<String>) -> AppResult<String> {
    let raw = value
        .as_deref()
        .ok_or_else(|| AppError::Config(format!("{} is not set", field)))?;
    let resolved = secret::resolve(raw)
        .map_err(|e| AppError::Config(format!("failed to resolve {}: {}", field, e)))?;
    Ok(resolved.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExitStatus;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn sendable() -> ClientConfig {
        let mut config = ClientConfig::default();
        config.apply_env_overrides(env(&[
            ("SMTP_USER", "digest@example.com"),
            ("SMTP_PASSWORD", "app-password"),
            ("RECIPIENT_EMAIL", "noah@example.com"),
        ]));
        config
    }

    mod parsing {
        use super::*;

        #[test]
        fn defaults() {
            let config = ClientConfig::default();
            assert_eq!(config.calendar.calendar_id, "primary");
            assert_eq!(config.calendar.window_hours, 48);
            assert_eq!(config.calendar.timezone, "America/New_York");
            assert_eq!(config.smtp.host, "smtp.gmail.com");
            assert_eq!(config.smtp.port, 587);
            assert_eq!(config.smtp.security, SmtpSecurity::Starttls);
            assert_eq!(config.delivery.max_attempts, 3);
            assert_eq!(config.delivery.base_delay_secs, 1);
            assert_eq!(config.normalize.on_malformed, MalformedPolicy::Skip);
        }

        #[test]
        fn full_file() {
            let toml_content = r#"
[calendar]
calendar_id = "team@example.com"
window_hours = 24
timezone = "Europe/Paris"
max_results = 100

[google]
token_path = "/var/lib/agendamail/token.json"
client_id = "id.apps.googleusercontent.com"
client_secret = "env::GOOGLE_SECRET"

[smtp]
host = "mail.example.com"
port = 465
security = "tls"
username = "digest@example.com"
password = "pass::mail/digest"

[delivery]
recipient = "noah@example.com"
recipient_name = "Noah"
max_attempts = 2

[normalize]
on_malformed = "abort"

[logging]
level = "debug"
format = "json"
file = "/var/log/agendamail.log"
"#;
            let config: ClientConfig = toml::from_str(toml_content).unwrap();
            assert_eq!(config.calendar.calendar_id, "team@example.com");
            assert_eq!(config.calendar.max_results, Some(100));
            assert_eq!(config.smtp.security, SmtpSecurity::Tls);
            assert_eq!(config.smtp.port, 465);
            assert_eq!(config.smtp.from_name, "Calendar Digest");
            assert_eq!(config.delivery.max_attempts, 2);
            assert_eq!(config.delivery.base_delay_secs, 1);
            assert_eq!(config.normalize.on_malformed, MalformedPolicy::Abort);
            assert_eq!(config.logging.format, "json");
        }

        #[test]
        fn partial_sections_keep_defaults() {
            let config: ClientConfig = toml::from_str("[smtp]\nport = 2525\n").unwrap();
            assert_eq!(config.smtp.port, 2525);
            assert_eq!(config.smtp.host, "smtp.gmail.com");
            assert_eq!(config.calendar.window_hours, 48);
        }

        #[test]
        fn unknown_policy_is_rejected() {
            assert!(toml::from_str::<ClientConfig>("[normalize]\non_malformed = \"ignore\"\n").is_err());
        }

        #[test]
        fn load_from_file() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("config.toml");
            std::fs::write(&path, "[calendar]\nwindow_hours = 12\n").unwrap();

            let config = ClientConfig::load(Some(&path)).unwrap();
            assert_eq!(config.calendar.window_hours, 12);

            std::fs::write(&path, "[calendar\n").unwrap();
            let err = ClientConfig::load(Some(&path)).unwrap_err();
            assert_eq!(err.exit_status(), ExitStatus::Config);

            let err = ClientConfig::load(Some(&dir.path().join("missing.toml"))).unwrap_err();
            assert!(err.to_string().contains("failed to read config"));
        }

        #[test]
        fn dump_round_trips_through_toml() {
            let config = sendable();
            let text = toml::to_string_pretty(&config.redacted()).unwrap();
            let parsed: ClientConfig = toml::from_str(&text).unwrap();
            assert_eq!(parsed.smtp.username.as_deref(), Some("digest@example.com"));
            assert_eq!(parsed.smtp.password.as_deref(), Some("***"));
        }
    }

    mod overrides {
        use super::*;

        #[test]
        fn environment_wins_over_file() {
            let mut config: ClientConfig =
                toml::from_str("[calendar]\ncalendar_id = \"file\"\n").unwrap();
            config.apply_env_overrides(env(&[
                ("CALENDAR_ID", "env@example.com"),
                ("TIMEZONE", "Asia/Tokyo"),
                ("LOG_LEVEL", "warn"),
                ("SMTP_USER", "user@example.com"),
            ]));
            assert_eq!(config.calendar.calendar_id, "env@example.com");
            assert_eq!(config.calendar.timezone, "Asia/Tokyo");
            assert_eq!(config.logging.level, "warn");
            assert_eq!(config.smtp.username.as_deref(), Some("user@example.com"));
        }

        #[test]
        fn empty_values_are_ignored() {
            let mut config = ClientConfig::default();
            config.apply_env_overrides(env(&[("CALENDAR_ID", "  "), ("SMTP_PASSWORD", "")]));
            assert_eq!(config.calendar.calendar_id, "primary");
            assert!(config.smtp.password.is_none());
        }
    }

    mod validation {
        use super::*;

        fn config_error(config: &ClientConfig) -> String {
            let err = config.validate().unwrap_err();
            assert_eq!(err.exit_status(), ExitStatus::Config);
            err.to_string()
        }

        #[test]
        fn complete_config_is_valid() {
            sendable().validate().unwrap();
        }

        #[test]
        fn unknown_timezone() {
            let mut config = sendable();
            config.calendar.timezone = "Mars/Olympus_Mons".into();
            assert!(config_error(&config).contains("Mars/Olympus_Mons"));
        }

        #[test]
        fn zero_window_and_attempts() {
            let mut config = sendable();
            config.calendar.window_hours = 0;
            assert!(config_error(&config).contains("window_hours"));

            let mut config = sendable();
            config.delivery.max_attempts = 0;
            assert!(config_error(&config).contains("max_attempts"));
        }

        #[test]
        fn window_upper_bound() {
            let mut config = sendable();
            config.calendar.window_hours = MAX_WINDOW_HOURS;
            config.validate().unwrap();

            config.calendar.window_hours = u32::MAX;
            assert!(config_error(&config).contains("window_hours"));
            // a dry run checks the window too
            assert_eq!(
                config.resolve(true).unwrap_err().exit_status(),
                ExitStatus::Config
            );
        }

        #[test]
        fn attempts_upper_bound() {
            let mut config = sendable();
            config.delivery.max_attempts = MAX_ATTEMPTS;
            config.validate().unwrap();

            config.delivery.max_attempts = 10;
            let message = config_error(&config);
            assert!(message.contains("max_attempts"));
            assert!(message.contains("10"));
            assert!(config.resolve(false).is_err());
        }

        #[test]
        fn missing_recipient_and_password() {
            let mut config = sendable();
            config.delivery.recipient = Some(" ".into());
            assert!(config_error(&config).contains("RECIPIENT_EMAIL"));

            let mut config = sendable();
            config.smtp.password = None;
            assert!(config_error(&config).contains("SMTP_PASSWORD"));
        }

        #[test]
        fn dry_run_needs_no_delivery_settings() {
            let resolved = ClientConfig::default().resolve(true).unwrap();
            assert!(resolved.delivery.is_none());
            assert_eq!(resolved.timezone, Tz::America__New_York);
            assert!(ClientConfig::default().resolve(false).is_err());
        }
    }

    mod resolution {
        use super::*;

        #[test]
        fn delivery_settings() {
            let mut config = sendable();
            config.delivery.base_delay_secs = 2;
            let resolved = config.resolve(false).unwrap();
            let delivery = resolved.delivery.unwrap();

            assert_eq!(delivery.smtp.host, "smtp.gmail.com");
            assert_eq!(delivery.smtp.username, "digest@example.com");
            assert_eq!(delivery.smtp.password, "app-password");
            assert_eq!(delivery.from_address, "digest@example.com");
            assert_eq!(delivery.from_name, "Calendar Digest");
            assert_eq!(delivery.recipient, "noah@example.com");
            assert_eq!(delivery.retry.max_attempts(), 3);
            assert_eq!(delivery.retry.base_delay(), Duration::from_secs(2));
        }

        #[test]
        fn password_reference_is_resolved() {
            unsafe {
                std::env::set_var("_AGENDAMAIL_CFG_TEST_PASSWORD", "from-env");
            }
            let mut config = sendable();
            config.smtp.password = Some("env::_AGENDAMAIL_CFG_TEST_PASSWORD".into());
            let delivery = config.resolve(false).unwrap().delivery.unwrap();
            assert_eq!(delivery.smtp.password, "from-env");
            unsafe {
                std::env::remove_var("_AGENDAMAIL_CFG_TEST_PASSWORD");
            }

            config.smtp.password = Some("env::_AGENDAMAIL_CFG_TEST_UNSET".into());
            let err = config.resolve(false).unwrap_err();
            assert_eq!(err.exit_status(), ExitStatus::Config);
        }

        #[test]
        fn google_config() {
            let mut config = ClientConfig::default();
            config.calendar.calendar_id = "team@example.com".into();
            config.calendar.max_results = Some(20);
            config.google.token_path = Some("/tmp/agendamail-token.json".into());

            let google = config.google_config().unwrap();
            assert_eq!(google.calendar_id, "team@example.com");
            assert_eq!(google.max_results, Some(20));
            assert_eq!(google.token_path, PathBuf::from("/tmp/agendamail-token.json"));
            assert!(google.credentials.is_none());
        }

        #[test]
        fn inline_credentials() {
            let settings = GoogleSettings {
                client_id: Some("id.apps.googleusercontent.com".into()),
                client_secret: Some("secret".into()),
                ..Default::default()
            };
            let creds = settings.resolve_credentials().unwrap().unwrap();
            assert_eq!(creds, OAuthCredentials::new("id.apps.googleusercontent.com", "secret"));

            let half = GoogleSettings {
                client_id: Some("id".into()),
                ..Default::default()
            };
            assert!(half.resolve_credentials().is_err());
        }

        #[test]
        fn credentials_file() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("credentials.json");
            std::fs::write(
                &path,
                r#"{"installed": {"client_id": "file-id", "client_secret": "file-secret"}}"#,
            )
            .unwrap();

            let settings = GoogleSettings {
                credentials_file: Some(path),
                ..Default::default()
            };
            let creds = settings.resolve_credentials().unwrap().unwrap();
            assert_eq!(creds.client_id, "file-id");

            let missing = GoogleSettings {
                credentials_file: Some(dir.path().join("nope.json")),
                ..Default::default()
            };
            let err = missing.resolve_credentials().unwrap_err();
            assert_eq!(err.exit_status(), ExitStatus::MissingPrerequisite);
        }

        #[test]
        fn tracing_settings() {
            let mut config = ClientConfig::default();
            config.logging.level = "warn".into();
            config.logging.format = "json".into();
            config.logging.file = Some("/tmp/agendamail.log".into());

            let tracing = config.tracing_config(false).unwrap();
            assert_eq!(tracing.default_level, Level::WARN);
            assert_eq!(tracing.output_format, TracingOutputFormat::Json);
            assert_eq!(tracing.log_file, Some(PathBuf::from("/tmp/agendamail.log")));

            let debug = config.tracing_config(true).unwrap();
            assert_eq!(debug.default_level, Level::DEBUG);
            assert!(debug.log_file.is_some());

            config.logging.level = "loud".into();
            assert!(config.tracing_config(false).is_err());
        }

        #[test]
        fn redaction_keeps_references() {
            let mut config = sendable();
            config.google.client_secret = Some("env::GOOGLE_SECRET".into());
            let redacted = config.redacted();
            assert_eq!(redacted.smtp.password.as_deref(), Some("***"));
            assert_eq!(
                redacted.google.client_secret.as_deref(),
                Some("env::GOOGLE_SECRET")
            );
        }
    }
}

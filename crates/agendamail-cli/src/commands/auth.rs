//! Authentication commands.

use std::path::{Path, PathBuf};
use std::time::Duration;

use agendamail_providers::google::{
    CALENDAR_READONLY_SCOPE, OAuthClient, OAuthCredentials, TokenStorage,
};
use tracing::info;

use crate::config::{ClientConfig, GoogleSettings};
use crate::error::{AppError, AppResult};
use crate::run::block_on;

/// Runs the Google consent flow and writes the token file.
///
/// Client credentials come from `--client-id`/`--client-secret`, then
/// `--credentials-file`, then the `[google]` section of the configuration.
/// They are stored in the token file next to the refresh token.
pub fn google(
    client_id: Option<String>,
    client_secret: Option<String>,
    credentials_file: Option<PathBuf>,
    force: bool,
    port: u16,
    config: &ClientConfig,
) -> AppResult<()> {
    let credentials = resolve_google_credentials(
        client_id,
        client_secret,
        credentials_file.as_deref(),
        &config.google,
    )?;

    let storage = TokenStorage::new(config.token_path());
    if storage.exists() && !force {
        println!("A token already exists at {}.", storage.path().display());
        println!("Use --force to authorize again.");
        return Ok(());
    }

    println!("Google Calendar authorization");
    println!();
    println!("Calendar: {}", config.calendar.calendar_id);
    println!("Token file: {}", storage.path().display());
    println!();
    println!("A browser window will open. Sign in with the account that owns the calendar.");
    println!();

    let oauth = OAuthClient::new(credentials, Duration::from_secs(config.google.timeout_secs))?;
    let scopes = [CALENDAR_READONLY_SCOPE.to_string()];
    let token = block_on(oauth.authorize(&scopes, port))??;
    storage.save(&token)?;

    info!("stored Google token at {}", storage.path().display());
    println!("Authorization complete. Token saved to {}", storage.path().display());
    println!("Run `agendamail calendars` to find a calendar id, or `agendamail --dry-run` to preview a digest.");
    Ok(())
}

/// Picks the OAuth client credentials for the consent flow.
fn resolve_google_credentials(
    client_id: Option<String>,
    client_secret: Option<String>,
    credentials_file: Option<&Path>,
    settings: &GoogleSettings,
) -> AppResult<OAuthCredentials> {
    match (client_id, client_secret) {
        (Some(id), Some(secret)) => return Ok(OAuthCredentials::new(id, secret)),
        (None, None) => {}
        _ => {
            return Err(AppError::Config(
                "both --client-id and --client-secret are required when providing credentials directly"
                    .to_string(),
            ));
        }
    }

    if let Some(path) = credentials_file {
        return OAuthCredentials::from_file(path).map_err(|e| {
            AppError::Config(format!(
                "failed to load credentials from {}: {}",
                path.display(),
                e
            ))
        });
    }

    settings.resolve_credentials()?.ok_or_else(|| {
        AppError::Config(format!(
            "Google OAuth client credentials are required. Provide via:\n  \
             - --client-id and --client-secret (or GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET)\n  \
             - --credentials-file (or GOOGLE_CREDENTIALS_FILE)\n  \
             - google.client_id/client_secret or google.credentials_file in {}",
            ClientConfig::default_path().display()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_credentials(dir: &Path, id: &str) -> PathBuf {
        let path = dir.join("credentials.json");
        std::fs::write(
            &path,
            format!(
                r#"{{"installed": {{"client_id": "{}", "client_secret": "file-secret"}}}}"#,
                id
            ),
        )
        .unwrap();
        path
    }

    mod credentials {
        use super::*;

        #[test]
        fn from_flags() {
            let creds = resolve_google_credentials(
                Some("cli-id".into()),
                Some("cli-secret".into()),
                None,
                &GoogleSettings::default(),
            )
            .unwrap();
            assert_eq!(creds, OAuthCredentials::new("cli-id", "cli-secret"));
        }

        #[test]
        fn flags_win_over_file_and_config() {
            let dir = tempfile::tempdir().unwrap();
            let file = write_credentials(dir.path(), "file-id");
            let settings = GoogleSettings {
                client_id: Some("config-id".into()),
                client_secret: Some("config-secret".into()),
                ..Default::default()
            };
            let creds = resolve_google_credentials(
                Some("cli-id".into()),
                Some("cli-secret".into()),
                Some(&file),
                &settings,
            )
            .unwrap();
            assert_eq!(creds.client_id, "cli-id");
        }

        #[test]
        fn file_wins_over_config() {
            let dir = tempfile::tempdir().unwrap();
            let file = write_credentials(dir.path(), "file-id");
            let settings = GoogleSettings {
                client_id: Some("config-id".into()),
                client_secret: Some("config-secret".into()),
                ..Default::default()
            };
            let creds = resolve_google_credentials(None, None, Some(&file), &settings).unwrap();
            assert_eq!(creds, OAuthCredentials::new("file-id", "file-secret"));
        }

        #[test]
        fn from_config() {
            let settings = GoogleSettings {
                client_id: Some("config-id".into()),
                client_secret: Some("config-secret".into()),
                ..Default::default()
            };
            let creds = resolve_google_credentials(None, None, None, &settings).unwrap();
            assert_eq!(creds, OAuthCredentials::new("config-id", "config-secret"));
        }

        #[test]
        fn partial_flags_fail() {
            let settings = GoogleSettings::default();
            let err = resolve_google_credentials(Some("id".into()), None, None, &settings)
                .unwrap_err();
            assert!(matches!(err, AppError::Config(_)));

            let err = resolve_google_credentials(None, Some("secret".into()), None, &settings)
                .unwrap_err();
            assert!(err.to_string().contains("--client-id"));
        }

        #[test]
        fn missing_file_is_a_config_error() {
            let dir = tempfile::tempdir().unwrap();
            let err = resolve_google_credentials(
                None,
                None,
                Some(&dir.path().join("absent.json")),
                &GoogleSettings::default(),
            )
            .unwrap_err();
            assert!(matches!(err, AppError::Config(_)));
            assert!(err.to_string().contains("absent.json"));
        }

        #[test]
        fn nothing_configured() {
            let err = resolve_google_credentials(None, None, None, &GoogleSettings::default())
                .unwrap_err();
            assert!(matches!(err, AppError::Config(_)));
            assert!(err.to_string().contains("--credentials-file"));
        }
    }

    #[test]
    fn existing_token_is_kept_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let token_path = dir.path().join("token.json");
        std::fs::write(&token_path, r#"{"token": "ya29.kept"}"#).unwrap();

        let mut config = ClientConfig::default();
        config.google.token_path = Some(token_path.clone());

        google(Some("id".into()), Some("secret".into()), None, false, 0, &config).unwrap();
        assert_eq!(
            std::fs::read_to_string(&token_path).unwrap(),
            r#"{"token": "ya29.kept"}"#
        );
    }
}

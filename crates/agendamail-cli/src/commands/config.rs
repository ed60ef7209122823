//! Configuration commands.

use std::path::Path;

use crate::config::ClientConfig;
use crate::error::{AppError, AppResult};

/// Renders the effective configuration as TOML, secrets masked.
pub fn render(config: &ClientConfig) -> AppResult<String> {
    toml::to_string_pretty(&config.redacted())
        .map_err(|e| AppError::Config(format!("failed to serialize config: {}", e)))
}

/// Dump the current configuration to stdout.
pub fn dump(config: &ClientConfig, path: Option<&Path>) -> AppResult<()> {
    let toml_str = render(config)?;
    println!("# config.toml ({})", config_path(path).display());
    println!("{}", toml_str);

    Ok(())
}

/// Validate the configuration for a sending run.
pub fn validate(config: &ClientConfig) -> AppResult<()> {
    config.validate()?;
    if config.google.resolve_credentials()?.is_some() {
        println!("Google client credentials are valid.");
    }

    println!("Configuration is valid.");
    Ok(())
}

/// Show the configuration file path.
pub fn path(path: Option<&Path>) -> AppResult<()> {
    println!("config: {}", config_path(path).display());
    Ok(())
}

fn config_path(explicit: Option<&Path>) -> std::path::PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(ClientConfig::default_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_masks_literal_password() {
        let mut config = ClientConfig::default();
        config.smtp.password = Some("hunter2".into());
        config.google.client_secret = Some("env::GOOGLE_CLIENT_SECRET".into());

        let rendered = render(&config).unwrap();
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("env::GOOGLE_CLIENT_SECRET"));
        assert!(rendered.contains("[calendar]"));
    }

    #[test]
    fn explicit_path_wins() {
        let explicit = Path::new("/etc/agendamail.toml");
        assert_eq!(config_path(Some(explicit)), explicit);
        assert_eq!(config_path(None), ClientConfig::default_path());
    }

    #[test]
    fn validate_reports_missing_recipient() {
        let mut config = ClientConfig::default();
        config.smtp.username = Some("digest@example.com".into());
        config.smtp.password = Some("secret".into());

        let err = validate(&config).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}

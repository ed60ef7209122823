//! CLI, configuration and the digest batch job.
//!
//! This crate provides the `agendamail` command-line interface.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod run;
pub mod secret;

pub use cli::Cli;
pub use error::{AppError, AppResult, ExitStatus};

use agendamail_core::init_tracing;

use cli::{AuthProvider, Command, ConfigAction};
use config::ClientConfig;

/// Loads configuration and dispatches the parsed command line.
pub fn run(cli: Cli) -> AppResult<()> {
    let mut config = ClientConfig::load(cli.config.as_deref())?;
    config.apply_env_overrides(|key| std::env::var(key).ok());
    cli.apply_overrides(&mut config);

    match cli.command {
        Some(Command::Auth { provider }) => {
            init_tracing(config.tracing_config(cli.debug)?)?;
            match provider {
                AuthProvider::Google {
                    client_id,
                    client_secret,
                    credentials_file,
                    force,
                    port,
                } => commands::auth::google(
                    client_id,
                    client_secret,
                    credentials_file,
                    force,
                    port,
                    &config,
                ),
            }
        }
        Some(Command::Calendars) => {
            init_tracing(config.tracing_config(cli.debug)?)?;
            commands::calendars::list(&config)
        }
        Some(Command::Config { action }) => match action {
            ConfigAction::Dump => commands::config::dump(&config, cli.config.as_deref()),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(cli.config.as_deref()),
        },
        None => {
            init_tracing(config.tracing_config(cli.debug)?)?;
            run::execute(&config, cli.dry_run)
        }
    }
}

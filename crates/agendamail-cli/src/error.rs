//! Application errors and process exit codes.

use std::process::ExitCode;

use agendamail_core::{TracingError, WindowOutOfRange};
use agendamail_mailer::DeliveryOutcome;
use agendamail_providers::{MalformedEventError, ProviderError, ProviderErrorCode};
use thiserror::Error;

/// Result type for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Process exit status of a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    /// The digest could not be delivered.
    DeliveryFailed,
    /// A file created outside the job (token, credentials) is missing.
    MissingPrerequisite,
    /// The configuration is incomplete or invalid.
    Config,
    /// Anything else.
    Unclassified,
}

impl ExitStatus {
    pub fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::DeliveryFailed => 1,
            Self::MissingPrerequisite => 2,
            Self::Config => 3,
            Self::Unclassified => 4,
        }
    }
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        ExitCode::from(status.code())
    }
}

/// Errors that end a run.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("missing prerequisite: {0}")]
    MissingPrerequisite(String),

    #[error("configuration error: {0}")]
    Window(#[from] WindowOutOfRange),

    #[error("calendar error: {0}")]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Malformed(#[from] MalformedEventError),

    #[error("delivery failed ({outcome}): {detail}")]
    Delivery {
        outcome: DeliveryOutcome,
        detail: String,
    },

    #[error("failed to initialize logging: {0}")]
    Tracing(#[from] TracingError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Maps the error to the exit status reported to the scheduler.
    pub fn exit_status(&self) -> ExitStatus {
        match self {
            Self::Config(_) | Self::Window(_) | Self::Tracing(_) => ExitStatus::Config,
            Self::MissingPrerequisite(_) => ExitStatus::MissingPrerequisite,
            Self::Provider(err) => match err.code() {
                ProviderErrorCode::MissingPrerequisite => ExitStatus::MissingPrerequisite,
                ProviderErrorCode::ConfigurationError => ExitStatus::Config,
                _ => ExitStatus::Unclassified,
            },
            Self::Delivery { .. } => ExitStatus::DeliveryFailed,
            Self::Malformed(_) | Self::Io(_) => ExitStatus::Unclassified,
        }
    }

    /// A hint printed after the error, when one helps.
    pub fn hint(&self) -> Option<&'static str> {
        match self.exit_status() {
            ExitStatus::MissingPrerequisite => {
                Some("run `agendamail auth google` and check the token and credentials paths")
            }
            ExitStatus::Config => Some("check config.toml and the .env file"),
            _ => None,
        }
    }
}

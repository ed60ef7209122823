//! Error types for calendar sources and event normalization.

use std::fmt;
use thiserror::Error;

/// What went wrong while reaching the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    /// The access token was rejected or could not be refreshed.
    AuthenticationFailed,
    /// The account may not read the calendar.
    AuthorizationFailed,
    /// Connection, TLS or timeout failure.
    NetworkError,
    /// HTTP 429 from the API.
    RateLimited,
    ServerError,
    /// The API answered with something we cannot decode.
    InvalidResponse,
    /// Credentials or settings are unusable as configured.
    ConfigurationError,
    /// A file created outside the job (token, client credentials) does not exist.
    MissingPrerequisite,
    InternalError,
}

impl ProviderErrorCode {
    /// Transient failures a later run may not see again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkError | Self::RateLimited | Self::ServerError
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed => "authentication_failed",
            Self::AuthorizationFailed => "authorization_failed",
            Self::NetworkError => "network_error",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::InvalidResponse => "invalid_response",
            Self::ConfigurationError => "configuration_error",
            Self::MissingPrerequisite => "missing_prerequisite",
            Self::InternalError => "internal_error",
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure while fetching events or obtaining credentials.
///
/// The code decides how the run ends; the message is for humans.
#[derive(Debug, Error)]
pub struct ProviderError {
    code: ProviderErrorCode,
    message: String,
    provider: Option<String>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

macro_rules! constructors {
    ($($name:ident => $code:ident),* $(,)?) => {
        $(
            pub fn $name(message: impl Into<String>) -> Self {
                Self::new(ProviderErrorCode::$code, message)
            }
        )*
    };
}

impl ProviderError {
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider: None,
            source: None,
        }
    }

    constructors! {
        authentication => AuthenticationFailed,
        authorization => AuthorizationFailed,
        network => NetworkError,
        rate_limited => RateLimited,
        server => ServerError,
        invalid_response => InvalidResponse,
        configuration => ConfigurationError,
        missing_prerequisite => MissingPrerequisite,
        internal => InternalError,
    }

    /// Tags the error with the source that raised it (`"google"`).
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn code(&self) -> ProviderErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref provider) = self.provider {
            write!(f, "[{}] ", provider)?;
        }
        write!(f, "{}: {}", self.code, self.message)
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Which side of an event's schedule a problem concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    Start,
    End,
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Start => "start",
            Self::End => "end",
        })
    }
}

/// Why an event's required start/end data could not be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedReason {
    #[error("missing {0} time")]
    Missing(Boundary),

    #[error("unparsable {boundary} time {value:?}")]
    Unparsable { boundary: Boundary, value: String },

    #[error("unknown time zone {zone:?} on {boundary} time")]
    UnknownZone { boundary: Boundary, zone: String },

    #[error("{boundary} time {value:?} does not exist in {zone}")]
    NonexistentLocalTime {
        boundary: Boundary,
        value: String,
        zone: String,
    },

    #[error("timed event has a date-only end")]
    DateOnlyEnd,
}

/// Returned by the normalizer when an event's start or end cannot be
/// resolved. Optional fields never produce this error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("event {event_id} is malformed: {reason}")]
pub struct MalformedEventError {
    /// The provider id of the offending record.
    pub event_id: String,
    pub reason: MalformedReason,
}

impl MalformedEventError {
    pub fn new(event_id: impl Into<String>, reason: MalformedReason) -> Self {
        Self {
            event_id: event_id.into(),
            reason,
        }
    }
}

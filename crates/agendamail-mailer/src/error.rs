//! Error types for message building and delivery.

use thiserror::Error;

/// The class of a failed delivery attempt.
///
/// The class alone decides whether an attempt is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Credentials were rejected. Never retried.
    Authentication,
    /// Connection or protocol failure. Retried while attempts remain.
    Transport,
    /// Anything else. Never retried.
    Unclassified,
}

/// A failed delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected delivery error: {0}")]
    Unclassified(String),
}

impl TransportError {
    /// Returns the failure class of this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Authentication(_) => FailureKind::Authentication,
            Self::Transport(_) => FailureKind::Transport,
            Self::Unclassified(_) => FailureKind::Unclassified,
        }
    }
}

/// Errors building a MIME message from an [`OutgoingMessage`](crate::OutgoingMessage).
#[derive(Debug, Error)]
pub enum MessageError {
    #[error("invalid {field} address '{address}': {source}")]
    InvalidAddress {
        field: &'static str,
        address: String,
        #[source]
        source: lettre::address::AddressError,
    },

    #[error("failed to build message: {0}")]
    Build(#[from] lettre::error::Error),
}

impl From<MessageError> for TransportError {
    fn from(err: MessageError) -> Self {
        Self::Unclassified(err.to_string())
    }
}

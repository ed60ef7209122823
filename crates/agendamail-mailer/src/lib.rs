//! Digest composition and email delivery.
//!
//! - [`compose_digest`] renders a batch of normalized events as a subject,
//!   an HTML body and a plain-text body
//! - [`Mailer`] delivers an [`OutgoingMessage`] through a [`MailTransport`],
//!   retrying transport failures with exponential backoff
//! - [`SmtpMailTransport`] is the production transport

pub mod compose;
pub mod delivery;
pub mod error;
pub mod message;
pub mod smtp;

pub use compose::{ComposedMessage, DigestRequest, compose_digest, subject_line};
pub use delivery::{
    DEFAULT_BASE_DELAY, MAX_ATTEMPTS, DeliveryAttempt, DeliveryOutcome, DeliveryReport,
    MailSession, MailTransport, Mailer, RetryPolicy, Sleeper, ThreadSleep,
};
pub use error::{FailureKind, MessageError, TransportError};
pub use message::OutgoingMessage;
pub use smtp::{SmtpMailTransport, SmtpSecurity, SmtpSession, SmtpSettings};

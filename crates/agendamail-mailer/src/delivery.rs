//! Delivery with bounded retry and exponential backoff.
//!
//! Each attempt opens a fresh [`MailTransport::Session`], sends once and drops
//! the session before the outcome is decided, so no connection outlives its
//! attempt. The retry decision depends only on the [`FailureKind`]:
//!
//! | failure          | effect                                        |
//! |------------------|-----------------------------------------------|
//! | authentication   | stop, [`DeliveryOutcome::AuthFailed`]         |
//! | transport        | wait `base * 2^(n-1)` and retry while allowed |
//! | unclassified     | stop, [`DeliveryOutcome::Unclassified`]       |
//!
//! Nothing here logs. The caller reads the [`DeliveryReport`].

use std::time::Duration;

use crate::error::{FailureKind, TransportError};
use crate::message::OutgoingMessage;

/// Attempts per message, both the default and the ceiling.
pub const MAX_ATTEMPTS: u32 = 3;

/// Default wait before the second attempt.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// How many attempts are made and how long to wait between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy making between one and [`MAX_ATTEMPTS`] attempts.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.clamp(1, MAX_ATTEMPTS),
            base_delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Wait after failed attempt `failed_attempt` (1-based): 1, 2, 4... units.
    pub fn delay_after(&self, failed_attempt: u32) -> Duration {
        if failed_attempt == 0 {
            return Duration::ZERO;
        }
        let factor = 2u32.saturating_pow(failed_attempt - 1);
        self.base_delay.saturating_mul(factor)
    }
}

/// Blocks the calling thread between attempts.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Sleeps with [`std::thread::sleep`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleep;

impl Sleeper for ThreadSleep {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// An open connection to a mail server.
///
/// Dropping the session closes the connection.
pub trait MailSession {
    fn send(&mut self, message: &OutgoingMessage) -> Result<(), TransportError>;
}

/// Opens mail sessions.
pub trait MailTransport {
    type Session: MailSession;

    /// Opens a new session. Called once per attempt.
    fn connect(&self) -> Result<Self::Session, TransportError>;
}

/// Terminal result of a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The server accepted the message.
    Sent,
    /// The server rejected the credentials.
    AuthFailed,
    /// Every allowed attempt failed with a transport error.
    TransportExhausted,
    /// An error outside the known classes stopped delivery.
    Unclassified,
}

impl DeliveryOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::AuthFailed => "auth_failed",
            Self::TransportExhausted => "transport_exhausted",
            Self::Unclassified => "unclassified",
        }
    }
}

impl std::fmt::Display for DeliveryOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One attempt of a delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryAttempt {
    /// 1-based attempt number.
    pub number: u32,
    /// Time waited before this attempt started.
    pub backoff: Duration,
    /// The error this attempt ended with, `None` if it succeeded.
    pub error: Option<TransportError>,
}

/// What happened during [`Mailer::send`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub outcome: DeliveryOutcome,
    pub attempts: Vec<DeliveryAttempt>,
}

impl DeliveryReport {
    /// The error of the final attempt, if it failed.
    pub fn last_error(&self) -> Option<&TransportError> {
        self.attempts.last().and_then(|a| a.error.as_ref())
    }

    /// Sum of all waits between attempts.
    pub fn total_backoff(&self) -> Duration {
        self.attempts.iter().map(|a| a.backoff).sum()
    }
}

/// Sends messages through a transport, retrying transient failures.
#[derive(Debug)]
pub struct Mailer<T, S = ThreadSleep> {
    transport: T,
    policy: RetryPolicy,
    sleeper: S,
}

impl<T: MailTransport> Mailer<T> {
    /// Creates a mailer that sleeps the calling thread between attempts.
    pub fn new(transport: T, policy: RetryPolicy) -> Self {
        Self::with_sleeper(transport, policy, ThreadSleep)
    }
}

impl<T: MailTransport, S: Sleeper> Mailer<T, S> {
    pub fn with_sleeper(transport: T, policy: RetryPolicy, sleeper: S) -> Self {
        Self {
            transport,
            policy,
            sleeper,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Delivers `message` to its recipient.
    ///
    /// Never fails: every failure ends up in the returned report.
    pub fn send(&self, message: &OutgoingMessage) -> DeliveryReport {
        let mut attempts = Vec::new();
        let mut backoff = Duration::ZERO;

        for number in 1..=self.policy.max_attempts {
            if !backoff.is_zero() {
                self.sleeper.sleep(backoff);
            }

            let result = self.attempt(message);
            let kind = result.as_ref().err().map(TransportError::kind);
            attempts.push(DeliveryAttempt {
                number,
                backoff,
                error: result.err(),
            });

            let outcome = match kind {
                None => Some(DeliveryOutcome::Sent),
                Some(FailureKind::Authentication) => Some(DeliveryOutcome::AuthFailed),
                Some(FailureKind::Unclassified) => Some(DeliveryOutcome::Unclassified),
                Some(FailureKind::Transport) => None,
            };
            if let Some(outcome) = outcome {
                return DeliveryReport { outcome, attempts };
            }

            backoff = self.policy.delay_after(number);
        }

        DeliveryReport {
            outcome: DeliveryOutcome::TransportExhausted,
            attempts,
        }
    }

    fn attempt(&self, message: &OutgoingMessage) -> Result<(), TransportError> {
        let mut session = self.transport.connect()?;
        session.send(message)
    }
}

//! SMTP transport built on lettre.
//!
//! A new [`SmtpTransport`] is built for every attempt and no connection pool
//! is configured, so each session connects, authenticates, sends and quits.

use std::time::Duration;

use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::{self, SmtpTransport};
use lettre::Transport;
use serde::{Deserialize, Serialize};

use crate::delivery::{MailSession, MailTransport};
use crate::error::TransportError;
use crate::message::OutgoingMessage;

/// SMTP reply codes that mean the credentials were refused.
const AUTH_REPLY_CODES: [u16; 3] = [530, 534, 535];

/// How the connection to the server is secured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmtpSecurity {
    /// Plain connection upgraded with STARTTLS (port 587).
    #[default]
    Starttls,
    /// Implicit TLS from the first byte (port 465).
    Tls,
    /// No encryption. Only for local relays.
    Plain,
}

/// Connection settings for an SMTP server.
#[derive(Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub security: SmtpSecurity,
    pub username: String,
    pub password: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("security", &self.security)
            .field("username", &self.username)
            .field("password", &"***")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// [`MailTransport`] over SMTP.
#[derive(Debug, Clone)]
pub struct SmtpMailTransport {
    settings: SmtpSettings,
}

impl SmtpMailTransport {
    pub fn new(settings: SmtpSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &SmtpSettings {
        &self.settings
    }
}

impl MailTransport for SmtpMailTransport {
    type Session = SmtpSession;

    fn connect(&self) -> Result<SmtpSession, TransportError> {
        let s = &self.settings;
        let builder = match s.security {
            SmtpSecurity::Starttls => SmtpTransport::starttls_relay(&s.host).map_err(classify)?,
            SmtpSecurity::Tls => SmtpTransport::relay(&s.host).map_err(classify)?,
            SmtpSecurity::Plain => SmtpTransport::builder_dangerous(&s.host),
        };

        let transport = builder
            .port(s.port)
            .credentials(Credentials::new(s.username.clone(), s.password.clone()))
            .timeout(Some(s.timeout))
            .build();

        Ok(SmtpSession { transport })
    }
}

/// One SMTP attempt. Dropping it releases the underlying connection.
pub struct SmtpSession {
    transport: SmtpTransport,
}

impl MailSession for SmtpSession {
    fn send(&mut self, message: &OutgoingMessage) -> Result<(), TransportError> {
        let mime = message.to_mime()?;
        self.transport.send(&mime).map_err(classify)?;
        Ok(())
    }
}

/// Maps a lettre SMTP error to a delivery failure class.
fn classify(err: smtp::Error) -> TransportError {
    let code = err.status().and_then(|c| c.to_string().parse::<u16>().ok());
    let message = err.to_string();
    classify_parts(code, err.is_client(), &message)
}

fn classify_parts(code: Option<u16>, is_client: bool, message: &str) -> TransportError {
    if code.is_some_and(|c| AUTH_REPLY_CODES.contains(&c)) {
        return TransportError::Authentication(message.to_string());
    }
    if is_client && message.to_ascii_lowercase().contains("authentication") {
        return TransportError::Authentication(message.to_string());
    }
    TransportError::Transport(message.to_string())
}

//! The message handed to delivery.

use lettre::message::{Mailbox, MultiPart};
use lettre::{Address, Message};

use crate::compose::ComposedMessage;
use crate::error::MessageError;

/// A fully composed email, recipient included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    /// Display name of the sender.
    pub from_name: String,
    /// Sender address, usually the SMTP account.
    pub from_address: String,
    /// Recipient address.
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
}

impl OutgoingMessage {
    /// Creates a message from a composed digest.
    pub fn new(
        from_name: impl Into<String>,
        from_address: impl Into<String>,
        to: impl Into<String>,
        composed: ComposedMessage,
    ) -> Self {
        Self {
            from_name: from_name.into(),
            from_address: from_address.into(),
            to: to.into(),
            subject: composed.subject,
            html_body: composed.html_body,
            text_body: composed.text_body,
        }
    }

    /// Builds the MIME message: a `multipart/alternative` with the plain
    /// text part first and the HTML part second.
    pub fn to_mime(&self) -> Result<Message, MessageError> {
        let from = Mailbox::new(
            Some(self.from_name.clone()),
            parse_address("sender", &self.from_address)?,
        );
        let to = Mailbox::new(None, parse_address("recipient", &self.to)?);

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(&self.subject)
            .multipart(MultiPart::alternative_plain_html(
                self.text_body.clone(),
                self.html_body.clone(),
            ))?;
        Ok(message)
    }
}

fn parse_address(field: &'static str, address: &str) -> Result<Address, MessageError> {
    address
        .trim()
        .parse::<Address>()
        .map_err(|source| MessageError::InvalidAddress {
            field,
            address: address.to_string(),
            source,
        })
}

//! SMTP delivery: STARTTLS on the submission port, login with the sender
//! credentials, one multipart (plain text + HTML) message per alert.

use super::{AlertMessage, AlertSink};
use crate::config::AlertConfig;
use crate::error::AlertError;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use std::time::Duration;
use tracing::warn;

pub struct SmtpMailer {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpMailer {
    /// Build the transport; no connection is made until a send or a login check.
    pub fn new(config: &AlertConfig) -> Result<Self, AlertError> {
        let server = config.smtp_server.trim();
        if server.is_empty() {
            return Err(AlertError::MissingSmtpServer);
        }
        let sender = config.sender_email.trim();
        let from = sender
            .parse::<Mailbox>()
            .map_err(|e| AlertError::InvalidAddress(format!("{}: {}", sender, e)))?;
        let transport = SmtpTransport::starttls_relay(server)?
            .port(config.smtp_port)
            .credentials(Credentials::new(
                sender.to_string(),
                config.sender_password.clone(),
            ))
            .timeout(Some(Duration::from_secs(config.timeout_secs.max(1))))
            .build();
        Ok(Self { transport, from })
    }

    /// Assemble the message; recipients that do not parse are skipped.
    pub fn build_message(
        &self,
        message: &AlertMessage,
        recipients: &[String],
    ) -> Result<Message, AlertError> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(message.subject.clone());
        let mut addressed = 0usize;
        for r in recipients {
            match r.parse::<Mailbox>() {
                Ok(mb) => {
                    builder = builder.to(mb);
                    addressed += 1;
                }
                Err(e) => warn!(recipient = %r, error = %e, "skipping recipient"),
            }
        }
        if addressed == 0 {
            return Err(AlertError::NoRecipients);
        }
        Ok(builder.multipart(MultiPart::alternative_plain_html(
            message.text.clone(),
            message.html.clone(),
        ))?)
    }

    /// Connect, upgrade and log in without sending anything.
    pub fn test_connection(&self) -> Result<(), AlertError> {
        if self.transport.test_connection()? {
            Ok(())
        } else {
            Err(AlertError::Rejected("SMTP server did not accept the session".into()))
        }
    }
}

impl AlertSink for SmtpMailer {
    fn deliver(&self, message: &AlertMessage, recipients: &[String]) -> Result<(), AlertError> {
        let email = self.build_message(message, recipients)?;
        self.transport.send(&email)?;
        Ok(())
    }
}

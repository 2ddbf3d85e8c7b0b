//! Outbound alert delivery. [`HttpRelay`] posts to an authenticated HTTP mail
//! relay; the [`AlertSink`] trait lets other transports plug in.

use super::AlertMessage;
use crate::config::AlertConfig;
use crate::error::AlertError;
use serde::Serialize;
use std::time::Duration;

pub trait AlertSink: Send + Sync + 'static {
    fn deliver(&self, message: &AlertMessage, recipients: &[String]) -> Result<(), AlertError>;
}

#[derive(Serialize)]
struct RelayPayload<'a> {
    from: &'a str,
    to: &'a [String],
    subject: &'a str,
    text: &'a str,
    html: &'a str,
}

pub struct HttpRelay {
    client: reqwest::blocking::Client,
    endpoint: String,
    sender_email: String,
    sender_password: String,
}

impl HttpRelay {
    pub fn new(config: &AlertConfig) -> Result<Self, AlertError> {
        let endpoint = config
            .endpoint
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or(AlertError::MissingEndpoint)?;
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .connect_timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            sender_email: config.sender_email.clone(),
            sender_password: config.sender_password.clone(),
        })
    }

    /// Authenticate against the relay without sending anything.
    pub fn test_connection(&self) -> Result<(), AlertError> {
        let res = self
            .client
            .head(&self.endpoint)
            .basic_auth(&self.sender_email, Some(&self.sender_password))
            .send()?;
        if res.status() == reqwest::StatusCode::UNAUTHORIZED
            || res.status() == reqwest::StatusCode::FORBIDDEN
        {
            return Err(AlertError::Rejected(res.status().to_string()));
        }
        Ok(())
    }
}

impl AlertSink for HttpRelay {
    fn deliver(&self, message: &AlertMessage, recipients: &[String]) -> Result<(), AlertError> {
        let payload = RelayPayload {
            from: &self.sender_email,
            to: recipients,
            subject: &message.subject,
            text: &message.text,
            html: &message.html,
        };
        let res = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.sender_email, Some(&self.sender_password))
            .json(&payload)
            .send()?;
        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().unwrap_or_default();
            return Err(AlertError::Rejected(format!("{} {}", status, text)));
        }
        Ok(())
    }
}

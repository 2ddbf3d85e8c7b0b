//! Alert dispatch for elevated tiers.
//!
//! Callers hand an [`Alert`] to [`AlertDispatcher::maybe_alert`] and move on.
//! Delivery happens on one background worker fed by a bounded queue: at most
//! one send is in flight, each alert gets a single attempt, a full queue drops
//! the alert, and every failure ends in a log line.

mod compose;
mod relay;
mod smtp;

pub use compose::{compose, Alert, AlertMessage};
pub use relay::{AlertSink, HttpRelay};
pub use smtp::SmtpMailer;

use crate::config::{AlertConfig, AlertTransport};
use crate::error::AlertError;
use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

/// What happened to an alert request. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStatus {
    /// Tier not elevated
    NotElevated,
    /// Alerts disabled or not configured
    Disabled,
    Queued,
    /// Queue full or worker gone
    Dropped,
}

pub struct AlertDispatcher {
    config: AlertConfig,
    tx: Option<mpsc::Sender<Alert>>,
    worker: Option<JoinHandle<()>>,
}

fn valid_recipients(recipients: &[String]) -> Vec<String> {
    recipients
        .iter()
        .map(|r| r.trim())
        .filter(|r| {
            let mut parts = r.splitn(2, '@');
            matches!((parts.next(), parts.next()), (Some(local), Some(domain)) if !local.is_empty() && !domain.is_empty())
        })
        .map(str::to_string)
        .collect()
}

fn deliver_one(sink: &dyn AlertSink, config: &AlertConfig, alert: &Alert) -> Result<(), AlertError> {
    let recipients = valid_recipients(&config.recipients);
    if recipients.is_empty() {
        return Err(AlertError::NoRecipients);
    }
    let message = compose(alert, &config.dashboard_url);
    sink.deliver(&message, &recipients)
}

impl AlertDispatcher {
    /// Start the worker when alerts are enabled and credentials are present.
    pub fn new(config: AlertConfig, sink: Arc<dyn AlertSink>) -> Self {
        if let Err(e) = Self::check(&config) {
            info!(reason = %e, "alert dispatch inactive");
            return Self::inactive(config);
        }

        let (tx, mut rx) = mpsc::channel::<Alert>(config.queue_capacity.max(1));
        let worker_config = config.clone();
        let worker = std::thread::Builder::new()
            .name("alert-dispatch".into())
            .spawn(move || {
                while let Some(alert) = rx.blocking_recv() {
                    let outcome = catch_unwind(AssertUnwindSafe(|| {
                        deliver_one(sink.as_ref(), &worker_config, &alert)
                    }));
                    match outcome {
                        Ok(Ok(())) => info!(
                            tier = %alert.tier,
                            record_id = alert.record_id.as_deref().unwrap_or("-"),
                            "alert sent"
                        ),
                        Ok(Err(e)) => warn!(
                            tier = %alert.tier,
                            record_id = alert.record_id.as_deref().unwrap_or("-"),
                            error = %e,
                            "alert delivery failed"
                        ),
                        Err(_) => warn!(tier = %alert.tier, "alert sink panicked"),
                    }
                }
                debug!("alert worker stopped");
            });

        match worker {
            Ok(handle) => Self {
                config,
                tx: Some(tx),
                worker: Some(handle),
            },
            Err(e) => {
                warn!(error = %e, "could not start alert worker; alerts disabled");
                Self::inactive(config)
            }
        }
    }

    /// Dispatcher delivering through the transport selected in `config`.
    pub fn from_config(config: AlertConfig) -> Self {
        if let Err(e) = Self::check(&config) {
            info!(reason = %e, "alert dispatch inactive");
            return Self::inactive(config);
        }
        match Self::sink_for(&config) {
            Ok(sink) => Self::new(config, sink),
            Err(e) => {
                warn!(error = %e, "alert transport unavailable; alerts disabled");
                Self::inactive(config)
            }
        }
    }

    fn sink_for(config: &AlertConfig) -> Result<Arc<dyn AlertSink>, AlertError> {
        let sink: Arc<dyn AlertSink> = match config.transport {
            AlertTransport::Smtp => Arc::new(SmtpMailer::new(config)?) as Arc<dyn AlertSink>,
            AlertTransport::Http => Arc::new(HttpRelay::new(config)?),
        };
        Ok(sink)
    }

    pub fn disabled() -> Self {
        Self::inactive(AlertConfig::default())
    }

    fn inactive(config: AlertConfig) -> Self {
        Self {
            config,
            tx: None,
            worker: None,
        }
    }

    fn check(config: &AlertConfig) -> Result<(), AlertError> {
        if !config.enabled {
            return Err(AlertError::Disabled);
        }
        if config.sender_email.trim().is_empty() || config.sender_password.is_empty() {
            return Err(AlertError::MissingCredentials);
        }
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.tx.is_some()
    }

    /// Configuration status, without contacting the server.
    pub fn test_configuration(config: &AlertConfig) -> Result<(), AlertError> {
        Self::check(config)?;
        if valid_recipients(&config.recipients).is_empty() {
            return Err(AlertError::NoRecipients);
        }
        Self::sink_for(config).map(|_| ())
    }

    /// Configuration status, then a live login against the configured transport.
    pub fn test_connection(config: &AlertConfig) -> Result<(), AlertError> {
        Self::test_configuration(config)?;
        match config.transport {
            AlertTransport::Smtp => SmtpMailer::new(config)?.test_connection(),
            AlertTransport::Http => HttpRelay::new(config)?.test_connection(),
        }
    }

    pub fn config(&self) -> &AlertConfig {
        &self.config
    }

    /// Queue an alert for elevated tiers; never blocks, never fails.
    pub fn maybe_alert(&self, alert: Alert) -> DispatchStatus {
        if !alert.tier.is_elevated() {
            return DispatchStatus::NotElevated;
        }
        let Some(ref tx) = self.tx else {
            debug!(tier = %alert.tier, "alerts disabled or not configured");
            return DispatchStatus::Disabled;
        };
        match tx.try_send(alert) {
            Ok(()) => DispatchStatus::Queued,
            Err(TrySendError::Full(alert)) => {
                warn!(tier = %alert.tier, "alert queue full; dropping alert");
                DispatchStatus::Dropped
            }
            Err(TrySendError::Closed(alert)) => {
                warn!(tier = %alert.tier, "alert worker gone; dropping alert");
                DispatchStatus::Dropped
            }
        }
    }

    /// Stop accepting alerts and wait for queued ones to finish.
    pub fn shutdown(mut self) {
        self.tx.take();
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                warn!("alert worker panicked during shutdown");
            }
        }
    }
}

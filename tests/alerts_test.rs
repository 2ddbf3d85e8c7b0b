//! Alert dispatch: gating, bounded queue, failure isolation, message content.

use cyberguard::{
    alerts::{compose, Alert, AlertDispatcher, AlertMessage, AlertSink, DispatchStatus, SmtpMailer},
    classifier::Tier,
    config::{AlertConfig, AlertTransport, AppConfig},
    error::AlertError,
    normalize::extract,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct RecordingSink {
    sent: Mutex<Vec<(AlertMessage, Vec<String>)>>,
}

impl RecordingSink {
    fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

impl AlertSink for RecordingSink {
    fn deliver(&self, message: &AlertMessage, recipients: &[String]) -> Result<(), AlertError> {
        self.sent
            .lock()
            .unwrap()
            .push((message.clone(), recipients.to_vec()));
        Ok(())
    }
}

struct FailingSink {
    calls: AtomicUsize,
}

impl AlertSink for FailingSink {
    fn deliver(&self, _: &AlertMessage, _: &[String]) -> Result<(), AlertError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(AlertError::Rejected("relay said no".into()))
    }
}

/// Panics on the first delivery, succeeds afterwards.
struct PanickyOnceSink {
    calls: AtomicUsize,
}

impl AlertSink for PanickyOnceSink {
    fn deliver(&self, _: &AlertMessage, _: &[String]) -> Result<(), AlertError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            panic!("transport exploded");
        }
        Ok(())
    }
}

/// Blocks each delivery until released; reports when a delivery starts.
struct GateSink {
    started: Mutex<std_mpsc::Sender<()>>,
    release: Mutex<std_mpsc::Receiver<()>>,
}

impl AlertSink for GateSink {
    fn deliver(&self, _: &AlertMessage, _: &[String]) -> Result<(), AlertError> {
        let _ = self.started.lock().unwrap().send(());
        let _ = self.release.lock().unwrap().recv_timeout(Duration::from_secs(5));
        Ok(())
    }
}

fn enabled_config() -> AlertConfig {
    AlertConfig {
        enabled: true,
        endpoint: Some("http://127.0.0.1:9/send".into()),
        sender_email: "soc@example.com".into(),
        sender_password: "app-password".into(),
        recipients: vec!["oncall@example.com".into()],
        ..AlertConfig::default()
    }
}

fn alert(tier: Tier, score: f64) -> Alert {
    let event = "login admin export database delete";
    Alert {
        record_id: Some("42".into()),
        event: event.into(),
        sequence: extract(event),
        tier,
        score,
        timestamp: chrono::Utc::now(),
        user_email: Some("analyst@example.com".into()),
    }
}

#[test]
fn elevated_alert_is_delivered() {
    let sink = Arc::new(RecordingSink::default());
    let dispatcher = AlertDispatcher::new(enabled_config(), sink.clone());
    assert!(dispatcher.is_active());

    assert_eq!(dispatcher.maybe_alert(alert(Tier::Malicious, 0.95)), DispatchStatus::Queued);
    assert_eq!(dispatcher.maybe_alert(alert(Tier::Suspicious, 0.55)), DispatchStatus::Queued);
    dispatcher.shutdown();

    let sent = sink.sent.lock().unwrap();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].0.subject, "Security Alert: MALICIOUS Activity Detected");
    assert_eq!(sent[1].0.subject, "Security Alert: SUSPICIOUS Activity Detected");
    assert_eq!(sent[0].1, vec!["oncall@example.com".to_string()]);
}

#[test]
fn normal_tier_never_alerts() {
    let sink = Arc::new(RecordingSink::default());
    let dispatcher = AlertDispatcher::new(enabled_config(), sink.clone());
    assert_eq!(dispatcher.maybe_alert(alert(Tier::Normal, 0.6)), DispatchStatus::NotElevated);
    dispatcher.shutdown();
    assert_eq!(sink.count(), 0);
}

#[test]
fn disabled_or_unconfigured_does_nothing() {
    let sink = Arc::new(RecordingSink::default());

    let mut off = enabled_config();
    off.enabled = false;
    let dispatcher = AlertDispatcher::new(off, sink.clone());
    assert!(!dispatcher.is_active());
    assert_eq!(dispatcher.maybe_alert(alert(Tier::Malicious, 0.95)), DispatchStatus::Disabled);
    dispatcher.shutdown();

    let mut no_password = enabled_config();
    no_password.sender_password.clear();
    let dispatcher = AlertDispatcher::new(no_password, sink.clone());
    assert_eq!(dispatcher.maybe_alert(alert(Tier::Malicious, 0.95)), DispatchStatus::Disabled);
    dispatcher.shutdown();

    assert_eq!(AlertDispatcher::disabled().maybe_alert(alert(Tier::Malicious, 0.9)), DispatchStatus::Disabled);
    assert_eq!(sink.count(), 0);
}

#[test]
fn test_configuration_reports_problems() {
    assert!(matches!(
        AlertDispatcher::test_configuration(&AlertConfig::default()),
        Err(AlertError::Disabled)
    ));
    let mut no_email = enabled_config();
    no_email.sender_email = "  ".into();
    assert!(matches!(
        AlertDispatcher::test_configuration(&no_email),
        Err(AlertError::MissingCredentials)
    ));
    let mut no_recipients = enabled_config();
    no_recipients.recipients = vec!["not-an-address".into()];
    assert!(matches!(
        AlertDispatcher::test_configuration(&no_recipients),
        Err(AlertError::NoRecipients)
    ));
    let mut no_endpoint = enabled_config();
    no_endpoint.transport = AlertTransport::Http;
    no_endpoint.endpoint = None;
    assert!(matches!(
        AlertDispatcher::test_configuration(&no_endpoint),
        Err(AlertError::MissingEndpoint)
    ));
    assert!(AlertDispatcher::test_configuration(&enabled_config()).is_ok());
}

#[test]
fn failing_sink_is_contained() {
    let sink = Arc::new(FailingSink {
        calls: AtomicUsize::new(0),
    });
    let dispatcher = AlertDispatcher::new(enabled_config(), sink.clone());
    for _ in 0..3 {
        assert_eq!(dispatcher.maybe_alert(alert(Tier::Malicious, 0.9)), DispatchStatus::Queued);
    }
    dispatcher.shutdown();
    assert_eq!(sink.calls.load(Ordering::SeqCst), 3);
}

#[test]
fn worker_survives_panicking_sink() {
    let sink = Arc::new(PanickyOnceSink {
        calls: AtomicUsize::new(0),
    });
    let dispatcher = AlertDispatcher::new(enabled_config(), sink.clone());
    dispatcher.maybe_alert(alert(Tier::Malicious, 0.9));
    dispatcher.maybe_alert(alert(Tier::Malicious, 0.9));
    dispatcher.shutdown();
    assert_eq!(sink.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn full_queue_drops_alert() {
    let (started_tx, started_rx) = std_mpsc::channel();
    let (release_tx, release_rx) = std_mpsc::channel();
    let sink = Arc::new(GateSink {
        started: Mutex::new(started_tx),
        release: Mutex::new(release_rx),
    });
    let config = AlertConfig {
        queue_capacity: 1,
        ..enabled_config()
    };
    let dispatcher = AlertDispatcher::new(config, sink);

    assert_eq!(dispatcher.maybe_alert(alert(Tier::Malicious, 0.9)), DispatchStatus::Queued);
    started_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    // Worker is busy; one slot left in the queue.
    assert_eq!(dispatcher.maybe_alert(alert(Tier::Malicious, 0.9)), DispatchStatus::Queued);
    assert_eq!(dispatcher.maybe_alert(alert(Tier::Malicious, 0.9)), DispatchStatus::Dropped);

    release_tx.send(()).unwrap();
    release_tx.send(()).unwrap();
    dispatcher.shutdown();
}

#[test]
fn invalid_recipients_skip_delivery() {
    let sink = Arc::new(RecordingSink::default());
    let config = AlertConfig {
        recipients: vec!["nobody".into(), "@example.com".into(), "".into()],
        ..enabled_config()
    };
    let dispatcher = AlertDispatcher::new(config, sink.clone());
    assert_eq!(dispatcher.maybe_alert(alert(Tier::Malicious, 0.9)), DispatchStatus::Queued);
    dispatcher.shutdown();
    assert_eq!(sink.count(), 0);
}

#[test]
fn compose_includes_details_and_escapes_html() {
    let mut a = alert(Tier::Malicious, 0.95);
    a.event = "<script>alert('x')</script> admin export".into();
    let msg = compose(&a, "https://dash.example.com/");

    assert_eq!(msg.subject, "Security Alert: MALICIOUS Activity Detected");
    assert!(msg.text.contains("Confidence: 95.0%"));
    assert!(msg.text.contains("User: analyst@example.com"));
    assert!(msg.text.contains("Immediately isolate the affected system"));
    assert!(msg.text.contains("https://dash.example.com/alerts"));
    assert!(!msg.html.contains("<script>"));
    assert!(msg.html.contains("&lt;script&gt;"));
    assert!(msg.html.contains("#dc2626"));
}

#[test]
fn compose_suspicious_without_user() {
    let mut a = alert(Tier::Suspicious, 0.55);
    a.user_email = None;
    let msg = compose(&a, "http://localhost:3000");
    assert_eq!(msg.subject, "Security Alert: SUSPICIOUS Activity Detected");
    assert!(msg.text.contains("Confidence: 55.0%"));
    assert!(!msg.text.contains("User:"));
    assert!(msg.text.contains("Monitor user activity closely"));
}

#[test]
fn smtp_is_the_default_transport() {
    let c = AlertConfig::default();
    assert_eq!(c.transport, AlertTransport::Smtp);
    assert_eq!(c.smtp_server, "smtp.gmail.com");
    assert_eq!(c.smtp_port, 587);

    let mut app = AppConfig::default();
    app.apply_overrides(|k| match k {
        "CYBERGUARD_SMTP_SERVER" => Some("mail.example.com".into()),
        "CYBERGUARD_SMTP_PORT" => Some("2525".into()),
        "CYBERGUARD_ALERT_TRANSPORT" => Some("HTTP".into()),
        _ => None,
    });
    assert_eq!(app.alerts.smtp_server, "mail.example.com");
    assert_eq!(app.alerts.smtp_port, 2525);
    assert_eq!(app.alerts.transport, AlertTransport::Http);

    let mut bad = AppConfig::default();
    bad.apply_overrides(|k| match k {
        "CYBERGUARD_SMTP_PORT" => Some("99999".into()),
        "CYBERGUARD_ALERT_TRANSPORT" => Some("pigeon".into()),
        _ => None,
    });
    assert_eq!(bad.alerts.smtp_port, 587);
    assert_eq!(bad.alerts.transport, AlertTransport::Smtp);
}

#[test]
fn smtp_configuration_checks() {
    let smtp = AlertConfig {
        endpoint: None,
        ..enabled_config()
    };
    assert!(AlertDispatcher::test_configuration(&smtp).is_ok());

    let no_server = AlertConfig {
        smtp_server: " ".into(),
        ..smtp.clone()
    };
    assert!(matches!(
        AlertDispatcher::test_configuration(&no_server),
        Err(AlertError::MissingSmtpServer)
    ));

    let bad_sender = AlertConfig {
        sender_email: "not an address".into(),
        ..smtp
    };
    assert!(matches!(
        AlertDispatcher::test_configuration(&bad_sender),
        Err(AlertError::InvalidAddress(_))
    ));
}

#[test]
fn smtp_message_is_multipart_to_valid_recipients() {
    let mailer = SmtpMailer::new(&enabled_config()).unwrap();
    let msg = compose(&alert(Tier::Malicious, 0.95), "http://localhost:3000");
    let recipients = vec!["oncall@example.com".to_string(), "not an address".to_string()];

    let email = mailer.build_message(&msg, &recipients).unwrap();
    let raw = String::from_utf8_lossy(&email.formatted()).to_string();
    assert!(raw.contains("Subject: Security Alert: MALICIOUS Activity Detected"));
    assert!(raw.contains("From: soc@example.com"));
    assert!(raw.contains("To: oncall@example.com"));
    assert!(raw.contains("multipart/alternative"));
    assert!(raw.contains("text/plain"));
    assert!(raw.contains("text/html"));

    let none = mailer.build_message(&msg, &["still not an address".to_string()]);
    assert!(matches!(none, Err(AlertError::NoRecipients)));
}

#[test]
fn smtp_login_check_fails_without_server() {
    let config = AlertConfig {
        smtp_server: "localhost".into(),
        smtp_port: 9,
        timeout_secs: 2,
        ..enabled_config()
    };
    assert!(AlertDispatcher::test_connection(&config).is_err());
}

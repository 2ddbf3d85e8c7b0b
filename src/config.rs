//! Service configuration: JSON file, then environment overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Backing database for the log store
    pub store: StoreConfig,
    /// Model prior and thresholds
    pub classifier: ClassifierConfig,
    /// Notification for elevated tiers
    pub alerts: AlertConfig,
    /// Upload batch limits
    pub batch: BatchConfig,
    /// Logging
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database file; unreachable → degraded mode for the process lifetime
    pub database: PathBuf,
    /// Secret the event-text encryption key is derived from
    pub secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Optional ONNX model; absent → prototype prior
    pub model_path: Option<PathBuf>,
    /// Hashed feature dimension expected by the model
    pub feature_dim: usize,
    /// Prior leaning thresholds (0.0–1.0); the override table ignores them
    pub suspicious_threshold: f64,
    pub malicious_threshold: f64,
}

/// How alerts leave the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertTransport {
    /// STARTTLS + login against `smtp_server:smtp_port`
    #[default]
    Smtp,
    /// JSON POST to `endpoint`
    Http,
}

impl std::str::FromStr for AlertTransport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "smtp" => Ok(Self::Smtp),
            "http" => Ok(Self::Http),
            other => Err(format!("unknown alert transport: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub enabled: bool,
    pub transport: AlertTransport,
    pub smtp_server: String,
    pub smtp_port: u16,
    /// HTTP mail relay URL
    pub endpoint: Option<String>,
    pub sender_email: String,
    pub sender_password: String,
    pub recipients: Vec<String>,
    /// Pending alerts beyond this are dropped
    pub queue_capacity: usize,
    pub timeout_secs: u64,
    /// Link embedded in alert bodies
    pub dashboard_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Records classified per uploaded file; the rest are dropped
    pub max_records: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        let base = dirs::data_local_dir()
            .map(|d| d.join("cyberguard"))
            .unwrap_or_else(|| PathBuf::from(".cyberguard"));
        Self {
            database: base.join("logs.db"),
            secret: "cyberguard-local-secret".to_string(),
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            feature_dim: 64,
            suspicious_threshold: 0.5,
            malicious_threshold: 0.75,
        }
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            transport: AlertTransport::Smtp,
            smtp_server: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            endpoint: None,
            sender_email: String::new(),
            sender_password: String::new(),
            recipients: Vec::new(),
            queue_capacity: 64,
            timeout_secs: 15,
            dashboard_url: "http://localhost:3000".to_string(),
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { max_records: 100 }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
        }
    }
}

/// Split a comma-separated recipient list, dropping blanks.
pub fn parse_recipients(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

impl AppConfig {
    /// Load from JSON file if present; otherwise return default
    pub fn load(path: &Path) -> Self {
        if path.exists() {
            if let Ok(data) = std::fs::read_to_string(path) {
                if let Ok(c) = serde_json::from_str::<AppConfig>(&data) {
                    return c;
                }
            }
        }
        Self::default()
    }

    /// Load the file, then apply `CYBERGUARD_*` variables from the process environment.
    pub fn from_env(path: &Path) -> Self {
        let mut config = Self::load(path);
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Apply overrides from any key lookup (the environment in production).
    /// Unparsable numeric or transport values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("CYBERGUARD_DATABASE") {
            self.store.database = PathBuf::from(v);
        }
        if let Some(v) = lookup("CYBERGUARD_STORE_SECRET") {
            self.store.secret = v;
        }
        if let Some(v) = lookup("CYBERGUARD_MODEL_PATH") {
            self.classifier.model_path = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("CYBERGUARD_SUSPICIOUS_THRESHOLD").and_then(|v| v.parse().ok()) {
            self.classifier.suspicious_threshold = v;
        }
        if let Some(v) = lookup("CYBERGUARD_MALICIOUS_THRESHOLD").and_then(|v| v.parse().ok()) {
            self.classifier.malicious_threshold = v;
        }
        if let Some(v) = lookup("CYBERGUARD_ALERTS_ENABLED") {
            self.alerts.enabled = parse_flag(&v);
        }
        if let Some(v) = lookup("CYBERGUARD_ALERT_TRANSPORT").and_then(|v| v.parse().ok()) {
            self.alerts.transport = v;
        }
        if let Some(v) = lookup("CYBERGUARD_SMTP_SERVER") {
            self.alerts.smtp_server = v;
        }
        if let Some(v) = lookup("CYBERGUARD_SMTP_PORT").and_then(|v| v.parse().ok()) {
            self.alerts.smtp_port = v;
        }
        if let Some(v) = lookup("CYBERGUARD_ALERT_ENDPOINT") {
            self.alerts.endpoint = Some(v);
        }
        if let Some(v) = lookup("CYBERGUARD_SENDER_EMAIL") {
            self.alerts.sender_email = v;
        }
        if let Some(v) = lookup("CYBERGUARD_SENDER_PASSWORD") {
            self.alerts.sender_password = v;
        }
        if let Some(v) = lookup("CYBERGUARD_ALERT_RECIPIENTS") {
            self.alerts.recipients = parse_recipients(&v);
        }
    }
}

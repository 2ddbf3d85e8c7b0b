//! Analysis pipeline: normalize → classify → save (always) → alert (elevated
//! tiers only, off the request path). Persistence and alert failures never
//! take away a classification that was already computed.

use crate::alerts::{Alert, AlertDispatcher, DispatchStatus};
use crate::classifier::{ClassificationResult, TierClassifier};
use crate::config::{AppConfig, BatchConfig};
use crate::error::AnalyzeError;
use crate::normalize::{self, Sequence};
use crate::store::{LogStore, NewRecord, Statistics};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

/// Outcome for one event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    pub original: String,
    pub sequence: Sequence,
    #[serde(flatten)]
    pub result: ClassificationResult,
    pub log_id: Option<String>,
    /// Set when classification succeeded but the record could not be saved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistence_error: Option<String>,
    pub alert: DispatchStatus,
}

impl Analysis {
    pub fn persisted(&self) -> bool {
        self.log_id.is_some()
    }
}

/// Outcome for one uploaded file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub total_logs: usize,
    /// Extracted records beyond the batch cap, not analyzed
    pub dropped: usize,
    pub statistics: Statistics,
    pub results: Vec<Analysis>,
}

pub struct Pipeline {
    classifier: TierClassifier,
    store: LogStore,
    alerts: AlertDispatcher,
    batch: BatchConfig,
}

impl Pipeline {
    pub fn new(
        classifier: TierClassifier,
        store: LogStore,
        alerts: AlertDispatcher,
        batch: BatchConfig,
    ) -> Self {
        Self {
            classifier,
            store,
            alerts,
            batch,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            TierClassifier::from_config(config.classifier.clone()),
            LogStore::init(&config.store),
            AlertDispatcher::from_config(config.alerts.clone()),
            config.batch.clone(),
        )
    }

    pub fn store(&self) -> &LogStore {
        &self.store
    }

    pub fn classifier(&self) -> &TierClassifier {
        &self.classifier
    }

    pub fn alerts(&self) -> &AlertDispatcher {
        &self.alerts
    }

    fn analyze_sequence(
        &self,
        original: String,
        sequence: Sequence,
        user_email: Option<&str>,
    ) -> Analysis {
        let result = self.classifier.classify(&sequence);

        let saved = self.store.save(NewRecord {
            event: original.clone(),
            sequence: sequence.clone(),
            tier: result.tier,
            score: result.score,
            user_email: user_email.map(str::to_string),
        });
        let (log_id, timestamp, persistence_error) = match saved {
            Ok(record) => (Some(record.id), record.timestamp, None),
            Err(e) => {
                warn!(tier = %result.tier, error = %e, "failed to persist classified event");
                (None, Utc::now(), Some(e.to_string()))
            }
        };

        let alert = self.alerts.maybe_alert(Alert {
            record_id: log_id.clone(),
            event: original.clone(),
            sequence: sequence.clone(),
            tier: result.tier,
            score: result.score,
            timestamp,
            user_email: user_email.map(str::to_string),
        });

        if result.tier.is_elevated() {
            info!(
                log_id = log_id.as_deref().unwrap_or("-"),
                tier = %result.tier,
                score = result.score,
                "elevated event"
            );
        } else {
            debug!(log_id = log_id.as_deref().unwrap_or("-"), score = result.score, "normal event");
        }

        Analysis {
            original,
            sequence,
            result,
            log_id,
            persistence_error,
            alert,
        }
    }

    /// Analyze one raw event. Blank text, or text with nothing left after
    /// normalization, is rejected before anything is stored.
    pub fn analyze_text(&self, text: &str, user_email: Option<&str>) -> Result<Analysis, AnalyzeError> {
        if text.trim().is_empty() {
            return Err(AnalyzeError::EmptyInput);
        }
        // Punctuation-only text cleans down to nothing.
        let sequence = normalize::extract(text);
        if sequence.is_empty() {
            return Err(AnalyzeError::EmptyInput);
        }
        Ok(self.analyze_sequence(text.to_string(), sequence, user_email))
    }

    /// Analyze decoded file content; only the first `batch.max_records`
    /// extracted records are classified and saved.
    pub fn analyze_content(
        &self,
        content: &str,
        is_csv: bool,
        user_email: Option<&str>,
    ) -> Result<BatchReport, AnalyzeError> {
        let entries: Vec<(String, Sequence)> = if is_csv {
            normalize::process_csv(content)
                .into_iter()
                .map(|e| (e.original, e.sequence))
                .collect()
        } else {
            normalize::process_log_file(content)
                .into_iter()
                .map(|e| (e.original, e.sequence))
                .collect()
        };
        if entries.is_empty() {
            return Err(AnalyzeError::NoValidLogs);
        }

        let dropped = entries.len().saturating_sub(self.batch.max_records);
        if dropped > 0 {
            debug!(dropped, cap = self.batch.max_records, "batch cap reached");
        }

        let mut statistics = Statistics::default();
        let results: Vec<Analysis> = entries
            .into_iter()
            .take(self.batch.max_records)
            .map(|(original, sequence)| {
                let analysis = self.analyze_sequence(original, sequence, user_email);
                statistics.add(analysis.result.tier, 1);
                analysis
            })
            .collect();

        Ok(BatchReport {
            total_logs: results.len(),
            dropped,
            statistics,
            results,
        })
    }

    /// Read a file and analyze it; `.csv` files are parsed as CSV.
    pub fn analyze_file(&self, path: &Path, user_email: Option<&str>) -> Result<BatchReport, AnalyzeError> {
        let content = std::fs::read_to_string(path)?;
        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        self.analyze_content(&content, is_csv, user_email)
    }

    /// Stop the alert worker after it drains queued alerts.
    pub fn shutdown(self) {
        self.alerts.shutdown();
    }
}

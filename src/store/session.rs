//! Degraded-mode storage: session writes in process memory, merged with a
//! fixed baseline of demonstration records on every read. Statistics over the
//! merge are a visible approximation, not real aggregation.

use super::{LogFilter, LogRecord, NewRecord, Statistics};
use crate::classifier::Tier;
use crate::normalize::extract;
use chrono::{DateTime, Duration, Utc};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// Baseline records shown while the backing database is unreachable.
const BASELINE: &[(&str, &str, Tier, f64, &str)] = &[
    ("baseline-1", "admin login failed multiple times", Tier::Malicious, 0.98, "system"),
    ("baseline-2", "user login successful", Tier::Normal, 0.60, "mahesh@test.com"),
    ("baseline-3", "suspicious port scanning detected", Tier::Suspicious, 0.75, "network_monitor"),
    ("baseline-4", "file upload: report.pdf", Tier::Normal, 0.60, "hr@company.com"),
    (
        "baseline-5",
        "database export initiated by unauthorized user",
        Tier::Malicious,
        0.95,
        "unknown",
    ),
];

pub struct SessionLog {
    session: Mutex<Vec<LogRecord>>,
    baseline: Vec<LogRecord>,
}

impl SessionLog {
    /// Baseline records are stamped just before `now`, one second apart.
    pub fn new(now: DateTime<Utc>) -> Self {
        let baseline = BASELINE
            .iter()
            .enumerate()
            .map(|(i, (id, event, tier, score, user))| LogRecord {
                id: id.to_string(),
                event: event.to_string(),
                sequence: extract(event),
                tier: *tier,
                score: *score,
                timestamp: now - Duration::seconds(i as i64 + 1),
                user_email: Some(user.to_string()),
            })
            .collect();
        Self {
            session: Mutex::new(Vec::new()),
            baseline,
        }
    }

    fn session(&self) -> MutexGuard<'_, Vec<LogRecord>> {
        self.session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append with an ephemeral id; cannot fail.
    pub fn append(&self, record: NewRecord, ts: DateTime<Utc>) -> LogRecord {
        let stored = LogRecord {
            id: Uuid::new_v4().to_string(),
            event: record.event,
            sequence: record.sequence,
            tier: record.tier,
            score: record.score,
            timestamp: ts,
            user_email: record.user_email,
        };
        self.session().push(stored.clone());
        stored
    }

    /// Session and baseline records matching `filter`, newest first.
    fn merged(&self, filter: &LogFilter) -> Vec<LogRecord> {
        let mut all: Vec<LogRecord> = self
            .session()
            .iter()
            .rev()
            .chain(self.baseline.iter())
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        all.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        all
    }

    pub fn list(&self, limit: usize, filter: &LogFilter) -> Vec<LogRecord> {
        let mut all = self.merged(filter);
        all.truncate(limit);
        all
    }

    pub fn statistics(&self, user_email: Option<&str>) -> Statistics {
        let filter = LogFilter {
            tier: None,
            user_email: user_email.map(str::to_string),
        };
        let mut stats = Statistics {
            approximate: true,
            ..Statistics::default()
        };
        for record in self.merged(&filter) {
            stats.add(record.tier, 1);
        }
        stats
    }
}

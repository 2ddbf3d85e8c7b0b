//! Append-only log of classified events.
//!
//! The store checks its backing database once, at [`LogStore::init`]. If it
//! answers, the store runs ONLINE against it for the rest of the process; if
//! not, it runs DEGRADED on process memory plus a baseline of demonstration
//! records, and stays there until restart.

mod encrypted;
mod session;

pub use encrypted::SecureStore;
pub use session::SessionLog;

use crate::classifier::Tier;
use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::normalize::Sequence;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreMode {
    Online,
    Degraded,
}

/// A classified event as persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    pub id: String,
    pub event: String,
    pub sequence: Sequence,
    #[serde(rename = "prediction")]
    pub tier: Tier,
    pub score: f64,
    pub timestamp: DateTime<Utc>,
    pub user_email: Option<String>,
}

/// Fields supplied by the caller; id and timestamp are assigned on save.
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub event: String,
    pub sequence: Sequence,
    pub tier: Tier,
    pub score: f64,
    pub user_email: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    pub tier: Option<Tier>,
    pub user_email: Option<String>,
}

impl LogFilter {
    pub fn tier(tier: Tier) -> Self {
        Self {
            tier: Some(tier),
            user_email: None,
        }
    }

    pub fn user(email: impl Into<String>) -> Self {
        Self {
            tier: None,
            user_email: Some(email.into()),
        }
    }

    pub fn matches(&self, record: &LogRecord) -> bool {
        self.tier.map_or(true, |t| record.tier == t)
            && self
                .user_email
                .as_deref()
                .map_or(true, |e| record.user_email.as_deref() == Some(e))
    }
}

/// Per-tier counts. `approximate` is set in degraded mode, where counts include
/// the baseline records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub total: u64,
    pub normal: u64,
    pub suspicious: u64,
    pub malicious: u64,
    pub approximate: bool,
}

impl Statistics {
    pub fn add(&mut self, tier: Tier, n: u64) {
        self.total += n;
        match tier {
            Tier::Normal => self.normal += n,
            Tier::Suspicious => self.suspicious += n,
            Tier::Malicious => self.malicious += n,
        }
    }
}

enum Backend {
    Online(SecureStore),
    Degraded(SessionLog),
}

pub struct LogStore {
    backend: Backend,
}

impl LogStore {
    /// Probe the configured database once and pick the mode for the process.
    pub fn init(config: &StoreConfig) -> Self {
        if let Some(parent) = config.database.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(e) = std::fs::create_dir_all(parent) {
                debug!(dir = %parent.display(), error = %e, "could not create database directory");
            }
        }
        match SecureStore::open(&config.database, config.secret.as_bytes()) {
            Ok(store) => {
                info!(database = %config.database.display(), "log store online");
                Self::online(store)
            }
            Err(e) => {
                warn!(
                    database = %config.database.display(),
                    error = %e,
                    "database unreachable; log store running in degraded mode (session data only)"
                );
                Self::degraded()
            }
        }
    }

    pub fn online(store: SecureStore) -> Self {
        Self {
            backend: Backend::Online(store),
        }
    }

    pub fn degraded() -> Self {
        Self {
            backend: Backend::Degraded(SessionLog::new(Utc::now())),
        }
    }

    pub fn mode(&self) -> StoreMode {
        match self.backend {
            Backend::Online(_) => StoreMode::Online,
            Backend::Degraded(_) => StoreMode::Degraded,
        }
    }

    /// Persist one record. Degraded saves always succeed with an ephemeral id;
    /// an online failure is returned and leaves the mode unchanged.
    pub fn save(&self, record: NewRecord) -> Result<LogRecord, StoreError> {
        let ts = Utc::now();
        match &self.backend {
            Backend::Online(store) => {
                let id = store.insert(&record, ts)?;
                Ok(LogRecord {
                    id: id.to_string(),
                    event: record.event,
                    sequence: record.sequence,
                    tier: record.tier,
                    score: record.score,
                    timestamp: ts,
                    user_email: record.user_email,
                })
            }
            Backend::Degraded(log) => Ok(log.append(record, ts)),
        }
    }

    /// Records newest first; every call reads the current state.
    pub fn list(&self, limit: usize, filter: &LogFilter) -> Result<Vec<LogRecord>, StoreError> {
        match &self.backend {
            Backend::Online(store) => store.list(limit, filter),
            Backend::Degraded(log) => Ok(log.list(limit, filter)),
        }
    }

    /// Counts over all records, or those of one user when `scope` is set.
    pub fn statistics(&self, scope: Option<&str>) -> Result<Statistics, StoreError> {
        match &self.backend {
            Backend::Online(store) => store.statistics(scope),
            Backend::Degraded(log) => Ok(log.statistics(scope)),
        }
    }

    /// Delete by id; `false` when no such record exists.
    pub fn delete(&self, id: &str) -> Result<bool, StoreError> {
        match &self.backend {
            Backend::Online(store) => match id.parse::<i64>() {
                Ok(id) => store.delete(id),
                Err(_) => Ok(false),
            },
            Backend::Degraded(_) => Err(StoreError::NotSupported("delete")),
        }
    }

    /// Remove every record; returns how many were deleted.
    pub fn clear(&self) -> Result<u64, StoreError> {
        match &self.backend {
            Backend::Online(store) => store.clear(),
            Backend::Degraded(_) => Err(StoreError::NotSupported("clear")),
        }
    }
}

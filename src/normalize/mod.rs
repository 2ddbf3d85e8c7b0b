//! Sequence normalization: raw log line → bounded, lowercase keyword sequence.
//! Batch helpers for plain log files and CSV exports live in [`batch`].

mod batch;

pub use batch::{process_csv, process_log_file, CsvEntry, LogEntry};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of tokens kept in a sequence.
pub const MAX_SEQUENCE_TOKENS: usize = 20;
/// Length of the cleaned-text fallback when no token survives filtering.
pub const FALLBACK_CHARS: usize = 100;

/// Short, high-signal behavior words kept regardless of length.
const BEHAVIOR_KEYWORDS: &[&str] = &[
    "login", "logout", "admin", "user", "access", "denied", "export", "delete", "modify",
    "create", "read", "write", "database", "file", "system", "config", "password", "sudo",
    "root", "privilege", "escalation", "brute", "force", "attempt", "failed", "success",
    "unauthorized", "forbidden", "error",
];

/// Normalized keyword representation of one raw event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sequence(String);

impl Sequence {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.0.split_whitespace()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Rebuild from an already normalized string (e.g. a stored record).
    pub fn from_normalized(s: impl Into<String>) -> Self {
        Self(s.into())
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lowercase, blank out everything outside `[a-z0-9\s]`, collapse whitespace.
pub fn clean_text(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let replaced: String = lowered
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn keep_token(token: &str) -> bool {
    BEHAVIOR_KEYWORDS.contains(&token) || token.chars().count() > 3
}

/// Extract the behavior sequence for one raw event.
///
/// Tokens pass if they are behavior keywords or longer than three characters;
/// the first [`MAX_SEQUENCE_TOKENS`] survivors are kept. When nothing survives,
/// the first [`FALLBACK_CHARS`] characters of the cleaned text are used instead,
/// so any input with at least one alphanumeric character yields a non-empty
/// sequence.
pub fn extract(raw: &str) -> Sequence {
    let cleaned = clean_text(raw);
    let kept: Vec<&str> = cleaned
        .split(' ')
        .filter(|t| !t.is_empty() && keep_token(t))
        .take(MAX_SEQUENCE_TOKENS)
        .collect();

    if kept.is_empty() {
        let fallback: String = cleaned.chars().take(FALLBACK_CHARS).collect();
        return Sequence(fallback.trim_end().to_string());
    }
    Sequence(kept.join(" "))
}

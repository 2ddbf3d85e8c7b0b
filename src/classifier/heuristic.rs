//! Deterministic keyword override. Counts are substring presence per keyword
//! (`readmin` hits `admin`), and a word in both lists counts toward both.

use super::Tier;
use serde::{Deserialize, Serialize};

pub const MALICIOUS_KEYWORDS: &[&str] = &[
    "delete",
    "admin",
    "root",
    "sudo",
    "export",
    "database",
    "privilege",
    "escalation",
    "unauthorized",
    "brute",
];

pub const SUSPICIOUS_KEYWORDS: &[&str] = &[
    "failed",
    "denied",
    "attempt",
    "retry",
    "error",
    "forbidden",
    "multiple",
];

/// Keyword hit counts for one sequence: `malicious` is M, `suspicious` is S.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KeywordCounts {
    pub malicious: u32,
    pub suspicious: u32,
}

impl KeywordCounts {
    pub fn of(text: &str) -> Self {
        let lower = text.to_lowercase();
        let hits = |set: &[&str]| set.iter().filter(|kw| lower.contains(*kw)).count() as u32;
        Self {
            malicious: hits(MALICIOUS_KEYWORDS),
            suspicious: hits(SUSPICIOUS_KEYWORDS),
        }
    }
}

/// Decision of the override table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub tier: Tier,
    pub score: f64,
    pub counts: KeywordCounts,
}

/// Apply the first matching row of the override table.
pub fn decide(counts: KeywordCounts) -> Verdict {
    let m = counts.malicious as f64;
    let s = counts.suspicious as f64;
    let (tier, score) = if counts.malicious >= 2 {
        (Tier::Malicious, (0.75 + 0.05 * m).min(0.98))
    } else if counts.malicious >= 1 && counts.suspicious >= 1 {
        (Tier::Malicious, (0.70 + 0.05 * m).min(0.95))
    } else if counts.suspicious >= 2 {
        (Tier::Suspicious, (0.55 + 0.05 * s).min(0.85))
    } else if counts.suspicious >= 1 {
        (Tier::Suspicious, (0.50 + 0.05 * s).min(0.75))
    } else {
        (Tier::Normal, (0.60 - 0.10 * m).max(0.40))
    };
    Verdict {
        tier,
        score,
        counts,
    }
}

pub fn apply(text: &str) -> Verdict {
    decide(KeywordCounts::of(text))
}

/// Inclusive score band each tier can take under the table.
pub fn score_band(tier: Tier) -> (f64, f64) {
    match tier {
        Tier::Malicious => (0.75, 0.98),
        Tier::Suspicious => (0.55, 0.85),
        Tier::Normal => (0.40, 0.60),
    }
}

//! Threat tiers and the threshold mapping used for the model's own leaning.

use crate::config::ClassifierConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Normal,
    Suspicious,
    Malicious,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Normal, Tier::Suspicious, Tier::Malicious];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Normal => "normal",
            Tier::Suspicious => "suspicious",
            Tier::Malicious => "malicious",
        }
    }

    /// Tiers above normal trigger notification.
    pub fn is_elevated(&self) -> bool {
        *self != Tier::Normal
    }

    /// Tier implied by class probabilities against the configured thresholds.
    pub fn from_probabilities(suspicious: f64, malicious: f64, config: &ClassifierConfig) -> Self {
        if malicious >= config.malicious_threshold {
            Tier::Malicious
        } else if suspicious + malicious >= config.suspicious_threshold {
            Tier::Suspicious
        } else {
            Tier::Normal
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(Tier::Normal),
            "suspicious" => Ok(Tier::Suspicious),
            "malicious" => Ok(Tier::Malicious),
            other => Err(format!("unknown tier: {}", other)),
        }
    }
}

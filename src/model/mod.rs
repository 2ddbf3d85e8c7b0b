//! Weak prior stage of classification: a three-way text model over sequences.
//!
//! - [`OnnxDetector`]: ONNX Runtime inference over hashed token features
//! - [`PrototypePrior`]: nearest-prototype fallback when no model is configured

mod onnx;
mod prototype;

pub use onnx::OnnxDetector;
pub use prototype::PrototypePrior;

use crate::classifier::Tier;
use crate::config::ClassifierConfig;
use crate::normalize::Sequence;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Probability triple over tiers; always non-negative and summing to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Probabilities {
    pub normal: f64,
    pub suspicious: f64,
    pub malicious: f64,
}

impl Probabilities {
    pub fn uniform() -> Self {
        Self {
            normal: 1.0 / 3.0,
            suspicious: 1.0 / 3.0,
            malicious: 1.0 / 3.0,
        }
    }

    /// Numerically stable softmax over `[normal, suspicious, malicious]` logits.
    pub fn from_logits(logits: [f64; 3]) -> Self {
        if logits.iter().any(|l| !l.is_finite()) {
            return Self::uniform();
        }
        let max = logits.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let exp = logits.map(|l| (l - max).exp());
        Self::from_weights(exp)
    }

    /// Normalize non-negative weights; degenerate input becomes uniform.
    pub fn from_weights(weights: [f64; 3]) -> Self {
        let clean = weights.map(|w| if w.is_finite() && w > 0.0 { w } else { 0.0 });
        let sum: f64 = clean.iter().sum();
        if sum <= 0.0 {
            return Self::uniform();
        }
        Self {
            normal: clean[0] / sum,
            suspicious: clean[1] / sum,
            malicious: clean[2] / sum,
        }
    }

    pub fn get(&self, tier: Tier) -> f64 {
        match tier {
            Tier::Normal => self.normal,
            Tier::Suspicious => self.suspicious,
            Tier::Malicious => self.malicious,
        }
    }

    pub fn sum(&self) -> f64 {
        self.normal + self.suspicious + self.malicious
    }

    /// Most probable tier; ties resolve toward the lower tier.
    pub fn argmax(&self) -> (Tier, f64) {
        Tier::ALL
            .iter()
            .map(|t| (*t, self.get(*t)))
            .fold((Tier::Normal, f64::NEG_INFINITY), |best, cur| {
                if cur.1 > best.1 {
                    cur
                } else {
                    best
                }
            })
    }
}

/// A three-way text classifier used as the weak prior.
pub trait PriorModel: Send + Sync {
    fn name(&self) -> &'static str;

    fn estimate(&self, sequence: &Sequence) -> Probabilities;
}

/// Build the prior from configuration: the ONNX model when one loads,
/// otherwise the prototype classifier.
pub fn load_prior(config: &ClassifierConfig) -> Box<dyn PriorModel> {
    if let Some(path) = config.model_path.as_deref() {
        match OnnxDetector::load(path, config.feature_dim) {
            Ok(detector) if detector.is_loaded() => {
                info!(path = %path.display(), "onnx prior loaded");
                return Box::new(detector);
            }
            Ok(_) => {}
            Err(e) => warn!(path = %path.display(), error = %e, "onnx prior unavailable"),
        }
    }
    info!("using prototype prior");
    Box::new(PrototypePrior::default())
}

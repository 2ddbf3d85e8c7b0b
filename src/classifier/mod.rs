//! Two-stage tier classification: a weak model prior, then the authoritative
//! keyword override. Tier and score always come from the override; the prior's
//! probabilities are returned for observability.

pub mod heuristic;
mod tier;

pub use heuristic::{KeywordCounts, Verdict};
pub use tier::Tier;

use crate::config::ClassifierConfig;
use crate::model::{load_prior, PriorModel, Probabilities};
use crate::normalize::Sequence;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationResult {
    #[serde(rename = "prediction")]
    pub tier: Tier,
    pub score: f64,
    pub probabilities: Probabilities,
    /// Tier the prior alone would pick under the configured thresholds.
    pub prior_tier: Tier,
    pub keyword_counts: KeywordCounts,
}

pub struct TierClassifier {
    prior: Box<dyn PriorModel>,
    config: ClassifierConfig,
}

impl TierClassifier {
    pub fn new(prior: Box<dyn PriorModel>, config: ClassifierConfig) -> Self {
        Self { prior, config }
    }

    pub fn from_config(config: ClassifierConfig) -> Self {
        let prior = load_prior(&config);
        Self::new(prior, config)
    }

    pub fn prior_name(&self) -> &'static str {
        self.prior.name()
    }

    pub fn classify(&self, sequence: &Sequence) -> ClassificationResult {
        let probabilities = self.prior.estimate(sequence);
        let prior_tier = Tier::from_probabilities(
            probabilities.suspicious,
            probabilities.malicious,
            &self.config,
        );

        let verdict = heuristic::apply(sequence.as_str());
        if verdict.tier != prior_tier {
            debug!(
                prior = %prior_tier,
                decided = %verdict.tier,
                model = self.prior.name(),
                "override disagrees with prior"
            );
        }

        ClassificationResult {
            tier: verdict.tier,
            score: verdict.score,
            probabilities,
            prior_tier,
            keyword_counts: verdict.counts,
        }
    }
}

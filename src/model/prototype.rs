//! Nearest-prototype text classifier over labelled behavior sequences.
//! Each class scores as its best token-set Jaccard similarity; scores are
//! softmaxed with a temperature so an unseen sequence stays close to uniform.

use super::{PriorModel, Probabilities};
use crate::classifier::Tier;
use crate::normalize::Sequence;
use std::collections::HashSet;

const TEMPERATURE: f64 = 4.0;

/// Labelled example sequences the prior is built from.
const PROTOTYPES: &[(&str, Tier)] = &[
    ("login user dashboard view logout", Tier::Normal),
    ("user access file read document", Tier::Normal),
    ("login check email send message logout", Tier::Normal),
    ("user view report download file", Tier::Normal),
    ("login user profile update settings", Tier::Normal),
    ("login failed attempt retry password", Tier::Suspicious),
    ("access denied unauthorized attempt", Tier::Suspicious),
    ("multiple login failed brute force", Tier::Suspicious),
    ("user access admin panel denied", Tier::Suspicious),
    ("password reset multiple attempts", Tier::Suspicious),
    ("login admin export database delete", Tier::Malicious),
    ("sudo root privilege escalation system", Tier::Malicious),
    ("admin delete user database export", Tier::Malicious),
    ("unauthorized access system config modify", Tier::Malicious),
    ("brute force login admin delete database", Tier::Malicious),
    ("root access system file delete modify", Tier::Malicious),
    ("admin privilege escalation export database", Tier::Malicious),
];

pub struct PrototypePrior {
    prototypes: Vec<(HashSet<String>, Tier)>,
}

impl Default for PrototypePrior {
    fn default() -> Self {
        Self::new(PROTOTYPES.iter().map(|(s, t)| (s.to_string(), *t)))
    }
}

fn token_set(text: &str) -> HashSet<String> {
    text.split_whitespace().map(str::to_string).collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

impl PrototypePrior {
    pub fn new(examples: impl IntoIterator<Item = (String, Tier)>) -> Self {
        Self {
            prototypes: examples
                .into_iter()
                .map(|(s, t)| (token_set(&s.to_lowercase()), t))
                .collect(),
        }
    }
}

impl PriorModel for PrototypePrior {
    fn name(&self) -> &'static str {
        "prototype"
    }

    fn estimate(&self, sequence: &Sequence) -> Probabilities {
        let tokens = token_set(sequence.as_str());
        let mut best = [0.0f64; 3];
        for (proto, tier) in &self.prototypes {
            let idx = *tier as usize;
            best[idx] = best[idx].max(jaccard(&tokens, proto));
        }
        Probabilities::from_logits(best.map(|s| s * TEMPERATURE))
    }
}

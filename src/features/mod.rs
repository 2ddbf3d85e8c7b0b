//! Numeric features for the model prior: sequence → hashed bag of tokens.

mod hashing;

pub use hashing::TokenHasher;

use serde::{Deserialize, Serialize};

/// Fixed-size feature vector for model input (e.g. 64-dim)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureVector {
    pub dim: usize,
    pub values: Vec<f32>,
}

impl FeatureVector {
    pub fn as_slice(&self) -> &[f32] {
        &self.values[..self.dim.min(self.values.len())]
    }

    pub fn is_zero(&self) -> bool {
        self.values.iter().all(|v| *v == 0.0)
    }
}

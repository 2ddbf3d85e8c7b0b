//! Feature hashing: each token lands in a SHA-256 derived bucket; the vector is
//! L2-normalized so sequence length does not dominate the model input.

use super::FeatureVector;
use crate::normalize::Sequence;
use sha2::{Digest, Sha256};

#[derive(Debug, Clone)]
pub struct TokenHasher {
    dim: usize,
}

impl TokenHasher {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    fn bucket(&self, token: &str) -> usize {
        let digest = Sha256::digest(token.as_bytes());
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        (u64::from_le_bytes(head) % self.dim as u64) as usize
    }

    pub fn vectorize(&self, sequence: &Sequence) -> FeatureVector {
        let mut values = vec![0.0f32; self.dim];
        for token in sequence.tokens() {
            values[self.bucket(token)] += 1.0;
        }
        let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in values.iter_mut() {
                *v /= norm;
            }
        }
        FeatureVector {
            dim: self.dim,
            values,
        }
    }
}

//! ONNX Runtime inference for the tier prior. Input: [1, feature_dim] f32 hashed
//! token features. Output: three logits (or probabilities) in tier order.
//! If the model file is missing the runtime is never loaded and the detector
//! answers from the prototype prior.

use super::{PriorModel, Probabilities, PrototypePrior};
use crate::error::ModelError;
use crate::features::{FeatureVector, TokenHasher};
use crate::normalize::Sequence;
use ndarray::{Array2, CowArray};
use ort::{Environment, SessionBuilder, Value};
use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock};
use tracing::{debug, warn};

static ORT_ENV: OnceLock<Arc<Environment>> = OnceLock::new();

fn init_env() -> Result<Arc<Environment>, ModelError> {
    if let Some(env) = ORT_ENV.get() {
        return Ok(env.clone());
    }
    let env = Environment::builder()
        .with_name("cyberguard")
        .build()
        .map_err(|e| ModelError::Runtime(e.to_string()))?
        .into_arc();
    Ok(ORT_ENV.get_or_init(|| env).clone())
}

pub struct OnnxDetector {
    session: Option<Mutex<ort::Session>>,
    hasher: TokenHasher,
    fallback: PrototypePrior,
}

impl OnnxDetector {
    /// Load model from path. A missing file yields a detector with no session.
    pub fn load(path: &Path, feature_dim: usize) -> Result<Self, ModelError> {
        let hasher = TokenHasher::new(feature_dim);
        if !path.exists() {
            warn!(path = %path.display(), "ONNX model not found; inference disabled");
            return Ok(Self {
                session: None,
                hasher,
                fallback: PrototypePrior::default(),
            });
        }

        let env = init_env()?;
        let session = SessionBuilder::new(&env)
            .and_then(|b| b.with_model_from_file(path))
            .map_err(|e| ModelError::Load {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            session: Some(Mutex::new(session)),
            hasher,
            fallback: PrototypePrior::default(),
        })
    }

    pub fn is_loaded(&self) -> bool {
        self.session.is_some()
    }

    /// Run inference; `None` when no model is loaded or the run fails.
    pub fn predict(&self, features: &FeatureVector) -> Option<Probabilities> {
        let session = self.session.as_ref()?.lock().ok()?;

        let values = features.as_slice();
        let dim = self.hasher.dim().min(values.len());
        let arr = Array2::from_shape_vec((1, dim), values[..dim].to_vec()).ok()?;
        let input = CowArray::from(arr.into_dyn());
        let value = Value::from_array(session.allocator(), &input)
            .map_err(|e| debug!(error = %e, "onnx input rejected"))
            .ok()?;
        let outputs = session
            .run(vec![value])
            .map_err(|e| debug!(error = %e, "onnx run failed"))
            .ok()?;
        let tensor = outputs
            .first()?
            .try_extract::<f32>()
            .map_err(|e| debug!(error = %e, "onnx output not f32"))
            .ok()?;
        let view = tensor.view();
        let raw: Vec<f64> = view.iter().take(3).map(|v| *v as f64).collect();
        if raw.len() < 3 {
            return None;
        }
        let triple = [raw[0], raw[1], raw[2]];

        let sum: f64 = triple.iter().sum();
        let already_normalized =
            triple.iter().all(|p| (0.0..=1.0).contains(p)) && (sum - 1.0).abs() < 1e-3;
        Some(if already_normalized {
            Probabilities::from_weights(triple)
        } else {
            Probabilities::from_logits(triple)
        })
    }
}

impl PriorModel for OnnxDetector {
    fn name(&self) -> &'static str {
        "onnx"
    }

    fn estimate(&self, sequence: &Sequence) -> Probabilities {
        let features = self.hasher.vectorize(sequence);
        self.predict(&features)
            .unwrap_or_else(|| self.fallback.estimate(sequence))
    }
}

//! CyberGuard: behavioral log threat classification and alerting.
//!
//! Modular structure:
//! - [`normalize`]: Raw log line → bounded keyword sequence; log/CSV batches
//! - [`features`]: Hashed token features for the model prior
//! - [`model`]: Weak prior: ONNX inference or prototype classifier
//! - [`classifier`]: Prior + authoritative keyword override → tier and score
//! - [`store`]: Log store, online (encrypted SQLite) or degraded (in memory)
//! - [`alerts`]: Background alert dispatch for elevated tiers
//! - [`pipeline`]: End-to-end analysis of events and files
//! - [`input`]: Stop-aware line streaming for stdin
//! - [`logging`]: Structured JSON logging

pub mod config;
pub mod error;
pub mod normalize;
pub mod features;
pub mod model;
pub mod classifier;
pub mod store;
pub mod alerts;
pub mod pipeline;
pub mod input;
pub mod logging;

pub use config::AppConfig;
pub use normalize::{extract, Sequence};
pub use features::{FeatureVector, TokenHasher};
pub use model::{OnnxDetector, PriorModel, Probabilities, PrototypePrior};
pub use classifier::{ClassificationResult, Tier, TierClassifier};
pub use store::{LogRecord, LogStore, StoreMode};
pub use alerts::{Alert, AlertDispatcher};
pub use pipeline::{Analysis, BatchReport, Pipeline};
pub use logging::StructuredLogger;

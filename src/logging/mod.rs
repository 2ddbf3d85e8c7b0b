//! Structured logging: tracing subscriber setup and ndjson analysis lines.

mod format;

pub use format::{AnalysisLine, StructuredLogger};

//! Structured logging, metrics, and secret redaction for the editor pipeline.

pub mod metrics;
pub mod redact;
pub mod spans;

pub use metrics::{MetricsCollector, NoopMetrics};
pub use redact::RedactedString;

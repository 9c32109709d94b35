//! Pluggable metrics collection for the editor pipeline.

use std::time::Duration;

/// Implemented by anything that wants to observe pipeline behavior.
/// The default [`NoopMetrics`] makes the core zero-cost when unwired.
pub trait MetricsCollector: Send + Sync {
    /// Records the wall-clock time spent in one pipeline run.
    fn record_pipeline_latency_ms(&self, _ms: u64) {}
    /// Records the wall-clock time spent in one ModelClient call.
    fn record_call_latency_ms(&self, _stage: &str, _ms: u64) {}
    /// Increments a named counter (e.g. `"fallback_triggered"`, `"repair_attempted"`).
    fn count_event(&self, _name: &str) {}
}

/// A [`MetricsCollector`] that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsCollector for NoopMetrics {}

/// Converts a [`Duration`] to milliseconds, saturating on overflow.
pub fn duration_to_ms(duration: Duration) -> u64 {
    duration.as_millis().min(u128::from(u64::MAX)) as u64
}

//! Span and field name constants for structured tracing around pipeline stages.

/// Span covering one full `EditorPipeline::run` invocation.
pub const SPAN_PIPELINE_RUN: &str = "editor.pipeline.run";
/// Span covering a single ModelClient call (Strict or Repair).
pub const SPAN_MODEL_CALL: &str = "editor.client.call";
/// Span covering StructureGuard decoding.
pub const SPAN_STRUCTURE_GUARD: &str = "editor.structure_guard.parse";
/// Span covering ModeGuard + DiffGuard safety evaluation.
pub const SPAN_SAFETY_CHECK: &str = "editor.safety.check";
/// Span covering the deterministic fallback post-processor.
pub const SPAN_FALLBACK: &str = "editor.fallback.process";

pub const FIELD_OPERATION_ID: &str = "operation_id";
pub const FIELD_MODE: &str = "mode";
pub const FIELD_BACKEND: &str = "backend";
pub const FIELD_STAGE: &str = "stage";
pub const FIELD_LATENCY_MS: &str = "latency_ms";

/// Opens [`SPAN_PIPELINE_RUN`] with the standard fields populated.
#[macro_export]
macro_rules! pipeline_run_span {
    ($operation_id:expr, $mode:expr) => {
        tracing::info_span!(
            $crate::observability::spans::SPAN_PIPELINE_RUN,
            operation_id = %$operation_id,
            mode = %$mode,
        )
    };
}

/// Opens [`SPAN_MODEL_CALL`] with the standard fields populated.
#[macro_export]
macro_rules! model_call_span {
    ($stage:expr, $backend:expr) => {
        tracing::info_span!(
            $crate::observability::spans::SPAN_MODEL_CALL,
            stage = %$stage,
            backend = %$backend,
        )
    };
}

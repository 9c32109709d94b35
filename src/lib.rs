//! Safety-gated LLM text editor core.
//!
//! Turns raw speech-to-text output into cleaner, mode-appropriate text via a
//! three-stage pipeline: a Strict call to the configured model, a Repair
//! retry if Strict produces something malformed or unsafe, and a
//! deterministic, model-free Fallback that always succeeds. See
//! [`pipeline::EditorPipeline`] for the state machine itself.

pub mod client;
pub mod config;
pub mod debug_sink;
pub mod diff_guard;
pub mod error;
pub mod fallback;
pub mod mode_guard;
pub mod observability;
pub mod pipeline;
pub mod prompt;
pub mod structure_guard;
pub mod types;

pub use client::{HttpModelClient, ModelClient};
pub use config::{default_config, validate_config, Backend, EditorConfig, SecretRef};
pub use debug_sink::DebugSink;
pub use error::{EditorError, Result};
pub use pipeline::{EditRequest, EditorPipeline};
pub use types::{
    mode_constraints, Constraints, DebugRecord, DictionaryTerm, EditOperationId, EditReport,
    EditedText, OutputMode, ParsedOutput, SafetySummary, StageReached,
};

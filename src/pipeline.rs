//! C5 — EditorPipeline: the Strict -> Repair -> Fallback state machine that
//! turns one raw ASR transcript into an [`EditedText`] plus an [`EditReport`]
//! describing how it got there. The pipeline itself cannot fail except via
//! cancellation (§5): every internal error is absorbed and routed onward.

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::client::{CallParams, ModelClient};
use crate::debug_sink::DebugSink;
use crate::diff_guard;
use crate::error::EditorError;
use crate::fallback;
use crate::mode_guard;
use crate::observability::metrics::{MetricsCollector, NoopMetrics};
use crate::prompt::{self, PromptBuilder};
use crate::structure_guard::{self, ParseOutcome};
use crate::types::{
    mode_constraints, DebugRecord, DictionaryTerm, EditOperationId, EditReport, EditedText,
    OutputMode, SafetySummary, StageReached,
};

/// Transcripts shorter than this are returned verbatim with no model call,
/// no guard evaluation, and no debug record.
const BYPASS_MIN_LENGTH: usize = 3;

/// A single request into the pipeline.
#[derive(Debug, Clone)]
pub struct EditRequest {
    pub raw_transcript: String,
    pub mode: OutputMode,
    pub dictionary: Vec<DictionaryTerm>,
}

/// What a Strict/Repair attempt produced: either a passing edit, or the
/// reason it didn't qualify for Repair/Fallback escalation.
enum StageOutcome {
    Passed { text: String, parsed_raw: Option<String>, safety: SafetySummary },
    Rejected { reason: String, raw_model_output: Option<String> },
}

/// Ties together ModelClient, StructureGuard, ModeGuard, DiffGuard, the
/// deterministic fallback, and (optionally) debug persistence.
pub struct EditorPipeline {
    client: Arc<dyn ModelClient>,
    metrics: Arc<dyn MetricsCollector>,
    debug_sink: Option<Arc<DebugSink>>,
    timeout_ms: u64,
}

impl EditorPipeline {
    pub fn new(client: Arc<dyn ModelClient>) -> Self {
        Self { client, metrics: Arc::new(NoopMetrics), debug_sink: None, timeout_ms: 8_000 }
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsCollector>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_debug_sink(mut self, debug_sink: Arc<DebugSink>) -> Self {
        self.debug_sink = Some(debug_sink);
        self
    }

    /// Overrides the Strict-call timeout (the Repair call always uses the
    /// fixed 10s from [`CallParams::repair`]). Defaults to 8s.
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Runs the Strict -> Repair -> Fallback state machine for one request.
    ///
    /// Returns `Err(EditorError::Cancelled)` only when `cancellation` fires;
    /// every other failure mode is absorbed and routed to the next stage,
    /// terminating in a guaranteed-successful Fallback result. Transcripts
    /// shorter than [`BYPASS_MIN_LENGTH`] bypass the pipeline entirely: the
    /// input is returned unchanged with no model call and no debug record.
    pub async fn run(
        &self,
        request: EditRequest,
        cancellation: CancellationToken,
    ) -> Result<(EditedText, EditReport), EditorError> {
        if request.raw_transcript.chars().count() < BYPASS_MIN_LENGTH {
            return Ok(self.bypass(request));
        }

        let operation_id = EditOperationId::new();
        let started = Instant::now();
        let constraints = mode_constraints(request.mode);

        let mut strict_error: Option<String> = None;
        let mut repair_error: Option<String> = None;
        let mut raw_model_output: Option<String> = None;
        let mut safety_summary: Option<SafetySummary> = None;

        if cancellation.is_cancelled() {
            return Err(EditorError::Cancelled("cancelled before pipeline start".to_string()));
        }

        let strict = self.attempt_strict(&request, &constraints, &cancellation).await;

        let (stage_reached, final_text) = match strict {
            Ok(StageOutcome::Passed { text, parsed_raw, safety }) => {
                raw_model_output = parsed_raw;
                safety_summary = Some(safety);
                (StageReached::Strict, text)
            }
            Ok(StageOutcome::Rejected { reason, raw_model_output: raw }) => {
                strict_error = Some(reason);
                let prior_output = raw.clone();
                raw_model_output = raw;
                self.repair_or_fallback(
                    &request,
                    &constraints,
                    &cancellation,
                    prior_output,
                    &mut repair_error,
                    &mut raw_model_output,
                    &mut safety_summary,
                )
                .await?
            }
            Err(EditorError::Cancelled(reason)) => {
                return Err(EditorError::Cancelled(reason));
            }
            Err(e) => {
                strict_error = Some(e.to_string());
                self.repair_or_fallback(
                    &request,
                    &constraints,
                    &cancellation,
                    None,
                    &mut repair_error,
                    &mut raw_model_output,
                    &mut safety_summary,
                )
                .await?
            }
        };

        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.metrics.record_pipeline_latency_ms(latency_ms);
        if stage_reached == StageReached::Fallback {
            self.metrics.count_event("fallback_triggered");
        }

        let safety = safety_summary.unwrap_or_else(SafetySummary::clean);
        let report = EditReport {
            operation_id,
            mode: request.mode,
            stage_reached,
            safety: safety.clone(),
            latency_ms,
            strict_error,
            repair_error,
        };

        let edited = EditedText {
            text: final_text,
            mode: request.mode,
            fallback_used: stage_reached == StageReached::Fallback,
        };

        if let Some(sink) = &self.debug_sink {
            let record = DebugRecord {
                id: operation_id,
                mode: request.mode,
                raw_input: request.raw_transcript.clone(),
                raw_model_output,
                parsed: None,
                safety: Some(safety),
                final_output: edited.text.clone(),
                stage_reached,
            };
            sink.write(&record).await;
        }

        Ok((edited, report))
    }

    /// Short-circuits the pipeline for inputs under [`BYPASS_MIN_LENGTH`]:
    /// no model call, no guard evaluation, no debug record.
    fn bypass(&self, request: EditRequest) -> (EditedText, EditReport) {
        let edited = EditedText { text: request.raw_transcript, mode: request.mode, fallback_used: false };
        let report = EditReport {
            operation_id: EditOperationId::new(),
            mode: request.mode,
            stage_reached: StageReached::Bypassed,
            safety: SafetySummary::clean(),
            latency_ms: 0,
            strict_error: None,
            repair_error: None,
        };
        (edited, report)
    }

    /// Runs Repair using a fixed "JSON repair assistant" prompt that quotes
    /// Strict's malformed output (or an empty placeholder when Strict
    /// errored before producing any content). On any rejection or error,
    /// falls through to the deterministic post-processor, which always
    /// succeeds.
    #[allow(clippy::too_many_arguments)]
    async fn repair_or_fallback(
        &self,
        request: &EditRequest,
        constraints: &crate::types::Constraints,
        cancellation: &CancellationToken,
        prior_output: Option<String>,
        repair_error: &mut Option<String>,
        raw_model_output: &mut Option<String>,
        safety_summary: &mut Option<SafetySummary>,
    ) -> Result<(StageReached, String), EditorError> {
        let repair = self.attempt_repair(request, constraints, cancellation, prior_output.as_deref()).await;

        match repair {
            Ok(StageOutcome::Passed { text, parsed_raw, safety }) => {
                *raw_model_output = parsed_raw;
                *safety_summary = Some(safety);
                Ok((StageReached::Repair, text))
            }
            Ok(StageOutcome::Rejected { reason, raw_model_output: raw }) => {
                *repair_error = Some(reason);
                if raw.is_some() {
                    *raw_model_output = raw;
                }
                Ok((StageReached::Fallback, self.fallback(request)))
            }
            Err(EditorError::Cancelled(reason)) => Err(EditorError::Cancelled(reason)),
            Err(e) => {
                *repair_error = Some(e.to_string());
                Ok((StageReached::Fallback, self.fallback(request)))
            }
        }
    }

    fn fallback(&self, request: &EditRequest) -> String {
        fallback::process(&request.raw_transcript, request.mode, &request.dictionary).text
    }

    /// The Strict attempt: the full mode/dictionary prompt at the per-mode
    /// sampling from `prompt::mode_sampling`, with the pipeline's configured
    /// timeout.
    async fn attempt_strict(
        &self,
        request: &EditRequest,
        constraints: &crate::types::Constraints,
        cancellation: &CancellationToken,
    ) -> Result<StageOutcome, EditorError> {
        let builder = PromptBuilder::new(request.mode).with_dictionary(request.dictionary.clone());
        let system_prompt = builder.system_prompt();
        let user_prompt = builder.user_prompt(&request.raw_transcript);
        let (temperature, max_tokens) = prompt::mode_sampling(request.mode);
        let params = CallParams::new(temperature, max_tokens, self.timeout_ms);

        self.attempt(request, constraints, cancellation, &system_prompt, &user_prompt, params).await
    }

    /// The Repair attempt: a minimal "JSON repair assistant" prompt quoting
    /// `prior_output` (or the empty string, when Strict errored rather than
    /// returned malformed content) and the required schema, always at the
    /// fixed [`CallParams::repair`] sampling.
    async fn attempt_repair(
        &self,
        request: &EditRequest,
        constraints: &crate::types::Constraints,
        cancellation: &CancellationToken,
        prior_output: Option<&str>,
    ) -> Result<StageOutcome, EditorError> {
        let (system_prompt, user_prompt) = prompt::repair_prompts(request.mode, prior_output.unwrap_or(""));
        self.attempt(request, constraints, cancellation, &system_prompt, &user_prompt, CallParams::repair()).await
    }

    /// One model call -> StructureGuard -> ModeGuard -> DiffGuard pass,
    /// shared by Strict and Repair. Returns `Ok(Rejected)` for any guard
    /// failure, reserving `Err` for ModelClient errors (propagated to the
    /// caller so cancellation can short-circuit the whole pipeline).
    async fn attempt(
        &self,
        request: &EditRequest,
        constraints: &crate::types::Constraints,
        cancellation: &CancellationToken,
        system_prompt: &str,
        user_prompt: &str,
        params: CallParams,
    ) -> Result<StageOutcome, EditorError> {
        let raw_response = self.client.send(system_prompt, user_prompt, params, cancellation).await?;

        match structure_guard::parse(&raw_response, request.mode) {
            ParseOutcome::Invalid { reason, .. } => {
                Ok(StageOutcome::Rejected { reason, raw_model_output: Some(raw_response) })
            }
            ParseOutcome::Valid(parsed) => {
                let mode_result = mode_guard::check(&parsed, &request.raw_transcript, request.mode);
                if !mode_result.passed {
                    return Ok(StageOutcome::Rejected {
                        reason: mode_result.violations.join("; "),
                        raw_model_output: Some(raw_response),
                    });
                }

                let safety = diff_guard::evaluate(&request.raw_transcript, &parsed, &request.dictionary, *constraints);
                if !safety.passed {
                    return Ok(StageOutcome::Rejected {
                        reason: format!("safety check failed: {safety:?}"),
                        raw_model_output: Some(raw_response),
                    });
                }

                Ok(StageOutcome::Passed { text: parsed.as_flat_text(), parsed_raw: Some(raw_response), safety })
            }
        }
    }
}

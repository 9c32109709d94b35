//! Core data model shared across the editor pipeline.
//!
//! Mirrors the upstream component contracts: the shapes an assistant
//! response is parsed into ([`ParsedOutput`]), the safety measurements taken
//! against it ([`SafetySummary`]), and the record emitted at the end of an
//! [`crate::pipeline::EditorPipeline`] run ([`EditReport`], [`EditedText`]).

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifies one run of the pipeline, minted once at entry and threaded
/// through tracing spans and [`DebugRecord::id`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EditOperationId(Uuid);

impl EditOperationId {
    /// Mint a fresh, random operation id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The first 8 hex characters, used for debug-record filenames.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for EditOperationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EditOperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn default_priority() -> u8 {
    3
}

/// A user-defined vocabulary term the editor must preserve verbatim.
///
/// `aliases` lists the misrecognitions ASR commonly produces for `term`
/// (homophones, phonetic near-misses); DiffGuard does not use them — it only
/// checks that `term` itself, when present in the input, survives into the
/// output. The deterministic fallback does use `aliases`, substituting any
/// occurrence of one with the canonical `term`. `priority` (1..=5, higher is
/// more important) ranks terms for the glossary prompt-budget helper, which
/// may need to drop lower-priority terms to fit a bounded prompt window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryTerm {
    pub term: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default = "default_priority")]
    pub priority: u8,
}

impl DictionaryTerm {
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            aliases: Vec::new(),
            case_sensitive: false,
            priority: default_priority(),
        }
    }

    pub fn with_aliases(mut self, aliases: impl IntoIterator<Item = String>) -> Self {
        self.aliases = aliases.into_iter().collect();
        self
    }

    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    /// Compares `term` against `other`, respecting `case_sensitive`.
    pub fn matches(&self, other: &str) -> bool {
        if self.case_sensitive {
            self.term == other
        } else {
            self.term.eq_ignore_ascii_case(other)
        }
    }
}

/// The target shape of the edited output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// Light cleanup: filler removal, punctuation, casing. No restructuring.
    Clean,
    /// Condense into bullet points, one idea per bullet.
    Notes,
    /// No rewriting permitted beyond whitespace/punctuation normalization.
    Verbatim,
    /// Clean prose formatted for an email body.
    Email,
    /// Clean prose formatted for a chat message; shorter, looser punctuation.
    Slack,
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Clean => "clean",
            Self::Notes => "notes",
            Self::Verbatim => "verbatim",
            Self::Email => "email",
            Self::Slack => "slack",
        };
        write!(f, "{s}")
    }
}

/// Per-mode safety thresholds. See [`crate::config::mode_constraints`] for
/// the concrete table keyed by [`OutputMode`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    /// Fraction of the input's word set that may differ in the output.
    pub max_word_change_ratio: f64,
    /// Fraction of net new non-whitespace characters tolerated.
    pub max_char_insertion_ratio: f64,
    /// `Notes` output must be a bullet list; all other modes must be prose.
    pub allow_structure: bool,
    /// Output length relative to input length, as an upper bound.
    pub max_length_ratio: f64,
}

impl Constraints {
    pub const fn new(
        max_word_change_ratio: f64,
        max_char_insertion_ratio: f64,
        allow_structure: bool,
        max_length_ratio: f64,
    ) -> Self {
        Self {
            max_word_change_ratio,
            max_char_insertion_ratio,
            allow_structure,
            max_length_ratio,
        }
    }
}

/// The per-mode safety profile DiffGuard checks against.
///
/// `Notes` tolerates the heaviest word change since condensing necessarily
/// rewrites most of the surface text.
pub const fn mode_constraints(mode: OutputMode) -> Constraints {
    match mode {
        OutputMode::Clean => Constraints::new(0.4, 0.2, false, 1.3),
        OutputMode::Notes => Constraints::new(0.5, 0.35, true, 0.8),
        OutputMode::Verbatim => Constraints::new(0.05, 0.05, false, 1.1),
        OutputMode::Email => Constraints::new(0.4, 0.3, false, 1.5),
        OutputMode::Slack => Constraints::new(0.4, 0.3, false, 1.3),
    }
}

/// The assistant response after StructureGuard has decoded it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParsedOutput {
    /// A condensed bullet list, one entry per idea (`OutputMode::Notes`).
    Notes { bullets: Vec<String> },
    /// Rewritten prose (`Clean` / `Verbatim` / `Email` / `Slack`).
    Edited { text: String },
}

impl ParsedOutput {
    /// Flattens either variant into a single string for diffing against
    /// the original transcript.
    pub fn as_flat_text(&self) -> String {
        match self {
            Self::Notes { bullets } => bullets.join("\n"),
            Self::Edited { text } => text.clone(),
        }
    }

    pub fn is_notes(&self) -> bool {
        matches!(self, Self::Notes { .. })
    }
}

/// Outcome of DiffGuard's measurements against [`ParsedOutput`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetySummary {
    pub word_change_ratio: f64,
    pub char_insertion_ratio: f64,
    pub glossary_violations: Vec<String>,
    pub numbers_preserved: bool,
    pub passed: bool,
}

impl SafetySummary {
    /// A summary with no violations of any kind; useful as a test fixture
    /// or as the summary attached to a deterministic-fallback result.
    pub fn clean() -> Self {
        Self {
            word_change_ratio: 0.0,
            char_insertion_ratio: 0.0,
            glossary_violations: Vec::new(),
            numbers_preserved: true,
            passed: true,
        }
    }
}

/// Which stage of the pipeline produced the final output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageReached {
    Strict,
    Repair,
    Fallback,
    /// The pipeline was skipped entirely (input too short, or no backend
    /// configured) and the input was returned unchanged.
    Bypassed,
}

impl fmt::Display for StageReached {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Strict => "strict",
            Self::Repair => "repair",
            Self::Fallback => "fallback",
            Self::Bypassed => "bypassed",
        };
        write!(f, "{s}")
    }
}

/// Summary of one pipeline run, independent of the text it produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditReport {
    pub operation_id: EditOperationId,
    pub mode: OutputMode,
    pub stage_reached: StageReached,
    pub safety: SafetySummary,
    pub latency_ms: u64,
    pub strict_error: Option<String>,
    pub repair_error: Option<String>,
}

impl EditReport {
    pub fn fell_back(&self) -> bool {
        self.stage_reached == StageReached::Fallback
    }
}

/// The text the pipeline hands back to the caller, paired with the report
/// that explains how it was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditedText {
    pub text: String,
    pub mode: OutputMode,
    pub fallback_used: bool,
}

impl fmt::Display for EditedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// A full trace of one pipeline run, persisted by [`crate::debug_sink::DebugSink`]
/// when debug capture is enabled. Never constructed unless `debug_enabled`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugRecord {
    pub id: EditOperationId,
    pub mode: OutputMode,
    pub raw_input: String,
    pub raw_model_output: Option<String>,
    pub parsed: Option<ParsedOutput>,
    pub safety: Option<SafetySummary>,
    pub final_output: String,
    pub stage_reached: StageReached,
}

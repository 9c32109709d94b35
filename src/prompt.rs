//! C1 — PromptBuilder: turns a raw transcript plus mode/dictionary context
//! into the system and user messages sent to the model.

use crate::types::{DictionaryTerm, OutputMode};

/// Rough token estimate used to keep prompts within a model's context
/// window: one token per four characters, rounded up.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

/// Per-mode sampling parameters: `(temperature, max_tokens)`. Used for the
/// Strict call; the Repair call always overrides to a fixed `(0.0, 512)`.
pub const fn mode_sampling(mode: OutputMode) -> (f64, usize) {
    match mode {
        OutputMode::Verbatim => (0.0, 512),
        OutputMode::Clean => (0.1, 768),
        OutputMode::Notes => (0.1, 384),
        OutputMode::Email => (0.2, 768),
        OutputMode::Slack => (0.2, 384),
    }
}

/// The exact JSON shape the model must respond with for `mode`.
pub const fn required_schema(mode: OutputMode) -> &'static str {
    match mode {
        OutputMode::Notes => r#"{"bullets": ["...", "..."]}"#,
        _ => r#"{"edited_text": "..."}"#,
    }
}

fn format_glossary_line(term: &DictionaryTerm) -> String {
    if term.aliases.is_empty() {
        format!("- {}", term.term)
    } else {
        format!("- {} (may be misheard as: {})", term.term, term.aliases.join(", "))
    }
}

/// Selects the highest-priority dictionary terms whose cumulative cost fits
/// `budget_tokens - 10 (reserved) - language_prompt_cost`, for callers that
/// feed glossary context into a separately bounded prompt window (e.g. an
/// ASR initial-prompt slot). The main editor system prompt does not use
/// this — its glossary block is bounded only by dictionary size, which is
/// assumed small.
pub fn select_glossary_terms_for_budget(
    terms: &[DictionaryTerm],
    budget_tokens: usize,
    language_prompt_cost: usize,
) -> Vec<DictionaryTerm> {
    const RESERVED_TOKENS: usize = 10;
    let available = budget_tokens.saturating_sub(RESERVED_TOKENS).saturating_sub(language_prompt_cost);

    let mut ordered: Vec<&DictionaryTerm> = terms.iter().collect();
    ordered.sort_by(|a, b| b.priority.cmp(&a.priority));

    let mut selected = Vec::new();
    let mut spent = 0usize;
    for term in ordered {
        let cost = estimate_tokens(&format_glossary_line(term));
        if spent + cost > available {
            break;
        }
        spent += cost;
        selected.push(term.clone());
    }
    selected
}

/// Builds the fixed Repair-pass system/user prompt pair: a minimal "JSON
/// repair assistant" instruction plus the malformed prior output and the
/// schema it must conform to. Used in place of the normal mode prompt when
/// Strict failed to produce valid output — `malformed_output` is empty when
/// Strict errored before producing any content at all.
pub fn repair_prompts(mode: OutputMode, malformed_output: &str) -> (String, String) {
    let system = "You are a JSON repair assistant. You are given output that failed to \
                  parse against a required JSON schema. Produce a corrected JSON object \
                  that conforms to the schema. Output ONLY the JSON object. No other text."
        .to_string();
    let user = format!(
        "MALFORMED OUTPUT:\n{malformed_output}\n\nREQUIRED JSON OUTPUT FORMAT:\n{}",
        required_schema(mode)
    );
    (system, user)
}

/// Builds the system and user prompts for one edit operation.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    mode: OutputMode,
    dictionary: Vec<DictionaryTerm>,
}

impl PromptBuilder {
    pub fn new(mode: OutputMode) -> Self {
        Self { mode, dictionary: Vec::new() }
    }

    pub fn with_dictionary(mut self, dictionary: Vec<DictionaryTerm>) -> Self {
        self.dictionary = dictionary;
        self
    }

    /// The system prompt: role statement, numbered mode rules, optional
    /// DICTIONARY block, the required JSON output format, and the
    /// JSON-only instruction.
    pub fn system_prompt(&self) -> String {
        let mut prompt = String::new();
        prompt.push_str(Self::role_statement());
        prompt.push_str("\n\n");
        prompt.push_str(&self.rules_block());
        if !self.dictionary.is_empty() {
            prompt.push_str("\n\n");
            prompt.push_str(&self.dictionary_block());
        }
        prompt.push_str("\n\n");
        prompt.push_str(&self.output_format_block());
        prompt.push_str("\nOutput ONLY the JSON object. No other text.");
        prompt
    }

    /// The user prompt: the raw transcript, unmodified.
    pub fn user_prompt(&self, raw_transcript: &str) -> String {
        raw_transcript.to_string()
    }

    fn role_statement() -> &'static str {
        "You are a transcript-editing assistant. You turn raw speech-to-text \
         output into polished text without changing its meaning."
    }

    fn mode_rules(&self) -> &'static [&'static str] {
        match self.mode {
            OutputMode::Clean => &[
                "Remove filler words (um, uh, like).",
                "Fix punctuation and casing.",
                "Merge false starts.",
                "Do not add, remove, or reinterpret any ideas.",
                "Keep the same meaning, tone, and approximate length as the original.",
            ],
            OutputMode::Notes => &[
                "Condense the transcript into short bullet-point notes, one idea per bullet.",
                "Drop filler and repetition.",
                "Do not invent information that was not said.",
            ],
            OutputMode::Verbatim => &[
                "Normalize only whitespace and punctuation in this transcript.",
                "Do not rewrite, rephrase, or remove any words.",
            ],
            OutputMode::Email => &[
                "Rewrite this transcript as the body of a clear, professional email.",
                "Preserve every fact, number, and name exactly.",
            ],
            OutputMode::Slack => &[
                "Rewrite this transcript as a short, casual chat message.",
                "Preserve every fact, number, and name exactly.",
            ],
        }
    }

    fn rules_block(&self) -> String {
        let mut block = String::new();
        for (i, rule) in self.mode_rules().iter().enumerate() {
            if i > 0 {
                block.push('\n');
            }
            block.push_str(&format!("{}. {rule}", i + 1));
        }
        block
    }

    fn dictionary_block(&self) -> String {
        let mut block = String::from("DICTIONARY (preserve these terms exactly as written):\n");
        for (i, term) in self.dictionary.iter().enumerate() {
            if i > 0 {
                block.push('\n');
            }
            block.push_str(&format_glossary_line(term));
        }
        block
    }

    fn output_format_block(&self) -> String {
        format!("REQUIRED JSON OUTPUT FORMAT:\n{}", required_schema(self.mode))
    }
}

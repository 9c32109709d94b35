//! C4a — ModeGuard: validates that a [`ParsedOutput`] has the *shape*
//! appropriate for its [`OutputMode`], independent of DiffGuard's content
//! safety checks. Never panics; returns a structured result.

use crate::types::{OutputMode, ParsedOutput};

/// Hallucination-preamble phrases a bullet must not open with, matched
/// case-insensitively against the start of the trimmed bullet text.
const BANNED_BULLET_PREFIXES: [&str; 10] = [
    "here are",
    "key points",
    "the speaker",
    "this transcription",
    "based on",
    "the following",
    "summary of",
    "notes from",
    "in this",
    "the main",
];
const MAX_BULLET_LEN: usize = 160;
const MAX_BULLET_COUNT: usize = 8;
const MAX_SENTENCE_ENDERS_PER_BULLET: usize = 2;
const EMAIL_MAX_CHARS: usize = 5_000;
const SLACK_MAX_CHARS: usize = 2_000;
const CLEAN_MAX_LENGTH_RATIO: f64 = 1.3;

/// Result of a ModeGuard shape check.
#[derive(Debug, Clone, PartialEq)]
pub struct ModeCheckResult {
    pub passed: bool,
    pub violations: Vec<String>,
}

impl ModeCheckResult {
    fn ok() -> Self {
        Self { passed: true, violations: Vec::new() }
    }

    fn fail(violations: Vec<String>) -> Self {
        Self { passed: false, violations }
    }
}

fn strip_punctuation_words(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| w.chars().filter(|c| c.is_alphanumeric()).collect::<String>().to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

fn check_notes(bullets: &[String]) -> ModeCheckResult {
    let mut violations = Vec::new();

    if bullets.is_empty() {
        violations.push("notes output has zero bullets".to_string());
    }
    if bullets.len() > MAX_BULLET_COUNT {
        violations.push(format!("notes output has {} bullets, max is {MAX_BULLET_COUNT}", bullets.len()));
    }

    for (i, bullet) in bullets.iter().enumerate() {
        let trimmed = bullet.trim();
        if trimmed.is_empty() {
            violations.push(format!("bullet {i} is empty"));
            continue;
        }
        if trimmed.len() > MAX_BULLET_LEN {
            violations.push(format!("bullet {i} exceeds {MAX_BULLET_LEN} chars"));
        }
        let lower = trimmed.to_lowercase();
        if BANNED_BULLET_PREFIXES.iter().any(|p| lower.starts_with(p)) {
            violations.push(format!("bullet {i} opens with a hallucination-preamble phrase"));
        }
        if trimmed.contains("\n\n") {
            violations.push(format!("bullet {i} contains a paragraph break"));
        }
        let sentence_enders = trimmed.chars().filter(|c| matches!(c, '.' | '!' | '?')).count();
        if sentence_enders > MAX_SENTENCE_ENDERS_PER_BULLET {
            violations.push(format!("bullet {i} looks like more than one sentence"));
        }
    }

    if violations.is_empty() { ModeCheckResult::ok() } else { ModeCheckResult::fail(violations) }
}

fn check_prose(text: &str, raw_input: &str, mode: OutputMode) -> ModeCheckResult {
    let mut violations = Vec::new();

    if text.trim().is_empty() {
        violations.push("edited text is empty".to_string());
    }

    match mode {
        OutputMode::Clean => {
            let input_len = raw_input.chars().count();
            if input_len > 0 {
                let ratio = text.chars().count() as f64 / input_len as f64;
                if ratio > CLEAN_MAX_LENGTH_RATIO {
                    violations.push(format!("clean output length ratio {ratio:.2} exceeds {CLEAN_MAX_LENGTH_RATIO}"));
                }
            }
        }
        OutputMode::Verbatim => {
            let output_words = strip_punctuation_words(text);
            let input_words = strip_punctuation_words(raw_input);
            if output_words != input_words {
                violations.push("verbatim mode changed the word sequence".to_string());
            }
        }
        OutputMode::Email => {
            if text.chars().count() > EMAIL_MAX_CHARS {
                violations.push(format!("email output exceeds {EMAIL_MAX_CHARS} chars"));
            }
        }
        OutputMode::Slack => {
            if text.chars().count() > SLACK_MAX_CHARS {
                violations.push(format!("slack output exceeds {SLACK_MAX_CHARS} chars"));
            }
        }
        OutputMode::Notes => {}
    }

    if violations.is_empty() { ModeCheckResult::ok() } else { ModeCheckResult::fail(violations) }
}

/// Validates that `parsed` has the shape `mode` requires.
///
/// A `Notes` mode output must be [`ParsedOutput::Notes`] and vice versa —
/// a shape mismatch between `parsed`'s variant and `mode` is itself a
/// violation (StructureGuard only guarantees internal well-formedness, not
/// that the model honored the requested mode).
pub fn check(parsed: &ParsedOutput, raw_input: &str, mode: OutputMode) -> ModeCheckResult {
    match (parsed, mode) {
        (ParsedOutput::Notes { bullets }, OutputMode::Notes) => check_notes(bullets),
        (ParsedOutput::Edited { text }, m) if m != OutputMode::Notes => check_prose(text, raw_input, m),
        _ => ModeCheckResult::fail(vec!["parsed output shape does not match requested mode".to_string()]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notes_output_passes_with_clean_bullets() {
        let parsed = ParsedOutput::Notes { bullets: vec!["Ship by Friday".into(), "Review with Sam".into()] };
        let result = check(&parsed, "irrelevant", OutputMode::Notes);
        assert!(result.passed);
    }

    #[test]
    fn notes_output_rejects_empty_bullet_list() {
        let parsed = ParsedOutput::Notes { bullets: vec![] };
        let result = check(&parsed, "irrelevant", OutputMode::Notes);
        assert!(!result.passed);
    }

    #[test]
    fn notes_output_rejects_too_many_bullets() {
        let bullets: Vec<String> = (0..9).map(|i| format!("point {i}")).collect();
        let parsed = ParsedOutput::Notes { bullets };
        let result = check(&parsed, "irrelevant", OutputMode::Notes);
        assert!(!result.passed);
    }

    #[test]
    fn notes_output_rejects_hallucination_preamble() {
        let parsed = ParsedOutput::Notes { bullets: vec!["Here are the key takeaways from the call".into()] };
        let result = check(&parsed, "irrelevant", OutputMode::Notes);
        assert!(!result.passed);
    }

    #[test]
    fn notes_output_accepts_leading_list_marker() {
        // ModeGuard only bans hallucination-preamble phrasing, not list markers.
        let parsed = ParsedOutput::Notes { bullets: vec!["- already formatted as a bullet".into()] };
        let result = check(&parsed, "irrelevant", OutputMode::Notes);
        assert!(result.passed);
    }

    #[test]
    fn notes_output_rejects_multi_sentence_bullet() {
        let parsed = ParsedOutput::Notes { bullets: vec!["Ship this. Also review that. And close it.".into()] };
        let result = check(&parsed, "irrelevant", OutputMode::Notes);
        assert!(!result.passed);
    }

    #[test]
    fn notes_output_allows_up_to_two_sentence_enders() {
        let parsed = ParsedOutput::Notes { bullets: vec!["Ship this by Friday, e.g. version 2.".into()] };
        let result = check(&parsed, "irrelevant", OutputMode::Notes);
        assert!(result.passed);
    }

    #[test]
    fn notes_output_rejects_embedded_paragraph_break() {
        let parsed = ParsedOutput::Notes { bullets: vec!["line one\n\nline two".into()] };
        let result = check(&parsed, "irrelevant", OutputMode::Notes);
        assert!(!result.passed);
    }

    #[test]
    fn notes_output_allows_single_newline() {
        let parsed = ParsedOutput::Notes { bullets: vec!["line one\nline two".into()] };
        let result = check(&parsed, "irrelevant", OutputMode::Notes);
        assert!(result.passed);
    }

    #[test]
    fn clean_mode_passes_within_length_ratio() {
        let parsed = ParsedOutput::Edited { text: "We need to ship this by Friday.".into() };
        let result = check(&parsed, "um so like we need to ship this by friday i think", OutputMode::Clean);
        assert!(result.passed);
    }

    #[test]
    fn clean_mode_rejects_wildly_longer_output() {
        let parsed = ParsedOutput::Edited { text: "x ".repeat(100) };
        let result = check(&parsed, "short input", OutputMode::Clean);
        assert!(!result.passed);
    }

    #[test]
    fn verbatim_mode_accepts_punctuation_only_changes() {
        let parsed = ParsedOutput::Edited { text: "We need to ship this by Friday.".into() };
        let result = check(&parsed, "we need to ship this by friday", OutputMode::Verbatim);
        assert!(result.passed);
    }

    #[test]
    fn verbatim_mode_rejects_word_changes() {
        let parsed = ParsedOutput::Edited { text: "We must ship this by Friday.".into() };
        let result = check(&parsed, "we need to ship this by friday", OutputMode::Verbatim);
        assert!(!result.passed);
    }

    #[test]
    fn email_mode_rejects_oversized_output() {
        let parsed = ParsedOutput::Edited { text: "x".repeat(5_001) };
        let result = check(&parsed, &"x".repeat(5_001), OutputMode::Email);
        assert!(!result.passed);
    }

    #[test]
    fn email_mode_accepts_up_to_the_cap() {
        let parsed = ParsedOutput::Edited { text: "x".repeat(5_000) };
        let result = check(&parsed, &"x".repeat(5_000), OutputMode::Email);
        assert!(result.passed);
    }

    #[test]
    fn slack_mode_rejects_oversized_output() {
        let parsed = ParsedOutput::Edited { text: "x".repeat(2_001) };
        let result = check(&parsed, &"x".repeat(2_001), OutputMode::Slack);
        assert!(!result.passed);
    }

    #[test]
    fn slack_mode_accepts_up_to_the_cap() {
        let parsed = ParsedOutput::Edited { text: "x".repeat(2_000) };
        let result = check(&parsed, &"x".repeat(2_000), OutputMode::Slack);
        assert!(result.passed);
    }

    #[test]
    fn shape_mismatch_between_parsed_and_mode_fails() {
        let parsed = ParsedOutput::Edited { text: "prose".into() };
        let result = check(&parsed, "input", OutputMode::Notes);
        assert!(!result.passed);
    }
}

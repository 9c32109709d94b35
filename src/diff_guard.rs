//! C4b — DiffGuard: measures how much the parsed output diverges from the
//! raw transcript and assembles the [`SafetySummary`] that gates whether a
//! Strict/Repair result may be returned as-is.

use std::collections::HashSet;

use crate::types::{Constraints, DictionaryTerm, ParsedOutput, SafetySummary};

fn word_set(text: &str) -> HashSet<String> {
    text.split_whitespace()
        .map(|w| w.chars().filter(|c| c.is_alphanumeric()).collect::<String>().to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Fraction of `input`'s word set that was added or removed in `output`,
/// relative to the size of `input`'s word set. Zero if `input` has no words.
pub fn word_change_ratio(input: &str, output: &str) -> f64 {
    let input_words = word_set(input);
    if input_words.is_empty() {
        return 0.0;
    }
    let output_words = word_set(output);
    let symmetric_difference = input_words.symmetric_difference(&output_words).count();
    symmetric_difference as f64 / input_words.len() as f64
}

fn non_whitespace_char_count(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}

/// Fraction of net new non-whitespace characters introduced by the output,
/// relative to the input's non-whitespace character count. Zero if `input`
/// is empty or whitespace-only.
pub fn char_insertion_ratio(input: &str, output: &str) -> f64 {
    let input_chars = non_whitespace_char_count(input);
    if input_chars == 0 {
        return 0.0;
    }
    let output_chars = non_whitespace_char_count(output);
    let net_new = output_chars.saturating_sub(input_chars);
    net_new as f64 / input_chars as f64
}

fn contains_term(text: &str, term: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        text.contains(term)
    } else {
        text.to_lowercase().contains(&term.to_lowercase())
    }
}

/// For every dictionary term whose canonical form occurs in `raw_input`
/// (required-retained), the same canonical form must also occur in
/// `output`. Aliases are not considered here; glossary substitution is the
/// fallback's job, not a safety gate.
fn glossary_violations(raw_input: &str, output: &str, dictionary: &[DictionaryTerm]) -> Vec<String> {
    let mut violations = Vec::new();
    for term in dictionary {
        if !contains_term(raw_input, &term.term, term.case_sensitive) {
            continue;
        }
        if !contains_term(output, &term.term, term.case_sensitive) {
            violations.push(format!(
                "required-retained term {:?} present in input but missing from output",
                term.term
            ));
        }
    }
    violations
}

/// Whitespace-delimited tokens that contain at least one digit, trimmed of
/// surrounding punctuation but preserving internal punctuation (so
/// `"2,000,000"` stays one token instead of splitting into digit runs).
fn digit_bearing_tokens(text: &str) -> HashSet<String> {
    text.split_whitespace()
        .map(|tok| tok.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|tok| tok.chars().any(|c| c.is_ascii_digit()))
        .map(|tok| tok.to_string())
        .collect()
}

/// Verifies every digit-bearing token in `output` also exists in `input`.
/// Dropping a number is permitted (not a safety violation); introducing or
/// altering one is not.
fn numbers_preserved(input: &str, output: &str) -> bool {
    let input_numbers = digit_bearing_tokens(input);
    let output_numbers = digit_bearing_tokens(output);
    output_numbers.iter().all(|n| input_numbers.contains(n))
}

/// Evaluates `parsed` against `raw_input`, producing a [`SafetySummary`].
/// `passed` is true only when every measurement is within `constraints`.
pub fn evaluate(
    raw_input: &str,
    parsed: &ParsedOutput,
    dictionary: &[DictionaryTerm],
    constraints: Constraints,
) -> SafetySummary {
    let flat_output = parsed.as_flat_text();

    let word_ratio = word_change_ratio(raw_input, &flat_output);
    let char_ratio = char_insertion_ratio(raw_input, &flat_output);
    let violations = glossary_violations(raw_input, &flat_output, dictionary);
    let numbers_ok = numbers_preserved(raw_input, &flat_output);

    let passed = word_ratio <= constraints.max_word_change_ratio
        && char_ratio <= constraints.max_char_insertion_ratio
        && violations.is_empty()
        && numbers_ok;

    SafetySummary {
        word_change_ratio: word_ratio,
        char_insertion_ratio: char_ratio,
        glossary_violations: violations,
        numbers_preserved: numbers_ok,
        passed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loose_constraints() -> Constraints {
        Constraints::new(0.5, 0.5, true, 2.0)
    }

    #[test]
    fn word_change_ratio_is_zero_for_identical_text() {
        assert_eq!(word_change_ratio("hello world", "hello world"), 0.0);
    }

    #[test]
    fn word_change_ratio_is_zero_for_case_and_punctuation_only_changes() {
        assert_eq!(word_change_ratio("hello world", "Hello, World!"), 0.0);
    }

    #[test]
    fn word_change_ratio_is_zero_when_input_has_no_words() {
        assert_eq!(word_change_ratio("", "brand new text"), 0.0);
        assert_eq!(word_change_ratio("   ", "brand new text"), 0.0);
    }

    #[test]
    fn word_change_ratio_divides_by_input_word_count_only() {
        // 2 input words, 4-word symmetric difference against a full rewrite.
        let ratio = word_change_ratio("hello world", "goodbye moon");
        assert_eq!(ratio, 2.0);
    }

    #[test]
    fn char_insertion_ratio_is_zero_when_output_is_shorter() {
        assert_eq!(char_insertion_ratio("hello world", "hi"), 0.0);
    }

    #[test]
    fn char_insertion_ratio_is_zero_when_input_is_whitespace_only() {
        assert_eq!(char_insertion_ratio("   ", "hello"), 0.0);
        assert_eq!(char_insertion_ratio("", "hello"), 0.0);
    }

    #[test]
    fn char_insertion_ratio_detects_added_content() {
        let ratio = char_insertion_ratio("hello", "hello there friend");
        assert!(ratio > 0.0);
    }

    #[test]
    fn glossary_violation_when_required_term_dropped() {
        let dictionary = vec![DictionaryTerm::new("ClockoSocket").with_case_sensitive(true)];
        let violations = glossary_violations("we use ClockoSocket daily", "we use the socket daily", &dictionary);
        assert_eq!(violations.len(), 1);
    }

    #[test]
    fn glossary_no_violation_when_term_absent_from_input() {
        let dictionary = vec![DictionaryTerm::new("Kubernetes")];
        let violations = glossary_violations("deploy the service", "deploy the service", &dictionary);
        assert!(violations.is_empty());
    }

    #[test]
    fn glossary_no_violation_when_canonical_term_retained() {
        let dictionary = vec![DictionaryTerm::new("Kubernetes")];
        let violations = glossary_violations("we use Kubernetes in prod", "We use Kubernetes in production.", &dictionary);
        assert!(violations.is_empty());
    }

    #[test]
    fn glossary_case_sensitive_term_requires_exact_case() {
        let dictionary = vec![DictionaryTerm::new("SQL").with_case_sensitive(true)];
        let violations = glossary_violations("run this SQL query", "run this sql query", &dictionary);
        assert_eq!(violations.len(), 1);
        let violations = glossary_violations("run this SQL query", "run this SQL query, cleaned", &dictionary);
        assert!(violations.is_empty());
    }

    #[test]
    fn numbers_preserved_true_when_unchanged() {
        assert!(numbers_preserved("ship 12 units by the 5th", "Ship 12 units by the 5th."));
    }

    #[test]
    fn numbers_preserved_true_when_digit_dropped() {
        // Dropping a number is not a safety violation, only introducing one is.
        assert!(numbers_preserved("ship 12 units", "Ship units."));
    }

    #[test]
    fn numbers_preserved_false_when_digit_changed() {
        assert!(!numbers_preserved("ship 12 units", "Ship 13 units."));
    }

    #[test]
    fn numbers_preserved_true_for_comma_grouped_token_kept_intact() {
        assert!(numbers_preserved("revenue was 2,000,000 last year", "Revenue was 2,000,000 last year."));
    }

    #[test]
    fn evaluate_passes_for_light_cleanup() {
        let parsed = ParsedOutput::Edited { text: "We need to ship this by Friday.".into() };
        let summary = evaluate(
            "um so like we need to ship this by friday",
            &parsed,
            &[],
            loose_constraints(),
        );
        assert!(summary.passed);
    }

    #[test]
    fn evaluate_fails_when_number_hallucinated() {
        let parsed = ParsedOutput::Edited { text: "Revenue was 2,000,000 in Q3 2024.".into() };
        let summary = evaluate("revenue was two million", &parsed, &[], loose_constraints());
        assert!(!summary.passed);
        assert!(!summary.numbers_preserved);
    }

    #[test]
    fn evaluate_passes_when_number_dropped() {
        let parsed = ParsedOutput::Edited { text: "We need to ship the units.".into() };
        let summary = evaluate("we need to ship 12 units", &parsed, &[], loose_constraints());
        assert!(summary.numbers_preserved);
    }

    #[test]
    fn evaluate_fails_when_word_change_ratio_exceeds_constraint() {
        let parsed = ParsedOutput::Edited { text: "completely different content entirely".into() };
        let strict = Constraints::new(0.1, 0.5, true, 2.0);
        let summary = evaluate("the original transcript text", &parsed, &[], strict);
        assert!(!summary.passed);
    }

    #[test]
    fn evaluate_flattens_notes_bullets_for_measurement() {
        let parsed = ParsedOutput::Notes { bullets: vec!["Ship by Friday".into()] };
        let summary = evaluate("we need to ship by friday", &parsed, &[], loose_constraints());
        assert!(summary.passed);
    }
}

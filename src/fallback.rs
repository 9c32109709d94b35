//! DeterministicPostProcessor — the final, model-free stage the pipeline
//! falls back to when Strict and Repair both fail. Runs a fixed, ordered
//! set of text-normalization operations with no external call, so it can
//! never itself fail. Idempotent: running it twice on its own output
//! yields the same result as running it once (P6).

use crate::types::{DictionaryTerm, EditedText, OutputMode};

/// Collapses horizontal whitespace runs to a single space on each line,
/// normalizes CR/CRLF to LF, collapses runs of 3+ newlines down to 2, and
/// trims the result.
fn normalize_whitespace(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");
    let horizontally_collapsed = unified
        .split('\n')
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("\n");
    collapse_newline_runs(&horizontally_collapsed).trim().to_string()
}

fn collapse_newline_runs(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut run = 0usize;
    for c in text.chars() {
        if c == '\n' {
            run += 1;
        } else {
            if run > 0 {
                result.push_str(&"\n".repeat(run.min(2)));
                run = 0;
            }
            result.push(c);
        }
    }
    if run > 0 {
        result.push_str(&"\n".repeat(run.min(2)));
    }
    result
}

/// Replaces whole-word occurrences of each dictionary term's aliases with
/// the canonical term, respecting `case_sensitive`.
fn substitute_glossary(text: &str, dictionary: &[DictionaryTerm]) -> String {
    let mut result = text.to_string();
    for term in dictionary {
        for alias in &term.aliases {
            result = replace_word_boundary(&result, alias, &term.term, term.case_sensitive);
        }
    }
    result
}

fn replace_word_boundary(text: &str, needle: &str, replacement: &str, case_sensitive: bool) -> String {
    if needle.is_empty() {
        return text.to_string();
    }
    let haystack_for_match = if case_sensitive { text.to_string() } else { text.to_lowercase() };
    let needle_for_match = if case_sensitive { needle.to_string() } else { needle.to_lowercase() };

    let mut result = String::new();
    let mut rest = text;
    let mut rest_for_match = haystack_for_match.as_str();

    while let Some(pos) = rest_for_match.find(&needle_for_match) {
        let before_ok = pos == 0
            || !rest_for_match[..pos].chars().last().is_some_and(|c| c.is_alphanumeric());
        let after_pos = pos + needle_for_match.len();
        let after_ok = after_pos >= rest_for_match.len()
            || !rest_for_match[after_pos..].chars().next().is_some_and(|c| c.is_alphanumeric());

        result.push_str(&rest[..pos]);
        if before_ok && after_ok {
            result.push_str(replacement);
        } else {
            result.push_str(&rest[pos..after_pos]);
        }

        rest = &rest[after_pos..];
        rest_for_match = &rest_for_match[after_pos..];
    }
    result.push_str(rest);
    result
}

/// Removes a single space before `.,!?:;`.
fn remove_space_before_punctuation(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ' ' && matches!(chars.peek(), Some(next) if matches!(next, ',' | '.' | '!' | '?' | ';' | ':')) {
            continue;
        }
        result.push(c);
    }
    result
}

/// Ensures a single space after `.,!?:;` when directly followed by a letter.
fn ensure_space_after_punctuation(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut result = String::with_capacity(text.len());
    for (i, &c) in chars.iter().enumerate() {
        result.push(c);
        if matches!(c, '.' | ',' | '!' | '?' | ';' | ':') && chars.get(i + 1).is_some_and(|n| n.is_alphabetic()) {
            result.push(' ');
        }
    }
    result
}

/// Collapses runs of `.`, `,`, `!`, or `?` down to a single occurrence.
fn collapse_repeated_punctuation(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut result = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if matches!(c, '.' | ',' | '!' | '?') {
            result.push(c);
            while chars.get(i + 1) == Some(&c) {
                i += 1;
            }
        } else {
            result.push(c);
        }
        i += 1;
    }
    result
}

/// Punctuation cleanup: remove space before `.,!?:;`, ensure a single
/// space after those marks when followed by a letter, then collapse
/// repeated `.`/`,`/`!`/`?`.
fn cleanup_punctuation(text: &str) -> String {
    let step1 = remove_space_before_punctuation(text);
    let step2 = ensure_space_after_punctuation(&step1);
    collapse_repeated_punctuation(&step2)
}

/// Capitalizes the first alphabetic character of each sentence (text
/// following a `.`, `!`, or `?` followed by whitespace, plus the very
/// start of the string).
fn fix_capitalization(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut capitalize_next = true;
    for c in text.chars() {
        if capitalize_next && c.is_alphabetic() {
            result.extend(c.to_uppercase());
            capitalize_next = false;
        } else {
            result.push(c);
            if matches!(c, '.' | '!' | '?') {
                capitalize_next = true;
            } else if !c.is_whitespace() {
                capitalize_next = false;
            }
        }
    }
    result
}

const BULLET_MARKERS: [&str; 3] = ["- ", "* ", "\u{2022} "];

/// Strips a leading bullet marker (if any) so re-segmenting already
/// bulleted text doesn't accumulate markers on repeated passes.
fn strip_leading_marker(segment: &str) -> &str {
    let trimmed = segment.trim();
    for marker in BULLET_MARKERS {
        if let Some(rest) = trimmed.strip_prefix(marker) {
            return rest;
        }
    }
    trimmed
}

/// Splits `text` into bullet-worthy segments for `Notes` mode, since the
/// fallback has no model available to condense ideas. Splits on
/// sentence-ending punctuation and existing newlines (so re-running on
/// already-bulleted output re-derives the same segments instead of
/// treating the whole block as one), keeps segments longer than 10 chars,
/// and falls back to the whole text when nothing qualifies.
fn segment_into_bullets(text: &str) -> Vec<String> {
    let segments: Vec<String> = text
        .split(['.', '!', '?', '\n'])
        .map(strip_leading_marker)
        .filter(|s| s.chars().count() > 10)
        .map(str::to_string)
        .collect();

    if segments.is_empty() { vec![strip_leading_marker(text).to_string()] } else { segments }
}

/// Runs the fixed normalization pipeline over `raw_input` and shapes the
/// result for `mode`. Always succeeds.
pub fn process(raw_input: &str, mode: OutputMode, dictionary: &[DictionaryTerm]) -> EditedText {
    let normalized = normalize_whitespace(raw_input);
    let substituted = substitute_glossary(&normalized, dictionary);
    let punctuated = cleanup_punctuation(&substituted);
    let capitalized = fix_capitalization(&punctuated);

    let text = if mode == OutputMode::Notes {
        segment_into_bullets(&capitalized)
            .into_iter()
            .map(|b| format!("- {b}"))
            .collect::<Vec<_>>()
            .join("\n")
    } else {
        capitalized
    };

    EditedText { text, mode, fallback_used: true }
}

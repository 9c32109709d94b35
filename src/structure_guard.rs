//! C3 — StructureGuard: decodes the assistant's raw text into a
//! [`ParsedOutput`], never panicking and never throwing. A response that
//! does not decode cleanly is reported as [`ParseOutcome::Invalid`] so the
//! pipeline can route to Repair or Fallback.

use serde_json::Value;

use crate::types::{OutputMode, ParsedOutput};

const INVISIBLE_CHARS: [char; 4] = ['\u{200B}', '\u{200C}', '\u{200D}', '\u{FEFF}'];

const NOTES_KEYS: &[&str] = &["bullets", "points", "items", "notes", "key_points"];
const EDITED_KEYS: &[&str] = &[
    "edited_text",
    "cleaned",
    "cleaned_text",
    "cleaned_transcription",
    "output",
    "result",
];

/// Result of attempting to decode a raw assistant response.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Valid(ParsedOutput),
    Invalid { reason: String, raw: String },
}

/// Strips zero-width and BOM characters LLMs occasionally emit, which would
/// otherwise corrupt DiffGuard's char-insertion-ratio counting.
fn strip_invisible_chars(text: &str) -> String {
    text.chars().filter(|c| !INVISIBLE_CHARS.contains(c)).collect()
}

/// Strips a ```json ... ``` / ``` ... ``` fence, tolerating a missing
/// closing fence and a missing trailing newline before the closing fence.
fn strip_markdown_fence(text: &str) -> String {
    let trimmed = text.trim();
    let Some(after_open) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    let after_open = after_open
        .strip_prefix("json")
        .or_else(|| after_open.strip_prefix("JSON"))
        .unwrap_or(after_open);
    let after_open = after_open.trim_start_matches('\n');

    match after_open.rfind("```") {
        Some(idx) => after_open[..idx].trim_end_matches('\n').trim().to_string(),
        None => after_open.trim().to_string(),
    }
}

fn first_present<'a>(obj: &'a serde_json::Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| obj.get(*k))
}

/// Decodes `raw` into a [`ParsedOutput`] appropriate for `mode`.
pub fn parse(raw: &str, mode: OutputMode) -> ParseOutcome {
    let cleaned = strip_markdown_fence(&strip_invisible_chars(raw));

    let value: Value = match serde_json::from_str(&cleaned) {
        Ok(v) => v,
        Err(e) => {
            return ParseOutcome::Invalid { reason: format!("json decode failed: {e}"), raw: raw.to_string() };
        }
    };

    let Some(obj) = value.as_object() else {
        return ParseOutcome::Invalid { reason: "top-level JSON value is not an object".to_string(), raw: raw.to_string() };
    };

    if mode == OutputMode::Notes {
        match first_present(obj, NOTES_KEYS) {
            Some(Value::Array(items)) => {
                let bullets: Option<Vec<String>> = items
                    .iter()
                    .map(|v| v.as_str().map(str::to_string))
                    .collect();
                match bullets {
                    Some(bullets) => ParseOutcome::Valid(ParsedOutput::Notes { bullets }),
                    None => ParseOutcome::Invalid {
                        reason: "bullets array contained a non-string element".to_string(),
                        raw: raw.to_string(),
                    },
                }
            }
            Some(_) => ParseOutcome::Invalid { reason: "bullets key is not an array".to_string(), raw: raw.to_string() },
            None => ParseOutcome::Invalid { reason: "no bullets/points/items/notes/key_points key found".to_string(), raw: raw.to_string() },
        }
    } else {
        match first_present(obj, EDITED_KEYS) {
            Some(Value::String(text)) => ParseOutcome::Valid(ParsedOutput::Edited { text: text.clone() }),
            Some(_) => ParseOutcome::Invalid { reason: "edited_text key is not a string".to_string(), raw: raw.to_string() },
            None => ParseOutcome::Invalid { reason: "no edited_text/cleaned/output/result key found".to_string(), raw: raw.to_string() },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_clean_edited_text() {
        let raw = r#"{"edited_text":"We need to ship this by Friday."}"#;
        let outcome = parse(raw, OutputMode::Clean);
        assert_eq!(
            outcome,
            ParseOutcome::Valid(ParsedOutput::Edited { text: "We need to ship this by Friday.".to_string() })
        );
    }

    #[test]
    fn parses_notes_bullets() {
        let raw = r#"{"bullets":["Ship by Friday","Review with Sam"]}"#;
        let outcome = parse(raw, OutputMode::Notes);
        assert_eq!(
            outcome,
            ParseOutcome::Valid(ParsedOutput::Notes { bullets: vec!["Ship by Friday".into(), "Review with Sam".into()] })
        );
    }

    #[test]
    fn strips_markdown_fence_with_json_tag() {
        let raw = "```json\n{\"edited_text\":\"hello\"}\n```";
        let outcome = parse(raw, OutputMode::Clean);
        assert_eq!(outcome, ParseOutcome::Valid(ParsedOutput::Edited { text: "hello".into() }));
    }

    #[test]
    fn strips_fence_with_missing_trailing_newline_before_close() {
        let raw = "```json\n{\"edited_text\":\"hello\"}```";
        let outcome = parse(raw, OutputMode::Clean);
        assert_eq!(outcome, ParseOutcome::Valid(ParsedOutput::Edited { text: "hello".into() }));
    }

    #[test]
    fn strips_fence_with_missing_closing_fence() {
        let raw = "```json\n{\"edited_text\":\"hello\"}";
        let outcome = parse(raw, OutputMode::Clean);
        assert_eq!(outcome, ParseOutcome::Valid(ParsedOutput::Edited { text: "hello".into() }));
    }

    #[test]
    fn strips_invisible_characters_before_decoding() {
        let raw = "{\u{200B}\"edited_text\":\"hello\u{FEFF}\"}";
        let outcome = parse(raw, OutputMode::Clean);
        assert_eq!(outcome, ParseOutcome::Valid(ParsedOutput::Edited { text: "hello".into() }));
    }

    #[test]
    fn accepts_alias_keys_for_edited_text() {
        for key in ["cleaned", "cleaned_text", "cleaned_transcription", "output", "result"] {
            let raw = format!(r#"{{"{key}":"hello"}}"#);
            let outcome = parse(&raw, OutputMode::Clean);
            assert_eq!(outcome, ParseOutcome::Valid(ParsedOutput::Edited { text: "hello".into() }), "key {key} should be accepted");
        }
    }

    #[test]
    fn accepts_alias_keys_for_notes() {
        for key in ["points", "items", "notes", "key_points"] {
            let raw = format!(r#"{{"{key}":["a"]}}"#);
            let outcome = parse(&raw, OutputMode::Notes);
            assert_eq!(outcome, ParseOutcome::Valid(ParsedOutput::Notes { bullets: vec!["a".into()] }), "key {key} should be accepted");
        }
    }

    #[test]
    fn invalid_json_is_reported() {
        let outcome = parse("not json at all", OutputMode::Clean);
        assert!(matches!(outcome, ParseOutcome::Invalid { .. }));
    }

    #[test]
    fn non_object_top_level_is_invalid() {
        let outcome = parse("[1,2,3]", OutputMode::Clean);
        assert!(matches!(outcome, ParseOutcome::Invalid { .. }));
    }

    #[test]
    fn missing_expected_key_is_invalid() {
        let outcome = parse(r#"{"unexpected":"value"}"#, OutputMode::Clean);
        assert!(matches!(outcome, ParseOutcome::Invalid { .. }));
    }

    #[test]
    fn bullets_with_non_string_element_is_invalid() {
        let outcome = parse(r#"{"bullets":["ok", 5]}"#, OutputMode::Notes);
        assert!(matches!(outcome, ParseOutcome::Invalid { .. }));
    }

    #[test]
    fn invalid_outcome_preserves_raw_text() {
        let raw = "garbage output";
        let outcome = parse(raw, OutputMode::Clean);
        match outcome {
            ParseOutcome::Invalid { raw: preserved, .. } => assert_eq!(preserved, raw),
            ParseOutcome::Valid(_) => panic!("expected invalid outcome"),
        }
    }
}

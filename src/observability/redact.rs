//! Secret redaction so API keys never reach logs or debug records.

use std::fmt;

/// Wraps a secret value. `Display`/`Debug` always print `[REDACTED]`;
/// reaching the real value requires an explicit call to [`RedactedString::as_str`]
/// or [`RedactedString::into_inner`].
#[derive(Clone, Serialize, Deserialize)]
pub struct RedactedString(String);

use serde::{Deserialize, Serialize};

impl RedactedString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Explicit, opt-in access to the wrapped value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper, returning the wrapped value.
    pub fn into_inner(self) -> String {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for RedactedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RedactedString([REDACTED])")
    }
}

impl fmt::Display for RedactedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl PartialEq for RedactedString {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

/// Replaces an `Authorization: Bearer <token>` header value with a redacted form.
pub fn redact_auth_header(header_value: &str) -> String {
    if let Some(rest) = header_value.strip_prefix("Bearer ") {
        if rest.len() > 8 {
            format!("Bearer {}...[REDACTED]", &rest[..4])
        } else {
            "Bearer [REDACTED]".to_string()
        }
    } else {
        "[REDACTED]".to_string()
    }
}

/// Redacts a raw API key, keeping a short visible prefix for log correlation.
pub fn redact_api_key(key: &str) -> String {
    if key.len() > 8 {
        format!("{}...[REDACTED]", &key[..4])
    } else if key.is_empty() {
        String::new()
    } else {
        "[REDACTED]".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_never_reveals_value() {
        let secret = RedactedString::new("sk-super-secret-key");
        assert_eq!(secret.to_string(), "[REDACTED]");
    }

    #[test]
    fn debug_never_reveals_value() {
        let secret = RedactedString::new("sk-super-secret-key");
        assert_eq!(format!("{secret:?}"), "RedactedString([REDACTED])");
    }

    #[test]
    fn as_str_gives_explicit_access() {
        let secret = RedactedString::new("sk-visible-on-purpose");
        assert_eq!(secret.as_str(), "sk-visible-on-purpose");
    }

    #[test]
    fn into_inner_consumes_and_returns() {
        let secret = RedactedString::new("value");
        assert_eq!(secret.into_inner(), "value");
    }

    #[test]
    fn empty_is_detected() {
        assert!(RedactedString::new("").is_empty());
        assert!(!RedactedString::new("x").is_empty());
    }

    #[test]
    fn redact_auth_header_keeps_short_prefix() {
        let redacted = redact_auth_header("Bearer sk-abcdefghijklmnop");
        assert!(redacted.starts_with("Bearer sk-a"));
        assert!(redacted.contains("[REDACTED]"));
        assert!(!redacted.contains("klmnop"));
    }

    #[test]
    fn redact_auth_header_handles_short_token() {
        let redacted = redact_auth_header("Bearer abc");
        assert_eq!(redacted, "Bearer [REDACTED]");
    }

    #[test]
    fn redact_auth_header_handles_non_bearer() {
        assert_eq!(redact_auth_header("Basic xyz"), "[REDACTED]");
    }

    #[test]
    fn redact_api_key_keeps_short_prefix() {
        assert_eq!(redact_api_key("sk-abcdefgh"), "sk-a...[REDACTED]");
    }

    #[test]
    fn redact_api_key_empty_stays_empty() {
        assert_eq!(redact_api_key(""), "");
    }

    #[test]
    fn serde_round_trips_the_real_value() {
        let secret = RedactedString::new("sk-keep-me");
        let json = serde_json::to_string(&secret).expect("serialize");
        let parsed: RedactedString = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed.as_str(), "sk-keep-me");
    }
}

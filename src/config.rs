//! Configuration schema for the transcript editor core.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::observability::redact::RedactedString;

/// Which backend handles Strict/Repair calls.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Use `endpoint_url` if set, else fall back to the OpenAI default endpoint.
    #[default]
    Auto,
    /// OpenAI-compatible chat-completions endpoint.
    OpenAi,
    /// A caller-provided endpoint with OpenAI-shaped request/response bodies.
    Custom,
    /// Skip Strict/Repair entirely; every call goes straight to Fallback.
    Disabled,
}

/// Deferred secret source, resolved lazily so the literal value never sits
/// in a config struct that might be logged or serialized for debugging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum SecretRef {
    /// No secret configured.
    None,
    /// Read from an environment variable at resolve time.
    Env { var: String },
    /// An inline literal value (test/dev convenience; avoid in production config files).
    Literal { value: String },
}

impl Default for SecretRef {
    fn default() -> Self {
        Self::None
    }
}

impl SecretRef {
    /// Resolve to a redacted value, or `None` if no secret is configured.
    pub fn resolve(&self) -> Option<RedactedString> {
        match self {
            Self::None => None,
            Self::Env { var } => std::env::var(var).ok().map(RedactedString::new),
            Self::Literal { value } => Some(RedactedString::new(value.clone())),
        }
    }
}

/// Root configuration for the editor pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub backend: Backend,
    pub endpoint_url: Option<String>,
    pub api_key: SecretRef,
    pub model_name: String,
    pub timeout_ms: u64,
    pub max_tokens: usize,
    pub temperature: f64,
    pub debug_enabled: bool,
    pub debug_dir: Option<PathBuf>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            endpoint_url: None,
            api_key: SecretRef::None,
            model_name: "gpt-4o-mini".to_owned(),
            timeout_ms: 8_000,
            max_tokens: 800,
            temperature: 0.2,
            debug_enabled: false,
            debug_dir: None,
        }
    }
}

impl EditorConfig {
    /// Load from a TOML file, falling back to defaults for missing fields.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::error::EditorError::NotConfigured(e.to_string()))?;
        toml::from_str(&content)
            .map_err(|e| crate::error::EditorError::NotConfigured(e.to_string()))
    }

    /// Returns the resolved debug-record directory, defaulting to the
    /// platform data directory when `debug_dir` is unset.
    pub fn effective_debug_dir(&self) -> PathBuf {
        self.debug_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("transcript-editor")
                .join("debug")
        })
    }

    /// Returns the endpoint to call, applying the `Auto` fallback.
    pub fn effective_endpoint(&self) -> Option<String> {
        match self.backend {
            Backend::Disabled => None,
            Backend::Auto => Some(
                self.endpoint_url
                    .clone()
                    .unwrap_or_else(|| "https://api.openai.com/v1/chat/completions".to_owned()),
            ),
            Backend::OpenAi | Backend::Custom => self.endpoint_url.clone(),
        }
    }
}

/// Validates a config, returning `Err` with a human-readable reason on
/// the first violation found.
pub fn validate_config(config: &EditorConfig) -> Result<(), String> {
    if config.backend == Backend::Disabled {
        return Ok(());
    }
    if config.model_name.trim().is_empty() {
        return Err("model_name must not be empty for a non-disabled backend".to_owned());
    }
    if config.backend != Backend::Auto && config.endpoint_url.is_none() {
        return Err("endpoint_url is required for OpenAi/Custom backends".to_owned());
    }
    if config.timeout_ms == 0 {
        return Err("timeout_ms must be greater than zero".to_owned());
    }
    if config.max_tokens == 0 {
        return Err("max_tokens must be greater than zero".to_owned());
    }
    if !(0.0..=2.0).contains(&config.temperature) {
        return Err("temperature must be within [0.0, 2.0]".to_owned());
    }
    Ok(())
}

/// Returns a config suitable for standalone/test use: `Disabled` backend,
/// debug capture off.
pub fn default_config() -> EditorConfig {
    EditorConfig {
        backend: Backend::Disabled,
        ..EditorConfig::default()
    }
}

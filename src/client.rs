//! C2 — ModelClient: sends a prompt to the configured backend and returns
//! the raw assistant content, or a coded [`EditorError`] on failure.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::config::EditorConfig;
use crate::error::{EditorError, Result};
use crate::observability::redact::redact_auth_header;

/// Per-call sampling and timeout parameters. The Strict call uses the
/// mode-selected temperature/max-tokens (see `prompt::mode_sampling`) and
/// the configured timeout; the Repair call overrides all three to a fixed
/// `(0.0, 512, 10_000ms)` regardless of mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CallParams {
    pub temperature: f64,
    pub max_tokens: usize,
    pub timeout_ms: u64,
}

impl CallParams {
    pub const fn new(temperature: f64, max_tokens: usize, timeout_ms: u64) -> Self {
        Self { temperature, max_tokens, timeout_ms }
    }

    /// The fixed parameters used for every Repair call.
    pub const fn repair() -> Self {
        Self::new(0.0, 512, 10_000)
    }
}

/// Abstracts the remote chat-completions call so the pipeline can be driven
/// against a fake in tests without network access.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Sends `system_prompt` + `user_prompt` with `params` and returns the
    /// assistant's raw text content (still JSON-encoded per the prompt's
    /// output contract — decoding is StructureGuard's job, not this
    /// trait's).
    async fn send(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        params: CallParams,
        cancellation: &CancellationToken,
    ) -> Result<String>;
}

/// Production [`ModelClient`] backed by `reqwest` against an OpenAI-shaped
/// chat-completions endpoint.
pub struct HttpModelClient {
    http: reqwest::Client,
    config: EditorConfig,
}

impl HttpModelClient {
    pub fn new(config: EditorConfig) -> Self {
        Self { http: reqwest::Client::new(), config }
    }

    fn build_request_body(&self, system_prompt: &str, user_prompt: &str, params: CallParams) -> serde_json::Value {
        json!({
            "model": self.config.model_name,
            "max_tokens": params.max_tokens,
            "temperature": params.temperature,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_prompt },
            ],
            "response_format": { "type": "json_object" },
        })
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string())
}

fn map_http_error(status: reqwest::StatusCode, body: &str, retry_after: Option<u64>) -> EditorError {
    let message = extract_error_message(body);
    match status.as_u16() {
        401 | 403 => EditorError::AuthError(message),
        429 => EditorError::RateLimited { message, retry_after },
        500..=599 => EditorError::ServerError { status: status.as_u16(), message },
        _ => EditorError::ServerError { status: status.as_u16(), message },
    }
}

#[async_trait]
impl ModelClient for HttpModelClient {
    async fn send(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        params: CallParams,
        cancellation: &CancellationToken,
    ) -> Result<String> {
        let endpoint = self
            .config
            .effective_endpoint()
            .ok_or_else(|| EditorError::NotConfigured("no endpoint configured".to_string()))?;

        let api_key = self.config.api_key.resolve();
        let body = self.build_request_body(system_prompt, user_prompt, params);
        let timeout = std::time::Duration::from_millis(params.timeout_ms);

        if cancellation.is_cancelled() {
            return Err(EditorError::Cancelled("cancelled before request".to_string()));
        }

        let mut request = self.http.post(&endpoint).json(&body).timeout(timeout);
        if let Some(key) = &api_key {
            let header_value = format!("Bearer {}", key.as_str());
            tracing::debug!(auth_header = %redact_auth_header(&header_value), "sending request");
            request = request.bearer_auth(key.as_str());
        }

        let response = tokio::select! {
            result = request.send() => result.map_err(map_reqwest_error)?,
            _ = cancellation.cancelled() => {
                return Err(EditorError::Cancelled("cancelled while awaiting response".to_string()));
            }
        };

        if cancellation.is_cancelled() {
            return Err(EditorError::Cancelled("cancelled after response arrived".to_string()));
        }

        let status = response.status();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());

        let body_text = response.text().await.map_err(map_reqwest_error)?;

        if !status.is_success() {
            return Err(map_http_error(status, &body_text, retry_after));
        }

        let parsed: ChatCompletionResponse = serde_json::from_str(&body_text)
            .map_err(|e| EditorError::InvalidResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| EditorError::InvalidResponse("empty choices array".to_string()))
    }
}

fn map_reqwest_error(err: reqwest::Error) -> EditorError {
    if err.is_timeout() {
        EditorError::Timeout(err.to_string())
    } else {
        EditorError::NetworkError(err.to_string())
    }
}

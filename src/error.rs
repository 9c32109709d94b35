//! Error types for the transcript editor core.
//!
//! Each variant carries a stable error code (SCREAMING_SNAKE_CASE) included
//! in the `Display` output and accessible via [`EditorError::code()`]. Codes
//! are part of the public contract and will not change.
//!
//! Only [`ModelClient`](crate::client::ModelClient) returns this type.
//! StructureGuard, ModeGuard and DiffGuard never throw — they return
//! structured pass/fail results instead (see [`crate::structure_guard`],
//! [`crate::mode_guard`], [`crate::diff_guard`]).

/// Errors produced while talking to the remote chat-completions endpoint.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EditorError {
    /// No endpoint/key configured for a non-disabled backend.
    #[error("[NOT_CONFIGURED] {0}")]
    NotConfigured(String),

    /// The in-flight request was cancelled before a response arrived.
    #[error("[CANCELLED] {0}")]
    Cancelled(String),

    /// The request exceeded its timeout.
    #[error("[TIMEOUT] {0}")]
    Timeout(String),

    /// A transport-level failure (DNS, connection reset, TLS, ...).
    #[error("[REQUEST_FAILED] {0}")]
    NetworkError(String),

    /// HTTP 429, optionally carrying a `Retry-After` value in seconds.
    #[error("[RATE_LIMITED] {message}")]
    RateLimited {
        message: String,
        retry_after: Option<u64>,
    },

    /// HTTP 401.
    #[error("[AUTH_FAILED] {0}")]
    AuthError(String),

    /// Any other non-2xx HTTP status.
    #[error("[SERVER_ERROR] HTTP {status}: {message}")]
    ServerError { status: u16, message: String },

    /// The response body did not have the expected `choices[0].message.content` shape.
    #[error("[INVALID_RESPONSE] {0}")]
    InvalidResponse(String),
}

impl EditorError {
    /// Returns the stable error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotConfigured(_) => "NOT_CONFIGURED",
            Self::Cancelled(_) => "CANCELLED",
            Self::Timeout(_) => "TIMEOUT",
            Self::NetworkError(_) => "REQUEST_FAILED",
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::AuthError(_) => "AUTH_FAILED",
            Self::ServerError { .. } => "SERVER_ERROR",
            Self::InvalidResponse(_) => "INVALID_RESPONSE",
        }
    }

    /// True for every variant except [`EditorError::Cancelled`].
    ///
    /// Per the propagation policy, a Strict-pass error other than
    /// cancellation routes to Repair; a Repair-pass error routes to
    /// Fallback. Cancellation short-circuits the whole pipeline instead.
    pub fn routes_to_next_stage(&self) -> bool {
        !matches!(self, Self::Cancelled(_))
    }
}

/// Convenience alias for editor-core results.
pub type Result<T> = std::result::Result<T, EditorError>;

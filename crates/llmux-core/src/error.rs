//! Error taxonomy for provider calls.
//!
//! Transport and vendor failures propagate to the caller as typed errors so the
//! caller can pick its own retry policy. Cost-logging failures and JSON
//! salvage failures never show up here: they are swallowed at the call site.

use thiserror::Error;

/// Errors surfaced by a provider call.
#[derive(Error, Debug)]
pub enum LlmError {
    /// The vendor signaled throttling (HTTP 429) or overload (HTTP 529).
    #[error("{provider} rate limit exceeded (HTTP {status})")]
    RateLimitExceeded { provider: String, status: u16 },

    /// The vendor returned a 5xx.
    #[error("{provider} server error (HTTP {status}): {message}")]
    ServerError {
        provider: String,
        status: u16,
        message: String,
    },

    /// Any other non-success response, carrying the vendor's message.
    #[error("{provider} returned HTTP {status}: {message}")]
    Provider {
        provider: String,
        status: u16,
        message: String,
    },

    /// The request never produced an HTTP response (connect error, timeout).
    #[error("transport error: {0}")]
    Transport(String),

    /// The vendor answered 2xx with a body that is not JSON.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// No provider matches the model name.
    #[error("no provider found for model '{0}'")]
    NoProvider(String),

    /// The matched provider has no API key configured.
    #[error("provider not configured: {0}")]
    NotConfigured(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LlmError {
    /// Whether the vendor asked us to slow down.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, LlmError::RateLimitExceeded { .. })
    }

    /// Whether a caller-side retry has a reasonable chance of succeeding.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::RateLimitExceeded { .. } | LlmError::ServerError { .. } | LlmError::Transport(_)
        )
    }

    /// HTTP status attached to the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            LlmError::RateLimitExceeded { status, .. }
            | LlmError::ServerError { status, .. }
            | LlmError::Provider { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Convenience alias used across the workspace.
pub type Result<T> = std::result::Result<T, LlmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_rate_limited() {
        let err = LlmError::RateLimitExceeded {
            provider: "Anthropic".into(),
            status: 529,
        };
        assert_eq!(err.to_string(), "Anthropic rate limit exceeded (HTTP 529)");
        assert!(err.is_rate_limited());
        assert!(err.is_retryable());
    }

    #[test]
    fn test_display_provider_error() {
        let err = LlmError::Provider {
            provider: "OpenAI".into(),
            status: 400,
            message: "bad request".into(),
        };
        assert_eq!(err.to_string(), "OpenAI returned HTTP 400: bad request");
        assert!(!err.is_retryable());
        assert_eq!(err.status(), Some(400));
    }

    #[test]
    fn test_no_provider_has_no_status() {
        let err = LlmError::NoProvider("llama-3".into());
        assert_eq!(err.status(), None);
        assert!(err.to_string().contains("llama-3"));
    }

    #[test]
    fn test_json_error_from() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: LlmError = parse.unwrap_err().into();
        assert!(matches!(err, LlmError::Json(_)));
    }
}

//! HTTP transport: one JSON POST per vendor call.
//!
//! The transport only moves bytes: it returns the status and the body of
//! every response it gets. [`check_status`] turns non-2xx answers into the
//! typed errors callers see (rate limit, server error, provider error).

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, error};

use llmux_core::error::{LlmError, Result};

// ─────────────────────────────────────────────
// Request / response
// ─────────────────────────────────────────────

/// How a vendor authenticates.
#[derive(Clone, Debug, PartialEq)]
pub enum Auth {
    None,
    /// `Authorization: Bearer <token>`.
    Bearer(String),
    /// Custom header, e.g. `x-api-key`.
    Header { name: String, value: String },
    /// Query parameter, e.g. `?key=`.
    Query { name: String, value: String },
}

/// A single vendor call.
#[derive(Clone, Debug)]
pub struct TransportRequest {
    /// Display name, used in errors and logs.
    pub provider: String,
    pub url: String,
    pub auth: Auth,
    pub headers: Vec<(String, String)>,
    pub body: Value,
    pub timeout: Duration,
}

impl TransportRequest {
    pub fn new(provider: impl Into<String>, url: impl Into<String>, body: Value) -> Self {
        TransportRequest {
            provider: provider.into(),
            url: url.into(),
            auth: Auth::None,
            headers: Vec::new(),
            body,
            timeout: Duration::from_secs(600),
        }
    }

    pub fn with_auth(mut self, auth: Auth) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Status + body of a vendor response. A non-JSON body is kept as a string.
#[derive(Clone, Debug, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Value,
}

impl TransportResponse {
    pub fn new(status: u16, body: Value) -> Self {
        TransportResponse { status, body }
    }

    pub fn ok(body: Value) -> Self {
        Self::new(200, body)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs the actual HTTP call.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post_json(&self, request: TransportRequest) -> Result<TransportResponse>;
}

// ─────────────────────────────────────────────
// Status mapping
// ─────────────────────────────────────────────

/// Map a vendor response to its JSON body or a typed error.
///
/// - 2xx → body (a non-JSON body is `InvalidResponse`)
/// - 429, 529 → `RateLimitExceeded`
/// - other 5xx → `ServerError`
/// - anything else → `Provider` with the vendor's message when present
pub fn check_status(provider: &str, response: TransportResponse) -> Result<Value> {
    let status = response.status;
    if response.is_success() {
        return match response.body {
            Value::String(text) => Err(LlmError::InvalidResponse(format!(
                "{provider} returned a non-JSON body: {}",
                llmux_core::utils::truncate_string(&text, 200)
            ))),
            body => Ok(body),
        };
    }

    let message = error_message(&response.body, status);
    error!(provider, status, message = %message, "API error");

    match status {
        429 | 529 => Err(LlmError::RateLimitExceeded {
            provider: provider.to_string(),
            status,
        }),
        500..=599 => Err(LlmError::ServerError {
            provider: provider.to_string(),
            status,
            message,
        }),
        _ => Err(LlmError::Provider {
            provider: provider.to_string(),
            status,
            message,
        }),
    }
}

/// Best human-readable message from an error body.
fn error_message(body: &Value, status: u16) -> String {
    body.pointer("/error/message")
        .and_then(Value::as_str)
        .or_else(|| body.get("error").and_then(Value::as_str))
        .or_else(|| body.get("message").and_then(Value::as_str))
        .or_else(|| body.as_str().filter(|s| !s.trim().is_empty()))
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {status}"))
}

// ─────────────────────────────────────────────
// HttpTransport
// ─────────────────────────────────────────────

/// reqwest-backed transport (shared, connection-pooled client).
#[derive(Clone, Debug, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        HttpTransport { client }
    }

    /// The underlying client, reused for image downloads.
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(&self, request: TransportRequest) -> Result<TransportResponse> {
        let mut builder = self
            .client
            .post(&request.url)
            .timeout(request.timeout)
            .json(&request.body);

        builder = match &request.auth {
            Auth::None => builder,
            Auth::Bearer(token) => builder.bearer_auth(token),
            Auth::Header { name, value } => builder.header(name.as_str(), value.as_str()),
            Auth::Query { name, value } => builder.query(&[(name.as_str(), value.as_str())]),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(|e| {
            error!(provider = %request.provider, error = %e, "HTTP request failed");
            LlmError::Transport(format!("{}: {}", request.provider, e))
        })?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::Transport(format!("{}: failed to read body: {}", request.provider, e)))?;
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));

        debug!(provider = %request.provider, status, "HTTP response received");
        Ok(TransportResponse { status, body })
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // ── check_status ──

    #[test]
    fn test_success_returns_body() {
        let body = check_status("OpenAI", TransportResponse::ok(json!({"id": "x"}))).unwrap();
        assert_eq!(body["id"], "x");
    }

    #[test]
    fn test_success_with_text_body_is_invalid() {
        let err = check_status("OpenAI", TransportResponse::ok(json!("<html>"))).unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse(_)));
    }

    #[test]
    fn test_429_is_rate_limit() {
        let err = check_status("OpenAI", TransportResponse::new(429, json!("slow down"))).unwrap_err();
        assert!(matches!(err, LlmError::RateLimitExceeded { status: 429, .. }));
    }

    #[test]
    fn test_529_is_rate_limit() {
        let err = check_status(
            "Anthropic",
            TransportResponse::new(529, json!({"error": {"message": "Overloaded"}})),
        )
        .unwrap_err();
        assert!(err.is_rate_limited());
    }

    #[test]
    fn test_500_is_server_error() {
        let err = check_status("Mistral", TransportResponse::new(500, json!({}))).unwrap_err();
        match err {
            LlmError::ServerError { status, message, .. } => {
                assert_eq!(status, 500);
                assert_eq!(message, "HTTP 500");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_400_carries_vendor_message() {
        let err = check_status(
            "OpenAI",
            TransportResponse::new(400, json!({"error": {"message": "bad request"}})),
        )
        .unwrap_err();
        match err {
            LlmError::Provider { status, message, .. } => {
                assert_eq!(status, 400);
                assert_eq!(message, "bad request");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_error_message_fallbacks() {
        assert_eq!(error_message(&json!({"error": "nope"}), 403), "nope");
        assert_eq!(error_message(&json!({"message": "denied"}), 403), "denied");
        assert_eq!(error_message(&json!("plain text"), 404), "plain text");
        assert_eq!(error_message(&json!(""), 404), "HTTP 404");
    }

    // ── HttpTransport against a mock server ──

    #[tokio::test]
    async fn test_bearer_auth_and_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer test-key-123"))
            .and(body_partial_json(json!({"model": "gpt-4o"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "chatcmpl-1"})))
            .mount(&mock_server)
            .await;

        let request = TransportRequest::new(
            "OpenAI",
            format!("{}/chat/completions", mock_server.uri()),
            json!({"model": "gpt-4o"}),
        )
        .with_auth(Auth::Bearer("test-key-123".into()));

        let response = HttpTransport::new().post_json(request).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body["id"], "chatcmpl-1");
    }

    #[tokio::test]
    async fn test_header_auth_and_extra_headers() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(header("x-api-key", "sk-ant"))
            .and(header("anthropic-version", "2023-06-01"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&mock_server)
            .await;

        let request = TransportRequest::new("Anthropic", format!("{}/messages", mock_server.uri()), json!({}))
            .with_auth(Auth::Header {
                name: "x-api-key".into(),
                value: "sk-ant".into(),
            })
            .with_header("anthropic-version", "2023-06-01");

        let response = HttpTransport::new().post_json(request).await.unwrap();
        assert_eq!(response.body["ok"], true);
    }

    #[tokio::test]
    async fn test_query_auth() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/models/gemini-pro:generateContent"))
            .and(query_param("key", "g-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
            .mount(&mock_server)
            .await;

        let request = TransportRequest::new(
            "Google Gemini",
            format!("{}/models/gemini-pro:generateContent", mock_server.uri()),
            json!({}),
        )
        .with_auth(Auth::Query {
            name: "key".into(),
            value: "g-key".into(),
        });

        let response = HttpTransport::new().post_json(request).await.unwrap();
        assert!(response.is_success());
    }

    #[tokio::test]
    async fn test_non_json_error_body_is_kept_as_text() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("Rate limit exceeded"))
            .mount(&mock_server)
            .await;

        let request = TransportRequest::new("Anthropic", mock_server.uri(), json!({}));
        let response = HttpTransport::new().post_json(request).await.unwrap();
        assert_eq!(response.status, 429);
        assert_eq!(response.body, json!("Rate limit exceeded"));
        assert!(check_status("Anthropic", response).unwrap_err().is_rate_limited());
    }

    #[tokio::test]
    async fn test_network_error() {
        // Point to a port that's not listening
        let request = TransportRequest::new("OpenAI", "http://127.0.0.1:1/chat/completions", json!({}))
            .with_timeout(Duration::from_secs(5));
        let err = HttpTransport::new().post_json(request).await.unwrap_err();
        assert!(matches!(err, LlmError::Transport(_)));
    }
}

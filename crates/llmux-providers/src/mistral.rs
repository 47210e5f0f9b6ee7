//! Mistral chat completions. Same wire shape as OpenAI without the quirks:
//! no JSON switch, no images, no continuation.

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use llmux_core::config::{ClientDefaults, ProviderConfig};
use llmux_core::error::Result;
use llmux_core::types::{ChatRequest, Completion};

use crate::openai::{extract_chat_completion, message_to_json};
use crate::registry::{find_by_family, ProviderFamily, ProviderSpec};
use crate::traits::{LlmProvider, ProviderContext};
use crate::transport::{Auth, TransportRequest};

/// Build the `/chat/completions` body.
///
/// Sampling and `max_tokens` are only sent when the request sets them.
pub fn build_payload(request: &ChatRequest, defaults: &ClientDefaults) -> Value {
    let system = request
        .system_prompt
        .as_deref()
        .unwrap_or(&defaults.system_prompt);

    let mut messages = vec![json!({ "role": "system", "content": system })];
    messages.extend(request.messages.iter().map(message_to_json));
    messages.push(json!({ "role": "user", "content": request.prompt }));

    let mut body = Map::new();
    body.insert("model".into(), json!(request.model));
    body.insert("messages".into(), Value::Array(messages));

    let sampling = request.sampling();
    if let Some(temperature) = sampling.temperature {
        body.insert("temperature".into(), json!(temperature));
    }
    if let Some(top_p) = sampling.top_p {
        body.insert("top_p".into(), json!(top_p));
    }
    if let Some(max_tokens) = request.max_tokens {
        body.insert("max_tokens".into(), json!(max_tokens));
    }

    Value::Object(body)
}

/// Mistral pipeline. Single call.
#[derive(Debug)]
pub struct MistralProvider {
    ctx: ProviderContext,
    config: ProviderConfig,
    spec: &'static ProviderSpec,
}

impl MistralProvider {
    pub fn new(ctx: ProviderContext, config: ProviderConfig) -> Self {
        MistralProvider {
            ctx,
            config,
            spec: find_by_family(ProviderFamily::Mistral),
        }
    }
}

#[async_trait]
impl LlmProvider for MistralProvider {
    async fn complete(&self, request: &ChatRequest) -> Result<Completion> {
        let body = build_payload(request, &self.ctx.defaults);
        let url = format!("{}/chat/completions", self.spec.api_base(&self.config));

        let mut transport_request = TransportRequest::new(self.spec.display_name, url, body)
            .with_auth(Auth::Bearer(self.config.api_key.clone()))
            .with_timeout(self.ctx.timeout_for(request));
        if let Some(headers) = &self.config.extra_headers {
            for (name, value) in headers {
                transport_request = transport_request.with_header(name, value);
            }
        }

        let response = self
            .ctx
            .execute(transport_request, request, 0, extract_chat_completion)
            .await?;

        Ok(Completion {
            text: response.text.clone(),
            provider: self.spec.display_name.to_string(),
            model: request.model.clone(),
            truncated: response.finish_reason.is_truncated(),
            legs: vec![response],
        })
    }

    fn family(&self) -> ProviderFamily {
        ProviderFamily::Mistral
    }

    fn display_name(&self) -> &str {
        self.spec.display_name
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

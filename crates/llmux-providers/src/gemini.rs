//! Google Gemini `generateContent` pipeline.

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use llmux_core::config::{ClientDefaults, ProviderConfig};
use llmux_core::error::{LlmError, Result};
use llmux_core::types::{ChatRequest, Completion, FinishReason, NormalizedResponse, Role, Usage};

use crate::images::ImageAttachment;
use crate::registry::{find_by_family, ProviderFamily, ProviderSpec};
use crate::traits::{LlmProvider, ProviderContext};
use crate::transport::{Auth, TransportRequest};

fn content(role: &str, text: &str) -> Value {
    json!({ "role": role, "parts": [{ "text": text }] })
}

/// Build the `generateContent` body.
///
/// History turns become `contents` (assistant → `model`); system text goes
/// to `systemInstruction`. Images ride along as `inline_data` parts after
/// the prompt text.
pub fn build_payload(
    request: &ChatRequest,
    images: &[ImageAttachment],
    defaults: &ClientDefaults,
) -> Value {
    let mut system: Vec<String> = request.system_prompt.iter().cloned().collect();
    let mut contents = Vec::with_capacity(request.messages.len() + 1);
    for message in &request.messages {
        match message.role {
            Role::System => system.push(message.text()),
            Role::User => contents.push(content("user", &message.text())),
            Role::Assistant => contents.push(content("model", &message.text())),
        }
    }

    let mut turn = content("user", &request.prompt);
    if let Some(parts) = turn["parts"].as_array_mut() {
        parts.extend(images.iter().map(|image| {
            json!({ "inline_data": { "mime_type": image.mime_type, "data": image.data } })
        }));
    }
    contents.push(turn);

    let sampling = request.sampling_or(defaults.temperature);
    let mut generation = Map::new();
    if let Some(temperature) = sampling.temperature {
        generation.insert("temperature".into(), json!(temperature));
    }
    if let Some(top_p) = sampling.top_p {
        generation.insert("topP".into(), json!(top_p));
    }
    if let Some(top_k) = sampling.top_k {
        generation.insert("topK".into(), json!(top_k));
    }
    generation.insert(
        "maxOutputTokens".into(),
        json!(request.max_tokens.unwrap_or(defaults.max_tokens)),
    );
    if request.json_mode {
        generation.insert("response_mime_type".into(), json!("application/json"));
    }

    let mut body = Map::new();
    body.insert("contents".into(), Value::Array(contents));
    body.insert("generationConfig".into(), Value::Object(generation));

    let system: Vec<String> = system.into_iter().filter(|s| !s.is_empty()).collect();
    if !system.is_empty() {
        body.insert(
            "systemInstruction".into(),
            json!({ "parts": [{ "text": system.join("\n\n") }] }),
        );
    }

    Value::Object(body)
}

/// Normalize a `generateContent` response. Text is the concatenation of the
/// last candidate's parts.
pub fn extract_response(body: &Value) -> Result<NormalizedResponse> {
    let candidate = body
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|candidates| candidates.last())
        .ok_or_else(|| LlmError::InvalidResponse("response has no candidates".into()))?;

    let text: String = candidate
        .pointer("/content/parts")
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();

    let finish_reason = match candidate.get("finishReason").and_then(Value::as_str) {
        Some("MAX_TOKENS") => FinishReason::LengthTruncated,
        Some("STOP") | None => FinishReason::Normal,
        Some(other) => FinishReason::Other(other.to_string()),
    };

    let usage = Usage::new(
        body.pointer("/usageMetadata/promptTokenCount")
            .and_then(Value::as_u64)
            .unwrap_or(0),
        body.pointer("/usageMetadata/candidatesTokenCount")
            .and_then(Value::as_u64)
            .unwrap_or(0),
    );

    Ok(NormalizedResponse {
        text,
        finish_reason,
        usage,
        id: body
            .get("responseId")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

/// Gemini pipeline. Single call, no continuation.
#[derive(Debug)]
pub struct GeminiProvider {
    ctx: ProviderContext,
    config: ProviderConfig,
    spec: &'static ProviderSpec,
}

impl GeminiProvider {
    pub fn new(ctx: ProviderContext, config: ProviderConfig) -> Self {
        GeminiProvider {
            ctx,
            config,
            spec: find_by_family(ProviderFamily::Gemini),
        }
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn complete(&self, request: &ChatRequest) -> Result<Completion> {
        let images = self
            .ctx
            .images
            .resolve(&request.image_urls, self.ctx.timeout_for(request))
            .await;
        let body = build_payload(request, &images, &self.ctx.defaults);
        let url = format!(
            "{}/models/{}:generateContent",
            self.spec.api_base(&self.config),
            request.model
        );

        let mut transport_request = TransportRequest::new(self.spec.display_name, url, body)
            .with_auth(Auth::Query {
                name: "key".into(),
                value: self.config.api_key.clone(),
            })
            .with_timeout(self.ctx.timeout_for(request));
        if let Some(headers) = &self.config.extra_headers {
            for (name, value) in headers {
                transport_request = transport_request.with_header(name, value);
            }
        }

        let response = self
            .ctx
            .execute(transport_request, request, images.len(), extract_response)
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
        ProviderFamily::Gemini
    }

    fn display_name(&self) -> &str {
        self.spec.display_name
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

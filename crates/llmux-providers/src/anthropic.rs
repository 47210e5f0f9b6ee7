//! Anthropic Messages API: payload builder, response extractor and
//! prefill-append continuation.
//!
//! JSON mode has no native switch here. Without extended thinking the
//! assistant turn is prefilled with `{`; with thinking (which forbids a
//! prefill) a JSON-only instruction is appended to the system prompt.
//! A caller-supplied assistant starter always wins, and disables thinking.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::debug;

use llmux_core::config::{ClientDefaults, ProviderConfig};
use llmux_core::error::{LlmError, Result};
use llmux_core::types::{
    ChatRequest, Completion, ContentPart, FinishReason, Message, MessageContent,
    NormalizedResponse, Role, Usage,
};

use crate::continuation::{continue_while_truncated, ContinuationStrategy};
use crate::images::ImageAttachment;
use crate::registry::{find_by_family, ProviderFamily, ProviderSpec};
use crate::traits::{LlmProvider, ProviderContext};
use crate::transport::{Auth, TransportRequest};

/// Smallest thinking budget the API accepts.
pub const MIN_THINKING_BUDGET: u32 = 1024;

/// Appended to the system prompt when JSON mode runs with thinking enabled.
pub const JSON_ONLY_INSTRUCTION: &str =
    "Respond only with a single valid JSON document. Do not write anything before or after it.";

// ─────────────────────────────────────────────
// Call plan
// ─────────────────────────────────────────────

/// Per-call decisions derived from the request before any payload is built.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MessagesPlan {
    /// Top-level system text.
    pub system: Option<String>,
    /// Assistant prefill; the model continues from here.
    pub prefill: Option<String>,
    /// Extended-thinking budget, when thinking is on.
    pub thinking_budget: Option<u32>,
}

impl MessagesPlan {
    /// Work out system text, prefill and thinking for `request`.
    pub fn for_request(request: &ChatRequest) -> Self {
        let budget = request.thinking_effort.to_claude_budget();
        let thinking_requested = budget >= MIN_THINKING_BUDGET;

        let mut system = system_text(request);
        let mut prefill = request.starter().map(str::to_string);

        if request.json_mode && prefill.is_none() {
            if thinking_requested {
                system = Some(match system {
                    Some(text) => format!("{text}\n\n{JSON_ONLY_INSTRUCTION}"),
                    None => JSON_ONLY_INSTRUCTION.to_string(),
                });
            } else {
                prefill = Some("{".to_string());
            }
        }

        let thinking_budget = (thinking_requested && prefill.is_none()).then_some(budget);

        MessagesPlan {
            system,
            prefill,
            thinking_budget,
        }
    }

    /// Plan for a continuation leg: everything so far becomes the prefill
    /// and thinking is off.
    pub fn continued(&self, accumulated: &str) -> Self {
        let starter = self.prefill.as_deref().unwrap_or_default();
        MessagesPlan {
            system: self.system.clone(),
            prefill: Some(format!("{starter}{accumulated}")),
            thinking_budget: None,
        }
    }
}

/// Request system prompt plus any system turns found in the history.
fn system_text(request: &ChatRequest) -> Option<String> {
    let mut sections: Vec<String> = request.system_prompt.iter().cloned().collect();
    sections.extend(
        request
            .messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(Message::text),
    );
    let sections: Vec<String> = sections.into_iter().filter(|s| !s.is_empty()).collect();
    (!sections.is_empty()).then(|| sections.join("\n\n"))
}

// ─────────────────────────────────────────────
// Payload
// ─────────────────────────────────────────────

fn image_block(mime_type: &str, data: &str) -> Value {
    json!({
        "type": "image",
        "source": { "type": "base64", "media_type": mime_type, "data": data }
    })
}

fn part_to_block(part: &ContentPart) -> Value {
    match part {
        ContentPart::Text { text } => json!({ "type": "text", "text": text }),
        ContentPart::Image { mime_type, data } => image_block(mime_type, data),
        ContentPart::ImageUrl { image_url } => match ImageAttachment::from_data_url(&image_url.url) {
            Some(image) => image_block(&image.mime_type, &image.data),
            None => json!({
                "type": "image",
                "source": { "type": "url", "url": image_url.url }
            }),
        },
    }
}

fn message_to_json(message: &Message) -> Value {
    let content = match &message.content {
        MessageContent::Text(text) => Value::String(text.clone()),
        MessageContent::Parts(parts) => Value::Array(parts.iter().map(part_to_block).collect()),
    };
    json!({ "role": message.role.as_str(), "content": content })
}

/// Build the `/messages` body.
pub fn build_payload(
    request: &ChatRequest,
    images: &[ImageAttachment],
    plan: &MessagesPlan,
    defaults: &ClientDefaults,
) -> Value {
    let mut messages: Vec<Value> = request
        .messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(message_to_json)
        .collect();

    let user_content = if images.is_empty() {
        Value::String(request.prompt.clone())
    } else {
        let mut blocks: Vec<Value> = images
            .iter()
            .map(|image| image_block(&image.mime_type, &image.data))
            .collect();
        blocks.push(json!({ "type": "text", "text": request.prompt }));
        Value::Array(blocks)
    };
    messages.push(json!({ "role": "user", "content": user_content }));

    // The final assistant turn may not end in whitespace or be empty.
    if let Some(prefill) = plan.prefill.as_deref().map(str::trim_end) {
        if !prefill.is_empty() {
            messages.push(json!({ "role": "assistant", "content": prefill }));
        }
    }

    let mut max_tokens = request.max_tokens.unwrap_or(defaults.max_tokens);

    let mut body = Map::new();
    body.insert("model".into(), json!(request.model));
    body.insert("messages".into(), Value::Array(messages));
    if let Some(system) = &plan.system {
        body.insert("system".into(), json!(system));
    }

    match plan.thinking_budget {
        Some(budget) => {
            if max_tokens <= budget {
                max_tokens += budget;
            }
            body.insert(
                "thinking".into(),
                json!({ "type": "enabled", "budget_tokens": budget }),
            );
            body.insert("temperature".into(), json!(1));
        }
        None => {
            let sampling = request.sampling_or(defaults.temperature);
            if let Some(temperature) = sampling.temperature {
                body.insert("temperature".into(), json!(temperature));
            }
            if let Some(top_p) = sampling.top_p {
                body.insert("top_p".into(), json!(top_p));
            }
            if let Some(top_k) = sampling.top_k {
                body.insert("top_k".into(), json!(top_k));
            }
        }
    }
    body.insert("max_tokens".into(), json!(max_tokens));

    if let Some(user_id) = request.metadata.user_id {
        body.insert("metadata".into(), json!({ "user_id": user_id.to_string() }));
    }

    Value::Object(body)
}

// ─────────────────────────────────────────────
// Response
// ─────────────────────────────────────────────

/// Normalize a Messages API response. The text is the last text block;
/// thinking blocks are skipped.
pub fn extract_response(body: &Value) -> Result<NormalizedResponse> {
    let blocks = body
        .get("content")
        .and_then(Value::as_array)
        .ok_or_else(|| LlmError::InvalidResponse("response has no content".into()))?;

    let text = blocks
        .iter()
        .rev()
        .filter(|block| {
            matches!(
                block.get("type").and_then(Value::as_str),
                None | Some("text")
            )
        })
        .find_map(|block| block.get("text").and_then(Value::as_str))
        .unwrap_or_default()
        .to_string();

    let finish_reason = match body.get("stop_reason").and_then(Value::as_str) {
        Some("max_tokens") => FinishReason::LengthTruncated,
        Some("end_turn") | Some("stop_sequence") | None => FinishReason::Normal,
        Some(other) => FinishReason::Other(other.to_string()),
    };

    let usage = Usage::new(
        body.pointer("/usage/input_tokens")
            .and_then(Value::as_u64)
            .unwrap_or(0),
        body.pointer("/usage/output_tokens")
            .and_then(Value::as_u64)
            .unwrap_or(0),
    );

    Ok(NormalizedResponse {
        text,
        finish_reason,
        usage,
        id: body.get("id").and_then(Value::as_str).map(str::to_string),
    })
}

// ─────────────────────────────────────────────
// AnthropicProvider
// ─────────────────────────────────────────────

/// Anthropic Messages API pipeline.
#[derive(Debug)]
pub struct AnthropicProvider {
    ctx: ProviderContext,
    config: ProviderConfig,
    spec: &'static ProviderSpec,
}

impl AnthropicProvider {
    pub fn new(ctx: ProviderContext, config: ProviderConfig) -> Self {
        AnthropicProvider {
            ctx,
            config,
            spec: find_by_family(ProviderFamily::Anthropic),
        }
    }

    async fn call_once(
        &self,
        request: &ChatRequest,
        images: &[ImageAttachment],
        plan: &MessagesPlan,
    ) -> Result<NormalizedResponse> {
        let body = build_payload(request, images, plan, &self.ctx.defaults);
        let url = format!("{}/messages", self.spec.api_base(&self.config));

        let mut transport_request = TransportRequest::new(self.spec.display_name, url, body)
            .with_auth(Auth::Header {
                name: "x-api-key".into(),
                value: self.config.api_key.clone(),
            })
            .with_header("anthropic-version", self.ctx.defaults.anthropic_version.as_str())
            .with_timeout(self.ctx.timeout_for(request));
        if let Some(headers) = &self.config.extra_headers {
            for (name, value) in headers {
                transport_request = transport_request.with_header(name, value);
            }
        }

        self.ctx
            .execute(transport_request, request, images.len(), extract_response)
            .await
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    async fn complete(&self, request: &ChatRequest) -> Result<Completion> {
        let images = self
            .ctx
            .images
            .resolve(&request.image_urls, self.ctx.timeout_for(request))
            .await;
        let plan = MessagesPlan::for_request(request);
        debug!(
            model = %request.model,
            prefill = plan.prefill.is_some(),
            thinking = ?plan.thinking_budget,
            "Anthropic request"
        );

        let first = self.call_once(request, &images, &plan).await?;

        // Total calls, the first one included.
        let max_attempts = request
            .max_attempts
            .unwrap_or(self.ctx.defaults.anthropic_max_attempts)
            .max(1);
        let strategy = PrefillAppend {
            provider: self,
            request,
            images: &images,
            plan: &plan,
        };
        let outcome = continue_while_truncated(&strategy, first, max_attempts - 1).await?;

        let starter = plan.prefill.unwrap_or_default();
        Ok(Completion {
            text: format!("{starter}{}", outcome.text),
            provider: self.spec.display_name.to_string(),
            model: request.model.clone(),
            legs: outcome.legs,
            truncated: outcome.truncated,
        })
    }

    fn family(&self) -> ProviderFamily {
        ProviderFamily::Anthropic
    }

    fn display_name(&self) -> &str {
        self.spec.display_name
    }
}

/// Continue by resending the conversation with the partial answer in the
/// assistant turn.
struct PrefillAppend<'a> {
    provider: &'a AnthropicProvider,
    request: &'a ChatRequest,
    images: &'a [ImageAttachment],
    plan: &'a MessagesPlan,
}

#[async_trait]
impl ContinuationStrategy for PrefillAppend<'_> {
    async fn next_leg(&self, accumulated: &str) -> Result<NormalizedResponse> {
        let plan = self.plan.continued(accumulated);
        self.provider.call_once(self.request, self.images, &plan).await
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

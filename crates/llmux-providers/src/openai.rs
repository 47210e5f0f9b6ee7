//! OpenAI chat completions: payload builder, response extractor, prompt
//! replay continuation, plus the embeddings and moderation endpoints.
//!
//! Reasoning models (o-series, gpt-5) get their own payload shape: no
//! sampling knobs, `max_completion_tokens`, optional `reasoning_effort`, and
//! for the oldest ones no system role at all.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::debug;

use llmux_core::config::{ClientDefaults, ProviderConfig};
use llmux_core::effort::ThinkingEffort;
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

// ─────────────────────────────────────────────
// Model profiles
// ─────────────────────────────────────────────

/// Payload quirks of an OpenAI model line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ModelProfile {
    /// Reasoning model: fixed temperature, no top_p or penalties,
    /// `max_completion_tokens`, no `response_format`.
    pub reasoning: bool,
    /// Accepts a `system` message.
    pub system_role: bool,
    /// Accepts `reasoning_effort`.
    pub reasoning_effort: bool,
}

const CHAT_MODEL: ModelProfile = ModelProfile {
    reasoning: false,
    system_role: true,
    reasoning_effort: false,
};

/// Prefix table, most specific first.
static MODEL_PROFILES: &[(&str, ModelProfile)] = &[
    (
        "o1-mini",
        ModelProfile {
            reasoning: true,
            system_role: false,
            reasoning_effort: false,
        },
    ),
    (
        "o1-preview",
        ModelProfile {
            reasoning: true,
            system_role: false,
            reasoning_effort: false,
        },
    ),
    (
        "o1",
        ModelProfile {
            reasoning: true,
            system_role: true,
            reasoning_effort: true,
        },
    ),
    (
        "o3",
        ModelProfile {
            reasoning: true,
            system_role: true,
            reasoning_effort: true,
        },
    ),
    (
        "o4",
        ModelProfile {
            reasoning: true,
            system_role: true,
            reasoning_effort: true,
        },
    ),
    (
        "gpt-5",
        ModelProfile {
            reasoning: true,
            system_role: true,
            reasoning_effort: true,
        },
    ),
];

/// Look up the payload profile for a model. Unknown models are plain chat.
pub fn model_profile(model: &str) -> ModelProfile {
    let model_lower = model.to_lowercase();
    MODEL_PROFILES
        .iter()
        .find(|(prefix, _)| model_lower.starts_with(prefix))
        .map(|(_, profile)| *profile)
        .unwrap_or(CHAT_MODEL)
}

/// Output ceiling for a model line.
pub fn default_max_output_tokens(model: &str) -> u32 {
    let model_lower = model.to_lowercase();
    if model_lower.starts_with("gpt-4") {
        8000
    } else if model_lower.starts_with("gpt-3.5-turbo") {
        16000
    } else {
        3900
    }
}

/// A single user turn carrying `prompt`.
pub fn generate_chat_array(prompt: &str) -> Vec<Message> {
    vec![Message::user(prompt)]
}

// ─────────────────────────────────────────────
// Payload
// ─────────────────────────────────────────────

/// Convert a message to the chat-completions wire shape.
pub(crate) fn message_to_json(message: &Message) -> Value {
    let content = match &message.content {
        MessageContent::Text(text) => Value::String(text.clone()),
        MessageContent::Parts(parts) => Value::Array(parts.iter().map(part_to_json).collect()),
    };
    json!({ "role": message.role.as_str(), "content": content })
}

fn part_to_json(part: &ContentPart) -> Value {
    match part {
        ContentPart::Text { text } => json!({ "type": "text", "text": text }),
        ContentPart::ImageUrl { image_url } => {
            let mut url = json!({ "url": image_url.url });
            if let Some(detail) = &image_url.detail {
                url["detail"] = json!(detail);
            }
            json!({ "type": "image_url", "image_url": url })
        }
        ContentPart::Image { mime_type, data } => json!({
            "type": "image_url",
            "image_url": { "url": format!("data:{mime_type};base64,{data}") }
        }),
    }
}

/// Build the `/chat/completions` body.
pub fn build_payload(
    request: &ChatRequest,
    images: &[ImageAttachment],
    defaults: &ClientDefaults,
) -> Value {
    let profile = model_profile(&request.model);
    let system = request
        .system_prompt
        .as_deref()
        .unwrap_or(&defaults.system_prompt);

    let mut messages = Vec::with_capacity(request.messages.len() + 2);
    let mut user_text = request.prompt.clone();
    if profile.system_role {
        messages.push(json!({ "role": "system", "content": system }));
        messages.extend(request.messages.iter().map(message_to_json));
    } else {
        // No system role at all: every system text is folded into the new turn.
        let mut sections = vec![system.to_string()];
        sections.extend(
            request
                .messages
                .iter()
                .filter(|m| m.role == Role::System)
                .map(Message::text),
        );
        sections.push(user_text);
        user_text = sections
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");
        messages.extend(
            request
                .messages
                .iter()
                .filter(|m| m.role != Role::System)
                .map(message_to_json),
        );
    }

    let user_content = if images.is_empty() {
        Value::String(user_text)
    } else {
        let mut parts = vec![json!({ "type": "text", "text": user_text })];
        parts.extend(images.iter().map(|image| {
            json!({ "type": "image_url", "image_url": { "url": image.to_data_url() } })
        }));
        Value::Array(parts)
    };
    messages.push(json!({ "role": "user", "content": user_content }));

    let max_tokens = request.max_tokens.unwrap_or_else(|| {
        defaults
            .max_tokens
            .min(default_max_output_tokens(&request.model))
    });

    let mut body = Map::new();
    body.insert("model".into(), json!(request.model));
    body.insert("messages".into(), Value::Array(messages));

    if profile.reasoning {
        body.insert("temperature".into(), json!(1));
        body.insert("max_completion_tokens".into(), json!(max_tokens));
        if profile.reasoning_effort {
            if let Some(effort) = request.thinking_effort.to_openai_effort() {
                body.insert("reasoning_effort".into(), json!(effort));
            }
        }
    } else {
        let sampling = request.sampling_or(defaults.temperature);
        if let Some(temperature) = sampling.temperature {
            body.insert("temperature".into(), json!(temperature));
        }
        if let Some(top_p) = sampling.top_p {
            body.insert("top_p".into(), json!(top_p));
        }
        if let Some(penalty) = request.frequency_penalty {
            body.insert("frequency_penalty".into(), json!(penalty));
        }
        if let Some(penalty) = request.presence_penalty {
            body.insert("presence_penalty".into(), json!(penalty));
        }
        body.insert("max_tokens".into(), json!(max_tokens));
        if request.json_mode {
            body.insert("response_format".into(), json!({ "type": "json_object" }));
        }
    }

    if let Some(user_id) = request.metadata.user_id {
        body.insert("user".into(), json!(format!("user-{user_id}")));
    }

    Value::Object(body)
}

// ─────────────────────────────────────────────
// Response
// ─────────────────────────────────────────────

/// Normalize a chat-completions response (OpenAI and Mistral).
pub fn extract_chat_completion(body: &Value) -> Result<NormalizedResponse> {
    let choice = body
        .pointer("/choices/0")
        .ok_or_else(|| LlmError::InvalidResponse("response has no choices".into()))?;

    let text = choice
        .pointer("/message/content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let finish_reason = match choice.get("finish_reason").and_then(Value::as_str) {
        Some("length") => FinishReason::LengthTruncated,
        Some("stop") | None => FinishReason::Normal,
        Some(other) => FinishReason::Other(other.to_string()),
    };

    let usage = Usage::new(
        body.pointer("/usage/prompt_tokens")
            .and_then(Value::as_u64)
            .unwrap_or(0),
        body.pointer("/usage/completion_tokens")
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

/// Prompt for the next leg: the original prompt plus everything produced so
/// far, asking the model to pick up exactly where it stopped.
pub fn continuation_prompt(prompt: &str, so_far: &str) -> String {
    format!(
        "Below are a PROMPT and the INITIAL ANSWER a model gave to it. The answer was cut off \
before it was finished. Continue the answer, starting EXACTLY where the INITIAL ANSWER left \
off, without repeating any of it and without adding any commentary.\n\n\
PROMPT\n{prompt}\n\n\
INITIAL ANSWER:\n{so_far}"
    )
}

// ─────────────────────────────────────────────
// OpenAiProvider
// ─────────────────────────────────────────────

/// OpenAI chat completions pipeline.
#[derive(Debug)]
pub struct OpenAiProvider {
    ctx: ProviderContext,
    config: ProviderConfig,
    spec: &'static ProviderSpec,
}

impl OpenAiProvider {
    pub fn new(ctx: ProviderContext, config: ProviderConfig) -> Self {
        OpenAiProvider {
            ctx,
            config,
            spec: find_by_family(ProviderFamily::OpenAi),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.spec.api_base(&self.config), path)
    }

    fn transport_request(&self, path: &str, body: Value) -> TransportRequest {
        let mut request = TransportRequest::new(self.spec.display_name, self.endpoint(path), body)
            .with_auth(Auth::Bearer(self.config.api_key.clone()))
            .with_timeout(std::time::Duration::from_secs(self.ctx.defaults.timeout_secs));
        if let Some(headers) = &self.config.extra_headers {
            for (name, value) in headers {
                request = request.with_header(name, value);
            }
        }
        request
    }

    /// One vendor call: build, send, normalize, log cost.
    async fn call_once(
        &self,
        request: &ChatRequest,
        images: &[ImageAttachment],
    ) -> Result<NormalizedResponse> {
        let body = build_payload(request, images, &self.ctx.defaults);
        let transport_request = self
            .transport_request("chat/completions", body)
            .with_timeout(self.ctx.timeout_for(request));

        self.ctx
            .execute(transport_request, request, images.len(), extract_chat_completion)
            .await
    }

    /// Embedding vector for `input`.
    pub async fn embedding(&self, input: &str, model: &str) -> Result<Vec<f32>> {
        let body = json!({ "model": model, "input": input });
        let raw = self
            .ctx
            .send(self.transport_request("embeddings", body))
            .await?;

        let vector = raw
            .pointer("/data/0/embedding")
            .and_then(Value::as_array)
            .ok_or_else(|| LlmError::InvalidResponse("embedding missing from response".into()))?;
        Ok(vector
            .iter()
            .filter_map(Value::as_f64)
            .map(|v| v as f32)
            .collect())
    }

    /// Raw moderation verdict for `input`.
    pub async fn moderation(&self, input: &str) -> Result<Value> {
        let body = json!({ "input": input });
        self.ctx
            .send(self.transport_request("moderations", body))
            .await
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn complete(&self, request: &ChatRequest) -> Result<Completion> {
        let images = self
            .ctx
            .images
            .resolve(&request.image_urls, self.ctx.timeout_for(request))
            .await;
        let first = self.call_once(request, &images).await?;

        let budget = request
            .max_attempts
            .unwrap_or(self.ctx.defaults.openai_continuations);
        let strategy = PromptReplay {
            provider: self,
            request,
        };
        let outcome = continue_while_truncated(&strategy, first, budget).await?;

        Ok(Completion {
            text: outcome.text,
            provider: self.spec.display_name.to_string(),
            model: request.model.clone(),
            legs: outcome.legs,
            truncated: outcome.truncated,
        })
    }

    fn family(&self) -> ProviderFamily {
        ProviderFamily::OpenAi
    }

    fn display_name(&self) -> &str {
        self.spec.display_name
    }
}

/// Continue by replaying the prompt with the partial answer attached.
///
/// Each leg is a fresh single-turn request at temperature 0, JSON mode off.
struct PromptReplay<'a> {
    provider: &'a OpenAiProvider,
    request: &'a ChatRequest,
}

#[async_trait]
impl ContinuationStrategy for PromptReplay<'_> {
    async fn next_leg(&self, accumulated: &str) -> Result<NormalizedResponse> {
        let leg = ChatRequest {
            prompt: continuation_prompt(&self.request.prompt, accumulated),
            messages: Vec::new(),
            temperature: Some(0.0),
            top_p: None,
            json_mode: false,
            image_urls: Vec::new(),
            thinking_effort: ThinkingEffort::None,
            ..self.request.clone()
        };
        debug!(model = %leg.model, "Requesting continuation leg");
        self.provider.call_once(&leg, &[]).await
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{chat_completion, context, ScriptedTransport};
    use crate::transport::TransportResponse;
    use serde_json::json;

    fn defaults() -> ClientDefaults {
        ClientDefaults::default()
    }

    // ── profiles ──

    #[test]
    fn test_model_profiles() {
        assert_eq!(model_profile("gpt-4o"), CHAT_MODEL);
        assert!(!model_profile("o1-mini").system_role);
        assert!(!model_profile("o1-preview-2024").reasoning_effort);
        assert!(model_profile("o1").reasoning_effort);
        assert!(model_profile("o3-mini").reasoning);
        assert!(model_profile("gpt-5-mini").reasoning);
        assert!(!model_profile("gpt-4.1").reasoning);
    }

    #[test]
    fn test_default_max_output_tokens() {
        assert_eq!(default_max_output_tokens("gpt-4o"), 8000);
        assert_eq!(default_max_output_tokens("gpt-3.5-turbo-0125"), 16000);
        assert_eq!(default_max_output_tokens("o3-mini"), 3900);
    }

    #[test]
    fn test_generate_chat_array() {
        let messages = generate_chat_array("Hello");
        assert_eq!(messages, vec![Message::user("Hello")]);
    }

    // ── payload ──

    #[test]
    fn test_chat_payload() {
        let request = ChatRequest::new("gpt-4o", "Summarize this")
            .with_system("Be brief.")
            .with_messages(vec![Message::user("Hi"), Message::assistant("Hello!")])
            .with_temperature(0.2)
            .with_max_tokens(500)
            .json_mode(true)
            .with_user(42);
        let body = build_payload(&request, &[], &defaults());

        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["messages"][0], json!({"role": "system", "content": "Be brief."}));
        assert_eq!(body["messages"][1]["content"], "Hi");
        assert_eq!(body["messages"][2]["role"], "assistant");
        assert_eq!(body["messages"][3], json!({"role": "user", "content": "Summarize this"}));
        assert_eq!(body["temperature"], 0.2);
        assert_eq!(body["max_tokens"], 500);
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["user"], "user-42");
    }

    #[test]
    fn test_temperature_wins_over_top_p() {
        let request = ChatRequest::new("gpt-4o", "x")
            .with_temperature(0.9)
            .with_top_p(0.5);
        let body = build_payload(&request, &[], &defaults());
        assert_eq!(body["temperature"], 0.9);
        assert!(body.get("top_p").is_none());

        let request = ChatRequest::new("gpt-4o", "x").with_top_p(0.5);
        let body = build_payload(&request, &[], &defaults());
        assert_eq!(body["top_p"], 0.5);
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn test_default_system_and_temperature() {
        let body = build_payload(&ChatRequest::new("gpt-4o-mini", "x"), &[], &defaults());
        assert_eq!(body["messages"][0]["content"], "You are a helpful assistant.");
        assert_eq!(body["temperature"], 0.7);
        assert_eq!(body["max_tokens"], 4096);
    }

    #[test]
    fn test_reasoning_payload() {
        let request = ChatRequest::new("o3-mini", "Solve it")
            .with_temperature(0.2)
            .with_top_p(0.4)
            .with_penalties(0.5, 0.5)
            .with_max_tokens(2000)
            .json_mode(true)
            .with_thinking(ThinkingEffort::High);
        let body = build_payload(&request, &[], &defaults());

        assert_eq!(body["temperature"], 1);
        assert_eq!(body["max_completion_tokens"], 2000);
        assert_eq!(body["reasoning_effort"], "high");
        for absent in ["top_p", "frequency_penalty", "presence_penalty", "max_tokens", "response_format"] {
            assert!(body.get(absent).is_none(), "{absent} should be absent");
        }
    }

    #[test]
    fn test_reasoning_effort_none_omitted() {
        let body = build_payload(&ChatRequest::new("o1", "x"), &[], &defaults());
        assert!(body.get("reasoning_effort").is_none());
    }

    #[test]
    fn test_system_merged_for_models_without_system_role() {
        let request = ChatRequest::new("o1-mini", "What is 2+2?")
            .with_system("Answer tersely.")
            .with_thinking(ThinkingEffort::Low);
        let body = build_payload(&request, &[], &defaults());

        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[0]["content"], "Answer tersely.\n\nWhat is 2+2?");
        assert!(body.get("reasoning_effort").is_none());
    }

    #[test]
    fn test_history_system_turns_merged_for_models_without_system_role() {
        let request = ChatRequest::new("o1-preview", "Continue.")
            .with_system("Answer tersely.")
            .with_messages(vec![
                Message::system("Use metric units."),
                Message::user("How far is it?"),
                Message::assistant("12 km."),
            ]);
        let body = build_payload(&request, &[], &defaults());

        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 3);
        assert!(messages.iter().all(|m| m["role"] != "system"));
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[1]["role"], "assistant");
        assert_eq!(
            messages[2]["content"],
            "Answer tersely.\n\nUse metric units.\n\nContinue."
        );
    }

    #[test]
    fn test_images_become_content_parts() {
        let images = vec![
            ImageAttachment::from_bytes("/tmp/a.png", b"abc"),
            ImageAttachment::from_data_url("data:image/webp;base64,AAAA").unwrap(),
        ];
        let body = build_payload(&ChatRequest::new("gpt-4o", "Describe"), &images, &defaults());

        let content = &body["messages"][1]["content"];
        assert_eq!(content[0], json!({"type": "text", "text": "Describe"}));
        assert_eq!(content[1]["image_url"]["url"], "data:image/png;base64,YWJj");
        assert_eq!(content[2]["image_url"]["url"], "data:image/webp;base64,AAAA");
    }

    // ── extraction ──

    #[test]
    fn test_extract_chat_completion() {
        let response = extract_chat_completion(&chat_completion("Hello", "length")).unwrap();
        assert_eq!(response.text, "Hello");
        assert_eq!(response.finish_reason, FinishReason::LengthTruncated);
        assert_eq!(response.usage, Usage::new(10, 5));
        assert_eq!(response.id.as_deref(), Some("chatcmpl-test"));
    }

    #[test]
    fn test_extract_other_finish_reason() {
        let response = extract_chat_completion(&chat_completion("", "content_filter")).unwrap();
        assert_eq!(response.finish_reason, FinishReason::Other("content_filter".into()));
    }

    #[test]
    fn test_extract_without_choices() {
        let err = extract_chat_completion(&json!({"id": "x"})).unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse(_)));
    }

    #[test]
    fn test_continuation_prompt() {
        let prompt = continuation_prompt("Write a story", "Once upon");
        assert!(prompt.contains("PROMPT\nWrite a story"));
        assert!(prompt.ends_with("INITIAL ANSWER:\nOnce upon"));
    }

    // ── provider ──

    #[tokio::test]
    async fn test_complete_single_leg() {
        let transport = ScriptedTransport::new(vec![TransportResponse::ok(chat_completion("Hi!", "stop"))]);
        let (ctx, costs) = context(transport.clone());
        let provider = OpenAiProvider::new(ctx, ProviderConfig::new("sk-test"));

        let completion = provider
            .complete(&ChatRequest::new("gpt-4o", "Hello").with_user(3))
            .await
            .unwrap();
        assert_eq!(completion.text, "Hi!");
        assert_eq!(completion.provider, "OpenAI");
        assert!(!completion.truncated);

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, "https://api.openai.com/v1/chat/completions");
        assert_eq!(requests[0].auth, Auth::Bearer("sk-test".into()));

        let records = costs.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].service, "OpenAI");
        assert_eq!(records[0].user_id, Some(3));
        assert_eq!(records[0].input_tokens, 10);
    }

    #[tokio::test]
    async fn test_truncated_response_replays_prompt() {
        let transport = ScriptedTransport::new(vec![
            TransportResponse::ok(chat_completion("Once upon", "length")),
            TransportResponse::ok(chat_completion(" a time.", "stop")),
        ]);
        let (ctx, costs) = context(transport.clone());
        let provider = OpenAiProvider::new(ctx, ProviderConfig::new("sk-test"));

        let request = ChatRequest::new("gpt-4o", "Write a story")
            .json_mode(true)
            .with_max_attempts(3);
        let completion = provider.complete(&request).await.unwrap();
        assert_eq!(completion.text, "Once upon a time.");
        assert_eq!(completion.legs.len(), 2);
        assert!(!completion.truncated);
        assert_eq!(costs.len(), 2);

        let bodies = transport.bodies();
        let replay = &bodies[1];
        assert_eq!(replay["temperature"], 0.0);
        assert!(replay.get("response_format").is_none());
        let user_turn = replay["messages"][1]["content"].as_str().unwrap();
        assert!(user_turn.contains("PROMPT\nWrite a story"));
        assert!(user_turn.ends_with("INITIAL ANSWER:\nOnce upon"));
    }

    #[tokio::test]
    async fn test_no_continuation_by_default() {
        let transport =
            ScriptedTransport::new(vec![TransportResponse::ok(chat_completion("Once upon", "length"))]);
        let (ctx, _costs) = context(transport.clone());
        let provider = OpenAiProvider::new(ctx, ProviderConfig::new("sk-test"));

        let completion = provider
            .complete(&ChatRequest::new("gpt-4o", "Write a story"))
            .await
            .unwrap();
        assert_eq!(completion.text, "Once upon");
        assert!(completion.truncated);
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_status_mapping() {
        for (status, check) in [
            (429u16, "rate" as &str),
            (500, "server"),
            (400, "provider"),
        ] {
            let transport = ScriptedTransport::new(vec![TransportResponse::new(
                status,
                json!({"error": {"message": "nope"}}),
            )]);
            let (ctx, costs) = context(transport);
            let provider = OpenAiProvider::new(ctx, ProviderConfig::new("sk-test"));
            let err = provider
                .complete(&ChatRequest::new("gpt-4o", "x"))
                .await
                .unwrap_err();
            match check {
                "rate" => assert!(matches!(err, LlmError::RateLimitExceeded { .. })),
                "server" => assert!(matches!(err, LlmError::ServerError { status: 500, .. })),
                _ => assert!(matches!(err, LlmError::Provider { status: 400, .. })),
            }
            assert!(costs.is_empty());
        }
    }

    #[tokio::test]
    async fn test_embedding() {
        let transport = ScriptedTransport::new(vec![TransportResponse::ok(json!({
            "data": [{"embedding": [0.25, -0.5, 1.0]}]
        }))]);
        let (ctx, _costs) = context(transport.clone());
        let provider = OpenAiProvider::new(ctx, ProviderConfig::new("sk-test"));

        let vector = provider
            .embedding("hello", "text-embedding-3-small")
            .await
            .unwrap();
        assert_eq!(vector, vec![0.25, -0.5, 1.0]);
        assert_eq!(transport.requests()[0].url, "https://api.openai.com/v1/embeddings");
        assert_eq!(transport.bodies()[0]["model"], "text-embedding-3-small");
    }

    #[tokio::test]
    async fn test_moderation_returns_raw_json() {
        let verdict = json!({"results": [{"flagged": false}]});
        let transport = ScriptedTransport::new(vec![TransportResponse::ok(verdict.clone())]);
        let (ctx, _costs) = context(transport.clone());
        let provider = OpenAiProvider::new(ctx, ProviderConfig::new("sk-test"));

        assert_eq!(provider.moderation("text").await.unwrap(), verdict);
        assert_eq!(transport.requests()[0].url, "https://api.openai.com/v1/moderations");
    }
}

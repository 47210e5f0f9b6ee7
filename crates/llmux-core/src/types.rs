//! Core types: the canonical request every vendor pipeline consumes and the
//! normalized result every vendor pipeline produces.
//!
//! Messages follow the OpenAI chat shape on the wire (`role` + `content`,
//! content either a string or an array of typed parts); vendor builders
//! translate from here.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::effort::ThinkingEffort;

// ─────────────────────────────────────────────
// Messages
// ─────────────────────────────────────────────

/// Speaker of a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A role-tagged chat message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Message {
            role: Role::System,
            content: MessageContent::Text(content.into()),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Message {
            role: Role::User,
            content: MessageContent::Text(content.into()),
        }
    }

    /// User message with multipart content (text + images).
    pub fn user_parts(parts: Vec<ContentPart>) -> Self {
        Message {
            role: Role::User,
            content: MessageContent::Parts(parts),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Message {
            role: Role::Assistant,
            content: MessageContent::Text(content.into()),
        }
    }

    /// Flattened text of the message (image parts are skipped).
    pub fn text(&self) -> String {
        self.content.as_text()
    }
}

/// Message content: plain text or an ordered list of typed parts.
///
/// Serialized untagged: text becomes a string, parts become an array.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    pub fn as_text(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    ContentPart::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// A single part of a multipart message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    /// Image referenced by URL (remote URL or `data:` URI).
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
    /// Image carried inline as base64 with its detected MIME type.
    #[serde(rename = "image")]
    Image { mime_type: String, data: String },
}

/// Image URL payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

// ─────────────────────────────────────────────
// Canonical request
// ─────────────────────────────────────────────

/// Identifying metadata forwarded to the cost log.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CallMetadata {
    pub user_id: Option<i64>,
    pub description: Option<String>,
    pub job_uuid: Option<String>,
}

/// Sampling parameters after the temperature/top_p rule has been applied.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Sampling {
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub top_k: Option<u32>,
}

impl Sampling {
    /// Temperature and top_p are mutually exclusive: when both are set,
    /// temperature wins and top_p is dropped. Every vendor uses this rule.
    pub fn resolve(temperature: Option<f64>, top_p: Option<f64>, top_k: Option<u32>) -> Self {
        let top_p = if temperature.is_some() { None } else { top_p };
        Sampling {
            temperature,
            top_p,
            top_k,
        }
    }
}

/// Vendor-neutral chat request.
#[derive(Clone, Debug, PartialEq)]
pub struct ChatRequest {
    /// The new user turn.
    pub prompt: String,
    /// Prior conversation, oldest first. May be empty.
    pub messages: Vec<Message>,
    pub model: String,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub top_k: Option<u32>,
    pub frequency_penalty: Option<f64>,
    pub presence_penalty: Option<f64>,
    /// Output budget; the vendor pipeline picks a default when absent.
    pub max_tokens: Option<u32>,
    pub system_prompt: Option<String>,
    pub json_mode: bool,
    /// Text seeded as the start of the model's own turn.
    pub assistant_starter: Option<String>,
    /// Image references attached to the new user turn (URLs, data URIs, paths).
    pub image_urls: Vec<String>,
    pub thinking_effort: ThinkingEffort,
    /// Continuation budget; the vendor pipeline picks a default when absent.
    pub max_attempts: Option<u32>,
    /// Per-call wall-clock timeout handed to the transport.
    pub timeout: Option<Duration>,
    pub metadata: CallMetadata,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        ChatRequest {
            prompt: prompt.into(),
            messages: Vec::new(),
            model: model.into(),
            temperature: None,
            top_p: None,
            top_k: None,
            frequency_penalty: None,
            presence_penalty: None,
            max_tokens: None,
            system_prompt: None,
            json_mode: false,
            assistant_starter: None,
            image_urls: Vec::new(),
            thinking_effort: ThinkingEffort::None,
            max_attempts: None,
            timeout: None,
            metadata: CallMetadata::default(),
        }
    }

    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }

    pub fn with_system(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_top_p(mut self, top_p: f64) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn with_top_k(mut self, top_k: u32) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn with_penalties(mut self, frequency: f64, presence: f64) -> Self {
        self.frequency_penalty = Some(frequency);
        self.presence_penalty = Some(presence);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn json_mode(mut self, enabled: bool) -> Self {
        self.json_mode = enabled;
        self
    }

    pub fn with_assistant_starter(mut self, starter: impl Into<String>) -> Self {
        self.assistant_starter = Some(starter.into());
        self
    }

    pub fn with_images(mut self, image_urls: Vec<String>) -> Self {
        self.image_urls = image_urls;
        self
    }

    pub fn with_thinking(mut self, effort: ThinkingEffort) -> Self {
        self.thinking_effort = effort;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_user(mut self, user_id: i64) -> Self {
        self.metadata.user_id = Some(user_id);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.metadata.description = Some(description.into());
        self
    }

    pub fn with_job_uuid(mut self, job_uuid: impl Into<String>) -> Self {
        self.metadata.job_uuid = Some(job_uuid.into());
        self
    }

    /// Sampling parameters with the temperature/top_p rule applied.
    pub fn sampling(&self) -> Sampling {
        Sampling::resolve(self.temperature, self.top_p, self.top_k)
    }

    /// Like [`ChatRequest::sampling`], but falls back to `default_temperature`
    /// when the request sets neither temperature nor top_p.
    pub fn sampling_or(&self, default_temperature: f64) -> Sampling {
        if self.temperature.is_none() && self.top_p.is_none() {
            Sampling::resolve(Some(default_temperature), None, self.top_k)
        } else {
            self.sampling()
        }
    }

    /// Assistant starter, treating an empty string as absent.
    pub fn starter(&self) -> Option<&str> {
        self.assistant_starter.as_deref().filter(|s| !s.is_empty())
    }
}

// ─────────────────────────────────────────────
// Normalized response
// ─────────────────────────────────────────────

/// Why the vendor stopped generating.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum FinishReason {
    #[default]
    Normal,
    /// Output hit the token cap; a continuation may complete it.
    LengthTruncated,
    Other(String),
}

impl FinishReason {
    pub fn is_truncated(&self) -> bool {
        matches!(self, FinishReason::LengthTruncated)
    }
}

/// Token counts reported by the vendor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl Usage {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Usage {
            input_tokens,
            output_tokens,
        }
    }

    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

impl std::ops::Add for Usage {
    type Output = Usage;

    fn add(self, rhs: Usage) -> Usage {
        Usage {
            input_tokens: self.input_tokens + rhs.input_tokens,
            output_tokens: self.output_tokens + rhs.output_tokens,
        }
    }
}

/// What an extractor pulls out of one vendor response.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NormalizedResponse {
    /// Generated text; empty when the vendor returned none.
    pub text: String,
    pub finish_reason: FinishReason,
    pub usage: Usage,
    /// Vendor response id, used to correlate cost records.
    pub id: Option<String>,
}

/// Result of one call, including every continuation leg.
///
/// Returned per call instead of being kept on the client, so concurrent calls
/// on a shared client never see each other's state.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Completion {
    /// Final text (prefill + every leg, for vendors that prefill).
    pub text: String,
    /// Display name of the provider that served the call.
    pub provider: String,
    pub model: String,
    /// One entry per vendor call, in order.
    pub legs: Vec<NormalizedResponse>,
    /// True when the continuation budget ran out while still truncated.
    pub truncated: bool,
}

impl Completion {
    pub fn total_usage(&self) -> Usage {
        self.legs
            .iter()
            .fold(Usage::default(), |acc, leg| acc + leg.usage)
    }

    pub fn last_finish_reason(&self) -> Option<&FinishReason> {
        self.legs.last().map(|leg| &leg.finish_reason)
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

//! Configuration schema.
//!
//! Hierarchy: `Config` → `ProvidersConfig`, `ClientDefaults`.
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case.
//! We use `#[serde(rename_all = "camelCase")]` to handle the conversion.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Root configuration: loaded from `~/.llmux/config.json` + env vars.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub providers: ProvidersConfig,
    pub defaults: ClientDefaults,
}

// ─────────────────────────────────────────────
// Providers
// ─────────────────────────────────────────────

/// Configuration for a single vendor (API key, base URL, headers).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderConfig {
    /// API key for authentication.
    #[serde(default)]
    pub api_key: String,
    /// Custom API base URL (overrides the vendor default).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    /// Extra HTTP headers to send with each request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_headers: Option<HashMap<String, String>>,
}

impl ProviderConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        ProviderConfig {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    /// Point this provider at a different base URL.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = Some(api_base.into());
        self
    }

    /// Whether this provider has a configured API key.
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

/// One `ProviderConfig` per supported vendor.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub openai: ProviderConfig,
    #[serde(default)]
    pub anthropic: ProviderConfig,
    #[serde(default)]
    pub gemini: ProviderConfig,
    #[serde(default)]
    pub mistral: ProviderConfig,
}

impl ProvidersConfig {
    /// Get a provider config by registry name (e.g. `"anthropic"`).
    pub fn get_by_name(&self, name: &str) -> Option<&ProviderConfig> {
        match name {
            "openai" => Some(&self.openai),
            "anthropic" => Some(&self.anthropic),
            "gemini" => Some(&self.gemini),
            "mistral" => Some(&self.mistral),
            _ => None,
        }
    }

    pub fn get_by_name_mut(&mut self, name: &str) -> Option<&mut ProviderConfig> {
        match name {
            "openai" => Some(&mut self.openai),
            "anthropic" => Some(&mut self.anthropic),
            "gemini" => Some(&mut self.gemini),
            "mistral" => Some(&mut self.mistral),
            _ => None,
        }
    }
}

// ─────────────────────────────────────────────
// Client defaults
// ─────────────────────────────────────────────

/// Defaults applied when a request leaves a field unset.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientDefaults {
    /// Per-call wall-clock timeout in seconds.
    pub timeout_secs: u64,
    /// Output token budget.
    pub max_tokens: u32,
    /// Sampling temperature used when a request sets neither temperature nor top_p.
    pub temperature: f64,
    /// System context for chat-completions vendors.
    pub system_prompt: String,
    /// Model asked to repair malformed JSON.
    pub repair_model: String,
    /// Value of the `anthropic-version` header.
    pub anthropic_version: String,
    /// Total calls (first + continuations) for the messages API.
    pub anthropic_max_attempts: u32,
    /// Continuation calls for chat-completions truncation; 0 disables.
    pub openai_continuations: u32,
}

impl Default for ClientDefaults {
    fn default() -> Self {
        Self {
            timeout_secs: 600,
            max_tokens: 4096,
            temperature: 0.7,
            system_prompt: "You are a helpful assistant.".to_string(),
            repair_model: "gpt-4o-mini".to_string(),
            anthropic_version: "2023-06-01".to_string(),
            anthropic_max_attempts: 2,
            openai_continuations: 0,
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

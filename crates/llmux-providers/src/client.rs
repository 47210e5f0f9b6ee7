//! `LlmClient`: the public entry point.
//!
//! Picks a vendor pipeline from the model name, runs the request through it
//! and hands back either the final text or the full [`Completion`]. Also
//! hosts the model-backed JSON repair and the non-chat OpenAI endpoints.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use llmux_core::config::{load_config, ClientDefaults, Config, ProvidersConfig};
use llmux_core::cost::{CostLogger, TracingCostLogger};
use llmux_core::effort::ThinkingEffort;
use llmux_core::error::Result;
use llmux_core::types::{ChatRequest, Completion};

use crate::anthropic::AnthropicProvider;
use crate::gemini::GeminiProvider;
use crate::images::ImageResolver;
use crate::mistral::MistralProvider;
use crate::openai::OpenAiProvider;
use crate::registry::{find_by_family, match_provider, ProviderFamily};
use crate::salvage::{JsonSalvager, RepairModel};
use crate::traits::{LlmProvider, ProviderContext};
use crate::transcription::WhisperTranscriber;
use crate::transport::{HttpTransport, Transport};

/// Build the pipeline that serves `model`.
///
/// Fails with `NoProvider` when no vendor claims the model and with
/// `NotConfigured` when the vendor has no API key.
pub fn create_provider(
    model: &str,
    providers: &ProvidersConfig,
    ctx: &ProviderContext,
) -> Result<Box<dyn LlmProvider>> {
    let (config, spec) = match_provider(model, providers)?;

    debug!(
        provider = spec.display_name,
        model = model,
        api_base = spec.api_base(config),
        "Creating LLM provider"
    );

    let ctx = ctx.clone();
    let config = config.clone();
    let provider: Box<dyn LlmProvider> = match spec.family {
        ProviderFamily::OpenAi => Box::new(OpenAiProvider::new(ctx, config)),
        ProviderFamily::Anthropic => Box::new(AnthropicProvider::new(ctx, config)),
        ProviderFamily::Gemini => Box::new(GeminiProvider::new(ctx, config)),
        ProviderFamily::Mistral => Box::new(MistralProvider::new(ctx, config)),
    };
    Ok(provider)
}

/// Multi-vendor chat client.
#[derive(Clone, Debug)]
pub struct LlmClient {
    ctx: ProviderContext,
    providers: ProvidersConfig,
}

impl LlmClient {
    /// Client over real HTTP, logging costs through `tracing`.
    pub fn new(config: Config) -> Self {
        let transport = HttpTransport::new();
        let images = ImageResolver::new(transport.client().clone());
        Self::with_parts(config, Arc::new(transport), images, Arc::new(TracingCostLogger))
    }

    /// Load `~/.llmux/config.json` (or `path`) plus env overrides.
    pub fn from_config_file(path: Option<&Path>) -> Self {
        Self::new(load_config(path))
    }

    /// Client over a custom transport.
    pub fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Self {
        Self::with_parts(
            config,
            transport,
            ImageResolver::default(),
            Arc::new(TracingCostLogger),
        )
    }

    pub fn with_parts(
        config: Config,
        transport: Arc<dyn Transport>,
        images: ImageResolver,
        cost_logger: Arc<dyn CostLogger>,
    ) -> Self {
        LlmClient {
            ctx: ProviderContext::new(transport, images, cost_logger, config.defaults),
            providers: config.providers,
        }
    }

    /// Replace the cost sink.
    pub fn with_cost_logger(mut self, cost_logger: Arc<dyn CostLogger>) -> Self {
        self.ctx.cost_logger = cost_logger;
        self
    }

    pub fn defaults(&self) -> &ClientDefaults {
        &self.ctx.defaults
    }

    /// The pipeline that would serve `model`.
    pub fn provider_for(&self, model: &str) -> Result<Box<dyn LlmProvider>> {
        create_provider(model, &self.providers, &self.ctx)
    }

    /// Run `request` and return the full result, legs and usage included.
    pub async fn complete(&self, request: &ChatRequest) -> Result<Completion> {
        let provider = self.provider_for(&request.model)?;
        let completion = provider.complete(request).await?;

        let usage = completion.total_usage();
        info!(
            provider = provider.display_name(),
            model = %request.model,
            legs = completion.legs.len(),
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            total_tokens = usage.total(),
            truncated = completion.truncated,
            "Completion finished"
        );
        Ok(completion)
    }

    /// Run `request` and return only the final text.
    pub async fn get_response_from_provider(&self, request: &ChatRequest) -> Result<String> {
        Ok(self.complete(request).await?.text)
    }

    /// Recover a JSON value from `response`, asking the repair model when
    /// local fixes fail.
    ///
    /// `None` only for missing or empty input; an unrecoverable response
    /// yields an empty object.
    pub async fn get_corrected_json_from_response(
        &self,
        response: Option<&str>,
        user_id: Option<i64>,
        first_key: &str,
    ) -> Option<Value> {
        JsonSalvager::new(self)
            .salvage(response, user_id, first_key)
            .await
            .value
    }

    /// OpenAI pipeline, for the embeddings and moderation endpoints.
    pub fn openai(&self) -> Result<OpenAiProvider> {
        let config = find_by_family(ProviderFamily::OpenAi).configured(&self.providers)?;
        Ok(OpenAiProvider::new(self.ctx.clone(), config.clone()))
    }

    /// Whisper transcription with the OpenAI credentials.
    pub fn transcriber(&self) -> WhisperTranscriber {
        WhisperTranscriber::new(&self.providers.openai)
            .with_timeout(std::time::Duration::from_secs(self.ctx.defaults.timeout_secs))
    }
}

#[async_trait]
impl RepairModel for LlmClient {
    async fn repair(&self, prompt: &str, user_id: Option<i64>) -> Result<String> {
        let mut request = ChatRequest::new(self.ctx.defaults.repair_model.clone(), prompt)
            .json_mode(true)
            .with_thinking(ThinkingEffort::Minimal)
            .with_description("JSON repair");
        if let Some(user_id) = user_id {
            request = request.with_user(user_id);
        }
        self.get_response_from_provider(&request).await
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

//! LLM Provider trait and the plumbing every vendor pipeline shares.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use llmux_core::config::ClientDefaults;
use llmux_core::cost::{record_best_effort, CostLogger, CostRecord};
use llmux_core::error::Result;
use llmux_core::types::{CallMetadata, ChatRequest, Completion, NormalizedResponse};

use crate::images::ImageResolver;
use crate::registry::ProviderFamily;
use crate::transport::{check_status, Transport, TransportRequest};

/// Trait that all vendor pipelines implement.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Run one canonical request through the vendor, continuation legs
    /// included.
    ///
    /// Transport and vendor errors propagate. Running out of continuation
    /// budget does not: the accumulated text comes back with
    /// `Completion::truncated` set.
    async fn complete(&self, request: &ChatRequest) -> Result<Completion>;

    fn family(&self) -> ProviderFamily;

    /// Display name for logging and cost records.
    fn display_name(&self) -> &str;
}

/// Shared collaborators handed to every provider.
///
/// Holds only immutable configuration and shared handles; nothing about an
/// individual call is stored here.
#[derive(Clone)]
pub struct ProviderContext {
    pub transport: Arc<dyn Transport>,
    pub images: ImageResolver,
    pub cost_logger: Arc<dyn CostLogger>,
    pub defaults: ClientDefaults,
}

impl ProviderContext {
    pub fn new(
        transport: Arc<dyn Transport>,
        images: ImageResolver,
        cost_logger: Arc<dyn CostLogger>,
        defaults: ClientDefaults,
    ) -> Self {
        ProviderContext {
            transport,
            images,
            cost_logger,
            defaults,
        }
    }

    /// Per-call timeout: the request's own, else the configured default.
    pub fn timeout_for(&self, request: &ChatRequest) -> Duration {
        request
            .timeout
            .unwrap_or_else(|| Duration::from_secs(self.defaults.timeout_secs))
    }

    /// One vendor call: send, normalize with `extract`, log cost.
    pub async fn execute(
        &self,
        transport_request: TransportRequest,
        request: &ChatRequest,
        images: usize,
        extract: fn(&Value) -> Result<NormalizedResponse>,
    ) -> Result<NormalizedResponse> {
        let service = transport_request.provider.clone();
        debug!(
            provider = %service,
            model = %request.model,
            json_mode = request.json_mode,
            images,
            "Sending request"
        );

        let raw = self.send(transport_request).await?;
        let response = extract(&raw)?;
        debug!(
            provider = %service,
            finish_reason = ?response.finish_reason,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "Response received"
        );

        self.log_cost(&response, &request.model, &service, &request.metadata);
        Ok(response)
    }

    /// POST and map the status to a body or a typed error.
    pub async fn send(&self, request: TransportRequest) -> Result<Value> {
        let provider = request.provider.clone();
        let response = self.transport.post_json(request).await?;
        check_status(&provider, response)
    }

    /// Record the cost of one vendor call. Failures are logged, never returned.
    pub fn log_cost(
        &self,
        response: &NormalizedResponse,
        model: &str,
        service: &str,
        metadata: &CallMetadata,
    ) {
        let record = CostRecord::from_response(response, model, service, metadata);
        record_best_effort(self.cost_logger.as_ref(), &record);
    }
}

impl std::fmt::Debug for ProviderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderContext")
            .field("defaults", &self.defaults)
            .finish()
    }
}

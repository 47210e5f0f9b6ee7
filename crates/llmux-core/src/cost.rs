//! Cost accounting: one record per completed vendor call.
//!
//! Persistence lives outside this workspace; embedders plug a sink in through
//! [`CostLogger`]. The client calls [`record_best_effort`], so a failing sink
//! only produces an error log line and never reaches the caller.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::types::{CallMetadata, NormalizedResponse};

/// Token usage for one vendor call, ready to be persisted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CostRecord {
    pub user_id: Option<i64>,
    pub model: String,
    /// Vendor display name, e.g. `"Anthropic"`.
    pub service: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub description: Option<String>,
    pub job_uuid: Option<String>,
    /// Vendor response id.
    pub prompt_identifier: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CostRecord {
    /// Build a record from a normalized response and the caller's metadata.
    pub fn from_response(
        response: &NormalizedResponse,
        model: &str,
        service: &str,
        metadata: &CallMetadata,
    ) -> Self {
        CostRecord {
            user_id: metadata.user_id,
            model: model.to_string(),
            service: service.to_string(),
            input_tokens: response.usage.input_tokens,
            output_tokens: response.usage.output_tokens,
            description: metadata.description.clone(),
            job_uuid: metadata.job_uuid.clone(),
            prompt_identifier: response.id.clone(),
            created_at: Utc::now(),
        }
    }
}

/// Sink for cost records.
pub trait CostLogger: Send + Sync {
    fn record(&self, record: &CostRecord) -> anyhow::Result<()>;
}

/// Hand a record to the sink, swallowing (and logging) any failure.
pub fn record_best_effort(logger: &dyn CostLogger, record: &CostRecord) {
    if let Err(e) = logger.record(record) {
        error!(
            service = %record.service,
            model = %record.model,
            "CostLog creation failed: {e}"
        );
    }
}

// ─────────────────────────────────────────────
// Built-in sinks
// ─────────────────────────────────────────────

/// Emits each record as a structured `tracing` event.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingCostLogger;

impl CostLogger for TracingCostLogger {
    fn record(&self, record: &CostRecord) -> anyhow::Result<()> {
        info!(
            user_id = ?record.user_id,
            model = %record.model,
            service = %record.service,
            input_tokens = record.input_tokens,
            output_tokens = record.output_tokens,
            prompt_identifier = record.prompt_identifier.as_deref().unwrap_or("-"),
            job_uuid = record.job_uuid.as_deref().unwrap_or("-"),
            "cost log"
        );
        Ok(())
    }
}

/// Discards every record.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopCostLogger;

impl CostLogger for NoopCostLogger {
    fn record(&self, _record: &CostRecord) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Keeps records in memory. Handy for tests and for batching by embedders.
#[derive(Debug, Default)]
pub struct MemoryCostLogger {
    records: Mutex<Vec<CostRecord>>,
}

impl MemoryCostLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn records(&self) -> Vec<CostRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CostLogger for MemoryCostLogger {
    fn record(&self, record: &CostRecord) -> anyhow::Result<()> {
        self.records
            .lock()
            .map_err(|_| anyhow::anyhow!("cost log mutex poisoned"))?
            .push(record.clone());
        Ok(())
    }
}

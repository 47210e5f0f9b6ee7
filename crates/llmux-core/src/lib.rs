//! llmux core: the vendor-neutral half of the client.
//!
//! - **types**: canonical chat request, messages, normalized responses
//! - **effort**: thinking/reasoning effort and its per-vendor mapping
//! - **error**: the error taxonomy shared by every provider pipeline
//! - **cost**: cost records and the `CostLogger` sink interface
//! - **config**: JSON config file + env var overrides

pub mod config;
pub mod cost;
pub mod effort;
pub mod error;
pub mod types;
pub mod utils;

pub use cost::{CostLogger, CostRecord};
pub use effort::ThinkingEffort;
pub use error::{LlmError, Result};
pub use types::{ChatRequest, Completion, FinishReason, Message, NormalizedResponse, Usage};

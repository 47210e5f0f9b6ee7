//! Vendor pipelines for llmux.
//!
//! Direct HTTP clients for OpenAI, Anthropic, Google Gemini and Mistral
//! behind one canonical request type.
//!
//! # Architecture
//!
//! - [`client::LlmClient`]: entry point: dispatch, completion, JSON repair
//! - [`registry`]: ordered model-name → vendor table
//! - [`traits::LlmProvider`]: trait that all vendor pipelines implement
//! - [`openai`], [`anthropic`], [`gemini`], [`mistral`]: payload builders,
//!   response extractors and the pipelines themselves
//! - [`continuation`]: truncation continuation loop
//! - [`salvage`]: JSON recovery, local and model-backed
//! - [`transport`]: JSON POST + status mapping; [`images`]: image loading
//! - [`transcription`]: Whisper speech-to-text

pub mod anthropic;
pub mod client;
pub mod continuation;
pub mod gemini;
pub mod images;
pub mod mistral;
pub mod openai;
pub mod registry;
pub mod salvage;
pub mod traits;
pub mod transcription;
pub mod transport;

#[cfg(test)]
mod testing;

// Re-export main types for convenience
pub use client::{create_provider, LlmClient};
pub use continuation::{continue_while_truncated, ContinuationStrategy};
pub use registry::{ProviderFamily, ProviderSpec, PROVIDERS};
pub use salvage::{salvage_json, JsonSalvager, RepairModel, SalvageOutcome, SalvageStage};
pub use traits::{LlmProvider, ProviderContext};
pub use transcription::{TranscriptionProvider, WhisperTranscriber};
pub use transport::{HttpTransport, Transport, TransportRequest, TransportResponse};

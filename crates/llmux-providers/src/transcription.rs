//! Speech-to-text via OpenAI's Whisper endpoint.
//!
//! Audio goes up as a multipart form (`file` + `model`), so this bypasses
//! the JSON [`Transport`](crate::transport::Transport) and talks to reqwest
//! directly. Status codes map to the same typed errors as chat calls.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use llmux_core::config::ProviderConfig;
use llmux_core::error::{LlmError, Result};

use crate::registry::{find_by_family, ProviderFamily};
use crate::transport::{check_status, TransportResponse};

/// Default Whisper model.
pub const WHISPER_MODEL: &str = "whisper-1";

// ─────────────────────────────────────────────
// Trait
// ─────────────────────────────────────────────

/// Trait for speech-to-text transcription providers.
#[async_trait]
pub trait TranscriptionProvider: Send + Sync {
    /// Transcribe in-memory audio. `file_name` tells the API the format.
    async fn transcribe(&self, audio: Vec<u8>, file_name: &str) -> Result<String>;

    /// Display name for logging.
    fn display_name(&self) -> &str;
}

// ─────────────────────────────────────────────
// Whisper
// ─────────────────────────────────────────────

/// OpenAI `/audio/transcriptions` client.
pub struct WhisperTranscriber {
    api_key: String,
    api_url: String,
    model: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl WhisperTranscriber {
    /// Build from the OpenAI provider config (key and optional API base).
    pub fn new(config: &ProviderConfig) -> Self {
        let spec = find_by_family(ProviderFamily::OpenAi);
        WhisperTranscriber {
            api_key: config.api_key.clone(),
            api_url: format!("{}/audio/transcriptions", spec.api_base(config)),
            model: WHISPER_MODEL.to_string(),
            timeout: Duration::from_secs(600),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

#[async_trait]
impl TranscriptionProvider for WhisperTranscriber {
    async fn transcribe(&self, audio: Vec<u8>, file_name: &str) -> Result<String> {
        if !self.is_configured() {
            return Err(LlmError::NotConfigured(
                "OpenAI (set OPENAI_API_KEY or providers.openai.apiKey)".into(),
            ));
        }
        if audio.is_empty() {
            warn!(file_name, "transcription: empty audio, skipping");
            return Ok(String::new());
        }

        debug!(
            file_name,
            bytes = audio.len(),
            model = %self.model,
            "transcribing audio via Whisper"
        );

        let file_part = reqwest::multipart::Part::bytes(audio)
            .file_name(file_name.to_string())
            .mime_str("application/octet-stream")
            .map_err(|e| LlmError::Transport(format!("OpenAI: {e}")))?;

        let form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("model", self.model.clone());

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| LlmError::Transport(format!("OpenAI: {e}")))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::Transport(format!("OpenAI: failed to read body: {e}")))?;
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));

        let json = check_status("OpenAI", TransportResponse::new(status, body))?;
        let transcript = json
            .get("text")
            .and_then(Value::as_str)
            .ok_or_else(|| LlmError::InvalidResponse("transcription has no text".into()))?
            .to_string();

        debug!(chars = transcript.len(), "transcription complete");
        Ok(transcript)
    }

    fn display_name(&self) -> &str {
        "OpenAI Whisper"
    }
}

// ─────────────────────────────────────────────
// Helper
// ─────────────────────────────────────────────

/// Check if a file name looks like audio Whisper accepts.
pub fn is_audio_file(path: &str) -> bool {
    const EXTENSIONS: &[&str] = &[
        ".flac", ".m4a", ".mp3", ".mp4", ".mpeg", ".mpga", ".oga", ".ogg", ".wav", ".webm",
    ];
    let lower = path.to_lowercase();
    EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

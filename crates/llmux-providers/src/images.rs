//! Image attachments: turn image references into base64 payloads.
//!
//! References can be `data:` URIs (decoded in place), `http(s)` URLs
//! (downloaded) or local paths (read from disk). Resolution happens before
//! the request builders run, so the builders stay pure. A reference that
//! fails to load is logged and dropped; the rest of the batch goes through.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use tracing::{debug, warn};

use llmux_core::utils::image_mime_type;

/// A resolved image, ready to embed in a vendor payload.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageAttachment {
    /// The reference the caller supplied.
    pub source: String,
    pub mime_type: String,
    /// Base64-encoded bytes.
    pub data: String,
}

impl ImageAttachment {
    /// Encode raw bytes, inferring the MIME type from the reference's extension.
    pub fn from_bytes(source: impl Into<String>, bytes: &[u8]) -> Self {
        let source = source.into();
        ImageAttachment {
            mime_type: image_mime_type(&source).to_string(),
            data: BASE64.encode(bytes),
            source,
        }
    }

    /// Parse a `data:<mime>;base64,<payload>` URI.
    pub fn from_data_url(url: &str) -> Option<Self> {
        let rest = url.strip_prefix("data:")?;
        let (meta, payload) = rest.split_once(',')?;
        let mime_type = meta.strip_suffix(";base64")?;
        let mime_type = if mime_type.is_empty() {
            "image/jpeg"
        } else {
            mime_type
        };
        Some(ImageAttachment {
            source: url.to_string(),
            mime_type: mime_type.to_string(),
            data: payload.to_string(),
        })
    }

    pub fn is_data_url(&self) -> bool {
        self.source.starts_with("data:")
    }

    /// URL form for chat-completions payloads: data URIs pass through
    /// verbatim, everything else is re-encoded as a data URI.
    pub fn to_data_url(&self) -> String {
        if self.is_data_url() {
            self.source.clone()
        } else {
            format!("data:{};base64,{}", self.mime_type, self.data)
        }
    }
}

/// Loads image references.
#[derive(Clone, Debug, Default)]
pub struct ImageResolver {
    client: reqwest::Client,
}

impl ImageResolver {
    pub fn new(client: reqwest::Client) -> Self {
        ImageResolver { client }
    }

    /// Resolve every reference in order, dropping the ones that fail.
    /// Each download is bounded by `timeout`.
    pub async fn resolve(&self, references: &[String], timeout: Duration) -> Vec<ImageAttachment> {
        let mut attachments = Vec::with_capacity(references.len());
        for reference in references {
            match self.load(reference, timeout).await {
                Ok(attachment) => {
                    debug!(
                        source = %llmux_core::utils::truncate_string(reference, 80),
                        mime_type = %attachment.mime_type,
                        "image attached"
                    );
                    attachments.push(attachment);
                }
                Err(e) => {
                    warn!(
                        source = %llmux_core::utils::truncate_string(reference, 80),
                        "Failed to process image: {e}"
                    );
                }
            }
        }
        attachments
    }

    async fn load(&self, reference: &str, timeout: Duration) -> anyhow::Result<ImageAttachment> {
        if reference.starts_with("data:") {
            return ImageAttachment::from_data_url(reference)
                .ok_or_else(|| anyhow::anyhow!("unsupported data URI (expected base64 payload)"));
        }

        if reference.starts_with("http://") || reference.starts_with("https://") {
            let bytes = self
                .client
                .get(reference)
                .timeout(timeout)
                .send()
                .await?
                .error_for_status()?
                .bytes()
                .await?;
            return Ok(ImageAttachment::from_bytes(reference, &bytes));
        }

        let bytes = tokio::fs::read(reference).await?;
        Ok(ImageAttachment::from_bytes(reference, &bytes))
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

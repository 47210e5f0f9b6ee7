//! Truncation continuation: keep asking until the model stops on its own.
//!
//! The controller is family-agnostic: it owns the loop, the budget and the
//! concatenation. How the next leg is requested lives behind
//! [`ContinuationStrategy`], implemented by the OpenAI pipeline (replay the
//! prompt plus the partial answer) and the Anthropic pipeline (append the
//! partial answer to the assistant prefill).

use async_trait::async_trait;
use tracing::{debug, warn};

use llmux_core::error::Result;
use llmux_core::types::NormalizedResponse;

/// Requests one further leg given everything generated so far.
#[async_trait]
pub trait ContinuationStrategy: Send + Sync {
    async fn next_leg(&self, accumulated: &str) -> Result<NormalizedResponse>;
}

/// Result of a continuation run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContinuationOutcome {
    /// All leg texts, concatenated in order, each exactly once.
    pub text: String,
    /// Every leg, the first one included.
    pub legs: Vec<NormalizedResponse>,
    /// The last leg was still cut off when the budget ran out.
    pub truncated: bool,
}

/// Drive `strategy` until a leg finishes normally or `max_continuations`
/// further legs have been requested.
///
/// A leg that fails propagates its error; running out of budget does not.
pub async fn continue_while_truncated<S>(
    strategy: &S,
    first: NormalizedResponse,
    max_continuations: u32,
) -> Result<ContinuationOutcome>
where
    S: ContinuationStrategy + ?Sized,
{
    let mut text = first.text.clone();
    let mut truncated = first.finish_reason.is_truncated();
    let mut legs = vec![first];
    let mut continuations = 0;

    while truncated && continuations < max_continuations {
        continuations += 1;
        debug!(leg = continuations + 1, so_far = text.len(), "Response truncated, continuing");

        let leg = strategy.next_leg(&text).await?;
        text.push_str(&leg.text);
        truncated = leg.finish_reason.is_truncated();
        legs.push(leg);
    }

    if truncated {
        warn!(
            legs = legs.len(),
            "Response still truncated after {max_continuations} continuation(s)"
        );
    }

    Ok(ContinuationOutcome {
        text,
        legs,
        truncated,
    })
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

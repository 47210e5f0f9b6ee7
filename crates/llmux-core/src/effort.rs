//! Thinking / reasoning effort.
//!
//! One closed enum, one mapping per vendor. Call sites ask the enum for the
//! vendor value instead of matching on model names themselves.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How much hidden deliberation a reasoning-capable model may spend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThinkingEffort {
    #[default]
    None,
    Minimal,
    Low,
    Medium,
    High,
}

impl ThinkingEffort {
    /// Anthropic `thinking.budget_tokens`. Zero means thinking stays disabled.
    pub fn to_claude_budget(self) -> u32 {
        match self {
            ThinkingEffort::None | ThinkingEffort::Minimal => 0,
            ThinkingEffort::Low => 6000,
            ThinkingEffort::Medium => 16000,
            ThinkingEffort::High => 25000,
        }
    }

    /// OpenAI `reasoning_effort` value, `None` when the field is omitted.
    pub fn to_openai_effort(self) -> Option<&'static str> {
        match self {
            ThinkingEffort::None => None,
            ThinkingEffort::Minimal => Some("minimal"),
            ThinkingEffort::Low => Some("low"),
            ThinkingEffort::Medium => Some("medium"),
            ThinkingEffort::High => Some("high"),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ThinkingEffort::None => "none",
            ThinkingEffort::Minimal => "minimal",
            ThinkingEffort::Low => "low",
            ThinkingEffort::Medium => "medium",
            ThinkingEffort::High => "high",
        }
    }
}

impl fmt::Display for ThinkingEffort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThinkingEffort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "none" => Ok(ThinkingEffort::None),
            "minimal" => Ok(ThinkingEffort::Minimal),
            "low" => Ok(ThinkingEffort::Low),
            "medium" => Ok(ThinkingEffort::Medium),
            "high" => Ok(ThinkingEffort::High),
            other => Err(format!("unknown thinking effort: {other}")),
        }
    }
}

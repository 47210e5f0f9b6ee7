//! Provider registry: the ordered dispatch table.
//!
//! Each `ProviderSpec` describes one vendor family: which model names it
//! claims, where its API lives, and the service name written to cost logs.
//! Dispatch walks `PROVIDERS` in order and the first spec with a matching
//! matcher wins, so overlapping keywords resolve deterministically.

use llmux_core::config::{ProviderConfig, ProvidersConfig};
use llmux_core::error::{LlmError, Result};

// ─────────────────────────────────────────────
// ProviderSpec: static metadata for one vendor
// ─────────────────────────────────────────────

/// Wire shape a vendor speaks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProviderFamily {
    /// Chat completions (`/chat/completions`, `choices[]`).
    OpenAi,
    /// Messages API (`/messages`, top-level `system`, `stop_reason`).
    Anthropic,
    /// generateContent (`contents[].parts[]`, `generationConfig`).
    Gemini,
    /// Plain chat completions without vendor quirks.
    Mistral,
}

/// How a spec claims a model name. Compared against the lowercase model.
#[derive(Clone, Copy, Debug)]
pub enum ModelMatcher {
    Contains(&'static str),
    Prefix(&'static str),
}

impl ModelMatcher {
    pub fn matches(&self, model_lower: &str) -> bool {
        match self {
            ModelMatcher::Contains(kw) => model_lower.contains(kw),
            ModelMatcher::Prefix(p) => model_lower.starts_with(p),
        }
    }
}

/// Static specification describing one vendor.
#[derive(Clone, Debug)]
pub struct ProviderSpec {
    /// Internal name, also the key in `ProvidersConfig` (e.g. `"anthropic"`).
    pub name: &'static str,
    /// Human-readable name; doubles as the cost-log service name.
    pub display_name: &'static str,
    pub family: ProviderFamily,
    /// Model-name matchers, any of which claims the model.
    pub matchers: &'static [ModelMatcher],
    /// Conventional environment variable for the API key.
    pub env_key: &'static str,
    /// Default API base URL.
    pub default_api_base: &'static str,
}

impl ProviderSpec {
    /// Whether this spec claims the model name (case-insensitive).
    pub fn matches(&self, model: &str) -> bool {
        let model_lower = model.to_lowercase();
        self.matchers.iter().any(|m| m.matches(&model_lower))
    }

    /// This vendor's entry in `providers`, if it has an API key.
    pub fn configured<'a>(&self, providers: &'a ProvidersConfig) -> Result<&'a ProviderConfig> {
        providers
            .get_by_name(self.name)
            .filter(|c| c.is_configured())
            .ok_or_else(|| {
                LlmError::NotConfigured(format!(
                    "{} (set {} or providers.{}.apiKey)",
                    self.display_name, self.env_key, self.name
                ))
            })
    }

    /// API base from config, falling back to the spec default.
    pub fn api_base<'a>(&'a self, config: &'a ProviderConfig) -> &'a str {
        config
            .api_base
            .as_deref()
            .unwrap_or(self.default_api_base)
            .trim_end_matches('/')
    }
}

// ─────────────────────────────────────────────
// All providers (in matching priority order)
// ─────────────────────────────────────────────

/// Supported vendors, in matching priority order.
pub static PROVIDERS: &[ProviderSpec] = &[
    // 1. OpenAI: "gpt" anywhere, o-series and chatgpt by prefix
    ProviderSpec {
        name: "openai",
        display_name: "OpenAI",
        family: ProviderFamily::OpenAi,
        matchers: &[
            ModelMatcher::Contains("gpt"),
            ModelMatcher::Prefix("o1"),
            ModelMatcher::Prefix("o3"),
            ModelMatcher::Prefix("o4"),
            ModelMatcher::Prefix("chatgpt"),
        ],
        env_key: "OPENAI_API_KEY",
        default_api_base: "https://api.openai.com/v1",
    },
    // 2. Mistral
    ProviderSpec {
        name: "mistral",
        display_name: "Mistral",
        family: ProviderFamily::Mistral,
        matchers: &[
            ModelMatcher::Contains("mistral"),
            ModelMatcher::Contains("mixtral"),
            ModelMatcher::Contains("codestral"),
            ModelMatcher::Contains("ministral"),
            ModelMatcher::Contains("pixtral"),
            ModelMatcher::Contains("magistral"),
            ModelMatcher::Contains("devstral"),
        ],
        env_key: "MISTRAL_API_KEY",
        default_api_base: "https://api.mistral.ai/v1",
    },
    // 3. Gemini
    ProviderSpec {
        name: "gemini",
        display_name: "Google Gemini",
        family: ProviderFamily::Gemini,
        matchers: &[ModelMatcher::Contains("gemini"), ModelMatcher::Contains("gemma")],
        env_key: "GEMINI_API_KEY",
        default_api_base: "https://generativelanguage.googleapis.com/v1beta",
    },
    // 4. Anthropic
    ProviderSpec {
        name: "anthropic",
        display_name: "Anthropic",
        family: ProviderFamily::Anthropic,
        matchers: &[ModelMatcher::Contains("claude"), ModelMatcher::Contains("anthropic")],
        env_key: "ANTHROPIC_API_KEY",
        default_api_base: "https://api.anthropic.com/v1",
    },
];

// ─────────────────────────────────────────────
// Matching functions
// ─────────────────────────────────────────────

/// Find the provider for a model name. First match in priority order wins.
pub fn find_by_model(model: &str) -> Option<&'static ProviderSpec> {
    let model_lower = model.to_lowercase();
    PROVIDERS
        .iter()
        .find(|spec| spec.matchers.iter().any(|m| m.matches(&model_lower)))
}

/// Find a provider spec by exact name.
pub fn find_by_name(name: &str) -> Option<&'static ProviderSpec> {
    PROVIDERS.iter().find(|spec| spec.name == name)
}

/// Find the provider spec for a family.
pub fn find_by_family(family: ProviderFamily) -> &'static ProviderSpec {
    PROVIDERS
        .iter()
        .find(|spec| spec.family == family)
        .unwrap_or(&PROVIDERS[0])
}

/// Match a model name to a configured provider.
///
/// No matching spec is a usage error (`NoProvider`); a match without an API
/// key is `NotConfigured`.
pub fn match_provider<'a>(
    model: &str,
    providers: &'a ProvidersConfig,
) -> Result<(&'a ProviderConfig, &'static ProviderSpec)> {
    let spec = find_by_model(model).ok_or_else(|| LlmError::NoProvider(model.to_string()))?;
    Ok((spec.configured(providers)?, spec))
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn family_of(model: &str) -> Option<ProviderFamily> {
        find_by_model(model).map(|spec| spec.family)
    }

    #[test]
    fn test_openai_models() {
        for model in [
            "gpt-3.5-turbo",
            "gpt-4o",
            "gpt-4o-mini",
            "GPT-4-1106-preview",
            "gpt-5",
            "o1",
            "o1-mini",
            "o3-mini",
            "o4-mini",
            "chatgpt-4o-latest",
            "ft:gpt-4o-mini:acme::abc123",
        ] {
            assert_eq!(family_of(model), Some(ProviderFamily::OpenAi), "{model}");
        }
    }

    #[test]
    fn test_mistral_models() {
        for model in [
            "mistral-small-latest",
            "mistral-7B",
            "open-mixtral-8x7b",
            "codestral-latest",
            "ministral-8b-latest",
            "pixtral-large-latest",
            "magistral-medium-latest",
            "devstral-small-2505",
        ] {
            assert_eq!(family_of(model), Some(ProviderFamily::Mistral), "{model}");
        }
    }

    #[test]
    fn test_gemini_models() {
        for model in ["gemini-1.5-flash-latest", "gemini-2.5-pro", "Gemini-Pro", "gemma-3-27b-it"] {
            assert_eq!(family_of(model), Some(ProviderFamily::Gemini), "{model}");
        }
    }

    #[test]
    fn test_anthropic_models() {
        for model in [
            "claude-3-5-sonnet-20241022",
            "claude-sonnet-4-20250514",
            "CLAUDE-v1",
            "anthropic.claude-3-haiku",
        ] {
            assert_eq!(family_of(model), Some(ProviderFamily::Anthropic), "{model}");
        }
    }

    #[test]
    fn test_overlap_priority() {
        // OpenAI outranks everything after it.
        assert_eq!(family_of("mistral-gpt-merge"), Some(ProviderFamily::OpenAi));
        assert_eq!(family_of("gpt-claude-distill"), Some(ProviderFamily::OpenAi));
        // Mistral outranks Gemini and Anthropic.
        assert_eq!(family_of("gemini-mixtral-blend"), Some(ProviderFamily::Mistral));
        // Gemini outranks Anthropic.
        assert_eq!(family_of("claude-on-gemini"), Some(ProviderFamily::Gemini));
    }

    #[test]
    fn test_o_series_is_prefix_only() {
        // "o1"/"o3" inside a name must not claim it for OpenAI.
        assert_eq!(family_of("claude-o1-style"), Some(ProviderFamily::Anthropic));
        assert_eq!(family_of("pro3-model"), None);
    }

    #[test]
    fn test_unknown_model() {
        assert!(find_by_model("llama-3.3-70b").is_none());
        assert!(find_by_model("").is_none());
    }

    #[test]
    fn test_find_by_name() {
        let spec = find_by_name("gemini").unwrap();
        assert_eq!(spec.display_name, "Google Gemini");
        assert_eq!(spec.env_key, "GEMINI_API_KEY");
        assert!(find_by_name("groq").is_none());
    }

    #[test]
    fn test_find_by_family() {
        assert_eq!(find_by_family(ProviderFamily::Mistral).name, "mistral");
        assert_eq!(find_by_family(ProviderFamily::Anthropic).display_name, "Anthropic");
    }

    #[test]
    fn test_api_base_override_and_trailing_slash() {
        let spec = find_by_name("openai").unwrap();
        let default = ProviderConfig::new("key");
        assert_eq!(spec.api_base(&default), "https://api.openai.com/v1");
        let custom = ProviderConfig::new("key").with_api_base("http://localhost:1234/v1/");
        assert_eq!(spec.api_base(&custom), "http://localhost:1234/v1");
    }

    #[test]
    fn test_match_provider_direct() {
        let mut providers = ProvidersConfig::default();
        providers.anthropic = ProviderConfig::new("sk-ant-123");

        let (config, spec) = match_provider("claude-sonnet-4-20250514", &providers).unwrap();
        assert_eq!(spec.name, "anthropic");
        assert_eq!(config.api_key, "sk-ant-123");
    }

    #[test]
    fn test_match_provider_unknown_model() {
        let providers = ProvidersConfig::default();
        let err = match_provider("llama-3", &providers).unwrap_err();
        assert!(matches!(err, LlmError::NoProvider(m) if m == "llama-3"));
    }

    #[test]
    fn test_match_provider_no_key() {
        let providers = ProvidersConfig::default();
        let err = match_provider("gpt-4o", &providers).unwrap_err();
        match err {
            LlmError::NotConfigured(msg) => assert!(msg.contains("OPENAI_API_KEY")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_all_providers_have_unique_names() {
        let names: Vec<&str> = PROVIDERS.iter().map(|s| s.name).collect();
        let mut unique = names.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(names.len(), unique.len(), "Duplicate provider names found");
    }

    #[test]
    fn test_every_family_has_a_spec() {
        for family in [
            ProviderFamily::OpenAi,
            ProviderFamily::Anthropic,
            ProviderFamily::Gemini,
            ProviderFamily::Mistral,
        ] {
            assert!(PROVIDERS.iter().any(|s| s.family == family));
        }
    }
}

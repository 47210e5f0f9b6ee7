//! Config loader: reads `~/.llmux/config.json`, applies legacy migrations,
//! and merges env vars.
//!
//! # Loading precedence
//! 1. Defaults (from `Config::default()`)
//! 2. JSON file at `~/.llmux/config.json`
//! 3. Environment variables `LLMUX_<SECTION>__<FIELD>` (override JSON)
//! 4. Conventional vendor variables (`OPENAI_API_KEY`, …) for keys still empty

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::schema::{Config, ProviderConfig};

/// Default config file path.
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join("config.json")
}

/// Load configuration from the default path + env vars.
///
/// Falls back to `Config::default()` if the file doesn't exist or can't be parsed.
pub fn load_config(path: Option<&Path>) -> Config {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    load_config_from_path(&config_path)
}

/// Load config from a specific file path.
fn load_config_from_path(path: &Path) -> Config {
    if !path.exists() {
        info!("No config file found at {}, using defaults", path.display());
        return apply_env_overrides(Config::default());
    }

    debug!("Loading config from {}", path.display());

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return apply_env_overrides(Config::default());
        }
    };

    // Parse JSON → Value first for migration
    let mut raw: serde_json::Value = match serde_json::from_str(&content) {
        Ok(v) => v,
        Err(e) => {
            warn!("Failed to parse config JSON: {}", e);
            return apply_env_overrides(Config::default());
        }
    };

    migrate_config(&mut raw);

    let config: Config = match serde_json::from_value(raw) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to deserialize config: {}", e);
            return apply_env_overrides(Config::default());
        }
    };

    apply_env_overrides(config)
}

/// Save configuration to disk (pretty-printed JSON with camelCase keys).
pub fn save_config(config: &Config, path: Option<&Path>) -> std::io::Result<()> {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(config)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

    std::fs::write(&config_path, json)?;
    debug!("Config saved to {}", config_path.display());
    Ok(())
}

/// Legacy `aiProviders` block → `providers.<name>.apiKey`.
///
/// Older configs kept one flat key per vendor:
/// `{"aiProviders": {"openAiKey": "...", "anthropicKey": "...", ...}}`.
/// Keys already present under `providers` are never overwritten.
fn migrate_config(raw: &mut serde_json::Value) {
    const LEGACY_KEYS: &[(&str, &str)] = &[
        ("openAiKey", "openai"),
        ("anthropicKey", "anthropic"),
        ("geminiKey", "gemini"),
        ("mistralKey", "mistral"),
    ];

    let Some(legacy) = raw.get("aiProviders").cloned() else {
        return;
    };
    let Some(root) = raw.as_object_mut() else {
        return;
    };

    let providers = root
        .entry("providers")
        .or_insert_with(|| serde_json::json!({}));
    let Some(providers) = providers.as_object_mut() else {
        return;
    };

    for (legacy_key, name) in LEGACY_KEYS {
        let Some(key) = legacy.get(*legacy_key).and_then(|v| v.as_str()) else {
            continue;
        };
        let entry = providers
            .entry(name.to_string())
            .or_insert_with(|| serde_json::json!({}));
        if entry.is_object() && entry.get("apiKey").is_none() {
            entry["apiKey"] = serde_json::Value::String(key.to_string());
            debug!("Migrated aiProviders.{legacy_key} → providers.{name}.apiKey");
        }
    }
}

/// Apply environment variable overrides on top of a loaded config.
///
/// Env var format: `LLMUX_<SECTION>__<FIELD>` (double underscore as delimiter).
///
/// Supported overrides:
/// - `LLMUX_DEFAULTS__TIMEOUT_SECS`
/// - `LLMUX_DEFAULTS__MAX_TOKENS`
/// - `LLMUX_DEFAULTS__TEMPERATURE`
/// - `LLMUX_DEFAULTS__REPAIR_MODEL`
/// - `LLMUX_DEFAULTS__OPENAI_CONTINUATIONS`
/// - `LLMUX_PROVIDERS__<NAME>__API_KEY` → `providers.<name>.api_key`
/// - `LLMUX_PROVIDERS__<NAME>__API_BASE` → `providers.<name>.api_base`
///
/// After that, `OPENAI_API_KEY`, `ANTHROPIC_API_KEY`, `GEMINI_API_KEY` and
/// `MISTRAL_API_KEY` fill any key that is still empty.
fn apply_env_overrides(mut config: Config) -> Config {
    if let Ok(val) = std::env::var("LLMUX_DEFAULTS__TIMEOUT_SECS") {
        if let Ok(n) = val.parse::<u64>() {
            config.defaults.timeout_secs = n;
        }
    }
    if let Ok(val) = std::env::var("LLMUX_DEFAULTS__MAX_TOKENS") {
        if let Ok(n) = val.parse::<u32>() {
            config.defaults.max_tokens = n;
        }
    }
    if let Ok(val) = std::env::var("LLMUX_DEFAULTS__TEMPERATURE") {
        if let Ok(t) = val.parse::<f64>() {
            config.defaults.temperature = t;
        }
    }
    if let Ok(val) = std::env::var("LLMUX_DEFAULTS__REPAIR_MODEL") {
        config.defaults.repair_model = val;
    }
    if let Ok(val) = std::env::var("LLMUX_DEFAULTS__OPENAI_CONTINUATIONS") {
        if let Ok(n) = val.parse::<u32>() {
            config.defaults.openai_continuations = n;
        }
    }

    for name in ["openai", "anthropic", "gemini", "mistral"] {
        if let Some(provider) = config.providers.get_by_name_mut(name) {
            apply_provider_env(provider, &name.to_uppercase());
        }
    }

    config
}

/// Apply env var overrides for a single provider.
fn apply_provider_env(provider: &mut ProviderConfig, name: &str) {
    if let Ok(val) = std::env::var(format!("LLMUX_PROVIDERS__{name}__API_KEY")) {
        provider.api_key = val;
    }
    if let Ok(val) = std::env::var(format!("LLMUX_PROVIDERS__{name}__API_BASE")) {
        provider.api_base = Some(val);
    }
    if !provider.is_configured() {
        if let Ok(val) = std::env::var(format!("{name}_API_KEY")) {
            provider.api_key = val;
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

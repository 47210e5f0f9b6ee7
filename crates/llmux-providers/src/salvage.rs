//! JSON salvage: recover a JSON value from model output that should have
//! been JSON but may not be.
//!
//! Cheapest first: parse as-is, drop trailing commas, slice from the first
//! opening brace or bracket, and only then ask a model to repair it. Every
//! path ends in a value; the last resort is an empty object.

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use llmux_core::error::Result;

// ─────────────────────────────────────────────
// Pure helpers
// ─────────────────────────────────────────────

/// Remove commas that directly precede `}` or `]`, ignoring commas inside
/// string literals. Whitespace between the comma and the bracket goes too.
pub fn fix_trailing_commas(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            i += 1;
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            ',' => {
                let mut j = i + 1;
                while j < chars.len() && chars[j].is_whitespace() {
                    j += 1;
                }
                if j < chars.len() && (chars[j] == '}' || chars[j] == ']') {
                    i = j;
                    continue;
                }
                out.push(c);
            }
            _ => out.push(c),
        }
        i += 1;
    }
    out
}

/// The input unchanged if it parses, else with trailing commas removed if
/// that parses, else `None`.
pub fn validate_and_fix_json(input: &str) -> Option<String> {
    if serde_json::from_str::<Value>(input).is_ok() {
        return Some(input.to_string());
    }
    let fixed = fix_trailing_commas(input);
    serde_json::from_str::<Value>(&fixed).ok().map(|_| fixed)
}

/// Slice from the first JSON opening, trimmed.
///
/// An array of objects (`[` followed by `{`) wins over a bare object, which
/// wins over a bare array. Text after the closing bracket is kept.
pub fn clean_json_string(input: &str) -> Option<String> {
    let start = find_array_of_objects(input)
        .or_else(|| input.find('{'))
        .or_else(|| input.find('['))?;
    Some(input[start..].trim().to_string())
}

fn find_array_of_objects(input: &str) -> Option<usize> {
    input
        .char_indices()
        .filter(|(_, c)| *c == '[')
        .map(|(i, _)| i)
        .find(|&i| input[i + 1..].trim_start().starts_with('{'))
}

/// Strip a surrounding markdown code fence (```json ... ```), if any.
pub fn strip_code_fences(input: &str) -> &str {
    let trimmed = input.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().trim_end_matches("```").trim()
}

/// Non-empty object or array.
fn is_usable(value: &Value) -> bool {
    match value {
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => false,
    }
}

fn parse_usable(input: &str) -> Option<Value> {
    serde_json::from_str::<Value>(input)
        .ok()
        .filter(is_usable)
}

// ─────────────────────────────────────────────
// Pure pipeline
// ─────────────────────────────────────────────

/// Which step produced the value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SalvageStage {
    /// The input parsed as-is.
    Direct,
    /// Parsed after dropping trailing commas.
    TrailingCommas,
    /// Parsed after slicing from the first JSON opening.
    Sliced,
    /// Returned by the repair model.
    ModelRepair,
    /// Nothing worked; empty object.
    Empty,
}

/// One salvage attempt: what came in, what finally decoded, and how.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SalvageOutcome {
    /// Input as received.
    pub original: String,
    /// Text that decoded, when it differs from the input.
    pub repaired: Option<String>,
    pub value: Option<Value>,
    pub stage: Option<SalvageStage>,
}

impl SalvageOutcome {
    fn recovered(original: &str, repaired: Option<String>, value: Value, stage: SalvageStage) -> Self {
        SalvageOutcome {
            original: original.to_string(),
            repaired,
            value: Some(value),
            stage: Some(stage),
        }
    }

    /// Local steps found nothing usable in non-empty input.
    pub fn needs_repair(&self) -> bool {
        self.value.is_none() && !self.original.trim().is_empty()
    }
}

/// Run the local salvage steps in order.
///
/// A direct parse is returned whatever it holds. Later steps only count when
/// they yield a non-empty object or array.
pub fn salvage_json(input: Option<&str>) -> SalvageOutcome {
    let Some(input) = input.filter(|s| !s.trim().is_empty()) else {
        return SalvageOutcome::default();
    };

    if let Ok(value) = serde_json::from_str::<Value>(input) {
        return SalvageOutcome::recovered(input, None, value, SalvageStage::Direct);
    }

    let fixed = fix_trailing_commas(input);
    if let Some(value) = parse_usable(&fixed) {
        return SalvageOutcome::recovered(input, Some(fixed), value, SalvageStage::TrailingCommas);
    }

    if let Some(sliced) = clean_json_string(input) {
        if let Some(value) = parse_usable(&sliced) {
            return SalvageOutcome::recovered(input, Some(sliced), value, SalvageStage::Sliced);
        }
        let fixed = fix_trailing_commas(&sliced);
        if let Some(value) = parse_usable(&fixed) {
            return SalvageOutcome::recovered(input, Some(fixed), value, SalvageStage::Sliced);
        }
    }

    SalvageOutcome {
        original: input.to_string(),
        ..Default::default()
    }
}

// ─────────────────────────────────────────────
// Model-backed repair
// ─────────────────────────────────────────────

/// A model that can be asked to rewrite malformed JSON.
#[async_trait]
pub trait RepairModel: Send + Sync {
    /// Send `prompt` in JSON mode and return the raw text.
    async fn repair(&self, prompt: &str, user_id: Option<i64>) -> Result<String>;
}

/// Instructions sent to the repair model.
pub fn repair_prompt(malformed: &str, first_key: &str) -> String {
    format!(
        "Analyze the malformed JSON string below and identify what makes it invalid. \
Then return a corrected JSON string, making only the minimum changes needed for it to parse. \
If the text uses multiple line breaks inside string values, write them as escaped newlines, \
like \\n\\n. The JSON must start with `{{\"{first_key}\": ` and end with `}}`.\n\n\
MALFORMED STRING:\n{malformed}\n\n\
Your output must be ONLY the corrected JSON, in the form {{\"{first_key}\": ...}}."
    )
}

/// Full salvage pipeline: local steps, then the repair model, then `{}`.
pub struct JsonSalvager<'a, M: RepairModel + ?Sized> {
    model: &'a M,
}

impl<'a, M: RepairModel + ?Sized> JsonSalvager<'a, M> {
    pub fn new(model: &'a M) -> Self {
        JsonSalvager { model }
    }

    /// Recover a value from `input`.
    ///
    /// The value is `None` only for missing or empty input. `first_key`
    /// tells the repair model which key the document should open with.
    pub async fn salvage(
        &self,
        input: Option<&str>,
        user_id: Option<i64>,
        first_key: &str,
    ) -> SalvageOutcome {
        let outcome = salvage_json(input);
        if !outcome.needs_repair() {
            if let Some(stage) = outcome.stage {
                debug!(?stage, "JSON recovered locally");
            }
            return outcome;
        }

        debug!(first_key, "Asking repair model to fix malformed JSON");
        let prompt = repair_prompt(&outcome.original, first_key);
        match self.model.repair(&prompt, user_id).await {
            Ok(text) => {
                let candidate = strip_code_fences(&text);
                if let Ok(value) = serde_json::from_str::<Value>(candidate) {
                    if value.is_object() || value.is_array() {
                        return SalvageOutcome::recovered(
                            &outcome.original,
                            Some(candidate.to_string()),
                            value,
                            SalvageStage::ModelRepair,
                        );
                    }
                }
                warn!(
                    response = %llmux_core::utils::truncate_string(&text, 200),
                    "Repair model returned unusable JSON"
                );
            }
            Err(e) => warn!("JSON repair call failed: {e}"),
        }

        SalvageOutcome::recovered(
            &outcome.original,
            None,
            Value::Object(Map::new()),
            SalvageStage::Empty,
        )
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

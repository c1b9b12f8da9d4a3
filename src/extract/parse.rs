//! Turning a free-text service reply into `(label, value)` pairs.
//!
//! Two stages: `sanitize_reply` strips a known list of wrapping artifacts,
//! then `parse_level_pairs` requires the remainder to be a JSON list of
//! `[string, number]` pairs and fails closed otherwise.

use regex::Regex;
use serde_json::Value;

use crate::error::{PipelineError, Result};
use crate::levels::LevelLabel;

/// Markdown code fence, with or without a language tag (```json, ```plaintext, ```).
const CODE_FENCE_PATTERN: &str = r"```[A-Za-z]*";

/// Wrapping artifacts the service adds even when told not to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    /// ```json ... ``` or bare ``` fences anywhere in the reply
    CodeFence,
    /// `{ [[...]] }` - the prompt's example output wraps the list in braces
    WrappingBraces,
}

/// Artifacts stripped by `sanitize_reply`, in the order they are applied.
pub const KNOWN_ARTIFACTS: [Artifact; 2] = [Artifact::CodeFence, Artifact::WrappingBraces];

impl Artifact {
    pub fn name(self) -> &'static str {
        match self {
            Artifact::CodeFence => "code fence",
            Artifact::WrappingBraces => "wrapping braces",
        }
    }

    /// Removes this artifact from `text`. Returns None if it was not present.
    fn strip(self, text: &str) -> Result<Option<String>> {
        match self {
            Artifact::CodeFence => {
                let fence = Regex::new(CODE_FENCE_PATTERN).map_err(|e| {
                    PipelineError::config(format!("Bad code fence pattern: {}", e))
                })?;
                if !fence.is_match(text) {
                    return Ok(None);
                }
                Ok(Some(fence.replace_all(text, "").trim().to_string()))
            }
            Artifact::WrappingBraces => {
                let inner = text
                    .strip_prefix('{')
                    .and_then(|rest| rest.strip_suffix('}'));
                Ok(inner.map(|s| s.trim().to_string()))
            }
        }
    }
}

/// Strips known artifacts from a raw reply.
///
/// Returns the cleaned text and the artifacts that were found.
pub fn sanitize_reply(raw: &str) -> Result<(String, Vec<Artifact>)> {
    let mut text = raw.trim().to_string();
    let mut found = Vec::new();

    for artifact in KNOWN_ARTIFACTS {
        if let Some(stripped) = artifact.strip(&text)? {
            text = stripped;
            found.push(artifact);
        }
    }

    Ok((text, found))
}

/// Parses cleaned reply text as `[[label, value], ...]`.
///
/// `raw` is the unsanitized reply, carried in the error for diagnosis.
pub fn parse_level_pairs(cleaned: &str, raw: &str) -> Result<Vec<(LevelLabel, f64)>> {
    let value: Value = serde_json::from_str(cleaned)
        .map_err(|e| PipelineError::malformed(format!("not JSON: {}", e), raw))?;

    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(PipelineError::malformed(
                format!("expected a list of pairs, got {}", json_kind(&other)),
                raw,
            ));
        }
    };

    let mut pairs = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        let pair = match item {
            Value::Array(pair) if pair.len() == 2 => pair,
            _ => {
                return Err(PipelineError::malformed(
                    format!("item {} is not a [label, value] pair", idx),
                    raw,
                ));
            }
        };

        let label = pair[0].as_str().ok_or_else(|| {
            PipelineError::malformed(format!("item {} has a non-string label", idx), raw)
        })?;
        let number = pair[1]
            .as_f64()
            .filter(|v| v.is_finite())
            .ok_or_else(|| {
                PipelineError::malformed(format!("item {} has a non-numeric value", idx), raw)
            })?;

        pairs.push((LevelLabel::from(label.to_string()), number));
    }

    Ok(pairs)
}

/// Sanitizes then parses a raw service reply.
pub fn parse_reply(raw: &str) -> Result<Vec<(LevelLabel, f64)>> {
    let (cleaned, artifacts) = sanitize_reply(raw)?;
    if !artifacts.is_empty() {
        let names: Vec<&str> = artifacts.iter().map(|a| a.name()).collect();
        crate::log(&format!("Stripped from reply: {}", names.join(", ")));
    }
    parse_level_pairs(&cleaned, raw)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

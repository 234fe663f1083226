//! Strict decoding of raw AI output into an [`AiResult`].

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use mindgraph_shared::{AiResult, MindGraphError, Result};

use crate::keywords::sanitize_keywords;

/// Wire shape the AI is instructed to produce.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPayload {
    answer: String,
    #[serde(default, deserialize_with = "lenient_keywords")]
    keywords: Vec<Option<String>>,
}

/// A missing or non-list `keywords` field degrades to an empty list.
/// Non-string list elements become `None` and are dropped by the sanitizer.
fn lenient_keywords<'de, D>(deserializer: D) -> std::result::Result<Vec<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

/// Validate raw AI text and return the trimmed answer with sanitized keywords.
///
/// # Errors
/// - [`MindGraphError::EmptyResponse`] when `raw` is blank.
/// - [`MindGraphError::MalformedResponse`] when `raw` is not a JSON object of
///   the expected shape, `answer` is missing or not a string, or the trimmed
///   answer is empty.
pub fn normalize_response(raw: &str) -> Result<AiResult> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(MindGraphError::EmptyResponse);
    }

    let value: Value = serde_json::from_str(text)
        .map_err(|e| MindGraphError::malformed(format!("not valid JSON: {e}")))?;

    // Structs also deserialize from JSON arrays; only objects are accepted.
    if !value.is_object() {
        return Err(MindGraphError::malformed("expected a JSON object"));
    }

    let payload: RawPayload = serde_json::from_value(value)
        .map_err(|e| MindGraphError::malformed(e.to_string()))?;

    let answer = payload.answer.trim();
    if answer.is_empty() {
        return Err(MindGraphError::malformed("answer is empty"));
    }

    Ok(AiResult {
        answer: answer.to_string(),
        keywords: sanitize_keywords(payload.keywords),
    })
}

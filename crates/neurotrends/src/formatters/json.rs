//! Extraction of the JSON verdict array from a model reply.

use serde_json::Value;

/// Extract a JSON array from model output.
///
/// Tries the trimmed text as a whole first, then the span from the first `[`
/// to the last `]`. Returns `None` when neither is a JSON array.
#[must_use]
pub fn parse_model_json(text: &str) -> Option<Vec<Value>> {
    let text = text.trim();

    if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(text) {
        return Some(items);
    }

    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if end <= start {
        return None;
    }

    match serde_json::from_str::<Value>(&text[start..=end]) {
        Ok(Value::Array(items)) => Some(items),
        _ => None,
    }
}

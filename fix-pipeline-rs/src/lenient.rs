//! Tolerant JSON extraction from model replies
//!
//! Models asked for JSON still wrap it in prose or Markdown code fences
//! now and then. [`extract_json`] finds the first JSON object in such a
//! reply that deserializes into the requested type.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;

static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[A-Za-z]*\s*(.*?)```").expect("code fence pattern is valid"));

/// Extract the first JSON object in `text` that deserializes into `T`.
///
/// Returns `None` when no candidate fits; never panics.
pub fn extract_json<T: DeserializeOwned>(text: &str) -> Option<T> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<T>(text) {
        return Some(value);
    }

    for caps in CODE_FENCE.captures_iter(text) {
        if let Some(value) = first_object(caps.get(1).map_or("", |m| m.as_str())) {
            return Some(value);
        }
    }

    first_object(text)
}

/// Scan for `{` and try to read one JSON value starting there, ignoring
/// whatever follows it.
fn first_object<T: DeserializeOwned>(text: &str) -> Option<T> {
    for (start, _) in text.match_indices('{') {
        let mut values = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
        if let Some(Ok(value)) = values.next() {
            if let Ok(parsed) = serde_json::from_value::<T>(value) {
                return Some(parsed);
            }
        }
    }
    None
}

//! JSON-shape recovery for model responses.
//!
//! Models sometimes wrap the requested JSON object in prose or code fences.
//! Recovery order: direct parse, fence strip, then the first balanced
//! `{...}` substring that parses to an object.

use serde_json::{Map, Value};

use crate::errors::BackendError;

/// Extract the first JSON object found in `text`.
pub fn extract_first_json_object(text: &str) -> Result<Map<String, Value>, BackendError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(invalid("empty response content"));
    }

    // Fast path: the content is the object.
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return match value {
            Value::Object(map) => Ok(map),
            _ => Err(invalid("top-level JSON is not an object")),
        };
    }

    // Strip a markdown fence wrapping the whole content.
    if text.starts_with("```") {
        let lines: Vec<&str> = text.lines().collect();
        if lines.len() >= 3 && lines[lines.len() - 1].starts_with("```") {
            let candidate = lines[1..lines.len() - 1].join("\n");
            return extract_first_json_object(&candidate);
        }
    }

    let Some(start) = text.find('{') else {
        return Err(invalid("no JSON object start found"));
    };

    // Greedy scan: widest candidate ending in '}' that parses to an object.
    let bytes = text.as_bytes();
    for end in (start + 1..text.len()).rev() {
        if bytes[end] != b'}' {
            continue;
        }
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&text[start..=end]) {
            return Ok(map);
        }
    }

    Err(invalid("failed to extract a JSON object"))
}

fn invalid(message: &str) -> BackendError {
    BackendError::InvalidJson {
        message: message.to_string(),
    }
}

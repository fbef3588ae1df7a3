//! Interpreter for raw selector-model responses.
//!
//! Model output is not guaranteed to be well-formed JSON: it may be wrapped
//! in a markdown fence or preceded by commentary. Parsing is two-tier: try
//! the fence-stripped text directly, then fall back to the first
//! brace-delimited span of the original text (greedy to the last closing
//! brace).

use crate::error::{AssistantError, Result};
use serde_json::{Map, Value};

/// Extract a JSON object from a raw model response.
pub fn interpret(raw: &str) -> Result<Map<String, Value>> {
    let cleaned = strip_fences(raw);
    let direct_err = match parse_object(cleaned) {
        Ok(obj) => return Ok(obj),
        Err(e) => e,
    };

    if let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}')) {
        if start < end {
            if let Ok(obj) = parse_object(&raw[start..=end]) {
                return Ok(obj);
            }
        }
    }

    Err(AssistantError::SelectorParse(direct_err))
}

/// Read the `table_name` field, defaulting to empty and trimming whitespace.
pub fn candidate_table_name(response: &Map<String, Value>) -> String {
    response
        .get("table_name")
        .and_then(Value::as_str)
        .unwrap_or("")
        .trim()
        .to_string()
}

fn strip_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        // Drop an optional language tag on the fence line.
        text = match rest.find('\n') {
            Some(idx) => &rest[idx + 1..],
            None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
        };
    }
    text.trim_end_matches("```").trim()
}

fn parse_object(text: &str) -> std::result::Result<Map<String, Value>, String> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(obj)) => Ok(obj),
        Ok(other) => Err(format!("expected a JSON object, got {}", other)),
        Err(e) => Err(e.to_string()),
    }
}

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, error};

use crate::error::{AppError, Result};

static FENCED_JSON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```json\s*(\{.*\})\s*```").expect("fenced json pattern is valid")
});

/// Parses model output that should be a JSON object.
///
/// Schema-enforced responses are plain JSON. Models occasionally wrap the
/// object in a ```` ```json ```` fence, which is tried second. Anything else
/// is an error; nothing is fabricated here.
pub fn parse_analysis_json(raw: &str) -> Result<Value> {
    match serde_json::from_str::<Value>(raw.trim()) {
        Ok(value) => return ensure_object(value),
        Err(e) => debug!("Direct JSON parse failed ({}), looking for a fenced block", e),
    }

    if let Some(captures) = FENCED_JSON.captures(raw) {
        let body = &captures[1];
        return match serde_json::from_str::<Value>(body) {
            Ok(value) => ensure_object(value),
            Err(e) => {
                error!("Fenced JSON block did not parse: {}", e);
                Err(AppError::JsonParse(e.to_string()))
            }
        };
    }

    error!("Model response is not JSON ({} chars)", raw.len());
    Err(AppError::JsonParse("no JSON object found in response".to_string()))
}

fn ensure_object(value: Value) -> Result<Value> {
    if value.is_object() {
        Ok(value)
    } else {
        Err(AppError::JsonParse(format!("expected a JSON object, got {}", type_name(&value))))
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

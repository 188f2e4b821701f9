//! Pulling structured JSON out of free-form model output

use serde::de::DeserializeOwned;

use crate::error::{Result, SessionError};

/// Strip a surrounding markdown code fence, if any.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip an optional language tag on the opening line
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Find the outermost brace-balanced `{...}` block, ignoring braces inside
/// string literals. Returns the trimmed input when no complete object exists.
pub fn extract_json_object(text: &str) -> &str {
    let text = text.trim();
    let Some(start) = text.find('{') else {
        return text;
    };

    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape_next = false;
    for (offset, ch) in text[start..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return &text[start..start + offset + 1];
                }
            }
            _ => {}
        }
    }
    text
}

/// Parse a model response into `T`, tolerating code fences and prose
/// around the JSON object.
pub fn parse_json_response<T: DeserializeOwned>(raw: &str) -> Result<T> {
    let clean = strip_code_fences(raw);
    if let Ok(value) = serde_json::from_str::<T>(clean) {
        return Ok(value);
    }
    serde_json::from_str::<T>(extract_json_object(clean)).map_err(|e| SessionError::ResponseParse {
        message: e.to_string(),
    })
}

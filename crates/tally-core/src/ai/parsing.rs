//! Parsing helpers for AI backend responses
//!
//! Models wrap their payload in markdown fences or chatter around it more
//! often than not. These functions dig the CSV or JSON back out.

use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};
use crate::models::CategorizationResult;

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[A-Za-z0-9_-]*[ \t]*\r?\n?(.*?)```").expect("valid regex")
});

static FENCED_JSON_ARRAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*(\[.*?\])\s*```").expect("valid regex")
});

/// Shorten raw model output for error messages
fn truncate_for_error(raw: &str) -> String {
    const LIMIT: usize = 200;
    match raw.char_indices().nth(LIMIT) {
        Some((idx, _)) => format!("{}...", &raw[..idx]),
        None => raw.to_string(),
    }
}

/// Remove markdown code fences, keeping the first fenced block's content
///
/// Text without fences is returned trimmed.
pub fn strip_code_fences(response: &str) -> String {
    let trimmed = response.trim();
    match FENCED_BLOCK.captures(trimmed) {
        Some(caps) => caps[1].trim().to_string(),
        // An opening fence the model never closed
        None => trimmed
            .strip_prefix("```")
            .map(|rest| rest.split_once('\n').map_or("", |(_, body)| body))
            .unwrap_or(trimmed)
            .trim()
            .to_string(),
    }
}

/// Clean a reconstruction response down to CSV text
pub fn clean_csv_response(response: &str) -> Result<String> {
    let csv = strip_code_fences(response);
    if csv.is_empty() {
        return Err(Error::Reconstruction(
            "AI returned an empty statement".into(),
        ));
    }
    Ok(csv)
}

/// Extract a JSON array from a model response
///
/// Tries the whole response, then a fenced code block, then the outermost
/// `[` ... `]` span.
pub fn extract_json_array<T: DeserializeOwned>(response: &str) -> Result<Vec<T>> {
    let response = response.trim();

    if let Ok(items) = serde_json::from_str(response) {
        return Ok(items);
    }

    if let Some(caps) = FENCED_JSON_ARRAY.captures(response) {
        return serde_json::from_str(&caps[1]).map_err(|e| {
            Error::InvalidData(format!(
                "Invalid JSON in fenced block: {} | Raw: {}",
                e,
                truncate_for_error(&caps[1])
            ))
        });
    }

    match (response.find('['), response.rfind(']')) {
        (Some(s), Some(e)) if s < e => {
            let json_str = &response[s..=e];
            serde_json::from_str(json_str).map_err(|e| {
                Error::InvalidData(format!(
                    "Invalid JSON from AI: {} | Raw: {}",
                    e,
                    truncate_for_error(json_str)
                ))
            })
        }
        _ => Err(Error::InvalidData(format!(
            "No JSON array found in AI response | Raw: {}",
            truncate_for_error(response)
        ))),
    }
}

/// Parse a categorization batch response
pub fn parse_categorizations(response: &str) -> Result<Vec<CategorizationResult>> {
    extract_json_array(response)
}

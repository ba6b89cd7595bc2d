//! Parsing helpers for model responses
//!
//! Models wrap their payload in prose and markdown. These functions dig the
//! payload out and report `Error::InvalidData` when there is nothing usable.

use serde_json::Value;

use crate::error::{Error, Result};
use crate::models::Category;

use super::truncate_for_log;

/// Body of the first fenced code block tagged `json`, if any
pub fn extract_fenced_block(response: &str) -> Option<&str> {
    let start = response.find("```json")?;
    let body = &response[start + "```json".len()..];
    let end = body.find("```")?;
    Some(body[..end].trim())
}

/// Greedy JSON-array span: first `[` through last `]`
pub fn extract_json_array(response: &str) -> Option<&str> {
    let start = response.find('[')?;
    let end = response.rfind(']')?;
    (start < end).then(|| &response[start..=end])
}

/// Parse the insight array out of a model response
///
/// A fenced ```json block is tried first and parsed strictly. When there is
/// no fenced block, or it does not hold an array, the greedy bracket span of
/// the whole response is used instead. An empty array counts as unusable.
pub fn parse_insight_values(response: &str) -> Result<Vec<Value>> {
    let response = response.trim();

    if let Some(block) = extract_fenced_block(response) {
        if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(block) {
            if !items.is_empty() {
                return Ok(items);
            }
        }
    }

    let json_str = extract_json_array(response).ok_or_else(|| {
        Error::InvalidData(format!(
            "No JSON array found in AI response | Raw: {}",
            truncate_for_log(response)
        ))
    })?;

    let items: Vec<Value> = serde_json::from_str(json_str).map_err(|e| {
        Error::InvalidData(format!(
            "Invalid insights JSON from AI: {} | Raw: {}",
            e,
            truncate_for_log(json_str)
        ))
    })?;

    if items.is_empty() {
        return Err(Error::InvalidData("AI returned an empty insights array".into()));
    }

    Ok(items)
}

/// Match a trimmed response exactly against the category labels
pub fn parse_category(response: &str) -> Result<Category> {
    let label = response.trim();
    Category::from_label(label).ok_or_else(|| {
        Error::InvalidData(format!(
            "Category not in allowed set: {}",
            truncate_for_log(label)
        ))
    })
}

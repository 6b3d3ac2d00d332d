// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Parses a structured field-edit instruction out of an assistant's final
//! text, accepting both the canonical and legacy change shapes.

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Change {
    #[serde(rename = "fieldId")]
    pub field_id: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditResponse {
    pub message: String,
    pub changes: Vec<Change>,
}

/// Extracts the first ```json fenced block, or falls back to the whole
/// trimmed text when no fence is present.
fn extract_json_block(text: &str) -> &str {
    if let Some(start) = text.find("```json") {
        let after = &text[start + "```json".len()..];
        if let Some(end) = after.find("```") {
            return after[..end].trim();
        }
    }
    text.trim()
}

pub fn parse_edit_response(text: &str) -> Option<EditResponse> {
    let candidate = extract_json_block(text);
    let value: Value = serde_json::from_str(candidate).ok()?;
    let obj = value.as_object()?;

    if obj.get("type").and_then(Value::as_str) != Some("edit") {
        return None;
    }

    let message = obj.get("message").and_then(Value::as_str).unwrap_or("").to_string();
    let changes_raw = obj.get("changes").and_then(Value::as_array)?;

    let changes = changes_raw
        .iter()
        .filter_map(|entry| {
            let entry = entry.as_object()?;
            if let (Some(field_id), Some(value)) = (entry.get("fieldId").and_then(Value::as_str), entry.get("value")) {
                return Some(Change { field_id: field_id.to_string(), value: value_to_string(value) });
            }
            if let (Some(field), Some(after)) = (entry.get("field").and_then(Value::as_str), entry.get("after")) {
                return Some(Change { field_id: field.to_string(), value: value_to_string(after) });
            }
            None
        })
        .collect();

    Some(EditResponse { message, changes })
}

fn value_to_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

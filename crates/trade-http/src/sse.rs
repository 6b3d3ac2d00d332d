// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! SSE frame shapes and the static tool-display metadata table used to
//! decorate `tool` frames for the client.

use serde::Serialize;
use serde_json::json;

use crate::edit::Change;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Frame {
    #[serde(rename = "init")]
    Init {
        #[serde(skip_serializing_if = "Option::is_none")]
        doc_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        trade_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        gen_chat_id: Option<String>,
    },
    #[serde(rename = "context")]
    Context { summary: String },
    #[serde(rename = "agent_info")]
    AgentInfo { agent: AgentInfo },
    #[serde(rename = "text")]
    Text { content: String },
    #[serde(rename = "tool")]
    Tool { tool: ToolInfo },
    #[serde(rename = "edit")]
    Edit { message: String, changes: Vec<Change> },
    #[serde(rename = "done")]
    Done { tools_used: Vec<String> },
    #[serde(rename = "error")]
    Error { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentInfo {
    pub name: String,
    pub model: String,
    pub doc_mode: String,
    pub tools: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub description: String,
}

impl Frame {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| json!({"type": "error", "error": "frame serialization failed"}).to_string())
    }
}

/// Human-readable display metadata for a tool name, with a generic fallback
/// for anything not in the static table.
pub fn tool_info(name: &str) -> ToolInfo {
    let (display, icon, description) = match name {
        "search_trade_documents" => ("Knowledge search", "book", "Searching the trade knowledge base"),
        "search_user_document" => ("Document search", "file-search", "Searching the uploaded document"),
        "search_web" => ("Web search", "globe", "Searching the web"),
        other => return ToolInfo { id: other.to_string(), name: other.to_string(), icon: "tool".into(), description: "Running a tool".into() },
    };
    ToolInfo { id: name.to_string(), name: display.to_string(), icon: icon.to_string(), description: description.to_string() }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_frame_omits_absent_fields() {
        let frame = Frame::Init { doc_id: None, trade_id: None, gen_chat_id: Some("c1".into()) };
        let json = frame.to_json();
        assert!(json.contains("\"type\":\"init\""));
        assert!(json.contains("gen_chat_id"));
        assert!(!json.contains("doc_id"));
    }

    #[test]
    fn unknown_tool_falls_back_to_generic_display() {
        let info = tool_info("some_future_tool");
        assert_eq!(info.name, "some_future_tool");
        assert_eq!(info.icon, "tool");
    }

    #[test]
    fn known_tool_has_display_name() {
        let info = tool_info("search_web");
        assert_eq!(info.name, "Web search");
    }
}

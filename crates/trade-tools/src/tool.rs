// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

/// A single tool invocation requested by the model.
#[derive(Debug, Clone)]
pub struct ToolCall {
    /// Opaque identifier returned by the model (forwarded verbatim)
    pub id: String,
    pub name: String,
    /// Parsed JSON arguments
    pub args: Value,
}

/// A single retrieved passage, returned by every search tool.
///
/// `score` is omitted from search backends that do not produce a ranking
/// score (e.g. a web search API that only returns rank order).
#[derive(Debug, Clone, Serialize)]
pub struct Passage {
    pub text: String,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

/// Serialise a list of passages as the JSON text forwarded to the model as
/// the tool result. An empty list still serialises to `[]` rather than
/// failing the turn — see [`Tool::execute`].
pub fn passages_to_content(passages: &[Passage]) -> String {
    serde_json::to_string(passages).unwrap_or_else(|_| "[]".to_string())
}

/// The result of executing a tool.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub call_id: String,
    pub content: String,
    /// If true, the tool execution failed non-fatally (returned error message).
    pub is_error: bool,
}

impl ToolOutput {
    /// Successful plain-text or JSON result.
    pub fn ok(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            content: content.into(),
            is_error: false,
        }
    }

    /// Error result containing a plain-text error message.
    ///
    /// Per the tool-layer contract, search tools never use this for their
    /// own failures — a failed search returns `ToolOutput::ok` with an empty
    /// passage list plus a warning passage instead, so a flaky backend never
    /// aborts the turn.
    pub fn err(call_id: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            content: msg.into(),
            is_error: true,
        }
    }
}

/// Trait that every tool available to an agent must implement.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    /// JSON Schema for parameters
    fn parameters_schema(&self) -> Value;
    /// Execute the tool. Tool-internal failures should be swallowed into a
    /// successful empty-passages result with a warning rather than
    /// propagated as `ToolOutput::err`, so a flaky backend never aborts the
    /// turn.
    async fn execute(&self, call: &ToolCall) -> ToolOutput;
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Generic OpenAI-compatible chat-completions provider.
//!
//! Talks to any server implementing the `POST /chat/completions` streaming
//! wire format (OpenAI itself, Azure OpenAI, and most self-hosted gateways).
//! The exact vendor behind `base_url` is a deployment detail — this crate
//! only needs a provider that streams text deltas and tool-call deltas.

use std::pin::Pin;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::json;

use crate::provider::ResponseStream;
use crate::{CompletionRequest, Message, MessageContent, ResponseEvent, Role};

/// A chat-completions provider speaking the OpenAI-compatible streaming format.
#[derive(Debug)]
pub struct HttpChatProvider {
    model: String,
    api_key: Option<String>,
    base_url: String,
    max_tokens: u32,
    temperature: f32,
    client: reqwest::Client,
}

impl HttpChatProvider {
    pub fn new(model: impl Into<String>, api_key: Option<String>, base_url: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            api_key,
            base_url: base_url.into(),
            max_tokens: 4096,
            temperature: 0.2,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl crate::ModelProvider for HttpChatProvider {
    fn name(&self) -> &str {
        "compat"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, req: CompletionRequest) -> anyhow::Result<ResponseStream> {
        let body = json!({
            "model": self.model,
            "messages": req.messages.iter().map(to_wire_message).collect::<Vec<_>>(),
            "tools": req.tools.iter().map(|t| json!({
                "type": "function",
                "function": { "name": t.name, "description": t.description, "parameters": t.parameters },
            })).collect::<Vec<_>>(),
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "stream": true,
        });

        let mut builder = self.client.post(self.endpoint()).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let resp = builder.send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("chat completion request failed: {status} {text}");
        }

        Ok(Box::pin(parse_sse_stream(resp.bytes_stream())))
    }
}

fn to_wire_message(m: &Message) -> serde_json::Value {
    match &m.content {
        MessageContent::Text(text) => json!({ "role": role_str(&m.role), "content": text }),
        MessageContent::ContentParts(parts) => json!({ "role": role_str(&m.role), "content": parts }),
        MessageContent::ToolCall { tool_call_id, function } => json!({
            "role": "assistant",
            "tool_calls": [{
                "id": tool_call_id,
                "type": "function",
                "function": { "name": function.name, "arguments": function.arguments },
            }],
        }),
        MessageContent::ToolResult { tool_call_id, content } => json!({
            "role": "tool",
            "tool_call_id": tool_call_id,
            "content": content.to_string(),
        }),
    }
}

fn role_str(role: &Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    }
}

#[derive(Debug, Deserialize)]
struct Chunk {
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    usage: Option<ChunkUsage>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ChunkToolCall>,
}

#[derive(Debug, Deserialize)]
struct ChunkToolCall {
    index: u32,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: ChunkFunction,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkFunction {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

/// Parse a byte stream of `data: <json>\n\n` SSE frames into [`ResponseEvent`]s.
///
/// A `data: [DONE]` frame terminates the stream with [`ResponseEvent::Done`].
/// Non-JSON or malformed lines are skipped rather than failing the whole turn.
fn parse_sse_stream(
    bytes: impl Stream<Item = reqwest::Result<bytes::Bytes>> + Send + 'static,
) -> Pin<Box<dyn Stream<Item = anyhow::Result<ResponseEvent>> + Send>> {
    let lines = bytes.scan(String::new(), |buf, chunk| {
        let chunk = match chunk {
            Ok(c) => c,
            Err(e) => return futures::future::ready(Some(vec![Err(anyhow::anyhow!(e))])),
        };
        buf.push_str(&String::from_utf8_lossy(&chunk));
        let mut events = Vec::new();
        while let Some(pos) = buf.find("\n\n") {
            let frame: String = buf.drain(..pos + 2).collect();
            for line in frame.lines() {
                if let Some(data) = line.strip_prefix("data: ").or_else(|| line.strip_prefix("data:")) {
                    events.push(Ok(data.trim().to_string()));
                }
            }
        }
        futures::future::ready(Some(events))
    });

    Box::pin(lines.flat_map(futures::stream::iter).filter_map(|line: anyhow::Result<String>| async move {
        let line = match line {
            Ok(l) => l,
            Err(e) => return Some(Err(e)),
        };
        if line == "[DONE]" {
            return Some(Ok(ResponseEvent::Done));
        }
        let chunk: Chunk = match serde_json::from_str(&line) {
            Ok(c) => c,
            Err(_) => return None,
        };
        if let Some(usage) = chunk.usage {
            return Some(Ok(ResponseEvent::Usage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
                cache_read_tokens: 0,
                cache_write_tokens: 0,
            }));
        }
        let delta = chunk.choices.into_iter().next()?.delta;
        if let Some(text) = delta.content {
            return Some(Ok(ResponseEvent::TextDelta(text)));
        }
        if let Some(tc) = delta.tool_calls.into_iter().next() {
            return Some(Ok(ResponseEvent::ToolCall {
                index: tc.index,
                id: tc.id.unwrap_or_default(),
                name: tc.function.name.unwrap_or_default(),
                arguments: tc.function.arguments.unwrap_or_default(),
            }));
        }
        None
    }))
}

// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Compresses a raw role-tagged message list into the durable text stored
//! for one memory scope, using the scope's fixed summarization prompt.

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use trade_model::{CompletionRequest, Message, ModelProvider, ResponseEvent};

use crate::scope::MemoryType;

/// A single role-tagged message in the raw conversation passed to a write op.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleMessage {
    pub role: String,
    pub content: String,
}

impl RoleMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".into(), content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: "assistant".into(), content: content.into() }
    }
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarize `messages` for the given scope. Returns `None` when the
    /// digest is empty (nothing novel to store) rather than an empty string.
    async fn summarize(
        &self,
        memory_type: MemoryType,
        messages: &[RoleMessage],
    ) -> anyhow::Result<Option<String>>;
}

pub struct ModelSummarizer {
    provider: Arc<dyn ModelProvider>,
}

impl ModelSummarizer {
    pub fn new(provider: Arc<dyn ModelProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Summarizer for ModelSummarizer {
    async fn summarize(
        &self,
        memory_type: MemoryType,
        messages: &[RoleMessage],
    ) -> anyhow::Result<Option<String>> {
        if messages.is_empty() {
            return Ok(None);
        }

        let mut turns = vec![Message::system(memory_type.summarization_prompt())];
        turns.extend(messages.iter().map(|m| match m.role.as_str() {
            "assistant" => Message::assistant(m.content.clone()),
            "system" => Message::system(m.content.clone()),
            _ => Message::user(m.content.clone()),
        }));

        let req = CompletionRequest { messages: turns, ..Default::default() };
        let mut stream = self.provider.complete(req).await?;

        let mut text = String::new();
        while let Some(event) = stream.next().await {
            match event? {
                ResponseEvent::TextDelta(delta) => text.push_str(&delta),
                ResponseEvent::Done => break,
                ResponseEvent::Error(msg) => anyhow::bail!("summarization model error: {msg}"),
                _ => {}
            }
        }

        let trimmed = text.trim();
        if trimmed.is_empty() {
            Ok(None)
        } else {
            Ok(Some(trimmed.to_string()))
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use trade_model::MockProvider;

    #[tokio::test]
    async fn summarize_empty_messages_returns_none() {
        let s = ModelSummarizer::new(Arc::new(MockProvider));
        let result = s.summarize(MemoryType::DocSession, &[]).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn summarize_nonempty_messages_returns_some() {
        let s = ModelSummarizer::new(Arc::new(MockProvider));
        let messages = vec![RoleMessage::user("what's the FOB incoterm?")];
        let result = s.summarize(MemoryType::DocSession, &messages).await.unwrap();
        assert!(result.is_some());
    }
}

// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Text embedding — turns chunk and memory text into vectors for the store.

use async_trait::async_trait;
use serde_json::{json, Value};

use trade_config::EmbeddingConfig;

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    /// Vector dimensionality this embedder produces.
    fn dimensions(&self) -> usize;
}

/// OpenAI-compatible `/embeddings` endpoint client.
pub struct HttpEmbedder {
    model: String,
    api_key: Option<String>,
    base_url: String,
    client: reqwest::Client,
    dims: usize,
}

impl HttpEmbedder {
    pub fn new(model: impl Into<String>, api_key: Option<String>, base_url: impl Into<String>) -> Self {
        let model = model.into();
        let dims = catalog_dims(&model);
        Self {
            model,
            api_key,
            base_url: base_url.into(),
            client: reqwest::Client::new(),
            dims,
        }
    }

    pub fn from_config(cfg: &EmbeddingConfig) -> Self {
        let api_key = cfg
            .api_key_env
            .as_ref()
            .and_then(|env| std::env::var(env).ok());
        let base_url = cfg
            .base_url
            .clone()
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string());
        Self::new(cfg.model.clone(), api_key, base_url)
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let mut req = self
            .client
            .post(format!("{}/embeddings", self.base_url.trim_end_matches('/')))
            .json(&json!({ "model": self.model, "input": texts }));
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await?;
        if !resp.status().is_success() {
            anyhow::bail!("embedding API returned status {}", resp.status());
        }

        let body: Value = resp.json().await?;
        let mut data = body
            .get("data")
            .and_then(|d| d.as_array())
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("embedding API response missing 'data' array"))?;

        data.sort_by_key(|e| e.get("index").and_then(|i| i.as_u64()).unwrap_or(0));

        data.into_iter()
            .map(|entry| {
                entry
                    .get("embedding")
                    .and_then(|e| e.as_array())
                    .map(|arr| arr.iter().filter_map(|v| v.as_f64()).map(|v| v as f32).collect())
                    .ok_or_else(|| anyhow::anyhow!("embedding entry missing 'embedding' array"))
            })
            .collect()
    }

    fn dimensions(&self) -> usize {
        self.dims
    }
}

fn catalog_dims(model: &str) -> usize {
    match model {
        "text-embedding-3-large" => 3072,
        "text-embedding-3-small" | "text-embedding-ada-002" => 1536,
        _ => 1536,
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_dims_known_models() {
        assert_eq!(catalog_dims("text-embedding-3-large"), 3072);
        assert_eq!(catalog_dims("text-embedding-3-small"), 1536);
    }

    #[test]
    fn catalog_dims_unknown_model_defaults() {
        assert_eq!(catalog_dims("some-unknown-model"), 1536);
    }

    #[test]
    fn from_config_uses_base_url_default() {
        let cfg = EmbeddingConfig {
            model: "text-embedding-3-small".into(),
            api_key_env: None,
            base_url: None,
        };
        let e = HttpEmbedder::from_config(&cfg);
        assert_eq!(e.base_url, "https://api.openai.com/v1");
        assert_eq!(e.dimensions(), 1536);
    }

    #[tokio::test]
    async fn embed_batch_empty_returns_empty() {
        let e = HttpEmbedder::new("text-embedding-3-small", None, "http://localhost:1");
        let result = e.embed_batch(&[]).await.unwrap();
        assert!(result.is_empty());
    }
}

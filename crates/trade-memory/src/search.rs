// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Wires the vector store + embedder into the `trade_tools::VectorSearch`
//! trait consumed by the knowledge-search tools.

use std::sync::Arc;

use async_trait::async_trait;

use trade_tools::{Passage, VectorSearch};

use crate::embed::Embedder;
use crate::store::{SearchFilter, VectorStoreAdapter};

pub struct EmbeddingVectorSearch {
    pub store: Arc<dyn VectorStoreAdapter>,
    pub embedder: Arc<dyn Embedder>,
}

#[async_trait]
impl VectorSearch for EmbeddingVectorSearch {
    async fn search(
        &self,
        collection: &str,
        query: &str,
        doc_id: Option<&str>,
        limit: usize,
    ) -> anyhow::Result<Vec<Passage>> {
        let vectors = self.embedder.embed_batch(std::slice::from_ref(&query.to_string())).await?;
        let vector = vectors
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector for query"))?;

        let mut filter = SearchFilter::new();
        if let Some(doc_id) = doc_id {
            filter = filter.with("doc_id", doc_id);
        }

        let hits = self.store.search(collection, Some(&vector), Some(query), limit, &filter).await?;
        Ok(hits
            .into_iter()
            .map(|h| Passage { text: h.text, source: source_of(&h.payload), score: Some(h.score) })
            .collect())
    }
}

fn source_of(payload: &serde_json::Value) -> String {
    payload
        .get("source_object_key")
        .and_then(|v| v.as_str())
        .or_else(|| payload.get("doc_id").and_then(|v| v.as_str()))
        .unwrap_or("unknown")
        .to_string()
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

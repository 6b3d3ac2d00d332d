// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Vector store adapter contract (`upsert`/`search`/`delete`/`ensure_collection`).

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceMetric {
    Cosine,
}

/// One row to upsert into a collection.
#[derive(Debug, Clone)]
pub struct VectorPoint {
    pub id: String,
    pub vector: Vec<f32>,
    /// Plain text indexed for BM25 full-text search alongside the vector.
    pub text: String,
    pub payload: Value,
}

/// Equality filter over payload fields, applied by `search` and `delete`.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter(pub HashMap<String, String>);

impl SearchFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn matches(&self, payload: &Value) -> bool {
        self.0.iter().all(|(k, v)| {
            payload
                .get(k)
                .and_then(|val| val.as_str())
                .map(|s| s == v)
                .unwrap_or(false)
        })
    }
}

#[derive(Debug, Clone)]
pub struct SearchHit {
    pub id: String,
    pub score: f32,
    pub text: String,
    pub payload: Value,
}

/// Vector store adapter (C2). Every operation may block on I/O from the
/// caller's point of view but presents a synchronous-looking contract —
/// callers never see partial results.
#[async_trait]
pub trait VectorStoreAdapter: Send + Sync {
    async fn ensure_collection(&self, name: &str, dim: usize, metric: DistanceMetric) -> anyhow::Result<()>;

    async fn upsert(&self, collection: &str, points: Vec<VectorPoint>) -> anyhow::Result<()>;

    /// Similarity search. `vector = None` skips ranking by similarity and
    /// returns the most recently inserted matches instead (used for "recent
    /// N" reads that have no query text to embed).
    async fn search(
        &self,
        collection: &str,
        vector: Option<&[f32]>,
        query_text: Option<&str>,
        k: usize,
        filter: &SearchFilter,
    ) -> anyhow::Result<Vec<SearchHit>>;

    /// Delete all points matching `filter`. Must be atomic per call. Returns
    /// the number of points deleted.
    async fn delete(&self, collection: &str, filter: &SearchFilter) -> anyhow::Result<u64>;
}

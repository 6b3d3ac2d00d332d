// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Ingest Service (C4): materializes an uploaded document into retrievable
//! vector chunks.

use std::sync::Arc;

use serde_json::json;
use tracing::warn;

use trade_memory::{DistanceMetric, Embedder, SearchFilter, VectorPoint, VectorStoreAdapter};

use crate::chunk::chunk_pages;
use crate::error::IngestError;
use crate::object_store::ObjectStore;
use crate::parse;

#[derive(Debug)]
pub struct IngestResult {
    pub chunks_count: usize,
    pub needs_ocr: bool,
    pub warnings: Vec<String>,
}

pub struct IngestService {
    pub object_store: Arc<dyn ObjectStore>,
    pub store: Arc<dyn VectorStoreAdapter>,
    pub embedder: Arc<dyn Embedder>,
}

impl IngestService {
    pub fn new(object_store: Arc<dyn ObjectStore>, store: Arc<dyn VectorStoreAdapter>, embedder: Arc<dyn Embedder>) -> Self {
        Self { object_store, store, embedder }
    }

    pub async fn ingest(&self, doc_id: &str, object_key: &str, collection: &str) -> Result<IngestResult, IngestError> {
        // Re-ingesting the same document must not duplicate chunks.
        self.delete_document(doc_id, collection).await?;

        let bytes = self.object_store.fetch(object_key).await?;
        let extracted = parse::extract(object_key, &bytes)?;

        let is_pdf = object_key.to_ascii_lowercase().ends_with(".pdf");
        let needs_ocr = is_pdf && extracted.avg_chars_per_page() < 50.0;
        let mut warnings = extracted.warnings;
        if needs_ocr {
            warnings.push("low text density, document likely needs OCR".to_string());
        }

        let chunks = chunk_pages(&extracted.pages);
        if chunks.is_empty() {
            return Err(IngestError::NoText);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;
        if vectors.len() != chunks.len() {
            return Err(IngestError::Other(anyhow::anyhow!("embedder returned {} vectors for {} chunks", vectors.len(), chunks.len())));
        }

        self.store.ensure_collection(collection, self.embedder.dimensions(), DistanceMetric::Cosine).await?;

        let points: Vec<VectorPoint> = chunks
            .iter()
            .zip(vectors.into_iter())
            .map(|(chunk, vector)| {
                let mut payload = json!({
                    "doc_id": doc_id,
                    "chunk_index": chunk.index,
                    "source_object_key": object_key,
                });
                if let Some(page) = chunk.page {
                    payload["page"] = json!(page);
                }
                VectorPoint { id: format!("{doc_id}:{}", chunk.index), vector, text: chunk.text.clone(), payload }
            })
            .collect();

        let chunks_count = points.len();
        self.store.upsert(collection, points).await?;

        if !warnings.is_empty() {
            warn!(doc_id, collection, ?warnings, "ingest completed with warnings");
        }

        Ok(IngestResult { chunks_count, needs_ocr, warnings })
    }

    pub async fn delete_document(&self, doc_id: &str, collection: &str) -> anyhow::Result<u64> {
        let filter = SearchFilter::new().with("doc_id", doc_id);
        self.store.delete(collection, &filter).await
    }
}

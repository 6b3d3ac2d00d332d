// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Abstraction over the vector store used by the two knowledge-search tools.
//!
//! `search_trade_documents` and `search_user_document` need a similarity
//! search primitive but must not depend on the concrete vector-store crate
//! directly — the binary wires a concrete implementation in at startup.

use async_trait::async_trait;

use crate::tool::Passage;

/// Similarity search over a named vector-store collection, optionally scoped
/// to a single document id.
#[async_trait]
pub trait VectorSearch: Send + Sync {
    async fn search(
        &self,
        collection: &str,
        query: &str,
        doc_id: Option<&str>,
        limit: usize,
    ) -> anyhow::Result<Vec<Passage>>;
}

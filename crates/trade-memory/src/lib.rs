// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
pub mod embed;
pub mod error;
pub mod scope;
pub mod search;
pub mod service;
pub mod sqlite_store;
pub mod store;
pub mod summarize;

pub use embed::{Embedder, HttpEmbedder};
pub use error::MemoryError;
pub use scope::{buyer_scope, doc_scope, gen_chat_scope, normalize_buyer, user_scope, MemoryType};
pub use search::EmbeddingVectorSearch;
pub use service::{DocContext, GenChatContext, MemoryHit, MemoryService, SaveFlags, SaveReport, TradeDeleteReport};
pub use sqlite_store::SqliteVectorStore;
pub use store::{DistanceMetric, SearchFilter, SearchHit, VectorPoint, VectorStoreAdapter};
pub use summarize::{ModelSummarizer, RoleMessage, Summarizer};

// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Memory service (C3): four isolated memory scopes layered over one
//! vector-store collection, with parallel context assembly for the chat
//! orchestrator.

use std::sync::Arc;

use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::embed::Embedder;
use crate::error::MemoryError;
use crate::scope::{buyer_scope, doc_scope, gen_chat_scope, user_scope, MemoryType};
use crate::store::{SearchFilter, VectorPoint, VectorStoreAdapter};
use crate::summarize::{RoleMessage, Summarizer};

const CONTEXT_SEARCH_K: usize = 3;

#[derive(Debug, Clone, Serialize)]
pub struct MemoryHit {
    pub content: String,
    pub score: f32,
}

#[derive(Debug, Clone, Default)]
pub struct SaveFlags {
    pub save_doc: bool,
    pub save_user: bool,
    pub save_buyer: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SaveReport {
    pub doc: usize,
    pub gen_chat: usize,
    pub user: usize,
    pub buyer: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DocContext {
    pub doc: Vec<MemoryHit>,
    pub user: Vec<MemoryHit>,
    pub buyer: Vec<MemoryHit>,
    pub summary: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GenChatContext {
    pub chat: Vec<MemoryHit>,
    pub user: Vec<MemoryHit>,
    pub summary: String,
}

#[derive(Debug, Clone, Default)]
pub struct TradeDeleteReport {
    pub attempted: usize,
    pub succeeded: usize,
}

pub struct MemoryService {
    store: Arc<dyn VectorStoreAdapter>,
    embedder: Arc<dyn Embedder>,
    summarizer: Arc<dyn Summarizer>,
    collection: String,
}

impl MemoryService {
    pub fn new(
        store: Arc<dyn VectorStoreAdapter>,
        embedder: Arc<dyn Embedder>,
        summarizer: Arc<dyn Summarizer>,
        collection: impl Into<String>,
    ) -> Self {
        Self { store, embedder, summarizer, collection: collection.into() }
    }

    async fn embed_one(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let mut vectors = self.embedder.embed_batch(std::slice::from_ref(&text.to_string())).await?;
        vectors.pop().ok_or_else(|| anyhow::anyhow!("embedder returned no vector"))
    }

    async fn write(
        &self,
        memory_type: MemoryType,
        scope_key: &str,
        owner_user_id: &str,
        extra: serde_json::Value,
        messages: &[RoleMessage],
    ) -> anyhow::Result<usize> {
        let Some(summary) = self.summarizer.summarize(memory_type, messages).await? else {
            return Ok(0);
        };
        let vector = self.embed_one(&summary).await?;
        self.store.ensure_collection(&self.collection, vector.len(), crate::store::DistanceMetric::Cosine).await?;

        let mut payload = serde_json::json!({
            "memory_type": memory_type.as_str(),
            "scope_key": scope_key,
            "owner_user_id": owner_user_id,
        });
        if let serde_json::Value::Object(extra_map) = extra {
            if let serde_json::Value::Object(map) = &mut payload {
                map.extend(extra_map);
            }
        }

        let point = VectorPoint { id: Uuid::new_v4().to_string(), vector, text: summary, payload };
        self.store.upsert(&self.collection, vec![point]).await?;
        Ok(1)
    }

    async fn read(
        &self,
        scope_key: &str,
        query: Option<&str>,
        limit: usize,
    ) -> anyhow::Result<Vec<MemoryHit>> {
        let filter = SearchFilter::new().with("scope_key", scope_key);
        let vector = match query {
            Some(q) => Some(self.embed_one(q).await?),
            None => None,
        };
        let hits = self.store.search(&self.collection, vector.as_deref(), query, limit, &filter).await?;
        Ok(hits.into_iter().map(|h| MemoryHit { content: h.text, score: h.score }).collect())
    }

    // ── Writes ────────────────────────────────────────────────────────────

    pub async fn add_doc(&self, doc_id: &str, user_id: &str, messages: &[RoleMessage]) -> anyhow::Result<usize> {
        self.write(
            MemoryType::DocSession,
            &doc_scope(doc_id),
            user_id,
            serde_json::json!({ "doc_id": doc_id }),
            messages,
        )
        .await
    }

    pub async fn add_gen_chat(&self, gen_chat_id: &str, user_id: &str, messages: &[RoleMessage]) -> anyhow::Result<usize> {
        self.write(
            MemoryType::GenChatSession,
            &gen_chat_scope(gen_chat_id),
            user_id,
            serde_json::json!({ "gen_chat_id": gen_chat_id }),
            messages,
        )
        .await
    }

    pub async fn add_user(&self, user_id: &str, messages: &[RoleMessage]) -> anyhow::Result<usize> {
        self.write(MemoryType::UserPreference, &user_scope(user_id), user_id, serde_json::json!({}), messages)
            .await
    }

    pub async fn add_buyer(&self, user_id: &str, buyer_name: &str, messages: &[RoleMessage]) -> anyhow::Result<usize> {
        let scope = buyer_scope(user_id, buyer_name).map_err(anyhow::Error::from)?;
        self.write(
            MemoryType::BuyerMemo,
            &scope,
            user_id,
            serde_json::json!({ "buyer_name": buyer_name }),
            messages,
        )
        .await
    }

    // ── Reads ─────────────────────────────────────────────────────────────

    pub async fn get_doc(&self, doc_id: &str, query: Option<&str>, limit: usize) -> anyhow::Result<Vec<MemoryHit>> {
        self.read(&doc_scope(doc_id), query, limit).await
    }

    pub async fn get_gen_chat(&self, gen_chat_id: &str, query: Option<&str>, limit: usize) -> anyhow::Result<Vec<MemoryHit>> {
        self.read(&gen_chat_scope(gen_chat_id), query, limit).await
    }

    pub async fn get_user(&self, user_id: &str, query: Option<&str>, limit: usize) -> anyhow::Result<Vec<MemoryHit>> {
        self.read(&user_scope(user_id), query, limit).await
    }

    pub async fn get_buyer(
        &self,
        user_id: &str,
        buyer_name: &str,
        query: Option<&str>,
        limit: usize,
    ) -> Result<Vec<MemoryHit>, MemoryError> {
        let scope = buyer_scope(user_id, buyer_name)?;
        self.read(&scope, query, limit).await.map_err(MemoryError::Other)
    }

    // ── Deletes ───────────────────────────────────────────────────────────

    pub async fn delete_doc(&self, doc_id: &str) -> anyhow::Result<u64> {
        let filter = SearchFilter::new().with("scope_key", doc_scope(doc_id));
        self.store.delete(&self.collection, &filter).await
    }

    pub async fn delete_gen_chat(&self, gen_chat_id: &str) -> anyhow::Result<u64> {
        let filter = SearchFilter::new().with("scope_key", gen_chat_scope(gen_chat_id));
        self.store.delete(&self.collection, &filter).await
    }

    pub async fn delete_trade(&self, trade_id: &str, doc_ids: &[String]) -> TradeDeleteReport {
        let mut report = TradeDeleteReport { attempted: doc_ids.len(), succeeded: 0 };
        for doc_id in doc_ids {
            match self.delete_doc(doc_id).await {
                Ok(_) => report.succeeded += 1,
                Err(e) => warn!(trade_id, doc_id, error = %e, "delete_trade: failed to delete a document's memories"),
            }
        }
        report
    }

    // ── save_smart ────────────────────────────────────────────────────────

    /// Runs every enabled write in parallel and returns a per-scope success
    /// count. A gen-chat write runs whenever `gen_chat_id` is given — there
    /// is no corresponding flag since general-chat sessions always record
    /// their own history.
    #[allow(clippy::too_many_arguments)]
    pub async fn save_smart(
        &self,
        messages: &[RoleMessage],
        user_id: &str,
        doc_id: Option<&str>,
        gen_chat_id: Option<&str>,
        buyer_name: Option<&str>,
        flags: SaveFlags,
    ) -> SaveReport {
        let mut futures: Vec<std::pin::Pin<Box<dyn std::future::Future<Output = (&'static str, anyhow::Result<usize>)> + Send + '_>>> =
            Vec::new();

        if flags.save_doc {
            if let Some(doc_id) = doc_id {
                futures.push(Box::pin(async move { ("doc", self.add_doc(doc_id, user_id, messages).await) }));
            }
        }
        if let Some(gen_chat_id) = gen_chat_id {
            futures.push(Box::pin(async move { ("gen_chat", self.add_gen_chat(gen_chat_id, user_id, messages).await) }));
        }
        if flags.save_user {
            futures.push(Box::pin(async move { ("user", self.add_user(user_id, messages).await) }));
        }
        if flags.save_buyer {
            if let Some(buyer_name) = buyer_name {
                futures.push(Box::pin(async move { ("buyer", self.add_buyer(user_id, buyer_name, messages).await) }));
            }
        }

        let results = futures::future::join_all(futures).await;

        let mut report = SaveReport::default();
        for (scope, result) in results {
            let count = match result {
                Ok(n) => n,
                Err(e) => {
                    warn!(scope, error = %e, "save_smart: scoped write failed");
                    0
                }
            };
            match scope {
                "doc" => report.doc = count,
                "gen_chat" => report.gen_chat = count,
                "user" => report.user = count,
                "buyer" => report.buyer = count,
                _ => {}
            }
        }
        report
    }

    // ── Context builders ─────────────────────────────────────────────────

    pub async fn build_doc_context(
        &self,
        doc_id: &str,
        user_id: &str,
        query: &str,
        buyer_name: Option<&str>,
    ) -> DocContext {
        let doc_future = self.isolated_read(self.get_doc(doc_id, Some(query), CONTEXT_SEARCH_K), "doc");
        let user_future = self.isolated_read(self.get_user(user_id, Some(query), CONTEXT_SEARCH_K), "user");
        let buyer_future = async {
            match buyer_name {
                Some(name) => self
                    .isolated_read_result(self.get_buyer(user_id, name, Some(query), CONTEXT_SEARCH_K), "buyer")
                    .await,
                None => vec![],
            }
        };

        let (doc, user, buyer) = futures::join!(doc_future, user_future, buyer_future);

        let summary = format!("문서 이력 {}건, 사용자 선호 {}건, 거래처 메모 {}건", doc.len(), user.len(), buyer.len());
        DocContext { doc, user, buyer, summary }
    }

    pub async fn build_gen_chat_context(
        &self,
        gen_chat_id: &str,
        user_id: &str,
        query: &str,
        is_first_message: bool,
    ) -> GenChatContext {
        let chat_future = async {
            if is_first_message {
                vec![]
            } else {
                self.isolated_read(self.get_gen_chat(gen_chat_id, Some(query), CONTEXT_SEARCH_K), "gen_chat").await
            }
        };
        let user_future = self.isolated_read(self.get_user(user_id, Some(query), CONTEXT_SEARCH_K), "user");

        let (chat, user) = futures::join!(chat_future, user_future);

        let summary = format!("대화 이력 {}건, 사용자 선호 {}건", chat.len(), user.len());
        GenChatContext { chat, user, summary }
    }

    async fn isolated_read(
        &self,
        fut: impl std::future::Future<Output = anyhow::Result<Vec<MemoryHit>>>,
        scope: &str,
    ) -> Vec<MemoryHit> {
        match fut.await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(scope, error = %e, "context scope query failed, returning empty");
                vec![]
            }
        }
    }

    async fn isolated_read_result(
        &self,
        fut: impl std::future::Future<Output = Result<Vec<MemoryHit>, MemoryError>>,
        scope: &str,
    ) -> Vec<MemoryHit> {
        match fut.await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(scope, error = %e, "context scope query failed, returning empty");
                vec![]
            }
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite_store::SqliteVectorStore;
    use async_trait::async_trait;

    struct FakeEmbedder;

    #[async_trait]
    impl Embedder for FakeEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0, 0.0]).collect())
        }
        fn dimensions(&self) -> usize {
            3
        }
    }

    struct FakeSummarizer;

    #[async_trait]
    impl Summarizer for FakeSummarizer {
        async fn summarize(&self, memory_type: MemoryType, messages: &[RoleMessage]) -> anyhow::Result<Option<String>> {
            if messages.is_empty() {
                Ok(None)
            } else {
                Ok(Some(format!("{}: {} messages", memory_type.as_str(), messages.len())))
            }
        }
    }

    fn service() -> MemoryService {
        MemoryService::new(
            Arc::new(SqliteVectorStore::open_in_memory().unwrap()),
            Arc::new(FakeEmbedder),
            Arc::new(FakeSummarizer),
            "trade_memory".to_string(),
        )
    }

    #[tokio::test]
    async fn add_doc_then_get_doc_roundtrips() {
        let svc = service();
        let count = svc.add_doc("d1", "u1", &[RoleMessage::user("hello")]).await.unwrap();
        assert_eq!(count, 1);

        let hits = svc.get_doc("d1", None, 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].content.contains("doc_session"));
    }

    #[tokio::test]
    async fn add_doc_with_no_messages_writes_nothing() {
        let svc = service();
        let count = svc.add_doc("d1", "u1", &[]).await.unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn delete_doc_removes_only_that_scope() {
        let svc = service();
        svc.add_doc("d1", "u1", &[RoleMessage::user("hi")]).await.unwrap();
        svc.add_doc("d2", "u1", &[RoleMessage::user("hi")]).await.unwrap();

        let deleted = svc.delete_doc("d1").await.unwrap();
        assert_eq!(deleted, 1);
        assert!(svc.get_doc("d1", None, 5).await.unwrap().is_empty());
        assert_eq!(svc.get_doc("d2", None, 5).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn get_buyer_rejects_unnormalizable_name() {
        let svc = service();
        let err = svc.get_buyer("u1", "!!!", None, 5).await.unwrap_err();
        assert!(matches!(err, MemoryError::EmptyBuyerNorm));
    }

    #[tokio::test]
    async fn save_smart_runs_enabled_scopes_and_reports_counts() {
        let svc = service();
        let flags = SaveFlags { save_doc: true, save_user: true, save_buyer: false };
        let report = svc
            .save_smart(&[RoleMessage::user("hi")], "u1", Some("d1"), Some("c1"), None, flags)
            .await;

        assert_eq!(report.doc, 1);
        assert_eq!(report.gen_chat, 1, "gen_chat writes whenever gen_chat_id is given");
        assert_eq!(report.user, 1);
        assert_eq!(report.buyer, 0);
    }

    #[tokio::test]
    async fn save_smart_skips_doc_when_flag_disabled() {
        let svc = service();
        let flags = SaveFlags::default();
        let report = svc.save_smart(&[RoleMessage::user("hi")], "u1", Some("d1"), None, None, flags).await;
        assert_eq!(report.doc, 0);
        assert_eq!(report.gen_chat, 0);
    }

    #[tokio::test]
    async fn build_doc_context_reports_counts_in_summary() {
        let svc = service();
        svc.add_doc("d1", "u1", &[RoleMessage::user("edited incoterms")]).await.unwrap();
        svc.add_user("u1", &[RoleMessage::user("always uses FOB")]).await.unwrap();

        let ctx = svc.build_doc_context("d1", "u1", "incoterms", None).await;
        assert_eq!(ctx.doc.len(), 1);
        assert_eq!(ctx.user.len(), 1);
        assert!(ctx.buyer.is_empty());
        assert!(ctx.summary.contains('1'));
    }

    #[tokio::test]
    async fn build_gen_chat_context_skips_chat_search_on_first_message() {
        let svc = service();
        svc.add_gen_chat("c1", "u1", &[RoleMessage::user("hi")]).await.unwrap();

        let ctx = svc.build_gen_chat_context("c1", "u1", "hi again", true).await;
        assert!(ctx.chat.is_empty(), "first message must skip chat-scope search entirely");
    }

    #[tokio::test]
    async fn build_gen_chat_context_searches_chat_when_not_first_message() {
        let svc = service();
        svc.add_gen_chat("c1", "u1", &[RoleMessage::user("hi")]).await.unwrap();

        let ctx = svc.build_gen_chat_context("c1", "u1", "hi", false).await;
        assert_eq!(ctx.chat.len(), 1);
    }

    #[tokio::test]
    async fn delete_trade_reports_partial_success() {
        let svc = service();
        svc.add_doc("d1", "u1", &[RoleMessage::user("hi")]).await.unwrap();

        let report = svc.delete_trade("t1", &["d1".to_string(), "d2".to_string()]).await;
        assert_eq!(report.attempted, 2);
        assert_eq!(report.succeeded, 2, "deleting a scope with no items is still a success, just 0 rows");
    }
}

// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! `search_user_document` — similarity search scoped to a single uploaded
//! document, used by the document-reading agent.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::warn;

use crate::search::VectorSearch;
use crate::tool::{passages_to_content, Passage, Tool, ToolCall, ToolOutput};

const DEFAULT_LIMIT: usize = 5;

pub struct SearchUserDocumentTool {
    pub store: Arc<dyn VectorSearch>,
    pub collection: String,
    /// The document this agent instance is scoped to. Fixed at agent
    /// construction time rather than taken from model arguments, since a
    /// document-reading agent is always bound to the document the chat
    /// request names.
    pub doc_id: String,
}

#[async_trait]
impl Tool for SearchUserDocumentTool {
    fn name(&self) -> &str {
        "search_user_document"
    }

    fn description(&self) -> &str {
        "Similarity search scoped to the document the user is currently \
         viewing. Returns passages with their source."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Natural-language query"
                }
            },
            "required": ["query"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let query = match call.args.get("query").and_then(|v| v.as_str()) {
            Some(q) if !q.trim().is_empty() => q.trim().to_string(),
            _ => return ToolOutput::err(&call.id, "missing or empty 'query'"),
        };

        match self
            .store
            .search(&self.collection, &query, Some(&self.doc_id), DEFAULT_LIMIT)
            .await
        {
            Ok(passages) => ToolOutput::ok(&call.id, passages_to_content(&passages)),
            Err(e) => {
                warn!(error = %e, doc_id = %self.doc_id, "search_user_document backend failed");
                let warning = vec![Passage {
                    text: format!("document search unavailable: {e}"),
                    source: "search_user_document".into(),
                    score: None,
                }];
                ToolOutput::ok(&call.id, passages_to_content(&warning))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RecordingStore {
        last_doc_id: std::sync::Mutex<Option<String>>,
    }

    #[async_trait]
    impl VectorSearch for RecordingStore {
        async fn search(
            &self,
            _collection: &str,
            _query: &str,
            doc_id: Option<&str>,
            _limit: usize,
        ) -> anyhow::Result<Vec<Passage>> {
            *self.last_doc_id.lock().unwrap() = doc_id.map(|s| s.to_string());
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn scopes_search_to_configured_doc_id() {
        let store = Arc::new(RecordingStore { last_doc_id: std::sync::Mutex::new(None) });
        let t = SearchUserDocumentTool {
            store: store.clone(),
            collection: "user_documents".into(),
            doc_id: "doc-42".into(),
        };
        let call = ToolCall { id: "1".into(), name: "search_user_document".into(), args: json!({ "query": "payment terms" }) };
        let out = t.execute(&call).await;
        assert!(!out.is_error);
        assert_eq!(store.last_doc_id.lock().unwrap().as_deref(), Some("doc-42"));
    }

    #[tokio::test]
    async fn missing_query_is_error() {
        let store = Arc::new(RecordingStore { last_doc_id: std::sync::Mutex::new(None) });
        let t = SearchUserDocumentTool { store, collection: "user_documents".into(), doc_id: "doc-1".into() };
        let call = ToolCall { id: "1".into(), name: "search_user_document".into(), args: json!({}) };
        let out = t.execute(&call).await;
        assert!(out.is_error);
    }
}

// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! `search_trade_documents` — similarity search over the shared trade
//! knowledge base (regulations, incoterms, sample contracts, …).

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::warn;

use crate::search::VectorSearch;
use crate::tool::{passages_to_content, Passage, Tool, ToolCall, ToolOutput};

const DEFAULT_LIMIT: usize = 5;

pub struct SearchTradeDocumentsTool {
    pub store: Arc<dyn VectorSearch>,
    pub collection: String,
}

#[async_trait]
impl Tool for SearchTradeDocumentsTool {
    fn name(&self) -> &str {
        "search_trade_documents"
    }

    fn description(&self) -> &str {
        "Similarity search over the shared trade knowledge base \
         (regulations, incoterms, sample contracts, prior guidance). \
         Returns passages with their source."
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
            .search(&self.collection, &query, None, DEFAULT_LIMIT)
            .await
        {
            Ok(passages) => ToolOutput::ok(&call.id, passages_to_content(&passages)),
            Err(e) => {
                warn!(error = %e, "search_trade_documents backend failed");
                let warning = vec![Passage {
                    text: format!("knowledge search unavailable: {e}"),
                    source: "search_trade_documents".into(),
                    score: None,
                }];
                ToolOutput::ok(&call.id, passages_to_content(&warning))
            }
        }
    }
}

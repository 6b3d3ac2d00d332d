// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! `search_web` — external web-search provider (Brave Search).

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::tool::{passages_to_content, Passage, Tool, ToolCall, ToolOutput};

const DEFAULT_COUNT: usize = 5;

#[derive(Default)]
pub struct SearchWebTool {
    /// Optional API key override (falls back to env BRAVE_API_KEY)
    pub api_key: Option<String>,
}

#[async_trait]
impl Tool for SearchWebTool {
    fn name(&self) -> &str {
        "search_web"
    }

    fn description(&self) -> &str {
        "Real-time web search. Requires BRAVE_API_KEY to be configured. \
         Returns passages with their source URL."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search query"
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

        debug!(query = %query, "search_web tool");

        let api_key = self
            .api_key
            .clone()
            .or_else(|| std::env::var("BRAVE_API_KEY").ok());

        let Some(api_key) = api_key else {
            let warning = vec![Passage {
                text: "web search unavailable: no Brave Search API key configured".into(),
                source: "search_web".into(),
                score: None,
            }];
            return ToolOutput::ok(&call.id, passages_to_content(&warning));
        };

        match brave_search(&query, DEFAULT_COUNT, &api_key).await {
            Ok(passages) => ToolOutput::ok(&call.id, passages_to_content(&passages)),
            Err(e) => {
                warn!(error = %e, "search_web backend failed");
                let warning = vec![Passage {
                    text: format!("web search unavailable: {e}"),
                    source: "search_web".into(),
                    score: None,
                }];
                ToolOutput::ok(&call.id, passages_to_content(&warning))
            }
        }
    }
}

async fn brave_search(query: &str, count: usize, api_key: &str) -> anyhow::Result<Vec<Passage>> {
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(15))
        .user_agent("trade-gateway/1.0")
        .build()?;

    let url = format!(
        "https://api.search.brave.com/res/v1/web/search?q={}&count={}",
        urlencoding(query),
        count
    );

    let resp = client
        .get(&url)
        .header("Accept", "application/json")
        .header("Accept-Encoding", "gzip")
        .header("X-Subscription-Token", api_key)
        .send()
        .await?;

    if !resp.status().is_success() {
        anyhow::bail!("Brave API returned status {}", resp.status());
    }

    let json: Value = resp.json().await?;

    let results = json
        .get("web")
        .and_then(|w| w.get("results"))
        .and_then(|r| r.as_array())
        .map(|arr| arr.as_slice())
        .unwrap_or(&[]);

    Ok(results
        .iter()
        .take(count)
        .map(|r| Passage {
            text: format!(
                "{}\n{}",
                r.get("title").and_then(|v| v.as_str()).unwrap_or("(no title)"),
                r.get("description").and_then(|v| v.as_str()).unwrap_or(""),
            ),
            source: r.get("url").and_then(|v| v.as_str()).unwrap_or("").to_string(),
            score: None,
        })
        .collect())
}

fn urlencoding(s: &str) -> String {
    let mut encoded = String::new();
    for c in s.chars() {
        match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '-' | '_' | '.' | '~' => encoded.push(c),
            ' ' => encoded.push('+'),
            c => {
                for byte in c.to_string().as_bytes() {
                    encoded.push_str(&format!("%{:02X}", byte));
                }
            }
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_requires_query() {
        let t = SearchWebTool::default();
        let schema = t.parameters_schema();
        let required = schema["required"].as_array().unwrap();
        assert!(required.iter().any(|v| v.as_str() == Some("query")));
    }

    #[tokio::test]
    async fn missing_api_key_degrades_to_warning_passage_not_error() {
        std::env::remove_var("BRAVE_API_KEY");

        let t = SearchWebTool { api_key: None };
        let call = ToolCall { id: "1".into(), name: "search_web".into(), args: json!({"query": "test"}) };
        let out = t.execute(&call).await;
        assert!(!out.is_error, "missing api key must not abort the turn");
        assert!(out.content.contains("unavailable"));
    }

    #[tokio::test]
    async fn missing_query_is_error() {
        let t = SearchWebTool::default();
        let call = ToolCall { id: "1".into(), name: "search_web".into(), args: json!({}) };
        let out = t.execute(&call).await;
        assert!(out.is_error);
    }
}

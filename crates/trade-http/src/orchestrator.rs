// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Chat Orchestrator (C8): the per-request pipeline from history load
//! through SSE relay, edit extraction, persistence and memory write-back.
//! One task owns the channel end-to-end — no per-frame thread handoff.

use std::pin::Pin;
use std::sync::Arc;
use std::sync::OnceLock;

use futures::{Stream, StreamExt};
use regex::Regex;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::warn;

use trade_core::{RunnerEvent, RunnerInput};
use trade_memory::{RoleMessage, SaveFlags};
use trade_model::Message;

use crate::buyer::extract_buyer_name;
use crate::edit::parse_edit_response;
use crate::sse::{tool_info, AgentInfo, Frame};
use crate::state::AppState;
use crate::store::HistoryMessage;

const HISTORY_LIMIT: usize = 10;
const HISTORY_PREVIEW_TURNS: usize = 3;
const HISTORY_PREVIEW_CLIP: usize = 100;
const SIBLING_CLIP: usize = 2000;
const EDITOR_BODY_CLIP: usize = 2000;
const LONG_MEMORY_WINDOW: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    Trade,
    DocumentWrite,
    DocumentRead,
}

#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub message: String,
    pub user_id: Option<String>,
    pub gen_chat_id: Option<String>,
    pub doc_id: Option<String>,
    pub document_content: Option<String>,
    pub document_name: Option<String>,
    pub document_type: Option<String>,
}

pub type FrameStream = Pin<Box<dyn Stream<Item = Frame> + Send>>;

pub fn stream_chat(state: AppState, kind: ChatKind, req: ChatRequest) -> FrameStream {
    let (tx, rx) = mpsc::channel(64);
    tokio::spawn(drive(state, kind, req, tx));
    Box::pin(ReceiverStream::new(rx))
}

fn tag_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").unwrap())
}

fn strip_html(html: &str) -> String {
    tag_pattern().replace_all(html, " ").split_whitespace().collect::<Vec<_>>().join(" ")
}

fn clip(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        text.chars().take(max).collect()
    }
}

async fn drive(state: AppState, kind: ChatKind, req: ChatRequest, tx: mpsc::Sender<Frame>) {
    if req.message.trim().is_empty() {
        let _ = tx.send(Frame::Error { error: "message is required".into() }).await;
        return;
    }
    if matches!(kind, ChatKind::DocumentWrite | ChatKind::DocumentRead) && req.doc_id.is_none() {
        let _ = tx.send(Frame::Error { error: "doc_id is required".into() }).await;
        return;
    }

    let user_id = req.user_id.clone().unwrap_or_else(|| "anonymous".to_string());

    // ── Step 1/2: resolve session & document ────────────────────────────
    let document = if let Some(doc_id) = &req.doc_id {
        match state.relational.get_document(doc_id).await {
            Ok(Some(d)) => Some(d),
            Ok(None) => {
                let _ = tx.send(Frame::Error { error: format!("document not found: {doc_id}") }).await;
                return;
            }
            Err(e) => {
                let _ = tx.send(Frame::Error { error: e.to_string() }).await;
                return;
            }
        }
    } else {
        None
    };

    let (gen_chat_id, is_first_message) = if kind == ChatKind::Trade {
        match state.relational.resolve_gen_chat(req.gen_chat_id.as_deref(), &user_id).await {
            Ok(v) => (Some(v.0), v.1),
            Err(e) => {
                let _ = tx.send(Frame::Error { error: e.to_string() }).await;
                return;
            }
        }
    } else {
        (None, false)
    };

    // ── Step 3: persist user turn ────────────────────────────────────────
    let persist_result = if let Some(doc_id) = &req.doc_id {
        state.relational.insert_doc_message(doc_id, "user", &req.message, &serde_json::json!({})).await
    } else {
        state.relational.insert_gen_message(gen_chat_id.as_deref().unwrap_or_default(), "user", &req.message, &serde_json::json!({})).await
    };
    let user_message_id = match persist_result {
        Ok(id) => id,
        Err(e) => {
            let _ = tx.send(Frame::Error { error: e.to_string() }).await;
            return;
        }
    };

    // ── Step 4: load history, excluding the user turn just persisted above ─
    let history_rows: Vec<HistoryMessage> = if let Some(doc_id) = &req.doc_id {
        state.relational.load_doc_history(doc_id, HISTORY_LIMIT, Some(&user_message_id)).await.unwrap_or_default()
    } else {
        state.relational.load_gen_history(gen_chat_id.as_deref().unwrap_or_default(), HISTORY_LIMIT, Some(&user_message_id)).await.unwrap_or_default()
    };
    let history_messages: Vec<Message> = history_rows
        .iter()
        .map(|m| if m.role == "agent" { Message::assistant(m.content.clone()) } else { Message::user(m.content.clone()) })
        .collect();

    // ── Step 5: emit init ─────────────────────────────────────────────────
    let init = Frame::Init { doc_id: req.doc_id.clone(), trade_id: document.as_ref().map(|d| d.trade_id.clone()), gen_chat_id: gen_chat_id.clone() };
    if tx.send(init).await.is_err() {
        return;
    }

    // ── Step 6: assemble context ─────────────────────────────────────────
    let mut augmented = String::new();
    let mut buyer_name: Option<String> = None;

    if let Some(doc) = &document {
        let ctx = state.memory.build_doc_context(&doc.doc_id, &user_id, &req.message, None).await;
        let _ = tx.send(Frame::Context { summary: ctx.summary.clone() }).await;

        if !ctx.user.is_empty() {
            let body = ctx.user.iter().map(|h| h.content.as_str()).collect::<Vec<_>>().join("\n");
            augmented.push_str(&format!("[사용자 이전 기록]\n{body}\n\n"));
        }

        match state.relational.sibling_document_html(&doc.trade_id, &doc.doc_id).await {
            Ok(siblings) => {
                for (sibling_id, html) in siblings {
                    let text = clip(&strip_html(&html), SIBLING_CLIP);
                    augmented.push_str(&format!("[이전 step 문서 내용 - 참조용: {sibling_id}]\n{text}\n\n"));
                }
            }
            Err(e) => warn!(error = %e, "sibling document lookup failed, continuing without it"),
        }

        if let Some(content) = &req.document_content {
            let text = clip(&strip_html(content), EDITOR_BODY_CLIP);
            augmented.push_str(&format!("[현재 편집 중인 문서 내용]\n{text}\n\n"));
        }

        if let Some(html) = state.relational.latest_document_html(&doc.doc_id).await.ok().flatten() {
            buyer_name = extract_buyer_name(&html);
        }
    } else {
        let ctx = state.memory.build_gen_chat_context(gen_chat_id.as_deref().unwrap_or_default(), &user_id, &req.message, is_first_message).await;
        let _ = tx.send(Frame::Context { summary: ctx.summary.clone() }).await;
        if !ctx.user.is_empty() {
            let body = ctx.user.iter().map(|h| h.content.as_str()).collect::<Vec<_>>().join("\n");
            augmented.push_str(&format!("[사용자 이전 기록]\n{body}\n\n"));
        }
    }

    if !history_rows.is_empty() {
        let preview = history_rows
            .iter()
            .rev()
            .take(HISTORY_PREVIEW_TURNS)
            .map(|m| clip(&m.content, HISTORY_PREVIEW_CLIP))
            .collect::<Vec<_>>()
            .join(" / ");
        augmented.push_str(&format!("[최근 대화]\n{preview}\n\n"));
    }

    augmented.push_str(&req.message);

    // ── Step 7: select agent ─────────────────────────────────────────────
    let use_reading_agent = matches!(document.as_ref(), Some(d) if d.doc_mode == "upload" && d.upload_status == "ready");

    let agent_result = if let Some(doc) = &document {
        if use_reading_agent {
            state
                .agent_factory
                .document_reading_assistant(&doc.doc_id, req.document_name.as_deref().unwrap_or("document"), req.document_type.as_deref().unwrap_or("unknown"))
                .await
        } else {
            state.agent_factory.document_writing_assistant(req.document_content.as_deref().unwrap_or("")).await
        }
    } else {
        state.agent_factory.trade_assistant().await
    };

    let agent = match agent_result {
        Ok(a) => Arc::new(a),
        Err(e) => {
            let _ = tx.send(Frame::Error { error: e.to_string() }).await;
            return;
        }
    };

    let doc_mode = document.as_ref().map(|d| d.doc_mode.clone()).unwrap_or_else(|| "none".into());
    let agent_info = Frame::AgentInfo {
        agent: AgentInfo { name: agent.name.clone(), model: agent.model_id.clone(), doc_mode, tools: agent.tools.names() },
    };
    if tx.send(agent_info).await.is_err() {
        return;
    }

    // ── Step 8: invoke runner ────────────────────────────────────────────
    let input = if history_messages.is_empty() {
        RunnerInput::Message(augmented)
    } else {
        RunnerInput::WithHistory { history: history_messages, message: augmented }
    };
    let mut events = trade_core::run_streamed(state.model.clone(), agent.clone(), input);

    // ── Step 9: relay ─────────────────────────────────────────────────────
    let mut full_response = String::new();
    let mut tools_used: Vec<String> = Vec::new();
    let mut errored = false;

    while let Some(event) = events.next().await {
        match event {
            Ok(RunnerEvent::TokenDelta { text }) => {
                full_response.push_str(&text);
                if tx.send(Frame::Text { content: text }).await.is_err() {
                    return;
                }
            }
            Ok(RunnerEvent::ToolCall { name }) => {
                tools_used.push(name.clone());
                if tx.send(Frame::Tool { tool: tool_info(&name) }).await.is_err() {
                    return;
                }
            }
            Ok(RunnerEvent::FinalText { text }) => {
                full_response = text;
            }
            Err(e) => {
                errored = true;
                let _ = tx.send(Frame::Error { error: e.to_string() }).await;
                break;
            }
        }
    }

    // ── Step 10/11: edit extraction, persist assistant turn ──────────────
    let mut edit_changes = Vec::new();
    if !errored {
        if let Some(edit) = parse_edit_response(&full_response) {
            edit_changes = edit.changes.clone();
            if tx.send(Frame::Edit { message: edit.message, changes: edit.changes }).await.is_err() {
                return;
            }
        }
        if tx.send(Frame::Done { tools_used: tools_used.clone() }).await.is_err() {
            return;
        }
    }

    if errored && full_response.is_empty() {
        return;
    }

    let metadata = serde_json::json!({
        "tools_used": tools_used,
        "is_edit": !edit_changes.is_empty(),
        "changes": edit_changes,
    });
    let persisted = if let Some(doc_id) = &req.doc_id {
        state.relational.insert_doc_message(doc_id, "agent", &full_response, &metadata).await
    } else {
        state.relational.insert_gen_message(gen_chat_id.as_deref().unwrap_or_default(), "agent", &full_response, &metadata).await
    };
    if let Err(e) = persisted {
        warn!(error = %e, "failed to persist assistant turn");
    }
    if errored {
        return;
    }

    // ── Step 12: write memories (best-effort, after done) ────────────────
    let roles = vec![RoleMessage::user(req.message.clone()), RoleMessage::assistant(full_response.clone())];
    let flags = SaveFlags { save_doc: document.is_some(), save_user: true, save_buyer: buyer_name.is_some() };
    let _report = state
        .memory
        .save_smart(&roles, &user_id, req.doc_id.as_deref(), gen_chat_id.as_deref(), buyer_name.as_deref(), flags)
        .await;

    let turn_count = match (&req.doc_id, &gen_chat_id) {
        (Some(doc_id), _) => state.relational.count_doc_messages(doc_id).await.unwrap_or(0) / 2,
        (_, Some(id)) => state.relational.count_gen_messages(id).await.unwrap_or(0) / 2,
        _ => 0,
    };
    if turn_count > 0 && turn_count % 10 == 0 {
        let window = if let Some(doc_id) = &req.doc_id {
            state.relational.load_doc_history(doc_id, LONG_MEMORY_WINDOW, None).await.unwrap_or_default()
        } else {
            state.relational.load_gen_history(gen_chat_id.as_deref().unwrap_or_default(), LONG_MEMORY_WINDOW, None).await.unwrap_or_default()
        };
        let long_roles: Vec<RoleMessage> = window
            .iter()
            .map(|m| if m.role == "agent" { RoleMessage::assistant(m.content.clone()) } else { RoleMessage::user(m.content.clone()) })
            .collect();
        if let Err(e) = state.memory.add_user(&user_id, &long_roles).await {
            warn!(error = %e, "long-term tier user memory write failed");
        }
        if let Some(name) = &buyer_name {
            if let Err(e) = state.memory.add_buyer(&user_id, name, &long_roles).await {
                warn!(error = %e, "long-term tier buyer memory write failed");
            }
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_counts_chars_not_bytes() {
        let s = "안녕하세요 world";
        let clipped = clip(s, 3);
        assert_eq!(clipped.chars().count(), 3);
    }

    #[test]
    fn strip_html_collapses_tags_and_whitespace() {
        let html = "<p>Hello</p>\n<p>World</p>";
        assert_eq!(strip_html(html), "Hello World");
    }
}

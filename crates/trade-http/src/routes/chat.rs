// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures::{Stream, StreamExt};
use serde::Deserialize;

use crate::orchestrator::{stream_chat, ChatKind, ChatRequest};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TradeChatBody {
    pub message: String,
    pub user_id: Option<String>,
    pub gen_chat_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DocumentWriteChatBody {
    pub doc_id: String,
    pub message: String,
    pub user_id: Option<String>,
    pub document_content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DocumentReadChatBody {
    pub doc_id: String,
    pub message: String,
    pub user_id: Option<String>,
    pub document_name: Option<String>,
    pub document_type: Option<String>,
}

fn sse_response(stream: impl Stream<Item = crate::sse::Frame> + Send + 'static) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events = stream.map(|frame| Ok(Event::default().data(frame.to_json())));
    Sse::new(events).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

pub async fn trade_chat_stream(State(state): State<AppState>, Json(body): Json<TradeChatBody>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let req = ChatRequest { message: body.message, user_id: body.user_id, gen_chat_id: body.gen_chat_id, ..Default::default() };
    sse_response(stream_chat(state, ChatKind::Trade, req))
}

pub async fn document_write_chat_stream(
    State(state): State<AppState>,
    Json(body): Json<DocumentWriteChatBody>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let req = ChatRequest {
        message: body.message,
        user_id: body.user_id,
        doc_id: Some(body.doc_id),
        document_content: body.document_content,
        ..Default::default()
    };
    sse_response(stream_chat(state, ChatKind::DocumentWrite, req))
}

pub async fn document_read_chat_stream(
    State(state): State<AppState>,
    Json(body): Json<DocumentReadChatBody>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let req = ChatRequest {
        message: body.message,
        user_id: body.user_id,
        doc_id: Some(body.doc_id),
        document_name: body.document_name,
        document_type: body.document_type,
        ..Default::default()
    };
    sse_response(stream_chat(state, ChatKind::DocumentRead, req))
}

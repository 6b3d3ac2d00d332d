// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use trade_memory::{MemoryHit, RoleMessage, SaveFlags};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MemorySearchBody {
    pub query: String,
    pub user_id: Option<String>,
    pub doc_id: Option<String>,
    pub buyer_name: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    5
}

#[derive(Debug, Serialize)]
pub struct MemorySearchResponse {
    pub memories: Vec<MemoryHit>,
    pub count: usize,
}

pub async fn memory_search(State(state): State<AppState>, Json(body): Json<MemorySearchBody>) -> Result<Json<MemorySearchResponse>, ApiError> {
    let mut memories = Vec::new();

    if let Some(doc_id) = &body.doc_id {
        memories.extend(state.memory.get_doc(doc_id, Some(&body.query), body.limit).await?);
    }
    if let Some(user_id) = &body.user_id {
        memories.extend(state.memory.get_user(user_id, Some(&body.query), body.limit).await?);
        if let Some(buyer) = &body.buyer_name {
            if let Ok(hits) = state.memory.get_buyer(user_id, buyer, Some(&body.query), body.limit).await {
                memories.extend(hits);
            }
        }
    }

    let count = memories.len();
    Ok(Json(MemorySearchResponse { memories, count }))
}

#[derive(Debug, Deserialize)]
pub struct MemorySaveBody {
    pub messages: Vec<RoleMessageBody>,
    pub user_id: String,
    pub doc_id: Option<String>,
    pub gen_chat_id: Option<String>,
    pub buyer_name: Option<String>,
    #[serde(default)]
    pub save_user: bool,
    #[serde(default)]
    pub save_doc: bool,
    #[serde(default)]
    pub save_buyer: bool,
}

#[derive(Debug, Deserialize)]
pub struct RoleMessageBody {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct MemorySaveResponse {
    pub success: bool,
    pub saved_count: usize,
    pub user: usize,
    pub doc: usize,
    pub buyer: usize,
}

pub async fn memory_save(State(state): State<AppState>, Json(body): Json<MemorySaveBody>) -> Json<MemorySaveResponse> {
    let roles: Vec<RoleMessage> = body.messages.into_iter().map(|m| RoleMessage { role: m.role, content: m.content }).collect();
    let flags = SaveFlags { save_doc: body.save_doc, save_user: body.save_user, save_buyer: body.save_buyer };
    let report = state
        .memory
        .save_smart(&roles, &body.user_id, body.doc_id.as_deref(), body.gen_chat_id.as_deref(), body.buyer_name.as_deref(), flags)
        .await;

    let saved_count = report.doc + report.gen_chat + report.user + report.buyer;
    Json(MemorySaveResponse { success: true, saved_count, user: report.user, doc: report.doc, buyer: report.buyer })
}

#[derive(Debug, Deserialize)]
pub struct MemoryContextBody {
    pub doc_id: String,
    pub user_id: String,
    pub query: String,
}

pub async fn memory_context(State(state): State<AppState>, Json(body): Json<MemoryContextBody>) -> Json<trade_memory::DocContext> {
    let ctx = state.memory.build_doc_context(&body.doc_id, &body.user_id, &body.query, None).await;
    Json(ctx)
}

#[derive(Debug, Deserialize)]
pub struct MemoryDeleteBody {
    pub trade_id: String,
    pub doc_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct MemoryDeleteResponse {
    pub success: bool,
    pub deleted_count: usize,
}

pub async fn memory_delete(State(state): State<AppState>, Json(body): Json<MemoryDeleteBody>) -> Json<MemoryDeleteResponse> {
    let report = state.memory.delete_trade(&body.trade_id, &body.doc_ids).await;
    Json(MemoryDeleteResponse { success: true, deleted_count: report.succeeded })
}

#[derive(Debug, Deserialize)]
pub struct MemoryDeleteGenChatBody {
    pub gen_chat_id: String,
}

pub async fn memory_delete_gen_chat(State(state): State<AppState>, Json(body): Json<MemoryDeleteGenChatBody>) -> Result<Json<MemoryDeleteResponse>, ApiError> {
    let deleted = state.memory.delete_gen_chat(&body.gen_chat_id).await?;
    Ok(Json(MemoryDeleteResponse { success: true, deleted_count: deleted as usize }))
}

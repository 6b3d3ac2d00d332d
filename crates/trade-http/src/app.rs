// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Router assembly (C9). All streaming endpoints additionally carry the
//! `Cache-Control`/`X-Accel-Buffering` headers SSE proxies expect.

use axum::http::{HeaderName, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::routes::{chat, health, ingest, memory};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let sse_headers = tower::ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::overriding(axum::http::header::CACHE_CONTROL, HeaderValue::from_static("no-cache")))
        .layer(SetResponseHeaderLayer::overriding(HeaderName::from_static("x-accel-buffering"), HeaderValue::from_static("no")));

    let chat_routes = Router::new()
        .route("/api/trade/chat/stream", post(chat::trade_chat_stream))
        .route("/api/document/write/chat/stream", post(chat::document_write_chat_stream))
        .route("/api/document/read/chat/stream", post(chat::document_read_chat_stream))
        .layer(sse_headers);

    let memory_routes = Router::new()
        .route("/api/memory/search", post(memory::memory_search))
        .route("/api/memory/save", post(memory::memory_save))
        .route("/api/memory/context", post(memory::memory_context))
        .route("/api/memory/delete", post(memory::memory_delete))
        .route("/api/memory/delete/gen-chat", post(memory::memory_delete_gen_chat));

    let ingest_routes = Router::new().route("/api/ingest/document", post(ingest::ingest_document).delete(ingest::delete_ingest_document));

    let cors = CorsLayer::new().allow_origin(Any).allow_methods([Method::GET, Method::POST, Method::DELETE]);

    Router::new()
        .route("/health", get(health::health))
        .merge(chat_routes)
        .merge(memory_routes)
        .merge(ingest_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

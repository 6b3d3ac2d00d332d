// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct IngestDocumentBody {
    pub doc_id: String,
    pub s3_key: String,
    pub collection_name: String,
}

#[derive(Debug, Serialize)]
pub struct IngestDocumentResponse {
    pub success: bool,
    pub doc_id: String,
    pub chunks_count: usize,
    pub collection: String,
}

pub async fn ingest_document(State(state): State<AppState>, Json(body): Json<IngestDocumentBody>) -> Result<Json<IngestDocumentResponse>, ApiError> {
    let ingest = state.ingest.as_ref().ok_or_else(|| ApiError::Validation("object store is not configured".into()))?;

    let result = ingest
        .ingest(&body.doc_id, &body.s3_key, &body.collection_name)
        .await
        .map_err(|e| ApiError::Upstream(e.into()))?;

    Ok(Json(IngestDocumentResponse { success: true, doc_id: body.doc_id, chunks_count: result.chunks_count, collection: body.collection_name }))
}

#[derive(Debug, Deserialize)]
pub struct DeleteIngestDocumentBody {
    pub doc_id: String,
    pub collection_name: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteIngestDocumentResponse {
    pub success: bool,
    pub doc_id: String,
    pub deleted_count: u64,
}

pub async fn delete_ingest_document(
    State(state): State<AppState>,
    Json(body): Json<DeleteIngestDocumentBody>,
) -> Result<Json<DeleteIngestDocumentResponse>, ApiError> {
    let ingest = state.ingest.as_ref().ok_or_else(|| ApiError::Validation("object store is not configured".into()))?;
    let deleted_count = ingest.delete_document(&body.doc_id, &body.collection_name).await?;
    Ok(Json(DeleteIngestDocumentResponse { success: true, doc_id: body.doc_id, deleted_count }))
}

// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! SQLite-backed hybrid vector + BM25 implementation of [`VectorStoreAdapter`].
//!
//! Vectors are stored as little-endian `f32` blobs and ranked with an
//! in-process cosine similarity pass; FTS5 supplies the lexical half of the
//! hybrid score. The store is small enough (chat memory and document
//! chunks, not a general-purpose vector database) that a single
//! mutex-guarded connection and a linear scan per collection are adequate —
//! there's no connection pool here.

use std::sync::Mutex;

use async_trait::async_trait;
use rusqlite::Connection;
use serde_json::Value;

use crate::store::{DistanceMetric, SearchFilter, SearchHit, VectorPoint, VectorStoreAdapter};

pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
}

impl SqliteVectorStore {
    pub fn open(path: &str) -> anyhow::Result<Self> {
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn init_schema(conn: &Connection) -> anyhow::Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS collections (
                name   TEXT PRIMARY KEY,
                dim    INTEGER NOT NULL,
                metric TEXT NOT NULL
             );
             CREATE TABLE IF NOT EXISTS points (
                rowid      INTEGER PRIMARY KEY AUTOINCREMENT,
                id         TEXT NOT NULL UNIQUE,
                collection TEXT NOT NULL,
                vector     BLOB NOT NULL,
                text       TEXT NOT NULL,
                payload    TEXT NOT NULL
             );
             CREATE INDEX IF NOT EXISTS idx_points_collection ON points(collection);
             CREATE VIRTUAL TABLE IF NOT EXISTS points_fts USING fts5(
                id UNINDEXED, collection UNINDEXED, text
             );",
        )?;
        Ok(())
    }
}

fn encode_vector(v: &[f32]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(v.len() * 4);
    for f in v {
        buf.extend_from_slice(&f.to_le_bytes());
    }
    buf
}

fn decode_vector(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

struct Row {
    rowid: i64,
    id: String,
    vector: Vec<f32>,
    text: String,
    payload: Value,
}

#[async_trait]
impl VectorStoreAdapter for SqliteVectorStore {
    async fn ensure_collection(&self, name: &str, dim: usize, metric: DistanceMetric) -> anyhow::Result<()> {
        let metric_str = match metric {
            DistanceMetric::Cosine => "cosine",
        };
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO collections (name, dim, metric) VALUES (?1, ?2, ?3)
             ON CONFLICT(name) DO UPDATE SET dim = excluded.dim, metric = excluded.metric",
            rusqlite::params![name, dim as i64, metric_str],
        )?;
        Ok(())
    }

    async fn upsert(&self, collection: &str, points: Vec<VectorPoint>) -> anyhow::Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        for point in &points {
            tx.execute(
                "INSERT INTO points (id, collection, vector, text, payload) VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                    vector = excluded.vector, text = excluded.text, payload = excluded.payload",
                rusqlite::params![
                    point.id,
                    collection,
                    encode_vector(&point.vector),
                    point.text,
                    serde_json::to_string(&point.payload)?,
                ],
            )?;
            tx.execute("DELETE FROM points_fts WHERE id = ?1", rusqlite::params![point.id])?;
            tx.execute(
                "INSERT INTO points_fts (id, collection, text) VALUES (?1, ?2, ?3)",
                rusqlite::params![point.id, collection, point.text],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector: Option<&[f32]>,
        query_text: Option<&str>,
        k: usize,
        filter: &SearchFilter,
    ) -> anyhow::Result<Vec<SearchHit>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(
            "SELECT rowid, id, vector, text, payload FROM points WHERE collection = ?1",
        )?;
        let rows: Vec<Row> = stmt
            .query_map(rusqlite::params![collection], |r| {
                let payload_str: String = r.get(4)?;
                Ok((r.get::<_, i64>(0)?, r.get::<_, String>(1)?, r.get::<_, Vec<u8>>(2)?, r.get::<_, String>(3)?, payload_str))
            })?
            .filter_map(|r| r.ok())
            .filter_map(|(rowid, id, vec_bytes, text, payload_str)| {
                let payload: Value = serde_json::from_str(&payload_str).ok()?;
                Some(Row { rowid, id, vector: decode_vector(&vec_bytes), text, payload })
            })
            .filter(|row| filter.matches(&row.payload))
            .collect();
        drop(stmt);

        if rows.is_empty() {
            return Ok(vec![]);
        }

        if vector.is_none() {
            let mut ranked = rows;
            ranked.sort_by_key(|r| std::cmp::Reverse(r.rowid));
            return Ok(ranked
                .into_iter()
                .take(k)
                .map(|r| SearchHit { id: r.id, score: 0.0, text: r.text, payload: r.payload })
                .collect());
        }
        let query_vector = vector.unwrap();

        let text_scores: std::collections::HashMap<String, f32> = match query_text {
            Some(q) if !q.trim().is_empty() => {
                let phrase = format!("\"{}\"", q.replace('"', ""));
                let mut fts_stmt = conn.prepare(
                    "SELECT id, bm25(points_fts) FROM points_fts WHERE points_fts MATCH ?1 AND collection = ?2",
                )?;
                fts_stmt
                    .query_map(rusqlite::params![phrase, collection], |r| {
                        Ok((r.get::<_, String>(0)?, r.get::<_, f64>(1)?))
                    })
                    .map(|iter| {
                        iter.filter_map(|r| r.ok())
                            .map(|(id, rank)| (id, 1.0_f32 / (1.0 + rank.max(0.0) as f32)))
                            .collect()
                    })
                    .unwrap_or_default()
            }
            _ => std::collections::HashMap::new(),
        };

        let mut scored: Vec<SearchHit> = rows
            .into_iter()
            .map(|row| {
                let cos = cosine(query_vector, &row.vector);
                let score = match text_scores.get(&row.id) {
                    Some(text_score) => 0.6 * cos + 0.4 * text_score,
                    None => cos,
                };
                SearchHit { id: row.id, score, text: row.text, payload: row.payload }
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }

    async fn delete(&self, collection: &str, filter: &SearchFilter) -> anyhow::Result<u64> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let ids: Vec<String> = {
            let mut stmt = tx.prepare("SELECT id, payload FROM points WHERE collection = ?1")?;
            let rows: Vec<(String, String)> = stmt
                .query_map(rusqlite::params![collection], |r| Ok((r.get(0)?, r.get(1)?)))?
                .filter_map(|r| r.ok())
                .collect();
            rows.into_iter()
                .filter_map(|(id, payload_str)| {
                    let payload: Value = serde_json::from_str(&payload_str).ok()?;
                    filter.matches(&payload).then_some(id)
                })
                .collect()
        };

        for id in &ids {
            tx.execute("DELETE FROM points WHERE id = ?1", rusqlite::params![id])?;
            tx.execute("DELETE FROM points_fts WHERE id = ?1", rusqlite::params![id])?;
        }
        tx.commit()?;
        Ok(ids.len() as u64)
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn point(id: &str, vector: Vec<f32>, text: &str, payload: Value) -> VectorPoint {
        VectorPoint { id: id.into(), vector, text: text.into(), payload }
    }

    #[tokio::test]
    async fn ensure_collection_then_upsert_and_search() {
        let store = SqliteVectorStore::open_in_memory().unwrap();
        store.ensure_collection("docs", 3, DistanceMetric::Cosine).await.unwrap();
        store
            .upsert(
                "docs",
                vec![
                    point("a", vec![1.0, 0.0, 0.0], "incoterm FOB definition", json!({"doc_id": "d1"})),
                    point("b", vec![0.0, 1.0, 0.0], "payment terms net 30", json!({"doc_id": "d2"})),
                ],
            )
            .await
            .unwrap();

        let hits = store
            .search("docs", Some(&[1.0, 0.0, 0.0]), None, 5, &SearchFilter::new())
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "a");
    }

    #[tokio::test]
    async fn search_applies_payload_filter() {
        let store = SqliteVectorStore::open_in_memory().unwrap();
        store.ensure_collection("docs", 3, DistanceMetric::Cosine).await.unwrap();
        store
            .upsert(
                "docs",
                vec![
                    point("a", vec![1.0, 0.0, 0.0], "text a", json!({"doc_id": "d1"})),
                    point("b", vec![1.0, 0.0, 0.0], "text b", json!({"doc_id": "d2"})),
                ],
            )
            .await
            .unwrap();

        let filter = SearchFilter::new().with("doc_id", "d2");
        let hits = store.search("docs", Some(&[1.0, 0.0, 0.0]), None, 5, &filter).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "b");
    }

    #[tokio::test]
    async fn search_without_vector_returns_most_recent() {
        let store = SqliteVectorStore::open_in_memory().unwrap();
        store.ensure_collection("docs", 3, DistanceMetric::Cosine).await.unwrap();
        store.upsert("docs", vec![point("a", vec![1.0, 0.0, 0.0], "first", json!({}))]).await.unwrap();
        store.upsert("docs", vec![point("b", vec![1.0, 0.0, 0.0], "second", json!({}))]).await.unwrap();

        let hits = store.search("docs", None, None, 1, &SearchFilter::new()).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "b");
    }

    #[tokio::test]
    async fn delete_removes_matching_points_only() {
        let store = SqliteVectorStore::open_in_memory().unwrap();
        store.ensure_collection("docs", 3, DistanceMetric::Cosine).await.unwrap();
        store
            .upsert(
                "docs",
                vec![
                    point("a", vec![1.0, 0.0, 0.0], "text a", json!({"doc_id": "d1"})),
                    point("b", vec![1.0, 0.0, 0.0], "text b", json!({"doc_id": "d2"})),
                ],
            )
            .await
            .unwrap();

        let deleted = store.delete("docs", &SearchFilter::new().with("doc_id", "d1")).await.unwrap();
        assert_eq!(deleted, 1);

        let remaining = store.search("docs", Some(&[1.0, 0.0, 0.0]), None, 5, &SearchFilter::new()).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, "b");
    }

    #[tokio::test]
    async fn upsert_same_id_overwrites() {
        let store = SqliteVectorStore::open_in_memory().unwrap();
        store.ensure_collection("docs", 3, DistanceMetric::Cosine).await.unwrap();
        store.upsert("docs", vec![point("a", vec![1.0, 0.0, 0.0], "old text", json!({}))]).await.unwrap();
        store.upsert("docs", vec![point("a", vec![1.0, 0.0, 0.0], "new text", json!({}))]).await.unwrap();

        let hits = store.search("docs", Some(&[1.0, 0.0, 0.0]), None, 5, &SearchFilter::new()).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text, "new text");
    }
}

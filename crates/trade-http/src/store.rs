// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Relational store: conversation history and document lifecycle tables.
//!
//! The chat orchestrator needs somewhere durable to put user/assistant
//! turns and to resolve a Document's upload state and sibling content. A
//! single mutex-guarded SQLite connection is adequate here for the same
//! reason it is in `trade_memory::SqliteVectorStore` — this is session and
//! document metadata, not a high-throughput OLTP workload.

use std::sync::Mutex;

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct DocumentRow {
    pub doc_id: String,
    pub trade_id: String,
    pub doc_mode: String,
    pub upload_status: String,
}

#[derive(Debug, Clone)]
pub struct HistoryMessage {
    pub role: String,
    pub content: String,
    pub created_at: i64,
}

#[async_trait]
pub trait RelationalStore: Send + Sync {
    async fn get_document(&self, doc_id: &str) -> anyhow::Result<Option<DocumentRow>>;

    /// Latest DocVersion HTML for every other Document under the same trade.
    async fn sibling_document_html(&self, trade_id: &str, exclude_doc_id: &str) -> anyhow::Result<Vec<(String, String)>>;

    /// Latest DocVersion HTML for this document, if any version was ever saved.
    async fn latest_document_html(&self, doc_id: &str) -> anyhow::Result<Option<String>>;

    async fn insert_doc_message(&self, doc_id: &str, role: &str, content: &str, metadata: &Value) -> anyhow::Result<String>;
    async fn insert_gen_message(&self, gen_chat_id: &str, role: &str, content: &str, metadata: &Value) -> anyhow::Result<String>;

    /// Last `limit` messages, ordered oldest-first. `exclude_message_id`, when
    /// given, drops that row from the result — the orchestrator passes the id
    /// of the user turn it just inserted so history stays a strict prefix of
    /// what came before this request.
    async fn load_doc_history(&self, doc_id: &str, limit: usize, exclude_message_id: Option<&str>) -> anyhow::Result<Vec<HistoryMessage>>;
    async fn load_gen_history(&self, gen_chat_id: &str, limit: usize, exclude_message_id: Option<&str>) -> anyhow::Result<Vec<HistoryMessage>>;

    async fn count_doc_messages(&self, doc_id: &str) -> anyhow::Result<usize>;
    async fn count_gen_messages(&self, gen_chat_id: &str) -> anyhow::Result<usize>;

    /// Resolves the GenChat for a user, creating one when `gen_chat_id` is
    /// absent. Returns `(gen_chat_id, is_first_message)`.
    async fn resolve_gen_chat(&self, gen_chat_id: Option<&str>, user_id: &str) -> anyhow::Result<(String, bool)>;
}

pub struct SqliteRelationalStore {
    conn: Mutex<Connection>,
}

impl SqliteRelationalStore {
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
            "CREATE TABLE IF NOT EXISTS documents (
                doc_id        TEXT PRIMARY KEY,
                trade_id      TEXT NOT NULL,
                doc_mode      TEXT NOT NULL DEFAULT 'manual',
                upload_status TEXT NOT NULL DEFAULT 'none'
             );
             CREATE TABLE IF NOT EXISTS doc_versions (
                version_id TEXT PRIMARY KEY,
                doc_id     TEXT NOT NULL,
                html       TEXT NOT NULL,
                created_at INTEGER NOT NULL
             );
             CREATE INDEX IF NOT EXISTS idx_doc_versions_doc ON doc_versions(doc_id, created_at);
             CREATE TABLE IF NOT EXISTS doc_messages (
                message_id TEXT PRIMARY KEY,
                doc_id     TEXT NOT NULL,
                role       TEXT NOT NULL,
                content    TEXT NOT NULL,
                metadata   TEXT NOT NULL,
                created_at INTEGER NOT NULL
             );
             CREATE INDEX IF NOT EXISTS idx_doc_messages_doc ON doc_messages(doc_id, created_at);
             CREATE TABLE IF NOT EXISTS gen_chats (
                gen_chat_id TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL,
                created_at  INTEGER NOT NULL
             );
             CREATE TABLE IF NOT EXISTS gen_messages (
                message_id  TEXT PRIMARY KEY,
                gen_chat_id TEXT NOT NULL,
                role        TEXT NOT NULL,
                content     TEXT NOT NULL,
                metadata    TEXT NOT NULL,
                created_at  INTEGER NOT NULL
             );
             CREATE INDEX IF NOT EXISTS idx_gen_messages_chat ON gen_messages(gen_chat_id, created_at);",
        )?;
        Ok(())
    }

    /// Millisecond clock used for `created_at` ordering. A plain counter
    /// over a monotonic source would also satisfy the ordering invariant;
    /// wall-clock time is kept here because it is what operators expect to
    /// see in the stored rows.
    fn now_ms() -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }
}

#[async_trait]
impl RelationalStore for SqliteRelationalStore {
    async fn get_document(&self, doc_id: &str) -> anyhow::Result<Option<DocumentRow>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT doc_id, trade_id, doc_mode, upload_status FROM documents WHERE doc_id = ?1",
                params![doc_id],
                |r| Ok(DocumentRow { doc_id: r.get(0)?, trade_id: r.get(1)?, doc_mode: r.get(2)?, upload_status: r.get(3)? }),
            )
            .optional()?;
        Ok(row)
    }

    async fn sibling_document_html(&self, trade_id: &str, exclude_doc_id: &str) -> anyhow::Result<Vec<(String, String)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT d.doc_id, v.html FROM documents d
             JOIN doc_versions v ON v.doc_id = d.doc_id
             WHERE d.trade_id = ?1 AND d.doc_id != ?2
             AND v.created_at = (SELECT MAX(created_at) FROM doc_versions WHERE doc_id = d.doc_id)",
        )?;
        let rows = stmt
            .query_map(params![trade_id, exclude_doc_id], |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    async fn latest_document_html(&self, doc_id: &str) -> anyhow::Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        let html = conn
            .query_row(
                "SELECT html FROM doc_versions WHERE doc_id = ?1 ORDER BY created_at DESC LIMIT 1",
                params![doc_id],
                |r| r.get::<_, String>(0),
            )
            .optional()?;
        Ok(html)
    }

    async fn insert_doc_message(&self, doc_id: &str, role: &str, content: &str, metadata: &Value) -> anyhow::Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO doc_messages (message_id, doc_id, role, content, metadata, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![id, doc_id, role, content, metadata.to_string(), Self::now_ms()],
        )?;
        Ok(id)
    }

    async fn insert_gen_message(&self, gen_chat_id: &str, role: &str, content: &str, metadata: &Value) -> anyhow::Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO gen_messages (message_id, gen_chat_id, role, content, metadata, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![id, gen_chat_id, role, content, metadata.to_string(), Self::now_ms()],
        )?;
        Ok(id)
    }

    async fn load_doc_history(&self, doc_id: &str, limit: usize, exclude_message_id: Option<&str>) -> anyhow::Result<Vec<HistoryMessage>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT role, content, created_at FROM doc_messages
             WHERE doc_id = ?1 AND (?2 IS NULL OR message_id != ?2)
             ORDER BY created_at DESC LIMIT ?3",
        )?;
        let mut rows = stmt
            .query_map(params![doc_id, exclude_message_id, limit as i64], |r| {
                Ok(HistoryMessage { role: r.get(0)?, content: r.get(1)?, created_at: r.get(2)? })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        rows.reverse();
        Ok(rows)
    }

    async fn load_gen_history(&self, gen_chat_id: &str, limit: usize, exclude_message_id: Option<&str>) -> anyhow::Result<Vec<HistoryMessage>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT role, content, created_at FROM gen_messages
             WHERE gen_chat_id = ?1 AND (?2 IS NULL OR message_id != ?2)
             ORDER BY created_at DESC LIMIT ?3",
        )?;
        let mut rows = stmt
            .query_map(params![gen_chat_id, exclude_message_id, limit as i64], |r| {
                Ok(HistoryMessage { role: r.get(0)?, content: r.get(1)?, created_at: r.get(2)? })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        rows.reverse();
        Ok(rows)
    }

    async fn count_doc_messages(&self, doc_id: &str) -> anyhow::Result<usize> {
        let conn = self.conn.lock().unwrap();
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM doc_messages WHERE doc_id = ?1", params![doc_id], |r| r.get(0))?;
        Ok(n as usize)
    }

    async fn count_gen_messages(&self, gen_chat_id: &str) -> anyhow::Result<usize> {
        let conn = self.conn.lock().unwrap();
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM gen_messages WHERE gen_chat_id = ?1", params![gen_chat_id], |r| r.get(0))?;
        Ok(n as usize)
    }

    async fn resolve_gen_chat(&self, gen_chat_id: Option<&str>, user_id: &str) -> anyhow::Result<(String, bool)> {
        if let Some(id) = gen_chat_id {
            let conn = self.conn.lock().unwrap();
            let exists: Option<String> =
                conn.query_row("SELECT gen_chat_id FROM gen_chats WHERE gen_chat_id = ?1", params![id], |r| r.get(0)).optional()?;
            if exists.is_some() {
                return Ok((id.to_string(), false));
            }
            conn.execute(
                "INSERT INTO gen_chats (gen_chat_id, user_id, created_at) VALUES (?1, ?2, ?3)",
                params![id, user_id, Self::now_ms()],
            )?;
            return Ok((id.to_string(), true));
        }

        let new_id = uuid::Uuid::new_v4().to_string();
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO gen_chats (gen_chat_id, user_id, created_at) VALUES (?1, ?2, ?3)",
            params![new_id, user_id, Self::now_ms()],
        )?;
        Ok((new_id, true))
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolve_gen_chat_creates_when_absent() {
        let store = SqliteRelationalStore::open_in_memory().unwrap();
        let (id, is_first) = store.resolve_gen_chat(None, "u1").await.unwrap();
        assert!(is_first);
        let (id2, is_first2) = store.resolve_gen_chat(Some(&id), "u1").await.unwrap();
        assert_eq!(id, id2);
        assert!(!is_first2);
    }

    #[tokio::test]
    async fn doc_history_with_no_exclusion_orders_ascending() {
        let store = SqliteRelationalStore::open_in_memory().unwrap();
        for i in 0..5 {
            store.insert_doc_message("d1", "user", &format!("msg{i}"), &Value::Null).await.unwrap();
        }
        let history = store.load_doc_history("d1", 10, None).await.unwrap();
        assert_eq!(history.len(), 5);
        assert_eq!(history[0].content, "msg0");
        assert_eq!(history[4].content, "msg4");
    }

    #[tokio::test]
    async fn doc_history_respects_limit_keeping_most_recent() {
        let store = SqliteRelationalStore::open_in_memory().unwrap();
        for i in 0..12 {
            store.insert_doc_message("d1", "user", &format!("msg{i}"), &Value::Null).await.unwrap();
        }
        let history = store.load_doc_history("d1", 10, None).await.unwrap();
        assert_eq!(history.len(), 10);
        assert_eq!(history[0].content, "msg2");
        assert_eq!(history[9].content, "msg11");
    }

    #[tokio::test]
    async fn doc_history_excludes_the_given_message_id() {
        let store = SqliteRelationalStore::open_in_memory().unwrap();
        for i in 0..4 {
            store.insert_doc_message("d1", "user", &format!("msg{i}"), &Value::Null).await.unwrap();
        }
        let last_id = store.insert_doc_message("d1", "user", "msg4", &Value::Null).await.unwrap();

        let history = store.load_doc_history("d1", 10, Some(&last_id)).await.unwrap();
        assert_eq!(history.len(), 4);
        assert!(history.iter().all(|m| m.content != "msg4"));
        assert_eq!(history[3].content, "msg3");
    }

    #[tokio::test]
    async fn sibling_document_html_excludes_self_and_uses_latest_version() {
        let store = SqliteRelationalStore::open_in_memory().unwrap();
        let conn = store.conn.lock().unwrap();
        conn.execute("INSERT INTO documents (doc_id, trade_id) VALUES ('a', 't1')", []).unwrap();
        conn.execute("INSERT INTO documents (doc_id, trade_id) VALUES ('b', 't1')", []).unwrap();
        conn.execute("INSERT INTO doc_versions (version_id, doc_id, html, created_at) VALUES ('v1','b','<p>old</p>', 1)", []).unwrap();
        conn.execute("INSERT INTO doc_versions (version_id, doc_id, html, created_at) VALUES ('v2','b','<p>new</p>', 2)", []).unwrap();
        drop(conn);

        let siblings = store.sibling_document_html("t1", "a").await.unwrap();
        assert_eq!(siblings, vec![("b".to_string(), "<p>new</p>".to_string())]);
    }
}

//! SQLite-backed conversation store. Persistent across process restarts.
//!
//! Messages and tool outputs are stored as JSON columns; one row per
//! (user_id, session_id). Uses spawn_blocking for async.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use super::{ConversationStore, SessionRecord, SessionSummary, StoreError};

/// SQLite store. Key: (user_id, session_id).
pub struct SqliteStore {
    db_path: PathBuf,
}

impl SqliteStore {
    /// Opens (creating if needed) the database and ensures the table.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db_path = path.as_ref().to_path_buf();
        let conn = Connection::open(&db_path).map_err(|e| StoreError::Storage(e.to_string()))?;
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS conversations (
                user_id TEXT NOT NULL,
                session_id TEXT NOT NULL,
                messages TEXT NOT NULL,
                tool_outputs TEXT NOT NULL,
                title TEXT NOT NULL,
                model TEXT,
                last_updated INTEGER NOT NULL,
                message_count INTEGER NOT NULL,
                PRIMARY KEY (user_id, session_id)
            )
            "#,
            [],
        )
        .map_err(|e| StoreError::Storage(e.to_string()))?;
        Ok(Self { db_path })
    }

    fn open(&self) -> Result<Connection, StoreError> {
        Connection::open(&self.db_path).map_err(|e| StoreError::Storage(e.to_string()))
    }
}

#[async_trait]
impl ConversationStore for SqliteStore {
    async fn load(&self, user_id: &str, session_id: &str) -> Result<SessionRecord, StoreError> {
        let store = Self {
            db_path: self.db_path.clone(),
        };
        let user_id = user_id.to_string();
        let session_id = session_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = store.open()?;
            let row: Option<(String, String, String, Option<String>)> = conn
                .query_row(
                    "SELECT messages, tool_outputs, title, model FROM conversations \
                     WHERE user_id = ?1 AND session_id = ?2",
                    params![user_id, session_id],
                    |row| {
                        Ok((
                            row.get(0)?,
                            row.get(1)?,
                            row.get(2)?,
                            row.get(3)?,
                        ))
                    },
                )
                .optional()
                .map_err(|e| StoreError::Storage(e.to_string()))?;
            match row {
                None => Ok(SessionRecord::default()),
                Some((messages, tool_outputs, title, model)) => Ok(SessionRecord {
                    messages: serde_json::from_str(&messages)
                        .map_err(|e| StoreError::Serialization(e.to_string()))?,
                    tool_outputs: serde_json::from_str(&tool_outputs)
                        .map_err(|e| StoreError::Serialization(e.to_string()))?,
                    title,
                    model,
                }),
            }
        })
        .await
        .map_err(|e| StoreError::Storage(e.to_string()))?
    }

    async fn save(
        &self,
        user_id: &str,
        session_id: &str,
        record: &SessionRecord,
    ) -> Result<(), StoreError> {
        let store = Self {
            db_path: self.db_path.clone(),
        };
        let user_id = user_id.to_string();
        let session_id = session_id.to_string();
        let messages = serde_json::to_string(&record.messages)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let tool_outputs = serde_json::to_string(&record.tool_outputs)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let title = record.title.clone();
        let model = record.model.clone();
        let message_count = record.messages.len() as i64;
        tokio::task::spawn_blocking(move || {
            let conn = store.open()?;
            conn.execute(
                r#"
                INSERT INTO conversations
                    (user_id, session_id, messages, tool_outputs, title, model,
                     last_updated, message_count)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(user_id, session_id) DO UPDATE SET
                    messages = excluded.messages,
                    tool_outputs = excluded.tool_outputs,
                    title = excluded.title,
                    model = excluded.model,
                    last_updated = excluded.last_updated,
                    message_count = excluded.message_count
                "#,
                params![
                    user_id,
                    session_id,
                    messages,
                    tool_outputs,
                    title,
                    model,
                    Utc::now().timestamp_millis(),
                    message_count
                ],
            )
            .map_err(|e| StoreError::Storage(e.to_string()))?;
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Storage(e.to_string()))?
    }

    async fn delete(&self, session_id: &str) -> Result<(), StoreError> {
        let store = Self {
            db_path: self.db_path.clone(),
        };
        let session_id = session_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = store.open()?;
            conn.execute(
                "DELETE FROM conversations WHERE session_id = ?1",
                params![session_id],
            )
            .map_err(|e| StoreError::Storage(e.to_string()))?;
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Storage(e.to_string()))?
    }

    async fn list_sessions(&self, user_id: &str) -> Result<Vec<SessionSummary>, StoreError> {
        let store = Self {
            db_path: self.db_path.clone(),
        };
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = store.open()?;
            let mut stmt = conn
                .prepare(
                    "SELECT session_id, title FROM conversations \
                     WHERE user_id = ?1 ORDER BY last_updated DESC",
                )
                .map_err(|e| StoreError::Storage(e.to_string()))?;
            let rows = stmt
                .query_map(params![user_id], |row| {
                    Ok(SessionSummary {
                        session_id: row.get(0)?,
                        title: row.get(1)?,
                    })
                })
                .map_err(|e| StoreError::Storage(e.to_string()))?;
            rows.collect::<Result<Vec<_>, _>>()
                .map_err(|e| StoreError::Storage(e.to_string()))
        })
        .await
        .map_err(|e| StoreError::Storage(e.to_string()))?
    }
}

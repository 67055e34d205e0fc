//! SQLite-backed session store.
//!
//! One row per turn in `conversations`; ordering is by the autoincrement id,
//! which is insertion order.

use crate::traits::{ConversationTurn, SessionStore};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};

/// SQLite session store.
pub struct SqliteSessionStore {
    db_path: PathBuf,
}

impl SqliteSessionStore {
    /// Open (or create) the database at `db_path`, creating parent directories.
    pub fn new(db_path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(db_path)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS conversations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL,
                question TEXT NOT NULL,
                answer TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_conversations_session
                ON conversations(session_id, id);
            "#,
        )?;

        tracing::debug!(path = %db_path.display(), "Session store ready");

        Ok(Self {
            db_path: db_path.to_path_buf(),
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn get(&self, session_id: &str) -> anyhow::Result<Vec<ConversationTurn>> {
        let db_path = self.db_path.clone();
        let session_id = session_id.to_string();

        tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<ConversationTurn>> {
            let conn = Connection::open(&db_path)?;
            let mut stmt = conn.prepare(
                "SELECT question, answer, created_at FROM conversations WHERE session_id = ?1 ORDER BY id ASC",
            )?;
            let rows = stmt.query_map(params![session_id], |row| {
                Ok(ConversationTurn::at(
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })?;

            let mut turns = Vec::new();
            for row in rows {
                turns.push(row?);
            }
            Ok(turns)
        })
        .await?
    }

    async fn append(&self, session_id: &str, turn: ConversationTurn) -> anyhow::Result<()> {
        let db_path = self.db_path.clone();
        let session_id = session_id.to_string();

        tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
            let conn = Connection::open(&db_path)?;
            conn.execute(
                "INSERT INTO conversations (session_id, question, answer, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![session_id, turn.question(), turn.answer(), turn.created_at()],
            )?;
            Ok(())
        })
        .await?
    }

    async fn clear(&self, session_id: &str) -> anyhow::Result<usize> {
        let db_path = self.db_path.clone();
        let session_id = session_id.to_string();

        tokio::task::spawn_blocking(move || -> anyhow::Result<usize> {
            let conn = Connection::open(&db_path)?;
            let removed = conn.execute(
                "DELETE FROM conversations WHERE session_id = ?1",
                params![session_id],
            )?;
            Ok(removed)
        })
        .await?
    }

    async fn health_check(&self) -> bool {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            Connection::open(&db_path)
                .and_then(|conn| conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0)))
                .is_ok()
        })
        .await
        .unwrap_or(false)
    }
}

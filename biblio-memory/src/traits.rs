//! Core session store trait and the conversation turn type.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One question/answer exchange. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    question: String,
    answer: String,
    /// Creation timestamp (Unix millis)
    created_at: i64,
}

impl ConversationTurn {
    /// Create a new turn stamped with the current time.
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self::at(question, answer, chrono::Utc::now().timestamp_millis())
    }

    /// Create a turn with an explicit timestamp (used when loading from storage).
    pub fn at(question: impl Into<String>, answer: impl Into<String>, created_at: i64) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            created_at,
        }
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }
}

/// Per-session transcript storage: read, append, clear.
///
/// History is append-only and chronological. There is no expiry; a session
/// lives until it is cleared.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Backend name (e.g., "sqlite", "memory")
    fn name(&self) -> &str;

    /// All turns of a session, oldest first. Unknown sessions are empty.
    async fn get(&self, session_id: &str) -> anyhow::Result<Vec<ConversationTurn>>;

    /// Append a turn at the end of a session, creating the session if needed.
    async fn append(&self, session_id: &str, turn: ConversationTurn) -> anyhow::Result<()>;

    /// Remove every turn of a session.
    ///
    /// Returns the number of turns removed.
    async fn clear(&self, session_id: &str) -> anyhow::Result<usize>;

    /// Health check, true when the backend is operational.
    async fn health_check(&self) -> bool;
}

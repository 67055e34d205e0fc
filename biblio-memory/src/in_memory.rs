//! Process-local session store.

use crate::traits::{ConversationTurn, SessionStore};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Keeps every session in a `HashMap`; contents are lost on restart.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Vec<ConversationTurn>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions with at least one turn.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, session_id: &str) -> anyhow::Result<Vec<ConversationTurn>> {
        Ok(self
            .sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn append(&self, session_id: &str, turn: ConversationTurn) -> anyhow::Result<()> {
        self.sessions
            .write()
            .await
            .entry(session_id.to_string())
            .or_default()
            .push(turn);
        Ok(())
    }

    async fn clear(&self, session_id: &str) -> anyhow::Result<usize> {
        Ok(self
            .sessions
            .write()
            .await
            .remove(session_id)
            .map_or(0, |turns| turns.len()))
    }

    async fn health_check(&self) -> bool {
        true
    }
}

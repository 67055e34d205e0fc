//! Biblio Memory - Session transcript storage for the Biblio book assistant.
//!
//! The question-answering pipeline never touches storage itself. The web layer
//! reads a session's history through [`SessionStore`], hands it to the pipeline,
//! and appends the resulting turn.
//!
//! ```text
//! cookie session_id → SessionStore::get → pipeline → SessionStore::append
//! ```

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod in_memory;
pub mod sqlite;
pub mod traits;

pub use in_memory::InMemorySessionStore;
pub use sqlite::SqliteSessionStore;
pub use traits::{ConversationTurn, SessionStore};

use biblio_common::config::{MemoryBackend, MemoryConfig};
use std::sync::Arc;

/// Create the session store selected in configuration.
pub fn create_session_store(config: &MemoryConfig) -> anyhow::Result<Arc<dyn SessionStore>> {
    match config.backend {
        MemoryBackend::Memory => Ok(Arc::new(InMemorySessionStore::new())),
        MemoryBackend::Sqlite => {
            let path = config.resolved_path();
            Ok(Arc::new(SqliteSessionStore::new(&path)?))
        }
    }
}

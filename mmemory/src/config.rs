//! Store selection and construction.

use std::path::PathBuf;
use std::sync::Arc;

use mchat::{ConversationStore, InMemoryConversationStore};

use crate::backends::sqlite::SqliteConversationStore;
use crate::error::MemoryError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    Sqlite { path: PathBuf },
    InMemory,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: default_sqlite_path(),
        }
    }
}

pub fn create_conversation_store(
    config: StoreConfig,
) -> Result<Arc<dyn ConversationStore>, MemoryError> {
    match config {
        StoreConfig::Sqlite { path } => Ok(Arc::new(SqliteConversationStore::new(path)?)),
        StoreConfig::InMemory => Ok(Arc::new(InMemoryConversationStore::new())),
    }
}

pub fn create_default_conversation_store() -> Result<Arc<dyn ConversationStore>, MemoryError> {
    create_conversation_store(StoreConfig::default())
}

/// `~/.mana/conversations.sqlite3`, or a file in the working directory when
/// no home directory is known.
pub fn default_sqlite_path() -> PathBuf {
    if let Some(home) = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")) {
        return PathBuf::from(home)
            .join(".mana")
            .join("conversations.sqlite3");
    }

    PathBuf::from("conversations.sqlite3")
}

//! Durable conversation storage for mana chat services.
//!
//! ```rust
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! use mchat::ConversationStore;
//! use mcommon::MetadataMap;
//! use mmemory::SqliteConversationStore;
//!
//! let store = SqliteConversationStore::new_in_memory()?;
//! let conversation = store.create_conversation(MetadataMap::new()).await?;
//! store
//!     .append_user_message(&conversation, "hello".to_string(), MetadataMap::new())
//!     .await?;
//!
//! let messages = store.get_conversation(&conversation).await?;
//! assert_eq!(messages[0].content, "hello");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # }).unwrap();
//! ```

mod backends;
mod config;
mod error;

pub mod prelude {
    pub use crate::{
        MemoryError, MemoryErrorKind, SqliteConversationStore, StoreConfig,
        create_conversation_store, create_default_conversation_store,
    };
}

pub use backends::sqlite::SqliteConversationStore;
pub use config::{
    StoreConfig, create_conversation_store, create_default_conversation_store,
    default_sqlite_path,
};
pub use error::{MemoryError, MemoryErrorKind};

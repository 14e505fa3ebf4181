//! Single-dependency facade over the mana workspace crates.
//!
//! Re-exports the provider, chat, storage and observability crates and wires
//! them into a [`ManaRuntime`] from environment configuration.
//!
//! ```rust,no_run
//! # tokio::runtime::Builder::new_multi_thread().enable_all().build().unwrap().block_on(async {
//! use mana::prelude::*;
//!
//! init_tracing("info");
//! let config = ManaConfig::from_env()?;
//! let runtime = build_runtime(&config)?;
//!
//! let conversation = runtime.chat.new_conversation(MetadataMap::new()).await?;
//! runtime
//!     .chat
//!     .add_user_message(&conversation, "Say hello", MetadataMap::new())
//!     .await?;
//!
//! let mut stream = runtime
//!     .chat
//!     .start_assistant_stream(&conversation, GenerateOptions::new())
//!     .await?;
//! while let Some(event) = stream.next_event().await {
//!     if let Some(delta) = event.delta() {
//!         print!("{delta}");
//!     }
//! }
//! # Ok::<(), ChatError>(())
//! # }).unwrap();
//! ```

pub mod config;
pub mod prelude;
pub mod runtime;
pub mod telemetry;

pub use mchat;
pub use mcommon;
pub use mmemory;
pub use mobserve;
pub use mprovider;

pub use mchat::{
    AssistantStream, CancellationToken, ChatError, ChatErrorKind, ChatEventStream, ChatMessage,
    ChatService, ChatServiceBuilder, ChatStreamHooks, Conversation, ConversationStore,
    GenerateOptions, InMemoryConversationStore, MessageState, NoopChatStreamHooks, StreamEvent,
    StreamEventKind,
};
pub use mcommon::{BoxFuture, ConversationId, MessageId, MetadataMap};
pub use mmemory::{
    MemoryError, MemoryErrorKind, SqliteConversationStore, StoreConfig, create_conversation_store,
};
pub use mobserve::{
    MetricsObservabilityHooks, SafeChatStreamHooks, SafeProviderHooks, TracingObservabilityHooks,
};
pub use mprovider::{
    ChatProvider, GenerationManager, GenerationRequest, Message, ProviderAdapter, ProviderConfig,
    ProviderError, ProviderErrorKind, ProviderOperationHooks, ProviderRegistry, Role,
    StreamChunk, StreamingProvider, TokenUsage,
};

pub use config::ManaConfig;
pub use runtime::{ManaRuntime, build_runtime, build_runtime_with, default_registry};
pub use telemetry::init_tracing;

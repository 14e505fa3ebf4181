//! Common imports for most mana applications.

pub use crate::{
    AssistantStream, ChatError, ChatErrorKind, ChatMessage, ChatService, ChatServiceBuilder,
    ChatStreamHooks, Conversation, ConversationId, ConversationStore, GenerateOptions,
    GenerationManager, InMemoryConversationStore, ManaConfig, ManaRuntime, MessageId,
    MessageState, MetadataMap, ProviderConfig, ProviderError, ProviderErrorKind, ProviderRegistry,
    SqliteConversationStore, StoreConfig, StreamEvent, StreamEventKind, build_runtime,
    build_runtime_with, default_registry, init_tracing,
};

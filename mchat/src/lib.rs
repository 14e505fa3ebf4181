//! Conversation storage and streaming assistant orchestration.
//!
//! ```rust
//! # tokio::runtime::Builder::new_multi_thread().enable_all().build().unwrap().block_on(async {
//! use std::sync::Arc;
//!
//! use mchat::prelude::*;
//! use mprovider::{
//!     ChatProvider, GeneratedMessage, GenerationManager, GenerationRequest, ProviderAdapter,
//!     ProviderError, ProviderFuture, Role,
//! };
//!
//! struct Echo;
//!
//! impl ChatProvider for Echo {
//!     fn name(&self) -> &str {
//!         "echo"
//!     }
//!
//!     fn generate<'a>(
//!         &'a self,
//!         request: GenerationRequest,
//!     ) -> ProviderFuture<'a, Result<GeneratedMessage, ProviderError>> {
//!         Box::pin(async move {
//!             let last = request.messages.last().map(|m| m.content.clone()).unwrap_or_default();
//!             Ok(GeneratedMessage {
//!                 id: "gen-1".into(),
//!                 provider: "echo".into(),
//!                 model: "echo".into(),
//!                 role: Role::Assistant,
//!                 content: last,
//!                 finish_reason: None,
//!                 usage: None,
//!             })
//!         })
//!     }
//!
//!     fn list_models<'a>(&'a self) -> ProviderFuture<'a, Result<Vec<String>, ProviderError>> {
//!         Box::pin(async { Ok(vec!["echo".into()]) })
//!     }
//! }
//!
//! let manager = Arc::new(GenerationManager::from_adapter(ProviderAdapter::new(Echo)));
//! let service = ChatService::new(manager, Arc::new(InMemoryConversationStore::new()));
//!
//! let conversation = service.new_conversation(MetadataMap::new()).await?;
//! service.add_user_message(&conversation, "ping", MetadataMap::new()).await?;
//!
//! let mut stream = service
//!     .start_assistant_stream(&conversation, GenerateOptions::new())
//!     .await?;
//! let mut reply = String::new();
//! while let Some(event) = stream.next_event().await {
//!     if let Some(delta) = event.delta() {
//!         reply.push_str(delta);
//!     }
//! }
//! assert_eq!(reply, "ping");
//! # Ok::<(), ChatError>(())
//! # }).unwrap();
//! ```

mod error;
mod hooks;
mod service;
mod store;
mod types;

pub mod prelude {
    pub use crate::{
        AssistantStream, ChatError, ChatErrorKind, ChatEventStream, ChatMessage, ChatService,
        ChatServiceBuilder, ChatStreamHooks, Conversation, ConversationStore, GenerateOptions,
        InMemoryConversationStore, MessageState, StreamEvent, StreamEventKind,
    };
    pub use mcommon::{ConversationId, MessageId, MetadataMap};
}

pub use error::{ChatError, ChatErrorKind};
pub use hooks::{ChatStreamHooks, NoopChatStreamHooks};
pub use mcommon::{ConversationId, MessageId, MetadataMap};
pub use service::{AssistantStream, ChatService, ChatServiceBuilder, DEFAULT_EVENT_CAPACITY};
pub use store::{ChatFuture, ConversationStore, InMemoryConversationStore};
pub use tokio_util::sync::CancellationToken;
pub use types::{
    ChatEventStream, ChatMessage, Conversation, ERROR_METADATA_KEY, GenerateOptions,
    MODEL_METADATA_KEY, MessageState, StreamEvent, StreamEventKind,
};

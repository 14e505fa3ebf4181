//! Conversation storage contract and the in-memory reference store.
//!
//! Every operation is linearizable: implementations apply each call as one
//! atomic step and never hold their lock across an await point.
//!
//! ```rust
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! use mchat::{ConversationStore, InMemoryConversationStore, MessageState};
//! use mcommon::MetadataMap;
//!
//! let store = InMemoryConversationStore::new();
//! let conversation = store.create_conversation(MetadataMap::new()).await?;
//! let reply = store
//!     .create_assistant_message(&conversation, "fake", MetadataMap::new())
//!     .await?;
//! store.append_assistant_delta(&conversation, &reply, "He").await?;
//! store.append_assistant_delta(&conversation, &reply, "llo").await?;
//! store.complete_assistant_message(&conversation, &reply, None).await?;
//!
//! let messages = store.get_conversation(&conversation).await?;
//! assert_eq!(messages[0].content, "Hello");
//! assert_eq!(messages[0].state(), MessageState::Completed);
//! # Ok::<(), mchat::ChatError>(())
//! # }).unwrap();
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::SystemTime;

use mcommon::{ConversationId, IdGenerator, MessageId, MetadataMap};
use mprovider::{Role, TokenUsage};

use crate::{ChatError, ChatMessage, Conversation, ERROR_METADATA_KEY};

pub type ChatFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait ConversationStore: Send + Sync {
    fn create_conversation<'a>(
        &'a self,
        metadata: MetadataMap,
    ) -> ChatFuture<'a, Result<ConversationId, ChatError>>;

    /// Appends a user message; user messages are complete on arrival.
    fn append_user_message<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
        content: String,
        metadata: MetadataMap,
    ) -> ChatFuture<'a, Result<MessageId, ChatError>>;

    /// Appends an empty, pending assistant placeholder.
    fn create_assistant_message<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
        provider: &'a str,
        metadata: MetadataMap,
    ) -> ChatFuture<'a, Result<MessageId, ChatError>>;

    fn append_assistant_delta<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
        message_id: &'a MessageId,
        delta: &'a str,
    ) -> ChatFuture<'a, Result<(), ChatError>>;

    /// Marks the message completed. Completing twice is a no-op.
    fn complete_assistant_message<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
        message_id: &'a MessageId,
        usage: Option<TokenUsage>,
    ) -> ChatFuture<'a, Result<(), ChatError>>;

    /// Marks the message failed, freezing its partial content. A no-op on a
    /// message that is already terminal.
    fn fail_assistant_message<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
        message_id: &'a MessageId,
        reason: &'a str,
    ) -> ChatFuture<'a, Result<(), ChatError>>;

    /// Conversation ids, newest first. A `limit` of zero means no limit.
    fn list_conversations<'a>(
        &'a self,
        limit: usize,
    ) -> ChatFuture<'a, Result<Vec<ConversationId>, ChatError>>;

    fn get_conversation<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
    ) -> ChatFuture<'a, Result<Vec<ChatMessage>, ChatError>>;

    fn conversation_metadata<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
    ) -> ChatFuture<'a, Result<MetadataMap, ChatError>>;
}

#[derive(Debug, Default)]
struct StoreState {
    conversations: HashMap<ConversationId, Conversation>,
    /// Creation order, oldest first.
    order: Vec<ConversationId>,
}

impl StoreState {
    fn conversation(&self, conversation_id: &ConversationId) -> Result<&Conversation, ChatError> {
        self.conversations
            .get(conversation_id)
            .ok_or_else(|| conversation_not_found(conversation_id))
    }

    fn conversation_mut(
        &mut self,
        conversation_id: &ConversationId,
    ) -> Result<&mut Conversation, ChatError> {
        self.conversations
            .get_mut(conversation_id)
            .ok_or_else(|| conversation_not_found(conversation_id))
    }

    fn assistant_message_mut(
        &mut self,
        conversation_id: &ConversationId,
        message_id: &MessageId,
    ) -> Result<&mut ChatMessage, ChatError> {
        let message = self
            .conversation_mut(conversation_id)?
            .message_mut(message_id)
            .ok_or_else(|| {
                ChatError::not_found(format!(
                    "message {message_id} not found in conversation {conversation_id}"
                ))
            })?;

        if message.role != Role::Assistant {
            return Err(ChatError::invalid_request(format!(
                "message {message_id} is not an assistant message"
            )));
        }

        Ok(message)
    }
}

fn conversation_not_found(conversation_id: &ConversationId) -> ChatError {
    ChatError::not_found(format!("conversation {conversation_id} not found"))
}

#[derive(Debug, Default)]
pub struct InMemoryConversationStore {
    state: RwLock<StoreState>,
    ids: IdGenerator,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, StoreState>, ChatError> {
        self.state
            .read()
            .map_err(|_| ChatError::store("conversation store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, StoreState>, ChatError> {
        self.state
            .write()
            .map_err(|_| ChatError::store("conversation store lock poisoned"))
    }

    fn push_message(
        &self,
        conversation_id: &ConversationId,
        role: Role,
        content: String,
        provider: Option<String>,
        metadata: MetadataMap,
    ) -> Result<MessageId, ChatError> {
        let mut state = self.write()?;
        let conversation = state.conversation_mut(conversation_id)?;
        let id = self.ids.message_id();
        let created_at = SystemTime::now();

        conversation.messages.push(ChatMessage {
            id: id.clone(),
            conversation_id: conversation_id.clone(),
            role,
            content,
            provider,
            created_at,
            completed_at: (role != Role::Assistant).then_some(created_at),
            failed_at: None,
            usage: None,
            metadata,
        });

        Ok(id)
    }
}

impl ConversationStore for InMemoryConversationStore {
    fn create_conversation<'a>(
        &'a self,
        metadata: MetadataMap,
    ) -> ChatFuture<'a, Result<ConversationId, ChatError>> {
        Box::pin(async move {
            let mut state = self.write()?;
            let id = self.ids.conversation_id();
            state
                .conversations
                .insert(id.clone(), Conversation::new(id.clone(), metadata));
            state.order.push(id.clone());
            Ok(id)
        })
    }

    fn append_user_message<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
        content: String,
        metadata: MetadataMap,
    ) -> ChatFuture<'a, Result<MessageId, ChatError>> {
        Box::pin(async move {
            self.push_message(conversation_id, Role::User, content, None, metadata)
        })
    }

    fn create_assistant_message<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
        provider: &'a str,
        metadata: MetadataMap,
    ) -> ChatFuture<'a, Result<MessageId, ChatError>> {
        Box::pin(async move {
            self.push_message(
                conversation_id,
                Role::Assistant,
                String::new(),
                Some(provider.to_string()),
                metadata,
            )
        })
    }

    fn append_assistant_delta<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
        message_id: &'a MessageId,
        delta: &'a str,
    ) -> ChatFuture<'a, Result<(), ChatError>> {
        Box::pin(async move {
            let mut state = self.write()?;
            let message = state.assistant_message_mut(conversation_id, message_id)?;
            if message.is_terminal() {
                return Err(ChatError::invalid_request(format!(
                    "message {message_id} is no longer streaming"
                )));
            }

            message.content.push_str(delta);
            Ok(())
        })
    }

    fn complete_assistant_message<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
        message_id: &'a MessageId,
        usage: Option<TokenUsage>,
    ) -> ChatFuture<'a, Result<(), ChatError>> {
        Box::pin(async move {
            let mut state = self.write()?;
            let message = state.assistant_message_mut(conversation_id, message_id)?;
            if message.completed_at.is_some() {
                return Ok(());
            }
            if message.failed_at.is_some() {
                return Err(ChatError::invalid_request(format!(
                    "message {message_id} already failed"
                )));
            }

            message.completed_at = Some(SystemTime::now());
            message.usage = usage;
            Ok(())
        })
    }

    fn fail_assistant_message<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
        message_id: &'a MessageId,
        reason: &'a str,
    ) -> ChatFuture<'a, Result<(), ChatError>> {
        Box::pin(async move {
            let mut state = self.write()?;
            let message = state.assistant_message_mut(conversation_id, message_id)?;
            if message.is_terminal() {
                return Ok(());
            }

            message.failed_at = Some(SystemTime::now());
            message
                .metadata
                .insert(ERROR_METADATA_KEY.to_string(), reason.to_string());
            Ok(())
        })
    }

    fn list_conversations<'a>(
        &'a self,
        limit: usize,
    ) -> ChatFuture<'a, Result<Vec<ConversationId>, ChatError>> {
        Box::pin(async move {
            let state = self.read()?;
            let limit = if limit == 0 { usize::MAX } else { limit };
            Ok(state.order.iter().rev().take(limit).cloned().collect())
        })
    }

    fn get_conversation<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
    ) -> ChatFuture<'a, Result<Vec<ChatMessage>, ChatError>> {
        Box::pin(async move {
            let state = self.read()?;
            Ok(state.conversation(conversation_id)?.messages.clone())
        })
    }

    fn conversation_metadata<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
    ) -> ChatFuture<'a, Result<MetadataMap, ChatError>> {
        Box::pin(async move {
            let state = self.read()?;
            Ok(state.conversation(conversation_id)?.metadata.clone())
        })
    }
}

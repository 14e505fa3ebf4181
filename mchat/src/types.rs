//! Conversation, message, option, and stream event types.

use std::pin::Pin;
use std::time::SystemTime;

use futures_core::Stream;
use mcommon::{ConversationId, MessageId, MetadataMap};
use mprovider::{GenerationConfig, Message, Role, TokenUsage};
use serde_json::{Map, Value};

use crate::ChatError;

/// Metadata key recording why an assistant message failed.
pub const ERROR_METADATA_KEY: &str = "error";
/// Metadata key recording a per-stream model override.
pub const MODEL_METADATA_KEY: &str = "model";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageState {
    Pending,
    Streaming,
    Completed,
    Failed,
}

impl MessageState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub role: Role,
    pub content: String,
    pub provider: Option<String>,
    pub created_at: SystemTime,
    pub completed_at: Option<SystemTime>,
    pub failed_at: Option<SystemTime>,
    pub usage: Option<TokenUsage>,
    pub metadata: MetadataMap,
}

impl ChatMessage {
    pub fn state(&self) -> MessageState {
        if self.failed_at.is_some() {
            MessageState::Failed
        } else if self.completed_at.is_some() {
            MessageState::Completed
        } else if self.content.is_empty() {
            MessageState::Pending
        } else {
            MessageState::Streaming
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state().is_terminal()
    }

    pub fn is_completed(&self) -> bool {
        self.state() == MessageState::Completed
    }

    pub fn to_provider_message(&self) -> Message {
        Message::new(self.role, self.content.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub id: ConversationId,
    pub messages: Vec<ChatMessage>,
    pub metadata: MetadataMap,
    pub created_at: SystemTime,
}

impl Conversation {
    pub fn new(id: ConversationId, metadata: MetadataMap) -> Self {
        Self {
            id,
            messages: Vec::new(),
            metadata,
            created_at: SystemTime::now(),
        }
    }

    pub fn message(&self, message_id: &MessageId) -> Option<&ChatMessage> {
        self.messages.iter().find(|message| &message.id == message_id)
    }

    pub fn message_mut(&mut self, message_id: &MessageId) -> Option<&mut ChatMessage> {
        self.messages
            .iter_mut()
            .find(|message| &message.id == message_id)
    }
}

/// Per-stream overrides for an assistant reply.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GenerateOptions {
    pub model: Option<String>,
    pub system_prompt: Option<String>,
    /// Adapter-specific sampling parameters, forwarded untouched.
    pub parameters: Map<String, Value>,
}

impl GenerateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }
}

impl From<GenerateOptions> for GenerationConfig {
    fn from(value: GenerateOptions) -> Self {
        Self {
            model: value.model,
            system_prompt: value.system_prompt,
            parameters: value.parameters,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEventKind {
    Delta(String),
    Done { usage: Option<TokenUsage> },
    Error(ChatError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEvent {
    pub conversation_id: ConversationId,
    pub message_id: MessageId,
    pub kind: StreamEventKind,
}

impl StreamEvent {
    pub fn new(conversation_id: ConversationId, message_id: MessageId, kind: StreamEventKind) -> Self {
        Self {
            conversation_id,
            message_id,
            kind,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self.kind, StreamEventKind::Delta(_))
    }

    pub fn delta(&self) -> Option<&str> {
        match &self.kind {
            StreamEventKind::Delta(text) => Some(text),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ChatError> {
        match &self.kind {
            StreamEventKind::Error(error) => Some(error),
            _ => None,
        }
    }
}

pub type ChatEventStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

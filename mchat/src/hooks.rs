//! Lifecycle callbacks for assistant streams.

use std::time::Duration;

use mcommon::{ConversationId, MessageId};
use mprovider::TokenUsage;

use crate::ChatError;

/// Observes assistant streams. Callbacks run on the worker task and must not
/// block.
pub trait ChatStreamHooks: Send + Sync {
    fn on_stream_start(
        &self,
        _provider: &str,
        _conversation_id: &ConversationId,
        _message_id: &MessageId,
    ) {
    }

    /// Called after the delta was persisted and before it is published.
    fn on_delta(&self, _conversation_id: &ConversationId, _message_id: &MessageId, _len: usize) {}

    fn on_stream_complete(
        &self,
        _provider: &str,
        _conversation_id: &ConversationId,
        _message_id: &MessageId,
        _usage: Option<&TokenUsage>,
        _elapsed: Duration,
    ) {
    }

    fn on_stream_failed(
        &self,
        _provider: &str,
        _conversation_id: &ConversationId,
        _message_id: &MessageId,
        _error: &ChatError,
        _elapsed: Duration,
    ) {
    }

    /// Called when the caller cancelled or dropped the stream.
    fn on_stream_cancelled(
        &self,
        _provider: &str,
        _conversation_id: &ConversationId,
        _message_id: &MessageId,
        _elapsed: Duration,
    ) {
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopChatStreamHooks;

impl ChatStreamHooks for NoopChatStreamHooks {}

//! Structured `tracing` events for provider operations and assistant streams.
//!
//! ```rust
//! use mchat::ChatStreamHooks;
//! use mobserve::TracingObservabilityHooks;
//!
//! fn accepts_stream_hooks(_hooks: &dyn ChatStreamHooks) {}
//!
//! let hooks = TracingObservabilityHooks;
//! accepts_stream_hooks(&hooks);
//! ```

use std::time::Duration;

use mchat::{ChatError, ChatStreamHooks};
use mcommon::{ConversationId, MessageId};
use mprovider::{ProviderError, ProviderOperation, ProviderOperationHooks, TokenUsage};

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObservabilityHooks;

impl ProviderOperationHooks for TracingObservabilityHooks {
    fn on_operation_start(&self, provider: &str, operation: ProviderOperation) {
        tracing::info!(
            phase = "provider",
            event = "operation_start",
            provider,
            operation = operation.as_str()
        );
    }

    fn on_success(&self, provider: &str, operation: ProviderOperation, elapsed: Duration) {
        tracing::info!(
            phase = "provider",
            event = "success",
            provider,
            operation = operation.as_str(),
            elapsed_ms = elapsed.as_millis() as u64
        );
    }

    fn on_failure(
        &self,
        provider: &str,
        operation: ProviderOperation,
        elapsed: Duration,
        error: &ProviderError,
    ) {
        tracing::error!(
            phase = "provider",
            event = "failure",
            provider,
            operation = operation.as_str(),
            elapsed_ms = elapsed.as_millis() as u64,
            error_kind = ?error.kind,
            status = error.status,
            retryable = error.retryable,
            error = %error
        );
    }
}

impl ChatStreamHooks for TracingObservabilityHooks {
    fn on_stream_start(
        &self,
        provider: &str,
        conversation_id: &ConversationId,
        message_id: &MessageId,
    ) {
        tracing::info!(
            phase = "chat",
            event = "stream_start",
            provider,
            conversation_id = %conversation_id,
            message_id = %message_id
        );
    }

    fn on_delta(&self, conversation_id: &ConversationId, message_id: &MessageId, len: usize) {
        tracing::trace!(
            phase = "chat",
            event = "delta",
            conversation_id = %conversation_id,
            message_id = %message_id,
            len
        );
    }

    fn on_stream_complete(
        &self,
        provider: &str,
        conversation_id: &ConversationId,
        message_id: &MessageId,
        usage: Option<&TokenUsage>,
        elapsed: Duration,
    ) {
        tracing::info!(
            phase = "chat",
            event = "stream_complete",
            provider,
            conversation_id = %conversation_id,
            message_id = %message_id,
            elapsed_ms = elapsed.as_millis() as u64,
            total_tokens = usage.map(|usage| usage.total_tokens)
        );
    }

    fn on_stream_failed(
        &self,
        provider: &str,
        conversation_id: &ConversationId,
        message_id: &MessageId,
        error: &ChatError,
        elapsed: Duration,
    ) {
        tracing::error!(
            phase = "chat",
            event = "stream_failed",
            provider,
            conversation_id = %conversation_id,
            message_id = %message_id,
            elapsed_ms = elapsed.as_millis() as u64,
            error_kind = ?error.kind,
            retryable = error.is_retryable(),
            error = %error
        );
    }

    fn on_stream_cancelled(
        &self,
        provider: &str,
        conversation_id: &ConversationId,
        message_id: &MessageId,
        elapsed: Duration,
    ) {
        tracing::warn!(
            phase = "chat",
            event = "stream_cancelled",
            provider,
            conversation_id = %conversation_id,
            message_id = %message_id,
            elapsed_ms = elapsed.as_millis() as u64
        );
    }
}

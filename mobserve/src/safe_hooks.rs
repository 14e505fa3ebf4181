use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use mchat::{ChatError, ChatStreamHooks};
use mcommon::{ConversationId, MessageId};
use mprovider::{ProviderError, ProviderOperation, ProviderOperationHooks, TokenUsage};

pub struct SafeProviderHooks<H> {
    inner: H,
}

impl<H> SafeProviderHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H> ProviderOperationHooks for SafeProviderHooks<H>
where
    H: ProviderOperationHooks,
{
    fn on_operation_start(&self, provider: &str, operation: ProviderOperation) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_operation_start(provider, operation)
        }));
    }

    fn on_success(&self, provider: &str, operation: ProviderOperation, elapsed: Duration) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_success(provider, operation, elapsed)
        }));
    }

    fn on_failure(
        &self,
        provider: &str,
        operation: ProviderOperation,
        elapsed: Duration,
        error: &ProviderError,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_failure(provider, operation, elapsed, error)
        }));
    }
}

pub struct SafeChatStreamHooks<H> {
    inner: H,
}

impl<H> SafeChatStreamHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H> ChatStreamHooks for SafeChatStreamHooks<H>
where
    H: ChatStreamHooks,
{
    fn on_stream_start(
        &self,
        provider: &str,
        conversation_id: &ConversationId,
        message_id: &MessageId,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner
                .on_stream_start(provider, conversation_id, message_id)
        }));
    }

    fn on_delta(&self, conversation_id: &ConversationId, message_id: &MessageId, len: usize) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_delta(conversation_id, message_id, len)
        }));
    }

    fn on_stream_complete(
        &self,
        provider: &str,
        conversation_id: &ConversationId,
        message_id: &MessageId,
        usage: Option<&TokenUsage>,
        elapsed: Duration,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner
                .on_stream_complete(provider, conversation_id, message_id, usage, elapsed)
        }));
    }

    fn on_stream_failed(
        &self,
        provider: &str,
        conversation_id: &ConversationId,
        message_id: &MessageId,
        error: &ChatError,
        elapsed: Duration,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner
                .on_stream_failed(provider, conversation_id, message_id, error, elapsed)
        }));
    }

    fn on_stream_cancelled(
        &self,
        provider: &str,
        conversation_id: &ConversationId,
        message_id: &MessageId,
        elapsed: Duration,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner
                .on_stream_cancelled(provider, conversation_id, message_id, elapsed)
        }));
    }
}

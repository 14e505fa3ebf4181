use std::sync::{Arc, Mutex};
use std::time::Duration;

use mchat::{ChatError, ChatStreamHooks};
use mcommon::{ConversationId, MessageId};
use mprovider::{ProviderError, ProviderOperation, ProviderOperationHooks, TokenUsage};

use crate::{
    MetricsObservabilityHooks, SafeChatStreamHooks, SafeProviderHooks, TracingObservabilityHooks,
};

fn ids() -> (ConversationId, MessageId) {
    (ConversationId::from("conv-1"), MessageId::from("msg-1"))
}

fn exercise_provider_hooks(hooks: &dyn ProviderOperationHooks) {
    let error = ProviderError::upstream(401, Some("401".to_string()), "No auth credentials found");

    hooks.on_operation_start("openrouter", ProviderOperation::GenerateStream);
    hooks.on_success(
        "openrouter",
        ProviderOperation::GenerateStream,
        Duration::from_millis(10),
    );
    hooks.on_failure(
        "openrouter",
        ProviderOperation::Generate,
        Duration::from_millis(10),
        &error,
    );
}

fn exercise_stream_hooks(hooks: &dyn ChatStreamHooks) {
    let (conversation, message) = ids();
    let usage = TokenUsage::new(12, 3);
    let error = ChatError::from(ProviderError::timeout("read timed out"));

    hooks.on_stream_start("openrouter", &conversation, &message);
    hooks.on_delta(&conversation, &message, 5);
    hooks.on_stream_complete(
        "openrouter",
        &conversation,
        &message,
        Some(&usage),
        Duration::from_millis(20),
    );
    hooks.on_stream_complete(
        "openrouter",
        &conversation,
        &message,
        None,
        Duration::from_millis(20),
    );
    hooks.on_stream_failed(
        "openrouter",
        &conversation,
        &message,
        &error,
        Duration::from_millis(20),
    );
    hooks.on_stream_cancelled(
        "openrouter",
        &conversation,
        &message,
        Duration::from_millis(20),
    );
}

#[test]
fn tracing_hooks_smoke_test_all_callbacks() {
    exercise_provider_hooks(&TracingObservabilityHooks);
    exercise_stream_hooks(&TracingObservabilityHooks);
}

#[test]
fn metrics_hooks_smoke_test_all_callbacks() {
    exercise_provider_hooks(&MetricsObservabilityHooks);
    exercise_stream_hooks(&MetricsObservabilityHooks);
}

#[derive(Default, Clone)]
struct RecordingHooks {
    events: Arc<Mutex<Vec<&'static str>>>,
}

impl RecordingHooks {
    fn events(&self) -> Vec<&'static str> {
        self.events.lock().expect("events lock").clone()
    }

    fn push(&self, event: &'static str) {
        self.events.lock().expect("events lock").push(event);
    }
}

impl ProviderOperationHooks for RecordingHooks {
    fn on_operation_start(&self, _provider: &str, _operation: ProviderOperation) {
        self.push("start");
    }

    fn on_success(&self, _provider: &str, _operation: ProviderOperation, _elapsed: Duration) {
        self.push("success");
    }

    fn on_failure(
        &self,
        _provider: &str,
        _operation: ProviderOperation,
        _elapsed: Duration,
        _error: &ProviderError,
    ) {
        self.push("failure");
    }
}

impl ChatStreamHooks for RecordingHooks {
    fn on_stream_start(&self, _: &str, _: &ConversationId, _: &MessageId) {
        self.push("stream_start");
    }

    fn on_delta(&self, _: &ConversationId, _: &MessageId, _: usize) {
        self.push("delta");
    }

    fn on_stream_complete(
        &self,
        _: &str,
        _: &ConversationId,
        _: &MessageId,
        _: Option<&TokenUsage>,
        _: Duration,
    ) {
        self.push("complete");
    }

    fn on_stream_failed(&self, _: &str, _: &ConversationId, _: &MessageId, _: &ChatError, _: Duration) {
        self.push("failed");
    }

    fn on_stream_cancelled(&self, _: &str, _: &ConversationId, _: &MessageId, _: Duration) {
        self.push("cancelled");
    }
}

struct PanicHooks;

impl ProviderOperationHooks for PanicHooks {
    fn on_operation_start(&self, _provider: &str, _operation: ProviderOperation) {
        panic!("start panic");
    }

    fn on_success(&self, _provider: &str, _operation: ProviderOperation, _elapsed: Duration) {
        panic!("success panic");
    }

    fn on_failure(
        &self,
        _provider: &str,
        _operation: ProviderOperation,
        _elapsed: Duration,
        _error: &ProviderError,
    ) {
        panic!("failure panic");
    }
}

impl ChatStreamHooks for PanicHooks {
    fn on_stream_start(&self, _: &str, _: &ConversationId, _: &MessageId) {
        panic!("stream_start panic");
    }

    fn on_delta(&self, _: &ConversationId, _: &MessageId, _: usize) {
        panic!("delta panic");
    }

    fn on_stream_complete(
        &self,
        _: &str,
        _: &ConversationId,
        _: &MessageId,
        _: Option<&TokenUsage>,
        _: Duration,
    ) {
        panic!("complete panic");
    }

    fn on_stream_failed(&self, _: &str, _: &ConversationId, _: &MessageId, _: &ChatError, _: Duration) {
        panic!("failed panic");
    }

    fn on_stream_cancelled(&self, _: &str, _: &ConversationId, _: &MessageId, _: Duration) {
        panic!("cancelled panic");
    }
}

#[test]
fn safe_provider_hooks_delegate_when_inner_succeeds() {
    let recording = RecordingHooks::default();
    exercise_provider_hooks(&SafeProviderHooks::new(recording.clone()));

    assert_eq!(recording.events(), vec!["start", "success", "failure"]);
}

#[test]
fn safe_stream_hooks_delegate_when_inner_succeeds() {
    let recording = RecordingHooks::default();
    exercise_stream_hooks(&SafeChatStreamHooks::new(recording.clone()));

    assert_eq!(
        recording.events(),
        vec![
            "stream_start",
            "delta",
            "complete",
            "complete",
            "failed",
            "cancelled"
        ]
    );
}

#[test]
fn safe_hooks_swallow_panics() {
    exercise_provider_hooks(&SafeProviderHooks::new(PanicHooks));
    exercise_stream_hooks(&SafeChatStreamHooks::new(PanicHooks));
}

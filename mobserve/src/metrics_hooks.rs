//! `metrics` counters and histograms for provider operations and assistant streams.
//!
//! ```rust
//! use mobserve::MetricsObservabilityHooks;
//! use mprovider::ProviderOperationHooks;
//!
//! fn accepts_provider_hooks(_hooks: &dyn ProviderOperationHooks) {}
//!
//! let hooks = MetricsObservabilityHooks;
//! accepts_provider_hooks(&hooks);
//! ```

use std::time::Duration;

use mchat::{ChatError, ChatStreamHooks};
use mcommon::{ConversationId, MessageId};
use mprovider::{ProviderError, ProviderOperation, ProviderOperationHooks, TokenUsage};

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsObservabilityHooks;

impl ProviderOperationHooks for MetricsObservabilityHooks {
    fn on_operation_start(&self, provider: &str, operation: ProviderOperation) {
        metrics::counter!(
            "mana_provider_operation_start_total",
            "provider" => provider.to_string(),
            "operation" => operation.as_str()
        )
        .increment(1);
    }

    fn on_success(&self, provider: &str, operation: ProviderOperation, elapsed: Duration) {
        metrics::counter!(
            "mana_provider_success_total",
            "provider" => provider.to_string(),
            "operation" => operation.as_str()
        )
        .increment(1);
        metrics::histogram!(
            "mana_provider_operation_duration_seconds",
            "provider" => provider.to_string(),
            "operation" => operation.as_str(),
            "status" => "success"
        )
        .record(elapsed.as_secs_f64());
    }

    fn on_failure(
        &self,
        provider: &str,
        operation: ProviderOperation,
        elapsed: Duration,
        error: &ProviderError,
    ) {
        metrics::counter!(
            "mana_provider_failure_total",
            "provider" => provider.to_string(),
            "operation" => operation.as_str(),
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
        metrics::histogram!(
            "mana_provider_operation_duration_seconds",
            "provider" => provider.to_string(),
            "operation" => operation.as_str(),
            "status" => "failure"
        )
        .record(elapsed.as_secs_f64());
    }
}

impl ChatStreamHooks for MetricsObservabilityHooks {
    fn on_stream_start(&self, provider: &str, _: &ConversationId, _: &MessageId) {
        metrics::counter!("mana_chat_stream_start_total", "provider" => provider.to_string())
            .increment(1);
    }

    fn on_delta(&self, _: &ConversationId, _: &MessageId, len: usize) {
        metrics::counter!("mana_chat_stream_delta_total").increment(1);
        metrics::counter!("mana_chat_stream_delta_bytes_total").increment(len as u64);
    }

    fn on_stream_complete(
        &self,
        provider: &str,
        _: &ConversationId,
        _: &MessageId,
        usage: Option<&TokenUsage>,
        elapsed: Duration,
    ) {
        metrics::counter!("mana_chat_stream_complete_total", "provider" => provider.to_string())
            .increment(1);
        metrics::histogram!(
            "mana_chat_stream_duration_seconds",
            "provider" => provider.to_string(),
            "status" => "completed"
        )
        .record(elapsed.as_secs_f64());

        if let Some(usage) = usage {
            metrics::counter!(
                "mana_chat_stream_tokens_total",
                "provider" => provider.to_string(),
                "kind" => "prompt"
            )
            .increment(u64::from(usage.prompt_tokens));
            metrics::counter!(
                "mana_chat_stream_tokens_total",
                "provider" => provider.to_string(),
                "kind" => "completion"
            )
            .increment(u64::from(usage.completion_tokens));
        }
    }

    fn on_stream_failed(
        &self,
        provider: &str,
        _: &ConversationId,
        _: &MessageId,
        error: &ChatError,
        elapsed: Duration,
    ) {
        metrics::counter!(
            "mana_chat_stream_failure_total",
            "provider" => provider.to_string(),
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
        metrics::histogram!(
            "mana_chat_stream_duration_seconds",
            "provider" => provider.to_string(),
            "status" => "failed"
        )
        .record(elapsed.as_secs_f64());
    }

    fn on_stream_cancelled(
        &self,
        provider: &str,
        _: &ConversationId,
        _: &MessageId,
        elapsed: Duration,
    ) {
        metrics::counter!("mana_chat_stream_cancelled_total", "provider" => provider.to_string())
            .increment(1);
        metrics::histogram!(
            "mana_chat_stream_duration_seconds",
            "provider" => provider.to_string(),
            "status" => "cancelled"
        )
        .record(elapsed.as_secs_f64());
    }
}

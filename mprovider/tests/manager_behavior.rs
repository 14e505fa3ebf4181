use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::StreamExt;
use mprovider::{
    BoxedChunkStream, ChatProvider, GeneratedMessage, GenerationManager, GenerationRequest,
    Message, ProviderAdapter, ProviderConfig, ProviderError, ProviderErrorKind, ProviderFuture,
    ProviderOperation, ProviderOperationHooks, ProviderRegistry, Role, StreamChunk,
    StreamingProvider, TokenUsage, VecChunkStream,
};

#[derive(Debug, Clone)]
enum Reply {
    Content(&'static str),
    Fail(ProviderError),
}

#[derive(Debug)]
struct NonStreamingProvider {
    reply: Reply,
}

impl NonStreamingProvider {
    fn new(reply: Reply) -> Self {
        Self { reply }
    }
}

impl ChatProvider for NonStreamingProvider {
    fn name(&self) -> &str {
        "non-streaming"
    }

    fn generate<'a>(
        &'a self,
        _request: GenerationRequest,
    ) -> ProviderFuture<'a, Result<GeneratedMessage, ProviderError>> {
        Box::pin(async move {
            match &self.reply {
                Reply::Content(content) => Ok(GeneratedMessage {
                    id: "gen-1".to_string(),
                    provider: "non-streaming".to_string(),
                    model: "m".to_string(),
                    role: Role::Assistant,
                    content: content.to_string(),
                    finish_reason: Some("stop".to_string()),
                    usage: Some(TokenUsage::new(4, 2)),
                }),
                Reply::Fail(error) => Err(error.clone()),
            }
        })
    }

    fn list_models<'a>(&'a self) -> ProviderFuture<'a, Result<Vec<String>, ProviderError>> {
        Box::pin(async { Ok(vec!["m".to_string()]) })
    }
}

struct NativeStreamingProvider;

impl ChatProvider for NativeStreamingProvider {
    fn name(&self) -> &str {
        "native"
    }

    fn generate<'a>(
        &'a self,
        _request: GenerationRequest,
    ) -> ProviderFuture<'a, Result<GeneratedMessage, ProviderError>> {
        Box::pin(async { Err(ProviderError::transport("generate should not be called")) })
    }

    fn list_models<'a>(&'a self) -> ProviderFuture<'a, Result<Vec<String>, ProviderError>> {
        Box::pin(async { Ok(Vec::new()) })
    }

    fn close(&self) -> Result<(), ProviderError> {
        Err(ProviderError::transport("already closed"))
    }
}

impl StreamingProvider for NativeStreamingProvider {
    fn generate_stream<'a>(
        &'a self,
        _request: GenerationRequest,
    ) -> ProviderFuture<'a, Result<BoxedChunkStream<'a>, ProviderError>> {
        Box::pin(async {
            Ok(Box::pin(VecChunkStream::new(vec![
                Ok(StreamChunk::Delta("He".to_string())),
                Ok(StreamChunk::Delta("llo".to_string())),
                Ok(StreamChunk::done()),
            ])) as BoxedChunkStream<'a>)
        })
    }
}

#[derive(Default)]
struct RecordingHooks {
    events: Mutex<Vec<String>>,
}

impl RecordingHooks {
    fn events(&self) -> Vec<String> {
        self.events.lock().expect("events lock").clone()
    }
}

impl ProviderOperationHooks for RecordingHooks {
    fn on_operation_start(&self, provider: &str, operation: ProviderOperation) {
        self.events
            .lock()
            .expect("events lock")
            .push(format!("start:{provider}:{operation}"));
    }

    fn on_success(&self, provider: &str, operation: ProviderOperation, _elapsed: Duration) {
        self.events
            .lock()
            .expect("events lock")
            .push(format!("success:{provider}:{operation}"));
    }

    fn on_failure(
        &self,
        provider: &str,
        operation: ProviderOperation,
        _elapsed: Duration,
        error: &ProviderError,
    ) {
        self.events
            .lock()
            .expect("events lock")
            .push(format!("failure:{provider}:{operation}:{:?}", error.kind));
    }
}

fn request() -> GenerationRequest {
    GenerationRequest::new(vec![Message::new(Role::User, "hi")])
}

#[tokio::test]
async fn fallback_stream_emits_full_content_then_done() {
    let manager = GenerationManager::from_adapter(ProviderAdapter::new(NonStreamingProvider::new(
        Reply::Content("Hello"),
    )));
    assert!(!manager.supports_native_streaming());

    let chunks = manager
        .generate_stream(request())
        .await
        .expect("stream should open")
        .collect::<Vec<_>>()
        .await;

    assert_eq!(
        chunks,
        vec![
            Ok(StreamChunk::Delta("Hello".to_string())),
            Ok(StreamChunk::Done {
                finish_reason: Some("stop".to_string()),
                usage: Some(TokenUsage::new(4, 2)),
            }),
        ]
    );
}

#[tokio::test]
async fn fallback_stream_omits_empty_delta() {
    let manager =
        GenerationManager::from_adapter(ProviderAdapter::new(NonStreamingProvider::new(Reply::Content(""))));

    let chunks = manager
        .generate_stream(request())
        .await
        .expect("stream should open")
        .collect::<Vec<_>>()
        .await;

    assert_eq!(chunks.len(), 1);
    assert!(matches!(chunks[0], Ok(StreamChunk::Done { .. })));
}

#[tokio::test]
async fn fallback_stream_forwards_generation_error_once() {
    let manager = GenerationManager::from_adapter(ProviderAdapter::new(NonStreamingProvider::new(
        Reply::Fail(ProviderError::upstream(429, None, "slow down")),
    )));

    let chunks = manager
        .generate_stream(request())
        .await
        .expect("stream should open")
        .collect::<Vec<_>>()
        .await;

    assert_eq!(chunks.len(), 1);
    let error = chunks[0].clone().expect_err("only item should be the error");
    assert_eq!(error.kind, ProviderErrorKind::Upstream);
    assert_eq!(error.status, Some(429));
}

#[tokio::test]
async fn native_stream_is_used_when_available() {
    let manager = GenerationManager::from_adapter(ProviderAdapter::streaming(NativeStreamingProvider));
    assert!(manager.supports_native_streaming());
    assert_eq!(manager.provider_name(), "native");

    let content = manager
        .generate_stream(request())
        .await
        .expect("stream should open")
        .filter_map(|chunk| async move {
            match chunk {
                Ok(StreamChunk::Delta(text)) => Some(text),
                _ => None,
            }
        })
        .collect::<String>()
        .await;

    assert_eq!(content, "Hello");
}

#[tokio::test]
async fn operations_report_to_hooks() {
    let hooks = Arc::new(RecordingHooks::default());
    let manager = GenerationManager::from_adapter(ProviderAdapter::streaming(NativeStreamingProvider))
        .with_hooks(hooks.clone());

    manager
        .list_models()
        .await
        .expect("list_models should succeed");
    let error = manager
        .generate(request())
        .await
        .expect_err("generate should fail");
    assert_eq!(error.kind, ProviderErrorKind::Transport);
    assert!(manager.close().is_err());
    let _stream = manager
        .generate_stream(request())
        .await
        .expect("stream should open");

    assert_eq!(
        hooks.events(),
        vec![
            "start:native:list_models".to_string(),
            "success:native:list_models".to_string(),
            "start:native:generate".to_string(),
            "failure:native:generate:Transport".to_string(),
            "start:native:close".to_string(),
            "failure:native:close:Transport".to_string(),
            "start:native:generate_stream".to_string(),
            "success:native:generate_stream".to_string(),
        ]
    );
}

#[tokio::test]
async fn manager_resolves_adapter_through_registry() {
    let mut registry = ProviderRegistry::new();
    registry
        .register("non-streaming", |config: &ProviderConfig| {
            config.require_api_key("non-streaming")?;
            Ok(ProviderAdapter::new(NonStreamingProvider::new(Reply::Content(
                "ok",
            ))))
        })
        .expect("registration should succeed");

    let manager = GenerationManager::new(&registry, "non-streaming", &ProviderConfig::new("key", "m"))
        .expect("manager should build");
    let message = manager
        .generate(request())
        .await
        .expect("generate should succeed");
    assert_eq!(message.content, "ok");

    let error = GenerationManager::new(&registry, "non-streaming", &ProviderConfig::default())
        .expect_err("missing key should fail");
    assert_eq!(error.kind, ProviderErrorKind::Configuration);

    let error = GenerationManager::new(&registry, "absent", &ProviderConfig::new("key", "m"))
        .expect_err("unknown provider should fail");
    assert_eq!(error.kind, ProviderErrorKind::UnsupportedProvider);
}

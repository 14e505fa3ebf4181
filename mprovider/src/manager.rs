//! Generation manager: one resolved adapter behind a uniform streaming API.
//!
//! Adapters without native streaming are still consumed as streams; the
//! manager runs one `generate` call in a background task and forwards its
//! result as at most two chunks.
//!
//! ```rust
//! use mprovider::{GenerationManager, ProviderConfig, ProviderErrorKind, ProviderRegistry};
//!
//! let registry = ProviderRegistry::new();
//! let err = GenerationManager::new(&registry, "missing", &ProviderConfig::default())
//!     .err()
//!     .expect("unknown provider should fail");
//! assert_eq!(err.kind, ProviderErrorKind::UnsupportedProvider);
//! ```

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;

use crate::{
    BoxedChunkStream, GeneratedMessage, GenerationRequest, NoopOperationHooks, ProviderAdapter,
    ProviderConfig, ProviderError, ProviderOperation, ProviderOperationHooks, ProviderRegistry,
    StreamChunk,
};

pub const FALLBACK_CHANNEL_CAPACITY: usize = 2;

#[derive(Clone)]
pub struct GenerationManager {
    adapter: ProviderAdapter,
    hooks: Arc<dyn ProviderOperationHooks>,
}

impl GenerationManager {
    pub fn new(
        registry: &ProviderRegistry,
        name: &str,
        config: &ProviderConfig,
    ) -> Result<Self, ProviderError> {
        let adapter = registry.create(name, config)?;
        Ok(Self::from_adapter(adapter))
    }

    pub fn from_adapter(adapter: ProviderAdapter) -> Self {
        Self {
            adapter,
            hooks: Arc::new(NoopOperationHooks),
        }
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn ProviderOperationHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn provider_name(&self) -> &str {
        self.adapter.name()
    }

    pub fn supports_native_streaming(&self) -> bool {
        self.adapter.supports_native_streaming()
    }

    pub fn adapter(&self) -> &ProviderAdapter {
        &self.adapter
    }

    pub async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GeneratedMessage, ProviderError> {
        let started = self.begin(ProviderOperation::Generate);
        let result = self.adapter.core().generate(request).await;
        self.finish(ProviderOperation::Generate, started, &result);
        result
    }

    /// Opens a chunk stream, natively when the adapter supports it.
    pub async fn generate_stream(
        &self,
        request: GenerationRequest,
    ) -> Result<BoxedChunkStream<'_>, ProviderError> {
        let started = self.begin(ProviderOperation::GenerateStream);
        let result = match self.adapter.streaming_capability() {
            Some(streaming) => streaming.generate_stream(request).await,
            None => Ok(self.fallback_stream(request)),
        };
        self.finish(ProviderOperation::GenerateStream, started, &result);
        result
    }

    pub async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        let started = self.begin(ProviderOperation::ListModels);
        let result = self.adapter.core().list_models().await;
        self.finish(ProviderOperation::ListModels, started, &result);
        result
    }

    pub fn close(&self) -> Result<(), ProviderError> {
        let started = self.begin(ProviderOperation::Close);
        let result = self.adapter.core().close();
        self.finish(ProviderOperation::Close, started, &result);
        result
    }

    fn fallback_stream(&self, request: GenerationRequest) -> BoxedChunkStream<'static> {
        let provider = Arc::clone(self.adapter.core());
        let (sender, mut receiver) = mpsc::channel(FALLBACK_CHANNEL_CAPACITY);

        tokio::spawn(async move {
            let result = tokio::select! {
                _ = sender.closed() => return,
                result = provider.generate(request) => result,
            };

            match result {
                Ok(message) => {
                    if !message.content.is_empty()
                        && sender
                            .send(Ok(StreamChunk::Delta(message.content)))
                            .await
                            .is_err()
                    {
                        return;
                    }

                    let _ = sender
                        .send(Ok(StreamChunk::Done {
                            finish_reason: message.finish_reason,
                            usage: message.usage,
                        }))
                        .await;
                }
                Err(error) => {
                    let _ = sender.send(Err(error)).await;
                }
            }
        });

        Box::pin(async_stream::stream! {
            while let Some(item) = receiver.recv().await {
                yield item;
            }
        })
    }

    fn begin(&self, operation: ProviderOperation) -> Instant {
        self.hooks
            .on_operation_start(self.adapter.name(), operation);
        Instant::now()
    }

    fn finish<T>(
        &self,
        operation: ProviderOperation,
        started: Instant,
        result: &Result<T, ProviderError>,
    ) {
        let elapsed = started.elapsed();
        match result {
            Ok(_) => self
                .hooks
                .on_success(self.adapter.name(), operation, elapsed),
            Err(error) => self
                .hooks
                .on_failure(self.adapter.name(), operation, elapsed, error),
        }
    }
}

impl std::fmt::Debug for GenerationManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationManager")
            .field("adapter", &self.adapter)
            .finish()
    }
}

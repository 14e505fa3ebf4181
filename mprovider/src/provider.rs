//! Provider capability traits and the resolved adapter descriptor.
//!
//! Every adapter implements [`ChatProvider`]. Adapters that can stream
//! natively also implement [`StreamingProvider`]; the descriptor records
//! whether that capability exists so callers never probe for it at runtime.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::{BoxedChunkStream, GeneratedMessage, GenerationRequest, ProviderError};

pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait ChatProvider: Send + Sync {
    fn name(&self) -> &str;

    fn generate<'a>(
        &'a self,
        request: GenerationRequest,
    ) -> ProviderFuture<'a, Result<GeneratedMessage, ProviderError>>;

    fn list_models<'a>(&'a self) -> ProviderFuture<'a, Result<Vec<String>, ProviderError>>;

    fn close(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}

pub trait StreamingProvider: Send + Sync {
    fn generate_stream<'a>(
        &'a self,
        request: GenerationRequest,
    ) -> ProviderFuture<'a, Result<BoxedChunkStream<'a>, ProviderError>>;
}

#[derive(Clone)]
pub struct ProviderAdapter {
    core: Arc<dyn ChatProvider>,
    streaming: Option<Arc<dyn StreamingProvider>>,
}

impl ProviderAdapter {
    /// Descriptor for an adapter without native streaming.
    pub fn new<P>(provider: P) -> Self
    where
        P: ChatProvider + 'static,
    {
        Self {
            core: Arc::new(provider),
            streaming: None,
        }
    }

    pub fn streaming<P>(provider: P) -> Self
    where
        P: ChatProvider + StreamingProvider + 'static,
    {
        let provider = Arc::new(provider);
        let core: Arc<dyn ChatProvider> = provider.clone();
        let streaming: Arc<dyn StreamingProvider> = provider;

        Self {
            core,
            streaming: Some(streaming),
        }
    }

    pub fn from_parts(
        core: Arc<dyn ChatProvider>,
        streaming: Option<Arc<dyn StreamingProvider>>,
    ) -> Self {
        Self { core, streaming }
    }

    pub fn name(&self) -> &str {
        self.core.name()
    }

    pub fn core(&self) -> &Arc<dyn ChatProvider> {
        &self.core
    }

    pub fn streaming_capability(&self) -> Option<&Arc<dyn StreamingProvider>> {
        self.streaming.as_ref()
    }

    pub fn supports_native_streaming(&self) -> bool {
        self.streaming.is_some()
    }
}

impl std::fmt::Debug for ProviderAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderAdapter")
            .field("name", &self.core.name())
            .field("streaming", &self.streaming.is_some())
            .finish()
    }
}

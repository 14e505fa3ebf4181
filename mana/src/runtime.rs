//! Runtime wiring: provider registry, generation manager, store and chat service.

use std::sync::Arc;

use mchat::{ChatError, ChatService, ConversationStore};
use mmemory::create_conversation_store;
use mobserve::{SafeChatStreamHooks, SafeProviderHooks, TracingObservabilityHooks};
use mprovider::{GenerationManager, ProviderError, ProviderRegistry};

use crate::ManaConfig;

#[derive(Clone)]
pub struct ManaRuntime {
    pub manager: Arc<GenerationManager>,
    pub store: Arc<dyn ConversationStore>,
    pub chat: ChatService,
}

impl ManaRuntime {
    pub fn provider_name(&self) -> &str {
        self.manager.provider_name()
    }

    pub fn close(&self) -> Result<(), ProviderError> {
        self.manager.close()
    }
}

/// Registry holding every adapter compiled into this build.
pub fn default_registry() -> Result<ProviderRegistry, ProviderError> {
    #[allow(unused_mut)]
    let mut registry = ProviderRegistry::new();

    #[cfg(feature = "provider-openrouter")]
    mprovider::adapters::openrouter::register(&mut registry)?;
    #[cfg(feature = "provider-openai")]
    mprovider::adapters::openai::register(&mut registry)?;

    Ok(registry)
}

pub fn build_runtime(config: &ManaConfig) -> Result<ManaRuntime, ChatError> {
    let registry = default_registry()?;
    let store = create_conversation_store(config.store.clone())?;
    build_runtime_with(&registry, config, store)
}

/// Builds the runtime against a caller-supplied registry and store.
pub fn build_runtime_with(
    registry: &ProviderRegistry,
    config: &ManaConfig,
    store: Arc<dyn ConversationStore>,
) -> Result<ManaRuntime, ChatError> {
    let manager = GenerationManager::new(registry, &config.provider, &config.provider_config)?
        .with_hooks(Arc::new(SafeProviderHooks::new(TracingObservabilityHooks)));
    let manager = Arc::new(manager);

    let chat = ChatService::builder(Arc::clone(&manager), Arc::clone(&store))
        .with_hooks(Arc::new(SafeChatStreamHooks::new(TracingObservabilityHooks)))
        .build();

    tracing::debug!(
        phase = "runtime",
        event = "built",
        provider = manager.provider_name(),
        model = config.provider_config.model.as_str()
    );

    Ok(ManaRuntime {
        manager,
        store,
        chat,
    })
}

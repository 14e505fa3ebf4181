//! OpenRouter adapter.
//!
//! ```rust
//! use mprovider::adapters::openrouter;
//! use mprovider::{ProviderConfig, ProviderRegistry};
//!
//! let mut registry = ProviderRegistry::new();
//! openrouter::register(&mut registry).expect("first registration");
//! assert!(openrouter::register(&mut registry).is_err());
//!
//! let adapter = registry
//!     .create(openrouter::PROVIDER_NAME, &ProviderConfig::new("sk-or-1", ""))
//!     .expect("adapter should build");
//! assert!(adapter.supports_native_streaming());
//! ```

use std::sync::Arc;

use crate::adapters::openai_compat::{
    OpenAiCompatHttpTransport, OpenAiCompatProvider, OpenAiCompatTransport,
};
use crate::{ProviderAdapter, ProviderConfig, ProviderError, ProviderRegistry};

pub const PROVIDER_NAME: &str = "openrouter";
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "qwen/qwen3-coder:turbo";
pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";
pub const DEFAULT_REFERER: &str = "https://github.com/darling/mana";
pub const DEFAULT_TITLE: &str = "Mana CLI";

pub fn register(registry: &mut ProviderRegistry) -> Result<(), ProviderError> {
    registry.register(PROVIDER_NAME, build)
}

pub fn build(config: &ProviderConfig) -> Result<ProviderAdapter, ProviderError> {
    let transport = http_transport(config)?;
    with_transport(config, Arc::new(transport))
}

/// Builds the adapter over a caller-supplied transport.
pub fn with_transport(
    config: &ProviderConfig,
    transport: Arc<dyn OpenAiCompatTransport>,
) -> Result<ProviderAdapter, ProviderError> {
    let api_key = config.require_api_key(PROVIDER_NAME)?.clone();
    let model = if config.model.trim().is_empty() {
        DEFAULT_MODEL
    } else {
        config.model.as_str()
    };
    let provider =
        OpenAiCompatProvider::new(PROVIDER_NAME, transport, api_key).with_default_model(model);

    Ok(ProviderAdapter::streaming(provider))
}

pub fn http_transport(config: &ProviderConfig) -> Result<OpenAiCompatHttpTransport, ProviderError> {
    let referer = config.referer.as_deref().unwrap_or(DEFAULT_REFERER);
    let title = config.title.as_deref().unwrap_or(DEFAULT_TITLE);

    Ok(OpenAiCompatHttpTransport::from_config(config, DEFAULT_BASE_URL)?
        .with_header("HTTP-Referer", referer)
        .with_header("X-Title", title))
}

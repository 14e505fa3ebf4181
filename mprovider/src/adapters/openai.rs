//! OpenAI adapter over the shared chat-completions transport.

use std::sync::Arc;

use crate::adapters::openai_compat::{
    OpenAiCompatHttpTransport, OpenAiCompatProvider, OpenAiCompatTransport,
};
use crate::{ProviderAdapter, ProviderConfig, ProviderError, ProviderRegistry};

pub const PROVIDER_NAME: &str = "openai";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

pub fn register(registry: &mut ProviderRegistry) -> Result<(), ProviderError> {
    registry.register(PROVIDER_NAME, build)
}

pub fn build(config: &ProviderConfig) -> Result<ProviderAdapter, ProviderError> {
    let transport = OpenAiCompatHttpTransport::from_config(config, DEFAULT_BASE_URL)?;
    with_transport(config, Arc::new(transport))
}

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

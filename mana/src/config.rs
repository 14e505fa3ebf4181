//! Environment-driven runtime configuration.
//!
//! ```rust
//! use mana::{ManaConfig, StoreConfig};
//!
//! let config = ManaConfig::from_lookup(|name| match name {
//!     "MANA_PROVIDER" => Some("openrouter".to_string()),
//!     "OPENROUTER_API_KEY" => Some("sk-or-1".to_string()),
//!     "MANA_STORE" => Some("memory".to_string()),
//!     _ => None,
//! })
//! .expect("config should resolve");
//!
//! assert_eq!(config.provider, "openrouter");
//! assert_eq!(config.provider_config.model, "qwen/qwen3-coder:turbo");
//! assert_eq!(config.store, StoreConfig::InMemory);
//! ```

use std::path::PathBuf;

use mmemory::{StoreConfig, default_sqlite_path};
use mprovider::{ProviderConfig, ProviderError};

pub const PROVIDER_ENV: &str = "MANA_PROVIDER";
pub const API_KEY_ENV: &str = "MANA_API_KEY";
pub const MODEL_ENV: &str = "MANA_MODEL";
pub const BASE_URL_ENV: &str = "MANA_BASE_URL";
pub const STORE_ENV: &str = "MANA_STORE";
pub const SQLITE_PATH_ENV: &str = "MANA_SQLITE_PATH";

pub const DEFAULT_PROVIDER: &str = "openrouter";

#[derive(Debug, Clone)]
pub struct ManaConfig {
    pub provider: String,
    pub provider_config: ProviderConfig,
    pub store: StoreConfig,
}

struct ProviderDefaults {
    api_key_env: &'static str,
    model: &'static str,
}

fn provider_defaults(provider: &str) -> Option<ProviderDefaults> {
    match provider {
        #[cfg(feature = "provider-openrouter")]
        mprovider::adapters::openrouter::PROVIDER_NAME => Some(ProviderDefaults {
            api_key_env: mprovider::adapters::openrouter::API_KEY_ENV,
            model: mprovider::adapters::openrouter::DEFAULT_MODEL,
        }),
        #[cfg(feature = "provider-openai")]
        mprovider::adapters::openai::PROVIDER_NAME => Some(ProviderDefaults {
            api_key_env: mprovider::adapters::openai::API_KEY_ENV,
            model: mprovider::adapters::openai::DEFAULT_MODEL,
        }),
        _ => None,
    }
}

impl ManaConfig {
    pub fn from_env() -> Result<Self, ProviderError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolves configuration through `lookup`, treating blank values as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ProviderError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let provider = value(PROVIDER_ENV)
            .map(|provider| provider.to_ascii_lowercase())
            .unwrap_or_else(|| DEFAULT_PROVIDER.to_string());
        let defaults = provider_defaults(&provider)
            .ok_or_else(|| ProviderError::unsupported_provider(&provider))?;

        let api_key = value(API_KEY_ENV)
            .or_else(|| value(defaults.api_key_env))
            .ok_or_else(|| {
                ProviderError::configuration(format!(
                    "API key is required for provider '{provider}': set {API_KEY_ENV} or {}",
                    defaults.api_key_env
                ))
            })?;
        let model = value(MODEL_ENV).unwrap_or_else(|| defaults.model.to_string());

        let mut provider_config = ProviderConfig::new(api_key, model);
        if let Some(base_url) = value(BASE_URL_ENV) {
            provider_config = provider_config.with_base_url(base_url);
        }

        let store = match value(STORE_ENV).map(|store| store.to_ascii_lowercase()).as_deref() {
            None | Some("sqlite") => StoreConfig::Sqlite {
                path: value(SQLITE_PATH_ENV)
                    .map(PathBuf::from)
                    .unwrap_or_else(default_sqlite_path),
            },
            Some("memory") | Some("in-memory") => StoreConfig::InMemory,
            Some(other) => {
                return Err(ProviderError::configuration(format!(
                    "unknown {STORE_ENV} value '{other}': expected 'memory' or 'sqlite'"
                )));
            }
        };

        Ok(Self {
            provider,
            provider_config,
            store,
        })
    }
}

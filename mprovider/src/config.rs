//! Adapter construction settings.
//!
//! ```rust
//! use std::time::Duration;
//!
//! use mprovider::ProviderConfig;
//!
//! let config = ProviderConfig::new("sk-or-123", "qwen/qwen3-coder:turbo")
//!     .with_base_url("http://127.0.0.1:8080/v1")
//!     .with_timeout(Duration::from_secs(5));
//!
//! assert_eq!(config.base_url.as_deref(), Some("http://127.0.0.1:8080/v1"));
//! assert!(config.require_api_key("openrouter").is_ok());
//! assert!(format!("{config:?}").contains("[REDACTED]"));
//! ```

use std::time::Duration;

use crate::{ProviderError, SecretString};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(90);

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_key: SecretString,
    /// Fallback model when a request carries no override. When empty, the
    /// named adapters use their own default model.
    pub model: String,
    pub base_url: Option<String>,
    pub timeout: Duration,
    /// Attribution headers for providers that accept them.
    pub referer: Option<String>,
    pub title: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: SecretString::default(),
            model: String::new(),
            base_url: None,
            timeout: DEFAULT_REQUEST_TIMEOUT,
            referer: None,
            title: None,
        }
    }
}

impl ProviderConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key),
            model: model.into(),
            ..Self::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_attribution(mut self, referer: impl Into<String>, title: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self.title = Some(title.into());
        self
    }

    pub fn require_api_key(&self, provider: &str) -> Result<&SecretString, ProviderError> {
        if self.api_key.is_blank() {
            return Err(ProviderError::configuration(format!(
                "API key is required for provider '{provider}'"
            )));
        }

        Ok(&self.api_key)
    }
}

//! Shared provider error kinds and error value helpers.
//!
//! ```rust
//! use mprovider::{ProviderError, ProviderErrorKind};
//!
//! let denied = ProviderError::upstream(401, Some("401".into()), "No auth credentials found");
//! assert_eq!(denied.kind, ProviderErrorKind::Upstream);
//! assert_eq!(denied.status, Some(401));
//! assert!(!denied.retryable);
//!
//! let overloaded = ProviderError::upstream(503, None, "overloaded");
//! assert!(overloaded.retryable);
//! ```

use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    Configuration,
    UnsupportedProvider,
    InvalidRequest,
    Upstream,
    Protocol,
    EmptyResponse,
    Transport,
    Timeout,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
    /// HTTP status reported by the provider, when the failure came from one.
    pub status: Option<u16>,
    /// Provider-specific error code from the response body.
    pub code: Option<String>,
    /// Classification only; nothing in this workspace retries.
    pub retryable: bool,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            code: None,
            retryable,
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Configuration, message, false)
    }

    pub fn unsupported_provider(name: &str) -> Self {
        Self::new(
            ProviderErrorKind::UnsupportedProvider,
            format!("unsupported provider: {name}"),
            false,
        )
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::InvalidRequest, message, false)
    }

    pub fn upstream(status: u16, code: Option<String>, message: impl Into<String>) -> Self {
        let retryable = status == 408 || status == 429 || status >= 500;
        Self {
            status: Some(status),
            code,
            ..Self::new(ProviderErrorKind::Upstream, message, retryable)
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Protocol, message, false)
    }

    pub fn empty_response(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::EmptyResponse, message, false)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Transport, message, true)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Timeout, message, true)
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Cancelled, message, false)
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match (self.status, self.code.as_deref()) {
            (Some(status), Some(code)) => write!(
                f,
                "{:?} (status {status}, code {code}): {}",
                self.kind, self.message
            ),
            (Some(status), None) => write!(f, "{:?} (status {status}): {}", self.kind, self.message),
            (None, Some(code)) => write!(f, "{:?} (code {code}): {}", self.kind, self.message),
            (None, None) => write!(f, "{:?}: {}", self.kind, self.message),
        }
    }
}

impl Error for ProviderError {}

//! Tracing and metrics hooks for provider operations and assistant streams.
//!
//! ```rust
//! use mobserve::{
//!     MetricsObservabilityHooks, SafeChatStreamHooks, SafeProviderHooks,
//!     TracingObservabilityHooks,
//! };
//!
//! let _provider_hooks = SafeProviderHooks::new(TracingObservabilityHooks);
//! let _stream_hooks = SafeChatStreamHooks::new(MetricsObservabilityHooks);
//! ```

mod metrics_hooks;
mod safe_hooks;
mod tracing_hooks;

pub use metrics_hooks::MetricsObservabilityHooks;
pub use safe_hooks::{SafeChatStreamHooks, SafeProviderHooks};
pub use tracing_hooks::TracingObservabilityHooks;

pub mod prelude {
    pub use crate::{
        MetricsObservabilityHooks, SafeChatStreamHooks, SafeProviderHooks,
        TracingObservabilityHooks,
    };
}

#[cfg(test)]
mod tests;

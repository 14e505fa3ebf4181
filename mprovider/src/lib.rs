//! Provider adapters and generation orchestration for the mana workspace.
//!
//! ```rust
//! use mprovider::prelude::*;
//!
//! let request = GenerationRequest::new(vec![Message::new(Role::User, "hello")]);
//! assert!(request.validate().is_ok());
//!
//! let registry = ProviderRegistry::new();
//! assert!(registry.names().is_empty());
//! ```

pub mod adapters;
pub mod config;
pub mod credentials;
pub mod error;
pub mod hooks;
pub mod manager;
pub mod model;
pub mod prelude;
pub mod provider;
pub mod registry;
pub mod sse;
pub mod stream;

pub use config::{DEFAULT_REQUEST_TIMEOUT, ProviderConfig};
pub use credentials::SecretString;
pub use error::{ProviderError, ProviderErrorKind};
pub use hooks::{NoopOperationHooks, ProviderOperation, ProviderOperationHooks};
pub use manager::{FALLBACK_CHANNEL_CAPACITY, GenerationManager};
pub use mcommon::{BoxFuture, MetadataMap};
pub use model::{GeneratedMessage, GenerationConfig, GenerationRequest, Message, Role, TokenUsage};
pub use provider::{ChatProvider, ProviderAdapter, ProviderFuture, StreamingProvider};
pub use registry::{ProviderConstructor, ProviderRegistry};
pub use stream::{BoxedChunkStream, ChunkStream, StreamChunk, VecChunkStream};

//! Common `mprovider` imports for downstream crates.

pub use crate::{
    BoxedChunkStream, ChatProvider, ChunkStream, GeneratedMessage, GenerationConfig,
    GenerationManager, GenerationRequest, Message, NoopOperationHooks, ProviderAdapter,
    ProviderConfig, ProviderError, ProviderErrorKind, ProviderFuture, ProviderOperation,
    ProviderOperationHooks, ProviderRegistry, Role, SecretString, StreamChunk, StreamingProvider,
    TokenUsage,
};
pub use mcommon::{BoxFuture, MetadataMap};

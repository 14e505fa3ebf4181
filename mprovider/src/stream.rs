//! Streaming chunk contracts and in-memory stream utilities.
//!
//! ```rust
//! use mprovider::{BoxedChunkStream, StreamChunk, VecChunkStream};
//!
//! let stream = VecChunkStream::new(vec![
//!     Ok(StreamChunk::Delta("hello".into())),
//!     Ok(StreamChunk::done()),
//! ]);
//! let _boxed: BoxedChunkStream<'static> = Box::pin(stream);
//! ```

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;

use crate::{ProviderError, TokenUsage};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamChunk {
    Delta(String),
    Done {
        finish_reason: Option<String>,
        usage: Option<TokenUsage>,
    },
}

impl StreamChunk {
    pub fn done() -> Self {
        Self::Done {
            finish_reason: None,
            usage: None,
        }
    }
}

/// Provider stream contract.
///
/// Invariants for consumers:
/// - Chunks are emitted in source order.
/// - `Delta` may appear zero or more times.
/// - At most one terminal item is produced: `Done` or an `Err`, and nothing
///   follows it.
/// - A stream that ends with neither is treated as completed.
pub trait ChunkStream: Stream<Item = Result<StreamChunk, ProviderError>> + Send {}

impl<T> ChunkStream for T where T: Stream<Item = Result<StreamChunk, ProviderError>> + Send {}

pub type BoxedChunkStream<'a> = Pin<Box<dyn ChunkStream + 'a>>;

#[derive(Debug)]
pub struct VecChunkStream {
    chunks: VecDeque<Result<StreamChunk, ProviderError>>,
}

impl VecChunkStream {
    pub fn new(chunks: Vec<Result<StreamChunk, ProviderError>>) -> Self {
        Self {
            chunks: chunks.into(),
        }
    }
}

impl Stream for VecChunkStream {
    type Item = Result<StreamChunk, ProviderError>;

    fn poll_next(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<StreamChunk, ProviderError>>> {
        Poll::Ready(self.chunks.pop_front())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.chunks.len(), Some(self.chunks.len()))
    }
}

//! Shared plumbing for providers that speak the chat-completions wire format.

mod provider;
mod serde_api;
mod tests;
mod transport;
mod types;

pub use provider::OpenAiCompatProvider;
pub use serde_api::decode_chat_stream;
pub use transport::{OpenAiCompatHttpTransport, OpenAiCompatTransport};
pub use types::{OpenAiCompatRequest, OpenAiCompatResponse};

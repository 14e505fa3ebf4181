//! Neutral request and response values exchanged with a compat transport.

use serde_json::{Map, Value};

use crate::{Message, Role, TokenUsage};

#[derive(Debug, Clone, PartialEq)]
pub struct OpenAiCompatRequest {
    /// Empty means the provider account default.
    pub model: String,
    pub messages: Vec<Message>,
    pub parameters: Map<String, Value>,
    pub stream: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenAiCompatResponse {
    pub id: String,
    pub model: String,
    pub role: Role,
    pub content: String,
    pub finish_reason: Option<String>,
    pub usage: Option<TokenUsage>,
}

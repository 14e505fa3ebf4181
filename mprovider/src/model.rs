//! Provider-agnostic message, request, and generation result types.
//!
//! ```rust
//! use mprovider::{GenerationRequest, Message, ProviderErrorKind, Role};
//!
//! let request = GenerationRequest::new(vec![Message::new(Role::User, "Summarize this diff")])
//!     .with_model("qwen/qwen3-coder:turbo")
//!     .with_system_prompt("Be brief.");
//! assert!(request.validate().is_ok());
//!
//! let messages = request.effective_messages();
//! assert_eq!(messages[0].role, Role::System);
//! assert_eq!(messages[1].content, "Summarize this diff");
//!
//! let err = GenerationRequest::new(Vec::new()).validate().unwrap_err();
//! assert_eq!(err.kind, ProviderErrorKind::InvalidRequest);
//! ```

use std::fmt::{Display, Formatter};

use serde_json::{Map, Value};

use crate::ProviderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "system" => Some(Self::System),
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            "tool" => Some(Self::Tool),
            _ => None,
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

/// Per-call overrides. `parameters` is adapter-specific and forwarded as-is.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GenerationConfig {
    pub model: Option<String>,
    pub system_prompt: Option<String>,
    pub parameters: Map<String, Value>,
}

impl GenerationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Returns the model override when it is present and not blank.
    pub fn model_override(&self) -> Option<&str> {
        self.model
            .as_deref()
            .map(str::trim)
            .filter(|model| !model.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub messages: Vec<Message>,
    pub config: GenerationConfig,
}

impl GenerationRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            config: GenerationConfig::default(),
        }
    }

    pub fn with_config(mut self, config: GenerationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.parameters.insert(key.into(), value.into());
        self
    }

    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.messages.is_empty() {
            return Err(ProviderError::invalid_request(
                "generation request requires at least one message",
            ));
        }

        Ok(())
    }

    /// History with the system-prompt override applied: existing system
    /// messages are replaced by a single leading one.
    pub fn effective_messages(&self) -> Vec<Message> {
        let Some(system_prompt) = self
            .config
            .system_prompt
            .as_deref()
            .filter(|prompt| !prompt.trim().is_empty())
        else {
            return self.messages.clone();
        };

        let mut messages = Vec::with_capacity(self.messages.len() + 1);
        messages.push(Message::new(Role::System, system_prompt));
        messages.extend(
            self.messages
                .iter()
                .filter(|message| message.role != Role::System)
                .cloned(),
        );
        messages
    }

    /// Folds the system-prompt override into `messages` and clears it.
    pub fn with_resolved_system_prompt(mut self) -> Self {
        self.messages = self.effective_messages();
        self.config.system_prompt = None;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedMessage {
    pub id: String,
    pub provider: String,
    pub model: String,
    pub role: Role,
    pub content: String,
    pub finish_reason: Option<String>,
    pub usage: Option<TokenUsage>,
}

//! Chat-completions wire payloads, error bodies, and SSE chunk decoding.

use async_stream::try_stream;
use futures_core::Stream;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::sse::{SseFrame, SseLineDecoder, classify_line};
use crate::{BoxedChunkStream, ProviderError, ProviderErrorKind, Role, StreamChunk, TokenUsage};

use super::types::{OpenAiCompatRequest, OpenAiCompatResponse};

/// Body keys owned by the adapter; parameters may not override them.
const RESERVED_KEYS: [&str; 3] = ["model", "messages", "stream"];

pub(crate) fn build_api_request(
    request: OpenAiCompatRequest,
) -> Result<ApiRequest, ProviderError> {
    if request.messages.is_empty() {
        return Err(ProviderError::invalid_request(
            "chat completion request requires at least one message",
        ));
    }

    let messages = request
        .messages
        .into_iter()
        .map(|message| ApiMessage {
            role: message.role.as_str(),
            content: message.content,
        })
        .collect();

    let mut parameters = request.parameters;
    for key in RESERVED_KEYS {
        parameters.remove(key);
    }

    Ok(ApiRequest {
        model: request.model,
        messages,
        stream: request.stream,
        parameters,
    })
}

/// Maps a non-success HTTP response to an `Upstream` error, preferring the
/// provider's own code and message when the body carries them.
pub(crate) fn upstream_error(status: u16, body: &str) -> ProviderError {
    match serde_json::from_str::<ApiErrorEnvelope>(body) {
        Ok(envelope) if !envelope.error.message.trim().is_empty() => {
            let code = envelope.error.code_string();
            ProviderError::upstream(status, code, envelope.error.message)
        }
        _ => ProviderError::upstream(
            status,
            None,
            format!("API request failed with status {status}"),
        ),
    }
}

fn embedded_error(error: ApiError) -> ProviderError {
    let code = error.code_string();
    let message = if error.message.trim().is_empty() {
        "provider reported an error without a message".to_string()
    } else {
        error.message
    };

    let mut provider_error = ProviderError::new(ProviderErrorKind::Upstream, message, false);
    provider_error.code = code;
    provider_error
}

pub(crate) fn parse_response(body: &str) -> Result<OpenAiCompatResponse, ProviderError> {
    let parsed = serde_json::from_str::<ApiResponse>(body)
        .map_err(|err| ProviderError::protocol(format!("failed to decode response: {err}")))?;

    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::empty_response("no choices in response"))?;

    if let Some(error) = choice.error {
        return Err(embedded_error(error));
    }

    let message = choice.message.unwrap_or_default();
    let role = message
        .role
        .as_deref()
        .and_then(Role::parse)
        .unwrap_or(Role::Assistant);

    Ok(OpenAiCompatResponse {
        id: parsed.id,
        model: parsed.model,
        role,
        content: message.content.unwrap_or_default(),
        finish_reason: choice.finish_reason.filter(|reason| !reason.is_empty()),
        usage: parsed.usage.map(TokenUsage::from),
    })
}

pub(crate) fn parse_model_list(body: &str) -> Result<Vec<String>, ProviderError> {
    let parsed = serde_json::from_str::<ApiModelList>(body)
        .map_err(|err| ProviderError::protocol(format!("failed to decode model list: {err}")))?;

    Ok(parsed.data.into_iter().map(|model| model.id).collect())
}

/// Turns a chat-completions SSE body into neutral chunks.
///
/// Terminates on `[DONE]`, on the first non-empty `finish_reason`, or at end
/// of body; each path ends with exactly one `Done`. A chunk that cannot be
/// decoded ends the stream with a `Protocol` error.
pub fn decode_chat_stream<'a, S, B>(body: S) -> BoxedChunkStream<'a>
where
    S: Stream<Item = Result<B, ProviderError>> + Send + 'a,
    B: AsRef<[u8]> + Send + 'a,
{
    let stream = try_stream! {
        let mut body = Box::pin(body);
        let mut decoder = SseLineDecoder::new();
        let mut body_ended = false;
        let mut finish_reason = None;
        let mut usage = None;

        loop {
            let line = match decoder.next_line() {
                Some(line) => line?,
                None if body_ended => match decoder.finish() {
                    Some(line) => line?,
                    None => break,
                },
                None => {
                    match body.next().await {
                        Some(bytes) => decoder.push(bytes?.as_ref()),
                        None => body_ended = true,
                    }
                    continue;
                }
            };

            match interpret_line(&line)? {
                StreamLine::Skip => {}
                StreamLine::Done => break,
                StreamLine::Chunk(chunk) => {
                    if chunk.usage.is_some() {
                        usage = chunk.usage;
                    }

                    // Content after the finish chunk is dropped; usage may
                    // still follow in a choiceless chunk.
                    if finish_reason.is_some() {
                        continue;
                    }

                    if let Some(delta) = chunk.delta {
                        yield StreamChunk::Delta(delta);
                    }

                    if chunk.finish_reason.is_some() {
                        finish_reason = chunk.finish_reason;
                    }
                }
            }
        }

        yield StreamChunk::Done { finish_reason, usage };
    };

    Box::pin(stream)
}

#[derive(Debug, PartialEq, Eq)]
enum StreamLine {
    Skip,
    Done,
    Chunk(ParsedChunk),
}

#[derive(Debug, PartialEq, Eq)]
struct ParsedChunk {
    delta: Option<String>,
    finish_reason: Option<String>,
    usage: Option<TokenUsage>,
}

fn interpret_line(line: &str) -> Result<StreamLine, ProviderError> {
    let payload = match classify_line(line) {
        SseFrame::Ignored => return Ok(StreamLine::Skip),
        SseFrame::Done => return Ok(StreamLine::Done),
        SseFrame::Data(payload) => payload,
    };

    let chunk = serde_json::from_str::<ApiStreamChunk>(payload)
        .map_err(|err| ProviderError::protocol(format!("failed to decode stream chunk: {err}")))?;

    if let Some(error) = chunk.error {
        return Err(embedded_error(error));
    }

    let usage = chunk.usage.map(TokenUsage::from);
    let Some(choice) = chunk.choices.into_iter().next() else {
        return Ok(StreamLine::Chunk(ParsedChunk {
            delta: None,
            finish_reason: None,
            usage,
        }));
    };

    if let Some(error) = choice.error {
        return Err(embedded_error(error));
    }

    Ok(StreamLine::Chunk(ParsedChunk {
        delta: choice
            .delta
            .and_then(|delta| delta.content)
            .filter(|content| !content.is_empty()),
        finish_reason: choice.finish_reason.filter(|reason| !reason.is_empty()),
        usage,
    }))
}

#[derive(Debug, Serialize)]
pub(crate) struct ApiRequest {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub model: String,
    pub messages: Vec<ApiMessage>,
    pub stream: bool,
    #[serde(flatten)]
    pub parameters: Map<String, Value>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ApiMessage {
    pub role: &'static str,
    pub content: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: Option<Value>,
    #[serde(default)]
    message: String,
}

impl ApiError {
    fn code_string(&self) -> Option<String> {
        match self.code.as_ref()? {
            Value::String(code) if !code.is_empty() => Some(code.clone()),
            Value::Number(code) => Some(code.to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: Option<ApiAssistantMessage>,
    finish_reason: Option<String>,
    error: Option<ApiError>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiAssistantMessage {
    role: Option<String>,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

impl From<ApiUsage> for TokenUsage {
    fn from(value: ApiUsage) -> Self {
        Self {
            prompt_tokens: value.prompt_tokens,
            completion_tokens: value.completion_tokens,
            total_tokens: value.total_tokens,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiStreamChunk {
    #[serde(default)]
    choices: Vec<ApiStreamChoice>,
    usage: Option<ApiUsage>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiStreamChoice {
    delta: Option<ApiStreamDelta>,
    finish_reason: Option<String>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiStreamDelta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiModelList {
    data: Vec<ApiModel>,
}

#[derive(Debug, Deserialize)]
struct ApiModel {
    id: String,
}

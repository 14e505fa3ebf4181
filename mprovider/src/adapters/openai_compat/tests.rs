//! Focused unit tests for chat-completions adapter internals.

#![cfg(test)]

use std::sync::Arc;

use futures_util::{StreamExt, stream};
use serde_json::json;

use crate::{
    BoxedChunkStream, GenerationRequest, Message, ProviderError, ProviderErrorKind,
    ProviderFuture, Role, SecretString, StreamChunk, TokenUsage,
};

use super::provider::OpenAiCompatProvider;
use super::serde_api::{
    build_api_request, decode_chat_stream, parse_model_list, parse_response, upstream_error,
};
use super::transport::OpenAiCompatTransport;
use super::types::{OpenAiCompatRequest, OpenAiCompatResponse};

#[derive(Debug)]
struct NoopTransport;

impl OpenAiCompatTransport for NoopTransport {
    fn complete<'a>(
        &'a self,
        _request: OpenAiCompatRequest,
        _api_key: SecretString,
    ) -> ProviderFuture<'a, Result<OpenAiCompatResponse, ProviderError>> {
        Box::pin(async { Err(ProviderError::transport("not used")) })
    }

    fn stream<'a>(
        &'a self,
        _request: OpenAiCompatRequest,
        _api_key: SecretString,
    ) -> ProviderFuture<'a, Result<BoxedChunkStream<'a>, ProviderError>> {
        Box::pin(async { Err(ProviderError::transport("not used")) })
    }

    fn list_models<'a>(
        &'a self,
        _api_key: SecretString,
    ) -> ProviderFuture<'a, Result<Vec<String>, ProviderError>> {
        Box::pin(async { Ok(Vec::new()) })
    }
}

fn provider(default_model: &str) -> OpenAiCompatProvider {
    OpenAiCompatProvider::new("compat", Arc::new(NoopTransport), SecretString::new("key"))
        .with_default_model(default_model)
}

async fn decode_bytes(frames: Vec<Vec<u8>>) -> Vec<Result<StreamChunk, ProviderError>> {
    let body = stream::iter(frames.into_iter().map(Ok::<_, ProviderError>));
    decode_chat_stream(body).collect().await
}

async fn decode_text(frames: &[&str]) -> Vec<Result<StreamChunk, ProviderError>> {
    decode_bytes(frames.iter().map(|frame| frame.as_bytes().to_vec()).collect()).await
}

#[test]
fn build_request_prefers_override_then_default_model() {
    let request = GenerationRequest::new(vec![Message::new(Role::User, "hi")]);
    let built = provider("fallback")
        .build_request(request.clone(), false)
        .expect("request should build");
    assert_eq!(built.model, "fallback");
    assert!(!built.stream);

    let built = provider("fallback")
        .build_request(request.with_model("override"), true)
        .expect("request should build");
    assert_eq!(built.model, "override");
    assert!(built.stream);
}

#[test]
fn build_request_applies_system_prompt_and_rejects_empty_history() {
    let request = GenerationRequest::new(vec![
        Message::new(Role::System, "old"),
        Message::new(Role::User, "hi"),
    ])
    .with_system_prompt("new");
    let built = provider("")
        .build_request(request, false)
        .expect("request should build");
    assert_eq!(built.messages[0], Message::new(Role::System, "new"));
    assert_eq!(built.messages.len(), 2);

    let error = provider("")
        .build_request(GenerationRequest::new(Vec::new()), false)
        .expect_err("empty history should fail");
    assert_eq!(error.kind, ProviderErrorKind::InvalidRequest);
}

#[test]
fn api_request_flattens_parameters_without_overriding_reserved_keys() {
    let mut parameters = serde_json::Map::new();
    parameters.insert("temperature".to_string(), json!(0.2));
    parameters.insert("model".to_string(), json!("sneaky"));
    parameters.insert("stream".to_string(), json!(false));

    let api_request = build_api_request(OpenAiCompatRequest {
        model: "m".to_string(),
        messages: vec![Message::new(Role::User, "hi")],
        parameters,
        stream: true,
    })
    .expect("request should build");

    let body = serde_json::to_value(&api_request).expect("request should serialize");
    assert_eq!(
        body,
        json!({
            "model": "m",
            "messages": [{"role": "user", "content": "hi"}],
            "stream": true,
            "temperature": 0.2,
        })
    );
}

#[test]
fn api_request_omits_empty_model() {
    let api_request = build_api_request(OpenAiCompatRequest {
        model: String::new(),
        messages: vec![Message::new(Role::User, "hi")],
        parameters: serde_json::Map::new(),
        stream: false,
    })
    .expect("request should build");

    let body = serde_json::to_value(&api_request).expect("request should serialize");
    assert!(body.get("model").is_none());
}

#[test]
fn upstream_error_prefers_provider_code_and_message() {
    let error = upstream_error(
        401,
        r#"{"error":{"code":401,"message":"No auth credentials found"}}"#,
    );
    assert_eq!(error.kind, ProviderErrorKind::Upstream);
    assert_eq!(error.status, Some(401));
    assert_eq!(error.code.as_deref(), Some("401"));
    assert_eq!(error.message, "No auth credentials found");

    let error = upstream_error(400, r#"{"error":{"code":"model_not_found","message":"bad"}}"#);
    assert_eq!(error.code.as_deref(), Some("model_not_found"));

    let error = upstream_error(500, "<html>oops</html>");
    assert_eq!(error.code, None);
    assert_eq!(error.message, "API request failed with status 500");
    assert!(error.retryable);
}

#[test]
fn parse_response_maps_first_choice() {
    let response = parse_response(
        r#"{
            "id": "gen-1",
            "model": "qwen/qwen3-coder",
            "choices": [{"message": {"role": "assistant", "content": "Hello"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 5, "completion_tokens": 2, "total_tokens": 7}
        }"#,
    )
    .expect("response should parse");

    assert_eq!(response.id, "gen-1");
    assert_eq!(response.role, Role::Assistant);
    assert_eq!(response.content, "Hello");
    assert_eq!(response.finish_reason.as_deref(), Some("stop"));
    assert_eq!(response.usage, Some(TokenUsage::new(5, 2)));
}

#[test]
fn parse_response_classifies_failures() {
    let empty = parse_response(r#"{"id":"x","choices":[]}"#).expect_err("no choices");
    assert_eq!(empty.kind, ProviderErrorKind::EmptyResponse);

    let embedded = parse_response(
        r#"{"choices":[{"error":{"code":502,"message":"upstream model failed"}}]}"#,
    )
    .expect_err("choice error");
    assert_eq!(embedded.kind, ProviderErrorKind::Upstream);
    assert_eq!(embedded.code.as_deref(), Some("502"));
    assert_eq!(embedded.message, "upstream model failed");

    let malformed = parse_response("{not json").expect_err("malformed");
    assert_eq!(malformed.kind, ProviderErrorKind::Protocol);
}

#[test]
fn parse_model_list_reads_ids() {
    let models = parse_model_list(r#"{"data":[{"id":"a/one"},{"id":"b/two","name":"Two"}]}"#)
        .expect("list should parse");
    assert_eq!(models, vec!["a/one".to_string(), "b/two".to_string()]);

    let empty = parse_model_list(r#"{"data":[]}"#).expect("empty list should parse");
    assert!(empty.is_empty());

    let malformed = parse_model_list(r#"{"models":[]}"#).expect_err("missing data");
    assert_eq!(malformed.kind, ProviderErrorKind::Protocol);
}

#[tokio::test]
async fn stream_reassembles_lines_split_across_frames() {
    let chunks = decode_text(&[
        ": OPENROUTER PROCESSING\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"He\"}}]}\n\nda",
        "ta: {\"choices\":[{\"delta\":{\"content\":\"llo\"}}]}\n",
        "\ndata: [DONE]\n\n",
    ])
    .await;

    assert_eq!(
        chunks,
        vec![
            Ok(StreamChunk::Delta("He".to_string())),
            Ok(StreamChunk::Delta("llo".to_string())),
            Ok(StreamChunk::done()),
        ]
    );
}

#[tokio::test]
async fn stream_reassembles_split_utf8_sequences() {
    let line = "data: {\"choices\":[{\"delta\":{\"content\":\"caf\u{e9}\"}}]}\n".as_bytes();
    let split = line
        .iter()
        .position(|byte| *byte == 0xC3)
        .expect("lead byte")
        + 1;

    let chunks = decode_bytes(vec![line[..split].to_vec(), line[split..].to_vec()]).await;
    assert_eq!(
        chunks,
        vec![
            Ok(StreamChunk::Delta("caf\u{e9}".to_string())),
            Ok(StreamChunk::done()),
        ]
    );
}

#[tokio::test]
async fn stream_finish_reason_terminates_after_its_delta() {
    let chunks = decode_text(&[
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"},\"finish_reason\":\"stop\"}],\"usage\":{\"prompt_tokens\":3,\"completion_tokens\":1,\"total_tokens\":4}}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"ignored\"}}]}\n\n",
    ])
    .await;

    assert_eq!(
        chunks,
        vec![
            Ok(StreamChunk::Delta("Hi".to_string())),
            Ok(StreamChunk::Done {
                finish_reason: Some("stop".to_string()),
                usage: Some(TokenUsage::new(3, 1)),
            }),
        ]
    );
}

#[tokio::test]
async fn stream_captures_trailing_usage_from_choiceless_chunk() {
    let chunks = decode_text(&[
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"},\"finish_reason\":\"\"}]}\n\n",
        "data: {\"choices\":[],\"usage\":{\"prompt_tokens\":1,\"completion_tokens\":1,\"total_tokens\":2}}\n\n",
        "data: [DONE]\n\n",
    ])
    .await;

    assert_eq!(
        chunks,
        vec![
            Ok(StreamChunk::Delta("Hi".to_string())),
            Ok(StreamChunk::Done {
                finish_reason: None,
                usage: Some(TokenUsage::new(1, 1)),
            }),
        ]
    );
}

#[tokio::test]
async fn stream_keeps_reading_after_finish_for_usage_chunk() {
    let chunks = decode_text(&[
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
        "data: {\"choices\":[],\"usage\":{\"prompt_tokens\":1,\"completion_tokens\":1,\"total_tokens\":2}}\n\n",
        "data: [DONE]\n\n",
    ])
    .await;

    assert_eq!(
        chunks,
        vec![
            Ok(StreamChunk::Delta("Hi".to_string())),
            Ok(StreamChunk::Done {
                finish_reason: Some("stop".to_string()),
                usage: Some(TokenUsage::new(1, 1)),
            }),
        ]
    );
}

#[tokio::test]
async fn stream_without_terminal_signal_completes_at_end_of_body() {
    let chunks = decode_text(&["data: {\"choices\":[{\"delta\":{\"content\":\"tail\"}}]}"]).await;

    assert_eq!(
        chunks,
        vec![
            Ok(StreamChunk::Delta("tail".to_string())),
            Ok(StreamChunk::done()),
        ]
    );
}

#[tokio::test]
async fn stream_malformed_chunk_is_terminal_protocol_error() {
    let chunks = decode_text(&[
        "data: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n\n",
        "data: {broken\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"never\"}}]}\n\n",
    ])
    .await;

    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0], Ok(StreamChunk::Delta("ok".to_string())));
    let error = chunks[1].clone().expect_err("second item should fail");
    assert_eq!(error.kind, ProviderErrorKind::Protocol);
}

#[tokio::test]
async fn stream_mid_stream_error_object_is_upstream_error() {
    let chunks = decode_text(&[
        "data: {\"error\":{\"code\":\"server_error\",\"message\":\"provider overloaded\"}}\n\n",
    ])
    .await;

    assert_eq!(chunks.len(), 1);
    let error = chunks[0].clone().expect_err("error chunk should fail");
    assert_eq!(error.kind, ProviderErrorKind::Upstream);
    assert_eq!(error.code.as_deref(), Some("server_error"));
}

#[tokio::test]
async fn stream_transport_failure_ends_stream() {
    let body = stream::iter(vec![
        Ok(b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n".to_vec()),
        Err(ProviderError::transport("connection reset")),
    ]);
    let chunks = decode_chat_stream(body).collect::<Vec<_>>().await;

    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0], Ok(StreamChunk::Delta("a".to_string())));
    assert_eq!(
        chunks[1].clone().expect_err("transport error").kind,
        ProviderErrorKind::Transport
    );
}

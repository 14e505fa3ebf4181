//! Chat-completions transport trait and reqwest-based HTTP implementation.

use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response};

use crate::{BoxedChunkStream, ProviderConfig, ProviderError, ProviderFuture, SecretString};

use super::serde_api::{
    build_api_request, decode_chat_stream, parse_model_list, parse_response, upstream_error,
};
use super::types::{OpenAiCompatRequest, OpenAiCompatResponse};

pub trait OpenAiCompatTransport: Send + Sync + std::fmt::Debug {
    fn complete<'a>(
        &'a self,
        request: OpenAiCompatRequest,
        api_key: SecretString,
    ) -> ProviderFuture<'a, Result<OpenAiCompatResponse, ProviderError>>;

    fn stream<'a>(
        &'a self,
        request: OpenAiCompatRequest,
        api_key: SecretString,
    ) -> ProviderFuture<'a, Result<BoxedChunkStream<'a>, ProviderError>>;

    fn list_models<'a>(
        &'a self,
        api_key: SecretString,
    ) -> ProviderFuture<'a, Result<Vec<String>, ProviderError>>;
}

#[derive(Debug, Clone)]
pub struct OpenAiCompatHttpTransport {
    client: Client,
    base_url: String,
    headers: Vec<(String, String)>,
    request_timeout: Option<Duration>,
}

impl OpenAiCompatHttpTransport {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            headers: Vec::new(),
            request_timeout: None,
        }
    }

    /// Builds a transport whose client connects within `config.timeout`.
    /// Non-streaming calls are bounded by the same timeout; streams are not,
    /// since a long generation legitimately outlives it.
    pub fn from_config(config: &ProviderConfig, default_base_url: &str) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .connect_timeout(config.timeout)
            .build()
            .map_err(|err| ProviderError::configuration(format!("failed to build HTTP client: {err}")))?;

        let base_url = config
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .unwrap_or(default_base_url);

        Ok(Self::new(client, base_url).with_request_timeout(config.timeout))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    fn authorize(&self, builder: RequestBuilder, api_key: &SecretString) -> RequestBuilder {
        self.headers
            .iter()
            .fold(builder.bearer_auth(api_key.expose()), |builder, (name, value)| {
                builder.header(name.as_str(), value.as_str())
            })
    }

    async fn send(builder: RequestBuilder) -> Result<Response, ProviderError> {
        let response = builder.send().await.map_err(map_reqwest_error)?;
        if !response.status().is_success() {
            return Err(Self::parse_error(response).await);
        }

        Ok(response)
    }

    async fn parse_error(response: Response) -> ProviderError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        upstream_error(status, &body)
    }
}

fn map_reqwest_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::timeout(err.to_string())
    } else {
        ProviderError::transport(err.to_string())
    }
}

impl OpenAiCompatTransport for OpenAiCompatHttpTransport {
    fn complete<'a>(
        &'a self,
        mut request: OpenAiCompatRequest,
        api_key: SecretString,
    ) -> ProviderFuture<'a, Result<OpenAiCompatResponse, ProviderError>> {
        Box::pin(async move {
            request.stream = false;
            let api_request = build_api_request(request)?;
            let mut builder = self
                .client
                .post(self.endpoint("chat/completions"))
                .header(CONTENT_TYPE, "application/json")
                .json(&api_request);
            if let Some(timeout) = self.request_timeout {
                builder = builder.timeout(timeout);
            }

            let response = Self::send(self.authorize(builder, &api_key)).await?;
            let body = response.text().await.map_err(map_reqwest_error)?;
            parse_response(&body)
        })
    }

    fn stream<'a>(
        &'a self,
        mut request: OpenAiCompatRequest,
        api_key: SecretString,
    ) -> ProviderFuture<'a, Result<BoxedChunkStream<'a>, ProviderError>> {
        Box::pin(async move {
            request.stream = true;
            let api_request = build_api_request(request)?;
            let builder = self
                .client
                .post(self.endpoint("chat/completions"))
                .header(CONTENT_TYPE, "application/json")
                .header(ACCEPT, "text/event-stream")
                .json(&api_request);

            let response = Self::send(self.authorize(builder, &api_key)).await?;
            let body = response
                .bytes_stream()
                .map(|item| item.map_err(map_reqwest_error));

            Ok(decode_chat_stream(body))
        })
    }

    fn list_models<'a>(
        &'a self,
        api_key: SecretString,
    ) -> ProviderFuture<'a, Result<Vec<String>, ProviderError>> {
        Box::pin(async move {
            let mut builder = self.client.get(self.endpoint("models"));
            if let Some(timeout) = self.request_timeout {
                builder = builder.timeout(timeout);
            }

            let response = Self::send(self.authorize(builder, &api_key)).await?;
            let body = response.text().await.map_err(map_reqwest_error)?;
            parse_model_list(&body)
        })
    }
}

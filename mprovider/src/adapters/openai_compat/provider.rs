//! Provider implementation shared by every chat-completions compatible API.

use std::sync::Arc;

use crate::{
    BoxedChunkStream, ChatProvider, GeneratedMessage, GenerationRequest, ProviderError,
    ProviderFuture, SecretString, StreamingProvider,
};

use super::transport::OpenAiCompatTransport;
use super::types::OpenAiCompatRequest;

#[derive(Clone)]
pub struct OpenAiCompatProvider {
    name: String,
    transport: Arc<dyn OpenAiCompatTransport>,
    api_key: SecretString,
    default_model: String,
}

impl OpenAiCompatProvider {
    pub fn new(
        name: impl Into<String>,
        transport: Arc<dyn OpenAiCompatTransport>,
        api_key: SecretString,
    ) -> Self {
        Self {
            name: name.into(),
            transport,
            api_key,
            default_model: String::new(),
        }
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    pub(crate) fn build_request(
        &self,
        request: GenerationRequest,
        stream: bool,
    ) -> Result<OpenAiCompatRequest, ProviderError> {
        request.validate()?;
        let model = request
            .config
            .model_override()
            .map(str::to_string)
            .unwrap_or_else(|| self.default_model.trim().to_string());
        let messages = request.effective_messages();

        Ok(OpenAiCompatRequest {
            model,
            messages,
            parameters: request.config.parameters,
            stream,
        })
    }
}

impl std::fmt::Debug for OpenAiCompatProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatProvider")
            .field("name", &self.name)
            .field("transport", &self.transport)
            .field("api_key", &self.api_key)
            .field("default_model", &self.default_model)
            .finish()
    }
}

impl ChatProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn generate<'a>(
        &'a self,
        request: GenerationRequest,
    ) -> ProviderFuture<'a, Result<GeneratedMessage, ProviderError>> {
        Box::pin(async move {
            let request = self.build_request(request, false)?;
            let requested_model = request.model.clone();
            let response = self
                .transport
                .complete(request, self.api_key.clone())
                .await?;

            Ok(GeneratedMessage {
                id: response.id,
                provider: self.name.clone(),
                model: if response.model.is_empty() {
                    requested_model
                } else {
                    response.model
                },
                role: response.role,
                content: response.content,
                finish_reason: response.finish_reason,
                usage: response.usage,
            })
        })
    }

    fn list_models<'a>(&'a self) -> ProviderFuture<'a, Result<Vec<String>, ProviderError>> {
        Box::pin(async move { self.transport.list_models(self.api_key.clone()).await })
    }
}

impl StreamingProvider for OpenAiCompatProvider {
    fn generate_stream<'a>(
        &'a self,
        request: GenerationRequest,
    ) -> ProviderFuture<'a, Result<BoxedChunkStream<'a>, ProviderError>> {
        Box::pin(async move {
            let request = self.build_request(request, true)?;
            self.transport.stream(request, self.api_key.clone()).await
        })
    }
}

//! OpenAI-compatible upstream backend.

use super::errors::ModelError;
use super::types::{ModelBackend, ModelResponse, ModelStream};
use crate::translate;
use async_trait::async_trait;
use futures::{StreamExt, stream};
use tracing::debug;
use wire::{ChatCompletion, ChatCompletionChunk, ChatCompletionRequest, SseEvent, SseParser};

/// Builder for the upstream backend.
#[derive(Debug, Clone)]
pub struct OpenAiBackendBuilder {
    base_url: String,
    api_key: Option<String>,
}

impl OpenAiBackendBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
        }
    }

    /// Bearer token forwarded on every upstream request.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn build(self) -> OpenAiBackend {
        OpenAiBackend {
            client: reqwest::Client::new(),
            base_url: self.base_url.trim_end_matches('/').to_string(),
            api_key: self.api_key,
        }
    }
}

/// Backend speaking the OpenAI chat-completions protocol over HTTP.
pub struct OpenAiBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAiBackend {
    pub fn builder(base_url: impl Into<String>) -> OpenAiBackendBuilder {
        OpenAiBackendBuilder::new(base_url)
    }

    async fn send(
        &self,
        request: &ChatCompletionRequest,
        accept: &str,
    ) -> Result<reqwest::Response, ModelError> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(model = %request.model, stream = request.stream, "sending upstream completion request");

        let mut builder = self
            .client
            .post(&url)
            .header("accept", accept)
            .json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ModelError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

impl std::fmt::Display for OpenAiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "openai({})", self.base_url)
    }
}

#[async_trait]
impl ModelBackend for OpenAiBackend {
    async fn complete(&self, request: &ChatCompletionRequest) -> Result<ModelResponse, ModelError> {
        let mut request = request.clone();
        request.stream = false;

        let response = self.send(&request, "application/json").await?;
        let completion: ChatCompletion = response
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))?;

        let choice = completion
            .choices
            .first()
            .ok_or_else(|| ModelError::InvalidResponse("no choices in completion".to_string()))?;

        let turn = translate::assistant_turn_from_wire(&choice.message).map_err(|e| match e {
            crate::Error::Model(model) => model,
            other => ModelError::InvalidResponse(other.to_string()),
        })?;

        Ok(ModelResponse {
            turn,
            usage: completion.usage.unwrap_or_default(),
            finish_reason: choice.finish_reason.clone(),
        })
    }

    async fn stream(&self, request: &ChatCompletionRequest) -> Result<ModelStream, ModelError> {
        let mut request = request.clone();
        request.stream = true;

        let response = self.send(&request, "text/event-stream").await?;

        let mut parser = SseParser::new();
        let chunks = response
            .bytes_stream()
            .map(move |read| match read {
                Ok(bytes) => parser
                    .feed(&bytes)
                    .into_iter()
                    .filter_map(|event| match event {
                        SseEvent::Data(payload) => Some(
                            serde_json::from_str::<ChatCompletionChunk>(&payload)
                                .map_err(|e| ModelError::InvalidResponse(e.to_string())),
                        ),
                        SseEvent::Done => None,
                    })
                    .collect::<Vec<_>>(),
                Err(e) => vec![Err(ModelError::Stream(e.to_string()))],
            })
            .flat_map(stream::iter);

        Ok(Box::pin(chunks))
    }
}

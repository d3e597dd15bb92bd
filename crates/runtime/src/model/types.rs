use super::errors::ModelError;
use crate::convo::Turn;
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use wire::{ChatCompletionChunk, ChatCompletionRequest, Usage};

/// A whole-response answer from the model.
#[derive(Debug, Clone)]
pub struct ModelResponse {
    /// The assistant turn, including any tool calls.
    pub turn: Turn,
    pub usage: Usage,
    pub finish_reason: Option<String>,
}

/// A stream of raw completion chunks from the model.
pub type ModelStream =
    Pin<Box<dyn Stream<Item = Result<ChatCompletionChunk, ModelError>> + Send>>;

/// Trait for model-completion backends.
///
/// Implementations receive the fully prepared upstream request (messages,
/// advertised tools, generation parameters) and either return a whole
/// assistant turn or a chunk stream. Object-safe so the orchestrator can
/// hold any backend behind `Arc<dyn ModelBackend>`.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Request one whole completion.
    async fn complete(&self, request: &ChatCompletionRequest) -> Result<ModelResponse, ModelError>;

    /// Request a streamed completion.
    async fn stream(&self, request: &ChatCompletionRequest) -> Result<ModelStream, ModelError>;
}

//! The conversation orchestrator: drive the model, dispatch tools, loop.

use crate::convo::{Conversation, Turn};
use crate::dispatch::{DispatchOptions, dispatch};
use crate::model::ModelBackend;
use crate::tools::ToolClient;
use crate::translate;
use crate::{Error, Result};
use futures::StreamExt;
use registry::Registry;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use wire::{
    ChatCompletion, ChatCompletionChunk, ChatCompletionRequest, DeltaAssembler, Usage,
    completion_id,
};

/// Per-request limits.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    /// Maximum model→dispatch cycles before the request is aborted.
    pub round_limit: u32,
    pub per_call_timeout: Duration,
    pub max_concurrency: usize,
    /// Oldest turns beyond this count are dropped from the inbound history.
    pub max_history_turns: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            round_limit: 8,
            per_call_timeout: Duration::from_secs(30),
            max_concurrency: 8,
            max_history_turns: 256,
        }
    }
}

/// Drives one request's multi-round loop.
///
/// Each round sends the conversation plus advertised tools to the model.
/// A tool-free answer terminates the request; otherwise the batch of tool
/// calls is dispatched, the results are appended as tool turns in request
/// order, and the model is re-entered. Per-call failures are folded into
/// tool-result content the model can react to; only model failures and the
/// round limit abort the request.
pub struct Orchestrator {
    backend: Arc<dyn ModelBackend>,
    registry: Arc<Registry>,
    client: ToolClient,
    limits: Limits,
}

impl Orchestrator {
    pub fn new(
        backend: Arc<dyn ModelBackend>,
        registry: Arc<Registry>,
        client: ToolClient,
        limits: Limits,
    ) -> Self {
        Self {
            backend,
            registry,
            client,
            limits,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    fn dispatch_options(&self) -> DispatchOptions {
        DispatchOptions {
            per_call_timeout: self.limits.per_call_timeout,
            max_concurrency: self.limits.max_concurrency,
        }
    }

    /// Build the upstream request for the current conversation state.
    fn upstream_request(
        &self,
        inbound: &ChatCompletionRequest,
        conversation: &Conversation,
        stream: bool,
    ) -> ChatCompletionRequest {
        let tools = translate::advertised_tools(&self.registry.list(), inbound.tools.as_deref());
        ChatCompletionRequest {
            model: inbound.model.clone(),
            messages: translate::wire_from_conversation(conversation),
            stream,
            tools: if tools.is_empty() { None } else { Some(tools) },
            tool_choice: inbound.tool_choice.clone(),
            temperature: inbound.temperature,
            top_p: inbound.top_p,
            max_completion_tokens: inbound.max_completion_tokens,
            user: inbound.user.clone(),
            extra: inbound.extra.clone(),
        }
    }

    /// Append the assistant turn, dispatch its calls, append the results.
    ///
    /// Results are appended in the same order as the originating requests
    /// regardless of completion order.
    async fn run_batch(&self, conversation: &mut Conversation, turn: Turn) -> Result<()> {
        let calls = turn.tool_calls().to_vec();
        conversation.push(turn)?;

        let results = dispatch(&self.client, &self.registry, &calls, self.dispatch_options()).await;
        for result in &results {
            if result.is_failure() {
                debug!(call_id = %result.call_id, "tool call failed: {}", result.content_for_model());
            }
            conversation.push(Turn::tool_result(
                result.call_id.clone(),
                result.content_for_model(),
            ))?;
        }
        Ok(())
    }

    /// Rebuild the conversation from the inbound request: cap the history
    /// and answer any tool calls the trailing assistant turn left open.
    ///
    /// A client may resend a history that ends mid-batch (assistant tool
    /// calls without results). Upstreams reject such message lists, so the
    /// open calls are dispatched and answered here, before the first round.
    async fn ingest(&self, inbound: &ChatCompletionRequest) -> Result<Conversation> {
        let mut conversation = translate::conversation_from_wire(&inbound.messages)?;
        conversation.truncate_to(self.limits.max_history_turns);

        let pending = conversation.pending_calls();
        if !pending.is_empty() {
            debug!(calls = pending.len(), "settling tool calls left open by the inbound history");
            let results =
                dispatch(&self.client, &self.registry, &pending, self.dispatch_options()).await;
            for result in &results {
                conversation.push(Turn::tool_result(
                    result.call_id.clone(),
                    result.content_for_model(),
                ))?;
            }
        }
        Ok(conversation)
    }

    /// Run a request to completion, returning the final wire completion.
    pub async fn run(&self, inbound: &ChatCompletionRequest) -> Result<ChatCompletion> {
        let mut conversation = self.ingest(inbound).await?;
        let mut usage = Usage::default();
        let mut rounds = 0u32;

        loop {
            let request = self.upstream_request(inbound, &conversation, false);
            let response = self.backend.complete(&request).await?;
            usage.absorb(response.usage);

            if response.turn.tool_calls().is_empty() {
                info!(rounds, "conversation complete");
                let finish = response
                    .finish_reason
                    .unwrap_or_else(|| "stop".to_string());
                return Ok(translate::render_completion(
                    &inbound.model,
                    &response.turn,
                    &finish,
                    usage,
                ));
            }

            if rounds == self.limits.round_limit {
                warn!(limit = self.limits.round_limit, "tool round limit exceeded");
                return Err(Error::RoundLimitExceeded {
                    limit: self.limits.round_limit,
                });
            }
            rounds += 1;
            debug!(round = rounds, calls = response.turn.tool_calls().len(), "model requested tools");
            self.run_batch(&mut conversation, response.turn).await?;
        }
    }

    /// Run a request in streaming mode.
    ///
    /// Content tokens are forwarded through `sender` as they arrive;
    /// tool-call deltas are buffered and never surface to the client. If
    /// the receiver is dropped (client disconnect) no new round is started
    /// and the request ends with [`Error::Canceled`]; the current batch is
    /// allowed to drain and its results are discarded.
    pub async fn run_streaming(
        &self,
        inbound: &ChatCompletionRequest,
        sender: &mpsc::Sender<ChatCompletionChunk>,
    ) -> Result<()> {
        let mut conversation = self.ingest(inbound).await?;
        let id = completion_id();
        let model = inbound.model.clone();
        let mut usage = Usage::default();
        let mut rounds = 0u32;

        emit(sender, ChatCompletionChunk::role(&id, &model)).await?;

        loop {
            if sender.is_closed() {
                return Err(Error::Canceled);
            }

            let request = self.upstream_request(inbound, &conversation, true);
            let mut chunks = self.backend.stream(&request).await?;
            let mut assembler = DeltaAssembler::new();
            let mut forwarded = 0usize;

            while let Some(item) = chunks.next().await {
                let chunk = item?;
                if let Some(u) = chunk.usage {
                    usage.absorb(u);
                }
                if let Some(token) = assembler.absorb(&chunk) {
                    forwarded += token.len();
                    emit(sender, ChatCompletionChunk::content(&id, &model, token)).await?;
                }
            }
            let message = assembler.finish();
            if message.degraded {
                warn!("malformed tool-call payload degraded to content");
            }

            // Anything appended at finalization (malformed tool-call
            // payloads degraded to content) has not been forwarded yet.
            if message.content.len() > forwarded {
                let tail = message.content[forwarded..].to_string();
                emit(sender, ChatCompletionChunk::content(&id, &model, tail)).await?;
            }

            if !message.has_tool_calls() {
                info!(rounds, "streaming conversation complete");
                let finish = message
                    .finish_reason
                    .filter(|reason| reason != "tool_calls")
                    .unwrap_or_else(|| "stop".to_string());
                emit(
                    sender,
                    ChatCompletionChunk::finish(&id, &model, finish, Some(usage)),
                )
                .await?;
                return Ok(());
            }

            if rounds == self.limits.round_limit {
                warn!(limit = self.limits.round_limit, "tool round limit exceeded");
                return Err(Error::RoundLimitExceeded {
                    limit: self.limits.round_limit,
                });
            }
            rounds += 1;
            debug!(round = rounds, calls = message.tool_calls.len(), "model requested tools");
            let turn = translate::turn_from_assembled(&message);
            self.run_batch(&mut conversation, turn).await?;
        }
    }
}

async fn emit(
    sender: &mpsc::Sender<ChatCompletionChunk>,
    chunk: ChatCompletionChunk,
) -> Result<()> {
    sender.send(chunk).await.map_err(|_| Error::Canceled)
}

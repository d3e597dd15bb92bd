//! OpenAI-compatible chat wire protocol.
//!
//! This crate defines the wire shapes the gateway speaks on both sides:
//! inbound chat-completion requests from clients and outbound completions
//! or streaming chunks, plus the same shapes when talking to the upstream
//! model. It also provides the incremental machinery needed for streaming:
//!
//! - [`SseParser`] / [`encode_frame`]: server-sent-event framing.
//! - [`DeltaAssembler`]: folds a sequence of `chat.completion.chunk`
//!   deltas into one assistant message, buffering partial tool-call
//!   payloads until they are structurally complete.
//!
//! No I/O happens here; everything is pure data and parsing.

mod sse;
mod stream;
mod types;

pub use sse::{DONE_SENTINEL, SseEvent, SseParser, done_frame, encode_frame};
pub use stream::{AssembledMessage, DeltaAssembler};
pub use types::{
    ChatCompletion, ChatCompletionChunk, ChatCompletionRequest, Choice, ChunkChoice, Delta,
    FunctionDef, FunctionDelta, ToolCallDelta, ToolDef, Usage, WireFunctionCall, WireMessage,
    WireToolCall, completion_id,
};

//! Incremental assembly of streamed assistant messages.
//!
//! The model streams an assistant message as a sequence of deltas. Content
//! tokens can be forwarded to the client as they arrive, but tool-call
//! payloads arrive as fragments (name in one delta, argument text spread
//! over many) and must never be acted on until structurally complete. The
//! [`DeltaAssembler`] buffers fragments per tool-call index and only
//! promotes a fragment to a real tool call at end-of-stream, once its id,
//! name, and argument JSON all check out. Fragments that never become
//! complete are folded back into the assistant content verbatim instead of
//! being dropped.

use crate::types::{ChatCompletionChunk, ToolCallDelta, WireFunctionCall, WireToolCall};

/// Buffered state of one streamed tool call.
#[derive(Debug, Default)]
struct PartialToolCall {
    id: Option<String>,
    name: String,
    arguments: String,
}

impl PartialToolCall {
    fn absorb(&mut self, delta: &ToolCallDelta) {
        if let Some(id) = &delta.id {
            self.id = Some(id.clone());
        }
        if let Some(function) = &delta.function {
            if let Some(name) = &function.name {
                self.name.push_str(name);
            }
            if let Some(arguments) = &function.arguments {
                self.arguments.push_str(arguments);
            }
        }
    }

    /// A call is complete once it has an id, a name, and argument text
    /// that parses as JSON. Empty argument text means a no-parameter call.
    fn into_call(self) -> Result<WireToolCall, Self> {
        let arguments = if self.arguments.trim().is_empty() {
            "{}".to_string()
        } else {
            self.arguments.clone()
        };

        let valid_json = serde_json::from_str::<serde_json::Value>(&arguments).is_ok();
        match (&self.id, self.name.is_empty(), valid_json) {
            (Some(id), false, true) => Ok(WireToolCall {
                id: id.clone(),
                kind: "function".to_string(),
                function: WireFunctionCall {
                    name: self.name,
                    arguments,
                },
            }),
            _ => Err(self),
        }
    }

    /// The raw text of an incomplete fragment, preserved for the caller.
    fn raw_text(&self) -> String {
        let mut text = self.name.clone();
        text.push_str(&self.arguments);
        text
    }
}

/// A fully assembled assistant message.
#[derive(Debug)]
pub struct AssembledMessage {
    pub content: String,
    pub tool_calls: Vec<WireToolCall>,
    /// Whether any tool-call fragment was malformed and folded into content.
    pub degraded: bool,
    pub finish_reason: Option<String>,
}

impl AssembledMessage {
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Folds streamed deltas into one assistant message.
#[derive(Debug, Default)]
pub struct DeltaAssembler {
    content: String,
    partial: Vec<PartialToolCall>,
    finish_reason: Option<String>,
}

impl DeltaAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absorb one chunk. Returns the content token carried by the chunk,
    /// if any, so callers can forward it immediately.
    pub fn absorb(&mut self, chunk: &ChatCompletionChunk) -> Option<String> {
        let choice = chunk.choices.first()?;
        if let Some(reason) = &choice.finish_reason {
            self.finish_reason = Some(reason.clone());
        }

        if let Some(tool_calls) = &choice.delta.tool_calls {
            for delta in tool_calls {
                let index = delta.index as usize;
                while self.partial.len() <= index {
                    self.partial.push(PartialToolCall::default());
                }
                self.partial[index].absorb(delta);
            }
        }

        let token = choice.delta.content.clone()?;
        self.content.push_str(&token);
        Some(token)
    }

    /// Whether any tool-call fragment has been seen so far.
    pub fn buffering_tool_calls(&self) -> bool {
        !self.partial.is_empty()
    }

    /// Finalize at end-of-stream.
    pub fn finish(self) -> AssembledMessage {
        let mut content = self.content;
        let mut tool_calls = Vec::new();
        let mut degraded = false;

        for partial in self.partial {
            match partial.into_call() {
                Ok(call) => tool_calls.push(call),
                Err(partial) => {
                    content.push_str(&partial.raw_text());
                    degraded = true;
                }
            }
        }

        AssembledMessage {
            content,
            tool_calls,
            degraded,
            finish_reason: self.finish_reason,
        }
    }
}

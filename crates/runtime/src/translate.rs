//! Translation between the OpenAI wire shapes and the internal
//! conversation model.
//!
//! Inbound: rebuild a [`Conversation`] from the request's message list,
//! rejecting orphaned tool results. Outbound: render the conversation as
//! upstream wire messages, advertise registry tools, and build the final
//! completion object.

use crate::convo::{Conversation, ToolCallRequest, Turn};
use crate::{Error, Result};
use registry::ToolDeclaration;
use std::collections::HashSet;
use std::sync::Arc;
use wire::{
    AssembledMessage, ChatCompletion, ToolDef, Usage, WireFunctionCall, WireMessage, WireToolCall,
};

/// Rebuild the internal conversation from inbound wire messages.
pub fn conversation_from_wire(messages: &[WireMessage]) -> Result<Conversation> {
    if messages.is_empty() {
        return Err(Error::InvalidRequest("messages must not be empty".to_string()));
    }

    let mut conversation = Conversation::new();
    for message in messages {
        conversation.push(turn_from_wire(message))?;
    }
    Ok(conversation)
}

fn turn_from_wire(message: &WireMessage) -> Turn {
    match message {
        WireMessage::System { content, .. } => Turn::System {
            content: content.clone(),
        },
        WireMessage::User { content, .. } => Turn::user(content.clone()),
        WireMessage::Assistant { content, tool_calls } => Turn::assistant(
            content.clone().unwrap_or_default(),
            tool_calls
                .iter()
                .flatten()
                .map(request_from_wire_call)
                .collect(),
        ),
        WireMessage::Tool {
            content,
            tool_call_id,
        } => Turn::tool_result(tool_call_id.as_str().into(), content.clone()),
    }
}

fn request_from_wire_call(call: &WireToolCall) -> ToolCallRequest {
    ToolCallRequest {
        id: call.id.as_str().into(),
        name: call.function.name.clone(),
        arguments: call.function.arguments.clone(),
    }
}

/// Interpret a model response message as an assistant turn.
pub fn assistant_turn_from_wire(message: &WireMessage) -> Result<Turn> {
    match message {
        WireMessage::Assistant { .. } => Ok(turn_from_wire(message)),
        other => Err(Error::Model(crate::ModelError::InvalidResponse(format!(
            "expected an assistant message, got {other:?}"
        )))),
    }
}

/// Convert a fully assembled streamed message into an assistant turn.
pub fn turn_from_assembled(message: &AssembledMessage) -> Turn {
    Turn::assistant(
        message.content.clone(),
        message.tool_calls.iter().map(request_from_wire_call).collect(),
    )
}

/// Render the conversation as upstream wire messages.
pub fn wire_from_conversation(conversation: &Conversation) -> Vec<WireMessage> {
    conversation.turns().iter().map(wire_from_turn).collect()
}

fn wire_from_turn(turn: &Turn) -> WireMessage {
    match turn {
        Turn::System { content } => WireMessage::System {
            content: content.clone(),
            name: None,
        },
        Turn::User { content } => WireMessage::User {
            content: content.clone(),
            name: None,
        },
        Turn::Assistant { content, tool_calls } => WireMessage::assistant(
            if content.is_empty() && !tool_calls.is_empty() {
                None
            } else {
                Some(content.clone())
            },
            tool_calls.iter().map(wire_call_from_request).collect(),
        ),
        Turn::Tool { call_id, content } => WireMessage::tool(content.clone(), call_id.as_str()),
    }
}

fn wire_call_from_request(request: &ToolCallRequest) -> WireToolCall {
    WireToolCall {
        id: request.id.to_string(),
        kind: "function".to_string(),
        function: WireFunctionCall {
            name: request.name.clone(),
            arguments: request.arguments.clone(),
        },
    }
}

/// Merge registry tools with any the client supplied.
///
/// Registry declarations win on name collision; client tools that do not
/// resolve locally are still forwarded so the upstream model can use
/// whatever the caller executes on its own side.
pub fn advertised_tools(
    declarations: &[Arc<ToolDeclaration>],
    client_tools: Option<&[ToolDef]>,
) -> Vec<ToolDef> {
    let mut tools: Vec<ToolDef> = declarations.iter().map(|d| d.to_wire()).collect();
    let registered: HashSet<&str> = declarations.iter().map(|d| d.name.as_str()).collect();

    for tool in client_tools.into_iter().flatten() {
        if !registered.contains(tool.function.name.as_str()) {
            tools.push(tool.clone());
        }
    }
    tools
}

/// Build the final wire completion from the terminal assistant turn.
pub fn render_completion(
    model: &str,
    turn: &Turn,
    finish_reason: &str,
    usage: Usage,
) -> ChatCompletion {
    ChatCompletion::new(model, wire_from_turn(turn), finish_reason, Some(usage))
}

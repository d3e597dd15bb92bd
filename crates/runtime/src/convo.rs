//! Conversation state for one request.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Identifier correlating a tool call with its result.
///
/// Unique within one conversation; minted by the model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(String);

impl CallId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CallId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for CallId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CallId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A structured request, emitted by the model, to execute a named tool.
///
/// `arguments` is the raw JSON text exactly as the model produced it;
/// parsing and schema validation happen in the tool client so that a bad
/// payload becomes a failure the model can see and correct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: CallId,
    pub name: String,
    pub arguments: String,
}

/// One message unit in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Turn {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        content: String,
        #[serde(default)]
        tool_calls: Vec<ToolCallRequest>,
    },
    Tool {
        call_id: CallId,
        content: String,
    },
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>, tool_calls: Vec<ToolCallRequest>) -> Self {
        Self::Assistant {
            content: content.into(),
            tool_calls,
        }
    }

    pub fn tool_result(call_id: CallId, content: impl Into<String>) -> Self {
        Self::Tool {
            call_id,
            content: content.into(),
        }
    }

    /// Tool calls carried by this turn (empty unless assistant).
    pub fn tool_calls(&self) -> &[ToolCallRequest] {
        match self {
            Self::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }
}

/// Ordered, append-only sequence of turns, owned by one request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Append a turn.
    ///
    /// A tool-result turn must answer a call emitted by the immediately
    /// preceding assistant turn (skipping other tool results already
    /// appended for the same batch); anything else is an orphan and is
    /// rejected.
    pub fn push(&mut self, turn: Turn) -> Result<()> {
        if let Turn::Tool { call_id, .. } = &turn {
            if !self.pending_call_ids().contains(call_id) {
                return Err(Error::OrphanToolResult(call_id.clone()));
            }
        }
        self.turns.push(turn);
        Ok(())
    }

    /// Call ids of the trailing assistant turn that have no result yet.
    pub fn pending_call_ids(&self) -> HashSet<CallId> {
        self.pending_calls().into_iter().map(|c| c.id).collect()
    }

    /// Unanswered tool calls of the trailing assistant turn, in the order
    /// the assistant emitted them.
    pub fn pending_calls(&self) -> Vec<ToolCallRequest> {
        let mut answered = HashSet::new();
        for turn in self.turns.iter().rev() {
            match turn {
                Turn::Tool { call_id, .. } => {
                    answered.insert(call_id.clone());
                }
                Turn::Assistant { tool_calls, .. } => {
                    return tool_calls
                        .iter()
                        .filter(|c| !answered.contains(&c.id))
                        .cloned()
                        .collect();
                }
                _ => break,
            }
        }
        Vec::new()
    }

    /// Drop the oldest turns until at most `limit` remain.
    ///
    /// Leading system turns are kept. An assistant turn is dropped
    /// together with the tool results answering it so the remaining
    /// history never opens with a dangling tool result.
    pub fn truncate_to(&mut self, limit: usize) {
        while self.turns.len() > limit {
            let Some(index) = self
                .turns
                .iter()
                .position(|t| !matches!(t, Turn::System { .. }))
            else {
                break;
            };

            let removed = self.turns.remove(index);
            if matches!(removed, Turn::Assistant { .. }) {
                while matches!(self.turns.get(index), Some(Turn::Tool { .. })) {
                    self.turns.remove(index);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(id: &str, name: &str) -> ToolCallRequest {
        ToolCallRequest {
            id: id.into(),
            name: name.to_string(),
            arguments: "{}".to_string(),
        }
    }

    #[test]
    fn tool_result_answers_preceding_assistant() {
        let mut convo = Conversation::new();
        convo.push(Turn::user("hi")).unwrap();
        convo
            .push(Turn::assistant("", vec![call("call_1", "ping_pong")]))
            .unwrap();
        convo
            .push(Turn::tool_result("call_1".into(), "pong"))
            .unwrap();
        assert_eq!(convo.turns().len(), 3);
    }

    #[test]
    fn orphaned_tool_result_is_rejected() {
        let mut convo = Conversation::new();
        convo.push(Turn::user("hi")).unwrap();
        let err = convo
            .push(Turn::tool_result("call_unknown".into(), "x"))
            .unwrap_err();
        assert!(matches!(err, Error::OrphanToolResult(id) if id.as_str() == "call_unknown"));
    }

    #[test]
    fn duplicate_tool_result_is_rejected() {
        let mut convo = Conversation::new();
        convo
            .push(Turn::assistant("", vec![call("call_1", "a")]))
            .unwrap();
        convo.push(Turn::tool_result("call_1".into(), "ok")).unwrap();
        assert!(convo.push(Turn::tool_result("call_1".into(), "again")).is_err());
    }

    #[test]
    fn pending_ids_shrink_as_results_arrive() {
        let mut convo = Conversation::new();
        convo
            .push(Turn::assistant(
                "",
                vec![call("call_a", "a"), call("call_b", "b")],
            ))
            .unwrap();
        assert_eq!(convo.pending_call_ids().len(), 2);

        convo.push(Turn::tool_result("call_a".into(), "done")).unwrap();
        let pending = convo.pending_call_ids();
        assert_eq!(pending.len(), 1);
        assert!(pending.contains(&CallId::from("call_b")));
    }

    #[test]
    fn pending_calls_keep_emission_order() {
        let mut convo = Conversation::new();
        convo
            .push(Turn::assistant(
                "",
                vec![call("call_a", "a"), call("call_b", "b"), call("call_c", "c")],
            ))
            .unwrap();
        convo.push(Turn::tool_result("call_b".into(), "done")).unwrap();

        let pending = convo.pending_calls();
        let ids: Vec<&str> = pending.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["call_a", "call_c"]);
    }

    #[test]
    fn truncation_keeps_system_and_tool_pairing() {
        let mut convo = Conversation::new();
        convo
            .push(Turn::System {
                content: "be brief".to_string(),
            })
            .unwrap();
        convo.push(Turn::user("one")).unwrap();
        convo
            .push(Turn::assistant("", vec![call("call_1", "a")]))
            .unwrap();
        convo.push(Turn::tool_result("call_1".into(), "ok")).unwrap();
        convo.push(Turn::user("two")).unwrap();
        convo.push(Turn::user("three")).unwrap();

        convo.truncate_to(3);

        // "one" went first, then the assistant turn and its tool result
        // went as a pair; the system turn always survives.
        let remaining: Vec<&str> = convo
            .turns()
            .iter()
            .map(|t| match t {
                Turn::System { .. } => "system",
                Turn::User { content } => content.as_str(),
                Turn::Assistant { .. } => "assistant",
                Turn::Tool { .. } => "tool",
            })
            .collect();
        assert_eq!(remaining, vec!["system", "two", "three"]);
    }

    #[test]
    fn tool_result_cannot_skip_past_user_turn() {
        let mut convo = Conversation::new();
        convo
            .push(Turn::assistant("", vec![call("call_1", "a")]))
            .unwrap();
        convo.push(Turn::user("never mind")).unwrap();
        assert!(convo.push(Turn::tool_result("call_1".into(), "late")).is_err());
    }
}

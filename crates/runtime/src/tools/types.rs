//! Tool execution outcomes.

use crate::convo::CallId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Typed failure of one tool call.
///
/// These are recovered locally: each becomes tool-result content the model
/// itself sees and may react to. They never abort the whole request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolFailure {
    /// Argument payload failed JSON parsing or schema validation; the
    /// backend was never contacted.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// No declaration with this name in the registry.
    #[error("tool not found: {0}")]
    NotFound(String),

    /// The per-call deadline elapsed.
    #[error("timeout after {0}ms")]
    Timeout(u64),

    /// The backend reported a failure; its message is preserved.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Success or typed failure of one call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolOutcome {
    Success { output: Value },
    Failure { error: ToolFailure },
}

/// The outcome of executing one [`crate::ToolCallRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub call_id: CallId,
    pub outcome: ToolOutcome,
    pub elapsed: Duration,
}

impl ToolResult {
    pub fn success(call_id: CallId, output: Value, elapsed: Duration) -> Self {
        Self {
            call_id,
            outcome: ToolOutcome::Success { output },
            elapsed,
        }
    }

    pub fn failure(call_id: CallId, error: ToolFailure, elapsed: Duration) -> Self {
        Self {
            call_id,
            outcome: ToolOutcome::Failure { error },
            elapsed,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, ToolOutcome::Failure { .. })
    }

    /// Tool-result message content as the model sees it.
    ///
    /// Success payloads pass through verbatim; string outputs are unwrapped
    /// so the model is not shown JSON quoting. Failures are phrased so the
    /// model can correct itself.
    pub fn content_for_model(&self) -> String {
        match &self.outcome {
            ToolOutcome::Success { output } => match output {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
            ToolOutcome::Failure { error } => format!("Error: {error}"),
        }
    }
}

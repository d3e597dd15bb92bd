use crate::convo::CallId;
use crate::model::ModelError;
use thiserror::Error;

/// Request-fatal errors.
///
/// Per-tool-call failures are not represented here; they are folded into
/// [`crate::ToolResult`] values the model itself gets to see.
#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed request: {0}")]
    InvalidRequest(String),

    /// A tool-result message references a call id the immediately
    /// preceding assistant turn never emitted.
    #[error("orphaned tool result for call id '{0}'")]
    OrphanToolResult(CallId),

    #[error(transparent)]
    Model(#[from] ModelError),

    /// The model kept requesting tools past the configured round limit.
    #[error("tool round limit of {limit} exceeded")]
    RoundLimitExceeded { limit: u32 },

    /// The client went away before the request reached a terminal state.
    #[error("client disconnected")]
    Canceled,
}

pub type Result<T> = std::result::Result<T, Error>;

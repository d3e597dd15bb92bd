use thiserror::Error;

/// Errors from the model-completion collaborator.
///
/// All of these are request-fatal: the orchestrator surfaces them to the
/// caller as a wire-level error instead of retrying.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ModelError {
    /// The upstream could not be reached.
    #[error("network: {0}")]
    Network(String),

    /// The upstream returned an error response.
    #[error("upstream api {status}: {body}")]
    Api { status: u16, body: String },

    /// The upstream response could not be interpreted.
    #[error("invalid upstream response: {0}")]
    InvalidResponse(String),

    /// The chunk stream broke mid-response.
    #[error("stream: {0}")]
    Stream(String),
}

//! The boundary to tool-execution backends.
//!
//! Transport details are opaque to the rest of the runtime: a backend is
//! anything that can execute a named tool against a JSON argument object
//! and return a payload or a structured error.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Errors crossing the transport boundary.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The backend could not be reached at all.
    #[error("backend unreachable: {0}")]
    Unreachable(String),

    /// The backend answered with a failure; its message is preserved.
    #[error("{0}")]
    Backend(String),
}

/// One tool-execution backend.
#[async_trait]
pub trait ToolTransport: Send + Sync {
    /// Backend name as referenced by tool declarations.
    fn name(&self) -> &str;

    /// Execute `tool` with the given argument object.
    async fn call(&self, tool: &str, arguments: &Value) -> Result<Value, TransportError>;
}

#[derive(Debug, Serialize)]
struct InvokeRequest<'a> {
    tool: &'a str,
    arguments: &'a Value,
}

#[derive(Debug, Deserialize)]
struct InvokeResponse {
    #[serde(default)]
    output: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

/// HTTP tool server: `POST {base}/invoke` with `{"tool", "arguments"}`,
/// answering `{"output": ...}` or `{"error": "..."}`.
pub struct HttpToolServer {
    name: String,
    base_url: String,
    client: reqwest::Client,
}

impl HttpToolServer {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ToolTransport for HttpToolServer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(&self, tool: &str, arguments: &Value) -> Result<Value, TransportError> {
        let url = format!("{}/invoke", self.base_url);
        debug!(backend = %self.name, %tool, "invoking tool backend");

        let response = self
            .client
            .post(&url)
            .json(&InvokeRequest { tool, arguments })
            .send()
            .await
            .map_err(|e| TransportError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Backend(format!("{status}: {body}")));
        }

        let body: InvokeResponse = response
            .json()
            .await
            .map_err(|e| TransportError::Backend(format!("malformed backend response: {e}")))?;

        if let Some(message) = body.error {
            return Err(TransportError::Backend(message));
        }
        Ok(body.output.unwrap_or(Value::Null))
    }
}

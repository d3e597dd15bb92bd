//! Server error types and their wire rendering.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::config::ConfigError;

/// Startup errors.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to load tool registry: {0}")]
    Registry(#[from] registry::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Error body in the OpenAI wire format.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// A request-fatal error as surfaced to API clients.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, kind: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                error: ErrorDetail {
                    message: message.into(),
                    kind: kind.to_string(),
                    code: None,
                },
            },
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_request_error", message)
    }
}

impl From<runtime::Error> for ApiError {
    fn from(err: runtime::Error) -> Self {
        match &err {
            runtime::Error::InvalidRequest(_) | runtime::Error::OrphanToolResult(_) => {
                Self::invalid_request(err.to_string())
            }
            runtime::Error::RoundLimitExceeded { .. } => {
                Self::new(StatusCode::BAD_GATEWAY, "api_error", err.to_string())
            }
            runtime::Error::Model(model) => Self::new(
                StatusCode::BAD_GATEWAY,
                "api_error",
                format!("upstream model failure: {model}"),
            ),
            runtime::Error::Canceled => {
                // The client is gone; nobody will read this.
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "api_error", err.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

//! HTTP surface of the gateway.

use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use futures::Stream;
use runtime::Orchestrator;
use registry::Registry;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, info};
use wire::{ChatCompletionChunk, ChatCompletionRequest, DONE_SENTINEL, ToolDef};

use crate::error::ApiError;

/// Shared per-process state.
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub registry: Arc<Registry>,
    pub tools_path: Option<PathBuf>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .route("/v1/tools", get(list_tools))
        .route("/v1/tools/reload", post(reload_tools))
        .with_state(state)
}

async fn chat_completions(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatCompletionRequest>,
) -> Response {
    if request.stream {
        stream_completion(state, request).await.into_response()
    } else {
        match state.orchestrator.run(&request).await {
            Ok(completion) => Json(completion).into_response(),
            Err(err) => ApiError::from(err).into_response(),
        }
    }
}

/// Run the request in streaming mode, bridging the orchestrator's chunk
/// channel onto an SSE response.
///
/// A failure after chunks have gone out cannot change the status line, so
/// it is delivered as an error frame followed by the `[DONE]` sentinel.
async fn stream_completion(
    state: Arc<AppState>,
    request: ChatCompletionRequest,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (chunk_tx, mut chunk_rx) = mpsc::channel::<ChatCompletionChunk>(32);
    let (event_tx, event_rx) = mpsc::channel::<Event>(32);

    let orchestrator = Arc::clone(&state.orchestrator);
    let handle = tokio::spawn(async move {
        orchestrator.run_streaming(&request, &chunk_tx).await
    });

    tokio::spawn(async move {
        while let Some(chunk) = chunk_rx.recv().await {
            let Ok(event) = Event::default().json_data(&chunk) else {
                continue;
            };
            if event_tx.send(event).await.is_err() {
                // Client gone; the orchestrator notices via its own sender.
                return;
            }
        }

        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(runtime::Error::Canceled)) => return,
            Ok(Err(err)) => {
                error!("streaming request failed: {err}");
                let api = ApiError::from(err);
                if let Ok(event) = Event::default().json_data(&api.body) {
                    let _ = event_tx.send(event).await;
                }
            }
            Err(join_err) => {
                error!("streaming task panicked: {join_err}");
            }
        }
        let _ = event_tx.send(Event::default().data(DONE_SENTINEL)).await;
    });

    Sse::new(ReceiverStream::new(event_rx).map(Ok::<_, Infallible>))
        .keep_alive(KeepAlive::default())
}

#[derive(Debug, Serialize)]
struct ToolListing {
    object: String,
    data: Vec<ToolDef>,
}

async fn list_tools(State(state): State<Arc<AppState>>) -> Json<ToolListing> {
    let data = state
        .registry
        .list()
        .iter()
        .map(|declaration| declaration.to_wire())
        .collect();
    Json(ToolListing {
        object: "list".to_string(),
        data,
    })
}

#[derive(Debug, Serialize)]
struct ReloadReport {
    reloaded: usize,
}

async fn reload_tools(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ReloadReport>, ApiError> {
    let Some(path) = &state.tools_path else {
        return Err(ApiError::invalid_request(
            "no tool declaration file configured",
        ));
    };

    let toml = std::fs::read_to_string(path)
        .map_err(|e| ApiError::invalid_request(format!("cannot read {}: {e}", path.display())))?;

    // A parse failure leaves the previous tool set serving.
    let reloaded = state
        .registry
        .reload_from(&toml)
        .map_err(|e| ApiError::invalid_request(e.to_string()))?;

    info!(reloaded, path = %path.display(), "tool registry reloaded");
    Ok(Json(ReloadReport { reloaded }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use http_body_util::BodyExt;
    use runtime::{Limits, ModelBackend, ModelError, ModelResponse, ModelStream, ToolClient, Turn};
    use tower::ServiceExt;
    use wire::Usage;

    struct CannedModel;

    #[async_trait]
    impl ModelBackend for CannedModel {
        async fn complete(
            &self,
            _request: &ChatCompletionRequest,
        ) -> Result<ModelResponse, ModelError> {
            Ok(ModelResponse {
                turn: Turn::assistant("pong", Vec::new()),
                usage: Usage::default(),
                finish_reason: Some("stop".to_string()),
            })
        }

        async fn stream(
            &self,
            _request: &ChatCompletionRequest,
        ) -> Result<ModelStream, ModelError> {
            Err(ModelError::InvalidResponse("not scripted".to_string()))
        }
    }

    fn test_state() -> Arc<AppState> {
        let registry = Arc::new(
            Registry::parse(
                r#"
                [[tool]]
                name = "ping_pong"
                description = "Answers pong"
                backend = "local"
                "#,
            )
            .unwrap(),
        );
        Arc::new(AppState {
            orchestrator: Arc::new(Orchestrator::new(
                Arc::new(CannedModel),
                Arc::clone(&registry),
                ToolClient::new(),
                Limits::default(),
            )),
            registry,
            tools_path: None,
        })
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn completions_answer_in_wire_format() {
        let app = router(test_state());
        let request = axum::http::Request::post("/v1/chat/completions")
            .header("content-type", "application/json")
            .body(axum::body::Body::from(
                r#"{"model":"gpt-test","messages":[{"role":"user","content":"ping"}]}"#,
            ))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["object"], "chat.completion");
        assert_eq!(json["choices"][0]["message"]["content"], "pong");
        assert_eq!(json["choices"][0]["finish_reason"], "stop");
    }

    #[tokio::test]
    async fn orphan_tool_result_is_a_400() {
        let app = router(test_state());
        let request = axum::http::Request::post("/v1/chat/completions")
            .header("content-type", "application/json")
            .body(axum::body::Body::from(
                r#"{"model":"gpt-test","messages":[{"role":"tool","content":"4","tool_call_id":"call_ghost"}]}"#,
            ))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::BAD_REQUEST);

        let json = body_json(response).await;
        assert_eq!(json["error"]["type"], "invalid_request_error");
    }

    #[tokio::test]
    async fn tools_listing_renders_declarations() {
        let app = router(test_state());
        let request = axum::http::Request::get("/v1/tools")
            .body(axum::body::Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let json = body_json(response).await;
        assert_eq!(json["object"], "list");
        assert_eq!(json["data"][0]["function"]["name"], "ping_pong");
    }

    #[tokio::test]
    async fn reload_without_a_tools_file_is_rejected() {
        let app = router(test_state());
        let request = axum::http::Request::post("/v1/tools/reload")
            .body(axum::body::Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::BAD_REQUEST);
    }
}

//! Stevedore runtime: tool-call dispatch and the multi-round chat loop.
//!
//! This crate is the engine behind the gateway: it takes an inbound
//! OpenAI-compatible chat request, drives the model, executes any tool
//! calls the model emits against the configured backends, folds the
//! results back into the conversation, and repeats until the model
//! produces a tool-free answer or the round limit trips.
//!
//! # Overview
//!
//! The runtime is organized around these concepts:
//!
//! - **Conversation / Turn**: the internal, append-only representation of
//!   one request's message history.
//! - **ModelBackend**: a trait abstracting the model-completion
//!   collaborator (whole completions and chunk streams).
//! - **ToolClient / ToolTransport**: validation, deadline enforcement, and
//!   the opaque boundary to tool-execution backends.
//! - **dispatch**: bounded-concurrency fan-out of one assistant turn's
//!   tool calls with deterministic result ordering.
//! - **Orchestrator**: the round loop tying it all together.
//!
//! # Example
//!
//! ```ignore
//! use runtime::{Limits, OpenAiBackend, Orchestrator, ToolClient};
//! use registry::Registry;
//! use std::sync::Arc;
//!
//! # async fn example() -> runtime::Result<()> {
//! let backend = OpenAiBackend::builder("https://api.openai.com/v1")
//!     .api_key("sk-...")
//!     .build();
//! let registry = Arc::new(Registry::load("tools.toml").unwrap());
//! let client = ToolClient::new();
//!
//! let orchestrator = Orchestrator::new(Arc::new(backend), registry, client, Limits::default());
//! let completion = orchestrator.run(&request).await?;
//! # Ok(())
//! # }
//! ```

mod convo;
mod dispatch;
mod error;
mod model;
mod orchestrator;
pub mod translate;
mod tools;

pub use convo::{CallId, Conversation, ToolCallRequest, Turn};
pub use dispatch::{DispatchOptions, dispatch};
pub use error::{Error, Result};
pub use model::{ModelBackend, ModelError, ModelResponse, ModelStream, OpenAiBackend, OpenAiBackendBuilder};
pub use orchestrator::{Limits, Orchestrator};
pub use tools::{
    HttpToolServer, ToolClient, ToolFailure, ToolOutcome, ToolResult, ToolTransport, TransportError,
};

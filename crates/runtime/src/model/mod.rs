//! Model-completion collaborator: trait and upstream backend.

mod errors;
mod openai;
mod types;

pub use errors::ModelError;
pub use openai::{OpenAiBackend, OpenAiBackendBuilder};
pub use types::{ModelBackend, ModelResponse, ModelStream};

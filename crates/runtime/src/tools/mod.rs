//! Tool execution: result types, backend transport, and the tool client.

mod client;
mod transport;
mod types;

pub use client::ToolClient;
pub use transport::{HttpToolServer, ToolTransport, TransportError};
pub use types::{ToolFailure, ToolOutcome, ToolResult};

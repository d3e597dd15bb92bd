//! The tool client: validation, deadline enforcement, invocation.

use super::transport::ToolTransport;
use super::types::{ToolFailure, ToolResult};
use crate::convo::ToolCallRequest;
use registry::ToolDeclaration;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Invokes one tool on one backend.
///
/// `invoke` never returns an `Err`: every failure mode is folded into the
/// returned [`ToolResult`] so the dispatcher can treat all calls uniformly
/// and the model gets to see what went wrong.
#[derive(Default)]
pub struct ToolClient {
    transports: HashMap<String, Arc<dyn ToolTransport>>,
}

impl ToolClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend under its own name.
    pub fn with_transport(mut self, transport: Arc<dyn ToolTransport>) -> Self {
        self.transports.insert(transport.name().to_string(), transport);
        self
    }

    /// Execute one call against the declaration's backend.
    ///
    /// Validation failures short-circuit without contacting the backend.
    /// Exceeding `deadline` drops the in-flight transport future; the
    /// backend may finish on its own but is not awaited.
    pub async fn invoke(
        &self,
        declaration: &ToolDeclaration,
        call: &ToolCallRequest,
        deadline: Duration,
    ) -> ToolResult {
        let started = Instant::now();

        let arguments: Value = match serde_json::from_str(&call.arguments) {
            Ok(value) => value,
            Err(e) => {
                return ToolResult::failure(
                    call.id.clone(),
                    ToolFailure::InvalidArguments(format!("invalid JSON in arguments: {e}")),
                    started.elapsed(),
                );
            }
        };

        if let Err(violation) = declaration.parameters.validate(&arguments) {
            return ToolResult::failure(
                call.id.clone(),
                ToolFailure::InvalidArguments(violation.to_string()),
                started.elapsed(),
            );
        }

        let Some(transport) = self.transports.get(&declaration.backend) else {
            warn!(tool = %declaration.name, backend = %declaration.backend, "tool backend not configured");
            return ToolResult::failure(
                call.id.clone(),
                ToolFailure::Backend(format!("backend '{}' is not configured", declaration.backend)),
                started.elapsed(),
            );
        };

        debug!(tool = %declaration.name, call_id = %call.id, "executing tool call");
        match tokio::time::timeout(deadline, transport.call(&declaration.name, &arguments)).await {
            Ok(Ok(output)) => ToolResult::success(call.id.clone(), output, started.elapsed()),
            Ok(Err(e)) => ToolResult::failure(
                call.id.clone(),
                ToolFailure::Backend(e.to_string()),
                started.elapsed(),
            ),
            Err(_) => {
                warn!(tool = %declaration.name, call_id = %call.id, "tool call timed out");
                ToolResult::failure(
                    call.id.clone(),
                    ToolFailure::Timeout(deadline.as_millis() as u64),
                    started.elapsed(),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::transport::TransportError;
    use crate::tools::types::ToolOutcome;
    use async_trait::async_trait;
    use registry::{ParameterSchema, PropertySchema};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedBackend {
        calls: AtomicUsize,
        delay: Duration,
        reply: Result<Value, String>,
    }

    impl ScriptedBackend {
        fn replying(reply: Value) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
                reply: Ok(reply),
            })
        }

        fn failing(message: &str) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
                reply: Err(message.to_string()),
            })
        }

        fn slow(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                delay,
                reply: Ok(json!("late")),
            })
        }
    }

    #[async_trait]
    impl ToolTransport for ScriptedBackend {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn call(&self, _tool: &str, _arguments: &Value) -> Result<Value, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.reply
                .clone()
                .map_err(TransportError::Backend)
        }
    }

    fn declaration() -> ToolDeclaration {
        let mut properties = std::collections::BTreeMap::new();
        properties.insert(
            "expr".to_string(),
            PropertySchema {
                kind: "string".to_string(),
                description: None,
                enum_values: None,
            },
        );
        ToolDeclaration {
            name: "calculator".to_string(),
            description: "Evaluate arithmetic".to_string(),
            backend: "scripted".to_string(),
            parameters: ParameterSchema {
                properties,
                required: vec!["expr".to_string()],
                additional_properties: false,
            },
        }
    }

    fn call_with(arguments: &str) -> ToolCallRequest {
        ToolCallRequest {
            id: "call_1".into(),
            name: "calculator".to_string(),
            arguments: arguments.to_string(),
        }
    }

    #[tokio::test]
    async fn success_payload_passes_through() {
        let backend = ScriptedBackend::replying(json!(4));
        let client = ToolClient::new().with_transport(backend.clone());

        let result = client
            .invoke(&declaration(), &call_with(r#"{"expr":"2+2"}"#), Duration::from_secs(1))
            .await;

        assert!(matches!(result.outcome, ToolOutcome::Success { ref output } if *output == json!(4)));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalid_json_never_reaches_backend() {
        let backend = ScriptedBackend::replying(json!(4));
        let client = ToolClient::new().with_transport(backend.clone());

        let result = client
            .invoke(&declaration(), &call_with("{not json"), Duration::from_secs(1))
            .await;

        assert!(matches!(
            result.outcome,
            ToolOutcome::Failure { error: ToolFailure::InvalidArguments(_) }
        ));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn schema_violation_never_reaches_backend() {
        let backend = ScriptedBackend::replying(json!(4));
        let client = ToolClient::new().with_transport(backend.clone());

        // Missing the required "expr" field.
        let result = client
            .invoke(&declaration(), &call_with("{}"), Duration::from_secs(1))
            .await;

        assert!(matches!(
            result.outcome,
            ToolOutcome::Failure { error: ToolFailure::InvalidArguments(ref msg) }
                if msg.contains("expr")
        ));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn backend_message_is_preserved() {
        let backend = ScriptedBackend::failing("division by zero");
        let client = ToolClient::new().with_transport(backend);

        let result = client
            .invoke(&declaration(), &call_with(r#"{"expr":"1/0"}"#), Duration::from_secs(1))
            .await;

        assert!(matches!(
            result.outcome,
            ToolOutcome::Failure { error: ToolFailure::Backend(ref msg) }
                if msg == "division by zero"
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_yields_timeout() {
        let backend = ScriptedBackend::slow(Duration::from_secs(60));
        let client = ToolClient::new().with_transport(backend);

        let result = client
            .invoke(&declaration(), &call_with(r#"{"expr":"2+2"}"#), Duration::from_millis(100))
            .await;

        assert!(matches!(
            result.outcome,
            ToolOutcome::Failure { error: ToolFailure::Timeout(100) }
        ));
    }

    #[tokio::test]
    async fn unconfigured_backend_is_a_backend_error() {
        let client = ToolClient::new();

        let result = client
            .invoke(&declaration(), &call_with(r#"{"expr":"2+2"}"#), Duration::from_secs(1))
            .await;

        assert!(matches!(
            result.outcome,
            ToolOutcome::Failure { error: ToolFailure::Backend(ref msg) }
                if msg.contains("not configured")
        ));
    }
}

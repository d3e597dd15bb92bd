//! Bounded-concurrency fan-out of one assistant turn's tool calls.

use crate::convo::ToolCallRequest;
use crate::tools::{ToolClient, ToolFailure, ToolResult};
use futures::future::join_all;
use registry::Registry;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::debug;

/// Limits applied to one dispatch batch.
#[derive(Debug, Clone, Copy)]
pub struct DispatchOptions {
    /// Deadline applied to each individual call.
    pub per_call_timeout: Duration,
    /// Maximum calls in flight at once within the batch.
    pub max_concurrency: usize,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            per_call_timeout: Duration::from_secs(30),
            max_concurrency: 8,
        }
    }
}

/// Execute a batch of tool calls, returning one result per request in
/// input order.
///
/// Every request resolves against a single registry snapshot taken at
/// entry, so a concurrent reload cannot split the batch. Unresolvable
/// names produce `NotFound` results without consuming a permit or
/// contacting any backend. Calls are independent: one call's failure never
/// cancels its siblings, and the batch returns only once every request has
/// a result.
pub async fn dispatch(
    client: &ToolClient,
    registry: &Registry,
    batch: &[ToolCallRequest],
    options: DispatchOptions,
) -> Vec<ToolResult> {
    let snapshot = registry.snapshot();
    let semaphore = Arc::new(Semaphore::new(options.max_concurrency.max(1)));
    debug!(calls = batch.len(), "dispatching tool-call batch");

    let invocations = batch.iter().map(|call| {
        let declaration = snapshot.resolve(&call.name);
        let semaphore = Arc::clone(&semaphore);
        async move {
            let Some(declaration) = declaration else {
                return ToolResult::failure(
                    call.id.clone(),
                    ToolFailure::NotFound(call.name.clone()),
                    Duration::ZERO,
                );
            };

            // The semaphore is never closed while a batch runs.
            let _permit = match semaphore.acquire().await {
                Ok(permit) => permit,
                Err(_) => {
                    return ToolResult::failure(
                        call.id.clone(),
                        ToolFailure::Backend("dispatcher shut down".to_string()),
                        Duration::ZERO,
                    );
                }
            };
            client.invoke(&declaration, call, options.per_call_timeout).await
        }
    });

    // join_all preserves input order regardless of completion order.
    join_all(invocations).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{ToolOutcome, ToolTransport, TransportError};
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Backend that answers with the tool name after a per-tool delay, so
    /// tests can force completion order to differ from input order.
    struct EchoBackend {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        delays_ms: fn(&str) -> u64,
    }

    impl EchoBackend {
        fn new(delays_ms: fn(&str) -> u64) -> Arc<Self> {
            Arc::new(Self {
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                delays_ms,
            })
        }
    }

    #[async_trait]
    impl ToolTransport for EchoBackend {
        fn name(&self) -> &str {
            "echo"
        }

        async fn call(&self, tool: &str, _arguments: &Value) -> Result<Value, TransportError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            tokio::time::sleep(Duration::from_millis((self.delays_ms)(tool))).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if tool == "broken" {
                return Err(TransportError::Backend("forced failure".to_string()));
            }
            Ok(json!(tool))
        }
    }

    fn registry_with(names: &[&str]) -> Registry {
        let toml: String = names
            .iter()
            .map(|name| format!("[[tool]]\nname = \"{name}\"\nbackend = \"echo\"\n"))
            .collect();
        Registry::parse(&toml).unwrap()
    }

    fn batch(entries: &[(&str, &str)]) -> Vec<ToolCallRequest> {
        entries
            .iter()
            .map(|(id, name)| ToolCallRequest {
                id: (*id).into(),
                name: name.to_string(),
                arguments: "{}".to_string(),
            })
            .collect()
    }

    #[tokio::test]
    async fn one_result_per_request_in_input_order() {
        // C completes first (shortest delay) but must come back last.
        let backend = EchoBackend::new(|tool| match tool {
            "a" => 30,
            "b" => 20,
            _ => 1,
        });
        let client = ToolClient::new().with_transport(backend);
        let registry = registry_with(&["a", "b", "c"]);

        let calls = batch(&[("call_a", "a"), ("call_b", "b"), ("call_c", "c")]);
        let results = dispatch(&client, &registry, &calls, DispatchOptions::default()).await;

        assert_eq!(results.len(), calls.len());
        let ids: Vec<&str> = results.iter().map(|r| r.call_id.as_str()).collect();
        assert_eq!(ids, vec!["call_a", "call_b", "call_c"]);
    }

    #[tokio::test]
    async fn sibling_failure_does_not_cancel_the_batch() {
        let backend = EchoBackend::new(|_| 1);
        let client = ToolClient::new().with_transport(backend);
        let registry = registry_with(&["ok", "broken"]);

        let calls = batch(&[("call_1", "ok"), ("call_2", "broken"), ("call_3", "ok")]);
        let results = dispatch(&client, &registry, &calls, DispatchOptions::default()).await;

        assert!(matches!(results[0].outcome, ToolOutcome::Success { .. }));
        assert!(results[1].is_failure());
        assert!(matches!(results[2].outcome, ToolOutcome::Success { .. }));
    }

    #[tokio::test]
    async fn unresolved_name_skips_backend_entirely() {
        let backend = EchoBackend::new(|_| 1);
        let client = ToolClient::new().with_transport(backend.clone());
        let registry = registry_with(&["real"]);

        let calls = batch(&[("call_1", "foo_nonexistent")]);
        let results = dispatch(&client, &registry, &calls, DispatchOptions::default()).await;

        assert!(matches!(
            results[0].outcome,
            ToolOutcome::Failure { error: ToolFailure::NotFound(ref name) }
                if name == "foo_nonexistent"
        ));
        assert_eq!(backend.max_in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn concurrency_stays_under_the_gate() {
        let backend = EchoBackend::new(|_| 20);
        let client = ToolClient::new().with_transport(backend.clone());
        let registry = registry_with(&["a"]);

        let calls = batch(&[
            ("call_1", "a"),
            ("call_2", "a"),
            ("call_3", "a"),
            ("call_4", "a"),
            ("call_5", "a"),
            ("call_6", "a"),
        ]);
        let options = DispatchOptions {
            max_concurrency: 2,
            ..DispatchOptions::default()
        };
        let results = dispatch(&client, &registry, &calls, options).await;

        assert_eq!(results.len(), 6);
        assert!(backend.max_in_flight.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn results_form_a_bijection_with_requests() {
        let backend = EchoBackend::new(|_| 1);
        let client = ToolClient::new().with_transport(backend);
        let registry = registry_with(&["a", "b"]);

        let calls = batch(&[("call_1", "a"), ("call_2", "missing"), ("call_3", "b")]);
        let results = dispatch(&client, &registry, &calls, DispatchOptions::default()).await;

        let request_ids: Vec<&str> = calls.iter().map(|c| c.id.as_str()).collect();
        let result_ids: Vec<&str> = results.iter().map(|r| r.call_id.as_str()).collect();
        assert_eq!(request_ids, result_ids);
    }
}

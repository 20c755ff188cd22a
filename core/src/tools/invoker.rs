//! ToolInvoker - executes tool call requests against the catalog

use crate::error::ToolError;
use crate::output::{LoopEvent, LoopObserver, NullObserver};
use crate::tools::{Tool, ToolCallRequest, ToolCatalog, ToolResult};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Outcome of dispatching every request of one model turn
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    /// One result per request, in request order
    Completed(Vec<ToolResult>),
    /// The batch was cancelled before every request resolved
    Cancelled,
}

/// Executes tool calls with failure isolation.
///
/// A call never fails from the caller's point of view: unknown tools, handler
/// errors, panics and timeouts all come back as a [`ToolResult`] with `error`
/// set.
#[derive(Clone)]
pub struct ToolInvoker {
    catalog: Arc<ToolCatalog>,
    timeout: Option<Duration>,
    observer: Arc<dyn LoopObserver>,
}

impl ToolInvoker {
    pub fn new(catalog: Arc<ToolCatalog>) -> Self {
        Self {
            catalog,
            timeout: None,
            observer: Arc::new(NullObserver),
        }
    }

    /// Limit each individual call to `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn LoopObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    /// Execute a single tool call
    pub async fn invoke(&self, request: &ToolCallRequest) -> ToolResult {
        debug!(tool_name = %request.name, call_id = %request.id, "ToolInvoker::invoke");
        execute_call(self.catalog.resolve(&request.name), request, self.timeout).await
    }

    /// Execute every request of a model turn concurrently.
    ///
    /// Waits for all calls before returning; results are re-associated by
    /// request index, so the returned order matches `requests` regardless of
    /// completion order. On cancellation the outstanding calls are aborted
    /// and no results are returned.
    pub async fn invoke_batch(
        &self,
        turn: usize,
        requests: &[ToolCallRequest],
        cancel: &CancellationToken,
    ) -> BatchOutcome {
        debug!(turn, count = requests.len(), "ToolInvoker::invoke_batch");
        if cancel.is_cancelled() {
            return BatchOutcome::Cancelled;
        }

        let mut set = JoinSet::new();
        for (index, request) in requests.iter().enumerate() {
            self.observer
                .emit(&LoopEvent::ToolStarted {
                    turn,
                    request: request.clone(),
                })
                .await;

            let tool = self.catalog.resolve(&request.name);
            let request = request.clone();
            let timeout = self.timeout;
            set.spawn(async move {
                let started = Instant::now();
                let result = execute_call(tool, &request, timeout).await;
                (index, result, started.elapsed())
            });
        }

        let mut slots: Vec<Option<ToolResult>> = vec![None; requests.len()];
        let mut remaining = requests.len();

        while remaining > 0 {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!(turn, outstanding = remaining, "Tool batch cancelled");
                    set.abort_all();
                    return BatchOutcome::Cancelled;
                }
                joined = set.join_next() => match joined {
                    Some(Ok((index, result, elapsed))) => {
                        self.observer
                            .emit(&LoopEvent::ToolCompleted {
                                turn,
                                tool_name: requests[index].name.clone(),
                                result: result.clone(),
                                duration_ms: elapsed.as_millis() as u64,
                            })
                            .await;
                        slots[index] = Some(result);
                        remaining -= 1;
                    }
                    Some(Err(err)) => {
                        // Handler panics are caught inside the task, so this is
                        // an abort or a runtime shutdown.
                        warn!(turn, error = %err, "Tool task did not complete");
                        remaining -= 1;
                    }
                    None => break,
                },
            }
        }

        let results = slots
            .into_iter()
            .zip(requests)
            .map(|(slot, request)| {
                slot.unwrap_or_else(|| {
                    ToolResult::failure(
                        &request.id,
                        &ToolError::Panicked {
                            name: request.name.clone(),
                        },
                    )
                })
            })
            .collect();

        BatchOutcome::Completed(results)
    }
}

async fn execute_call(
    tool: Result<Arc<dyn Tool>, ToolError>,
    request: &ToolCallRequest,
    timeout: Option<Duration>,
) -> ToolResult {
    let tool = match tool {
        Ok(tool) => tool,
        Err(err) => {
            warn!(tool_name = %request.name, call_id = %request.id, "Unknown tool requested");
            return ToolResult::failure(&request.id, &err);
        }
    };

    let call = AssertUnwindSafe(tool.call(request.arguments.clone())).catch_unwind();
    let outcome = match timeout {
        Some(limit) => match tokio::time::timeout(limit, call).await {
            Ok(outcome) => outcome,
            Err(_) => {
                let err = ToolError::Timeout {
                    name: request.name.clone(),
                    timeout_ms: limit.as_millis() as u64,
                };
                warn!(call_id = %request.id, "{}", err);
                return ToolResult::failure(&request.id, &err);
            }
        },
        None => call.await,
    };

    match outcome {
        Ok(Ok(output)) => ToolResult::success(&request.id, output),
        Ok(Err(err)) => {
            warn!(tool_name = %request.name, call_id = %request.id, error = %err, "Tool call failed");
            ToolResult::failure(&request.id, &err)
        }
        Err(_) => {
            let err = ToolError::Panicked {
                name: request.name.clone(),
            };
            warn!(call_id = %request.id, "{}", err);
            ToolResult::failure(&request.id, &err)
        }
    }
}

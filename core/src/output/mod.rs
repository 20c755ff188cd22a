//! Output abstraction layer for the orchestration loop
//!
//! The loop reports what it is doing through [`LoopObserver`]; the CLI prints
//! events, the trajectory recorder persists them, tests capture them.

use crate::model::Reply;
use crate::tools::{ToolCallRequest, ToolResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Events emitted during a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LoopEvent {
    /// A run was seeded with a user query
    RunStarted { query: String, max_turns: usize },

    /// The loop is waiting on the model for turn `turn`
    ModelRequested { turn: usize },

    /// A model attempt failed and will be retried after `delay_ms`
    ModelRetry {
        turn: usize,
        attempt: u32,
        delay_ms: u64,
        error: String,
    },

    /// The model answered
    ModelReplied { turn: usize, reply: Reply },

    /// A tool call was dispatched
    ToolStarted { turn: usize, request: ToolCallRequest },

    /// A tool call finished, successfully or not
    ToolCompleted {
        turn: usize,
        tool_name: String,
        result: ToolResult,
        duration_ms: u64,
    },

    /// The run reached a final answer
    RunCompleted {
        model_turns: usize,
        final_text: String,
        duration_ms: u64,
    },

    /// The run stopped on a fatal error
    RunFailed { error: String },
}

/// Receiver of loop events. Implementations must not block for long: tool
/// events are emitted from concurrently running tasks.
#[async_trait]
pub trait LoopObserver: Send + Sync {
    async fn emit(&self, event: &LoopEvent);
}

/// Observer that discards all events
pub struct NullObserver;

#[async_trait]
impl LoopObserver for NullObserver {
    async fn emit(&self, _event: &LoopEvent) {}
}

/// Forwards every event to each member in order
#[derive(Default, Clone)]
pub struct ObserverSet {
    observers: Vec<Arc<dyn LoopObserver>>,
}

impl ObserverSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, observer: Arc<dyn LoopObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn push(&mut self, observer: Arc<dyn LoopObserver>) {
        self.observers.push(observer);
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

#[async_trait]
impl LoopObserver for ObserverSet {
    async fn emit(&self, event: &LoopEvent) {
        for observer in &self.observers {
            observer.emit(event).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct Capture(Mutex<Vec<LoopEvent>>);

    #[async_trait]
    impl LoopObserver for Capture {
        async fn emit(&self, event: &LoopEvent) {
            self.0.lock().await.push(event.clone());
        }
    }

    #[tokio::test]
    async fn test_observer_set_fans_out() {
        let first = Arc::new(Capture::default());
        let second = Arc::new(Capture::default());
        let set = ObserverSet::new()
            .with(first.clone())
            .with(Arc::new(NullObserver))
            .with(second.clone());

        set.emit(&LoopEvent::ModelRequested { turn: 1 }).await;

        assert_eq!(set.len(), 3);
        assert_eq!(first.0.lock().await.len(), 1);
        assert_eq!(
            second.0.lock().await[0],
            LoopEvent::ModelRequested { turn: 1 }
        );
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let json = serde_json::to_value(LoopEvent::RunFailed {
            error: "boom".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "run_failed");
        assert_eq!(json["error"], "boom");
    }
}

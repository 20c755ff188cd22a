//! Orchestrator implementation

use super::config::OrchestratorConfig;
use super::execution::RunOutcome;
use super::state::LoopState;
use crate::conversation::ConversationState;
use crate::error::{Error, ModelError, OrchestratorError, Result};
use crate::model::{generate_with_retry, GenerateError, ModelClient, Reply};
use crate::output::{LoopEvent, LoopObserver};
use crate::tools::{BatchOutcome, ToolInvoker};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Drives one query to a final answer.
///
/// The loop alternates between asking the model and running the tool calls
/// it requested. Tool failures are fed back to the model as results; model
/// failures, the turn ceiling and cancellation end the run.
pub struct Orchestrator {
    model: Arc<dyn ModelClient>,
    invoker: ToolInvoker,
    config: Arc<OrchestratorConfig>,
    observer: Arc<dyn LoopObserver>,
}

impl Orchestrator {
    pub(crate) fn new(
        model: Arc<dyn ModelClient>,
        invoker: ToolInvoker,
        config: Arc<OrchestratorConfig>,
        observer: Arc<dyn LoopObserver>,
    ) -> Self {
        Self {
            model,
            invoker,
            config,
            observer,
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn invoker(&self) -> &ToolInvoker {
        &self.invoker
    }

    pub fn model(&self) -> &dyn ModelClient {
        self.model.as_ref()
    }

    /// Run a query to completion
    pub async fn run(&self, query: &str) -> Result<RunOutcome> {
        self.run_with_cancellation(query, CancellationToken::new())
            .await
    }

    /// Run a query, stopping early when `cancel` fires. A cancelled run never
    /// leaves a partial tool turn in its transcript.
    pub async fn run_with_cancellation(
        &self,
        query: &str,
        cancel: CancellationToken,
    ) -> Result<RunOutcome> {
        let started = Instant::now();
        let tools = self.invoker.catalog().definitions();
        let policy = self.config.retry_policy();
        let max_turns = self.config.max_turns;

        let mut state =
            ConversationState::seed(query).with_instructions(self.config.instructions.clone());
        let mut loop_state = LoopState::AwaitingModel;

        info!(
            provider = self.model.provider_name(),
            model = self.model.model_name(),
            tools = tools.len(),
            max_turns,
            "Starting run"
        );
        self.observer
            .emit(&LoopEvent::RunStarted {
                query: query.to_string(),
                max_turns,
            })
            .await;

        loop {
            debug!(state = %loop_state, turns = state.len(), "Loop step");
            match loop_state {
                LoopState::AwaitingModel => {
                    let turn = state.model_turns() + 1;
                    if turn > max_turns {
                        return Err(self
                            .fail(OrchestratorError::MaxTurnsExceeded {
                                max_turns,
                                transcript: Box::new(state),
                            })
                            .await);
                    }

                    self.observer
                        .emit(&LoopEvent::ModelRequested { turn })
                        .await;

                    let reply = match generate_with_retry(
                        self.model.as_ref(),
                        &state,
                        &tools,
                        &policy,
                        &cancel,
                        self.observer.as_ref(),
                        turn,
                    )
                    .await
                    {
                        Ok(reply) => reply,
                        Err(GenerateError::Cancelled) => {
                            return Err(self
                                .fail(OrchestratorError::Cancelled {
                                    transcript: Box::new(state),
                                })
                                .await)
                        }
                        Err(GenerateError::Failed(source)) => {
                            return Err(self
                                .fail(OrchestratorError::ModelFailed {
                                    source,
                                    transcript: Box::new(state),
                                })
                                .await)
                        }
                    };

                    if let Reply::ToolCalls(calls) = &reply {
                        if calls.is_empty() {
                            return Err(self
                                .fail(OrchestratorError::ModelFailed {
                                    source: ModelError::InvalidResponse {
                                        message: "reply has an empty tool call list".into(),
                                    },
                                    transcript: Box::new(state),
                                })
                                .await);
                        }
                    }

                    self.observer
                        .emit(&LoopEvent::ModelReplied {
                            turn,
                            reply: reply.clone(),
                        })
                        .await;

                    loop_state = if reply.is_final() {
                        LoopState::Terminated
                    } else {
                        debug!(turn, calls = reply.tool_calls().len(), "Model requested tools");
                        LoopState::DispatchingTools
                    };
                    state.push_model_turn(reply)?;
                }

                LoopState::DispatchingTools => {
                    let turn = state.model_turns();
                    let requests = state.pending_tool_calls().to_vec();

                    match self.invoker.invoke_batch(turn, &requests, &cancel).await {
                        BatchOutcome::Completed(results) => {
                            let failed = results.iter().filter(|r| r.is_error()).count();
                            debug!(turn, results = results.len(), failed, "Tool batch joined");
                            state.push_tool_turn(results)?;
                            loop_state = LoopState::AwaitingModel;
                        }
                        BatchOutcome::Cancelled => {
                            return Err(self
                                .fail(OrchestratorError::Cancelled {
                                    transcript: Box::new(state),
                                })
                                .await)
                        }
                    }
                }

                LoopState::Terminated => break,
            }
        }

        let final_text = state.final_text().unwrap_or_default().to_string();
        let model_turns = state.model_turns();
        let duration_ms = started.elapsed().as_millis() as u64;

        info!(model_turns, duration_ms, "Run completed");
        self.observer
            .emit(&LoopEvent::RunCompleted {
                model_turns,
                final_text: final_text.clone(),
                duration_ms,
            })
            .await;

        Ok(RunOutcome {
            final_text,
            transcript: state,
            model_turns,
            duration_ms,
        })
    }

    async fn fail(&self, err: OrchestratorError) -> Error {
        error!(error = %err, "Run failed");
        self.observer
            .emit(&LoopEvent::RunFailed {
                error: err.to_string(),
            })
            .await;
        err.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ToolDefinition;
    use crate::orchestrator::OrchestratorBuilder;
    use crate::tools::{FnTool, ToolArguments, ToolCallRequest, ToolCatalog};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Mock model that replays scripted replies and records what it was sent
    struct MockModelClient {
        replies: Mutex<VecDeque<Reply>>,
        seen: Mutex<Vec<usize>>,
    }

    impl MockModelClient {
        fn new(replies: Vec<Reply>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ModelClient for MockModelClient {
        async fn generate(
            &self,
            conversation: &ConversationState,
            _tools: &[ToolDefinition],
        ) -> Result<Reply> {
            self.seen.lock().unwrap().push(conversation.len());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| Error::from("script exhausted"))
        }

        fn model_name(&self) -> &str {
            "mock-model"
        }

        fn provider_name(&self) -> &str {
            "mock"
        }
    }

    fn echo_catalog() -> ToolCatalog {
        ToolCatalog::new()
            .with_tool(FnTool::new(
                "echo",
                "Echo the text argument",
                json!({"type": "object", "properties": {"text": {"type": "string"}}}),
                |args: ToolArguments| async move { args.get::<String>("text") },
            ))
            .unwrap()
    }

    fn echo_call(id: &str, text: &str) -> ToolCallRequest {
        ToolCallRequest::new(id, "echo", ToolArguments::new().with("text", json!(text)))
    }

    #[tokio::test]
    async fn test_text_reply_terminates_immediately() {
        let model = Arc::new(MockModelClient::new(vec![Reply::Text("hi".into())]));
        let orchestrator = OrchestratorBuilder::new(model.clone()).build().unwrap();

        let outcome = orchestrator.run("hello").await.unwrap();
        assert_eq!(outcome.final_text, "hi");
        assert_eq!(outcome.model_turns, 1);
        assert_eq!(outcome.transcript.len(), 2);
        assert_eq!(*model.seen.lock().unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn test_tool_round_trip() {
        let model = Arc::new(MockModelClient::new(vec![
            Reply::ToolCalls(vec![echo_call("c1", "pong")]),
            Reply::Text("got pong".into()),
        ]));
        let orchestrator = OrchestratorBuilder::new(model.clone())
            .with_catalog(echo_catalog())
            .build()
            .unwrap();

        let outcome = orchestrator.run("ping").await.unwrap();
        assert_eq!(outcome.final_text, "got pong");
        assert_eq!(outcome.tool_calls(), 1);
        let results = outcome.transcript.turns()[2].tool_results();
        assert_eq!(results[0].output, "pong");
        assert_eq!(*model.seen.lock().unwrap(), vec![1, 3]);
    }

    #[tokio::test]
    async fn test_empty_tool_call_list_is_fatal() {
        let model = Arc::new(MockModelClient::new(vec![Reply::ToolCalls(vec![])]));
        let orchestrator = OrchestratorBuilder::new(model).build().unwrap();

        let err = orchestrator.run("x").await.unwrap_err();
        match err {
            Error::Orchestrator(OrchestratorError::ModelFailed { source, transcript }) => {
                assert!(matches!(source, ModelError::InvalidResponse { .. }));
                assert_eq!(transcript.len(), 1);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_instructions_reach_the_transcript() {
        let model = Arc::new(MockModelClient::new(vec![Reply::Text("ok".into())]));
        let orchestrator = OrchestratorBuilder::new(model)
            .with_instructions(Some("Answer tersely.".into()))
            .build()
            .unwrap();

        let outcome = orchestrator.run("x").await.unwrap();
        assert_eq!(outcome.transcript.instructions(), Some("Answer tersely."));
    }

    #[test]
    fn test_builder_rejects_zero_turns() {
        let model = Arc::new(MockModelClient::new(vec![]));
        assert!(OrchestratorBuilder::new(model)
            .with_max_turns(0)
            .build()
            .is_err());
    }
}

//! Model call retry with timeout and exponential backoff
//!
//! Each attempt is bounded by the request timeout. Retryable failures
//! (timeouts, unavailability, rate limits, network and 5xx errors) are retried
//! up to `max_retries` times; the delay doubles each time, capped at
//! `max_backoff`. Anything else fails immediately.

use crate::conversation::ConversationState;
use crate::error::{Error, ModelError};
use crate::model::{ModelClient, Reply, ToolDefinition};
use crate::output::{LoopEvent, LoopObserver};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// How model calls are bounded and retried
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Per-attempt timeout; `None` waits indefinitely
    pub request_timeout: Option<Duration>,
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_backoff: Duration,
    /// Upper bound for any single delay
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            request_timeout: Some(Duration::from_secs(120)),
            max_retries: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (0-based)
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.min(16));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// Why a retried model call gave up
#[derive(Debug, Clone, PartialEq)]
pub enum GenerateError {
    /// Non-retryable failure, or retries exhausted; holds the last error
    Failed(ModelError),
    /// The run was cancelled while waiting
    Cancelled,
}

/// Call the model under `policy`, reporting retries to `observer`
pub async fn generate_with_retry(
    client: &dyn ModelClient,
    conversation: &ConversationState,
    tools: &[ToolDefinition],
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    observer: &dyn LoopObserver,
    turn: usize,
) -> Result<Reply, GenerateError> {
    let mut retry = 0u32;

    loop {
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(GenerateError::Cancelled),
            outcome = attempt(client, conversation, tools, policy.request_timeout) => outcome,
        };

        let err = match outcome {
            Ok(reply) => return Ok(reply),
            Err(err) => err,
        };

        if !err.is_retryable() || retry >= policy.max_retries {
            warn!(turn, retries = retry, error = %err, "Model call failed");
            return Err(GenerateError::Failed(err));
        }

        let delay = policy.backoff(retry);
        retry += 1;
        warn!(
            turn,
            attempt = retry,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Model call failed, retrying"
        );
        observer
            .emit(&LoopEvent::ModelRetry {
                turn,
                attempt: retry,
                delay_ms: delay.as_millis() as u64,
                error: err.to_string(),
            })
            .await;

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(GenerateError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

async fn attempt(
    client: &dyn ModelClient,
    conversation: &ConversationState,
    tools: &[ToolDefinition],
    timeout: Option<Duration>,
) -> Result<Reply, ModelError> {
    debug!(
        provider = client.provider_name(),
        model = client.model_name(),
        turns = conversation.len(),
        "Calling model"
    );
    let call = client.generate(conversation, tools);
    let outcome = match timeout {
        Some(limit) => match tokio::time::timeout(limit, call).await {
            Ok(outcome) => outcome,
            Err(_) => {
                return Err(ModelError::Timeout {
                    timeout_ms: limit.as_millis() as u64,
                })
            }
        },
        None => call.await,
    };
    outcome.map_err(into_model_error)
}

/// Collapse any client failure into a [`ModelError`]
fn into_model_error(err: Error) -> ModelError {
    match err {
        Error::Model(err) => err,
        Error::Http(err) if err.is_timeout() => ModelError::Timeout { timeout_ms: 0 },
        Error::Http(err) => ModelError::Network {
            message: err.to_string(),
        },
        Error::Serialization(err) => ModelError::InvalidResponse {
            message: err.to_string(),
        },
        other => ModelError::Unavailable {
            message: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::output::NullObserver;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays a fixed script of outcomes, then answers "fallback"
    struct Flaky {
        script: Mutex<VecDeque<std::result::Result<Reply, ModelError>>>,
        calls: Mutex<u32>,
        delay: Duration,
    }

    impl Flaky {
        fn new(script: Vec<std::result::Result<Reply, ModelError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: Mutex::new(0),
                delay: Duration::ZERO,
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl ModelClient for Flaky {
        async fn generate(
            &self,
            _conversation: &ConversationState,
            _tools: &[ToolDefinition],
        ) -> Result<Reply> {
            *self.calls.lock().unwrap() += 1;
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(outcome) => outcome.map_err(Error::from),
                None => Ok(Reply::Text("fallback".into())),
            }
        }

        fn model_name(&self) -> &str {
            "flaky"
        }

        fn provider_name(&self) -> &str {
            "test"
        }
    }

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            request_timeout: Some(Duration::from_millis(50)),
            max_retries,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(4),
        }
    }

    async fn run(client: &Flaky, policy: &RetryPolicy) -> std::result::Result<Reply, GenerateError> {
        generate_with_retry(
            client,
            &ConversationState::seed("X"),
            &[],
            policy,
            &CancellationToken::new(),
            &NullObserver,
            1,
        )
        .await
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            request_timeout: None,
            max_retries: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(350),
        };
        assert_eq!(policy.backoff(0), Duration::from_millis(100));
        assert_eq!(policy.backoff(1), Duration::from_millis(200));
        assert_eq!(policy.backoff(2), Duration::from_millis(350));
        assert_eq!(policy.backoff(40), Duration::from_millis(350));
    }

    #[tokio::test]
    async fn test_retries_transient_failures() {
        let client = Flaky::new(vec![
            Err(ModelError::Unavailable {
                message: "overloaded".into(),
            }),
            Err(ModelError::RateLimit),
            Ok(Reply::Text("ok".into())),
        ]);

        let reply = run(&client, &fast_policy(3)).await.unwrap();
        assert_eq!(reply, Reply::Text("ok".into()));
        assert_eq!(client.calls(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let client = Flaky::new(vec![
            Err(ModelError::RateLimit),
            Err(ModelError::RateLimit),
            Err(ModelError::RateLimit),
        ]);

        let err = run(&client, &fast_policy(2)).await.unwrap_err();
        assert_eq!(err, GenerateError::Failed(ModelError::RateLimit));
        assert_eq!(client.calls(), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_fails_immediately() {
        let client = Flaky::new(vec![Err(ModelError::Authentication {
            message: "bad key".into(),
        })]);

        let err = run(&client, &fast_policy(5)).await.unwrap_err();
        assert!(matches!(
            err,
            GenerateError::Failed(ModelError::Authentication { .. })
        ));
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn test_slow_model_times_out() {
        let mut client = Flaky::new(vec![]);
        client.delay = Duration::from_millis(200);

        let err = run(&client, &fast_policy(1)).await.unwrap_err();
        assert!(matches!(
            err,
            GenerateError::Failed(ModelError::Timeout { timeout_ms: 50 })
        ));
        assert_eq!(client.calls(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_before_reply() {
        let mut client = Flaky::new(vec![]);
        client.delay = Duration::from_millis(200);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = generate_with_retry(
            &client,
            &ConversationState::seed("X"),
            &[],
            &fast_policy(0),
            &cancel,
            &NullObserver,
            1,
        )
        .await
        .unwrap_err();
        assert_eq!(err, GenerateError::Cancelled);
    }
}

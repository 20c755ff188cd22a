//! Orchestrator configuration and builder

use crate::error::{ConfigError, Result};
use crate::model::{ModelClient, RetryPolicy};
use crate::output::{LoopObserver, NullObserver};
use crate::tools::{ToolCatalog, ToolInvoker};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::core::Orchestrator;

/// Limits and retry settings for one orchestrator. Immutable once built and
/// shared with the loop behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Maximum number of model calls per run
    pub max_turns: usize,

    /// Per-attempt model timeout; `None` waits indefinitely
    #[serde(with = "opt_millis", rename = "model_timeout_ms")]
    pub model_timeout: Option<Duration>,

    /// Retries of a retryable model failure before the run fails
    pub max_model_retries: u32,

    #[serde(with = "millis", rename = "initial_backoff_ms")]
    pub initial_backoff: Duration,

    #[serde(with = "millis", rename = "max_backoff_ms")]
    pub max_backoff: Duration,

    /// Per-call tool timeout; `None` lets tools run to completion
    #[serde(with = "opt_millis", rename = "tool_timeout_ms")]
    pub tool_timeout: Option<Duration>,

    /// System instructions sent with every model call
    pub instructions: Option<String>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            max_turns: 32,
            model_timeout: retry.request_timeout,
            max_model_retries: retry.max_retries,
            initial_backoff: retry.initial_backoff,
            max_backoff: retry.max_backoff,
            tool_timeout: None,
            instructions: None,
        }
    }
}

impl OrchestratorConfig {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.max_turns == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_turns".into(),
                value: "0".into(),
            });
        }
        if self.model_timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::InvalidValue {
                field: "model_timeout_ms".into(),
                value: "0".into(),
            });
        }
        if self.tool_timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::InvalidValue {
                field: "tool_timeout_ms".into(),
                value: "0".into(),
            });
        }
        if self.initial_backoff > self.max_backoff {
            return Err(ConfigError::InvalidValue {
                field: "initial_backoff_ms".into(),
                value: self.initial_backoff.as_millis().to_string(),
            });
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            request_timeout: self.model_timeout,
            max_retries: self.max_model_retries,
            initial_backoff: self.initial_backoff,
            max_backoff: self.max_backoff,
        }
    }
}

/// Builder for creating an [`Orchestrator`]
pub struct OrchestratorBuilder {
    model: Arc<dyn ModelClient>,
    catalog: ToolCatalog,
    config: OrchestratorConfig,
    observer: Arc<dyn LoopObserver>,
}

impl OrchestratorBuilder {
    pub fn new(model: Arc<dyn ModelClient>) -> Self {
        Self {
            model,
            catalog: ToolCatalog::new(),
            config: OrchestratorConfig::default(),
            observer: Arc::new(NullObserver),
        }
    }

    pub fn with_catalog(mut self, catalog: ToolCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.config.max_turns = max_turns;
        self
    }

    pub fn with_instructions(mut self, instructions: Option<String>) -> Self {
        self.config.instructions = instructions;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn LoopObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Validate the configuration and build the orchestrator
    pub fn build(self) -> Result<Orchestrator> {
        self.config.validate()?;
        let invoker = ToolInvoker::new(Arc::new(self.catalog))
            .with_timeout(self.config.tool_timeout)
            .with_observer(self.observer.clone());
        Ok(Orchestrator::new(
            self.model,
            invoker,
            Arc::new(self.config),
            self.observer,
        ))
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

mod opt_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(value) => serializer.serialize_some(&(value.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<u64>::deserialize(deserializer).map(|ms| ms.map(Duration::from_millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.max_turns, 32);
        assert_eq!(config.retry_policy(), RetryPolicy::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: OrchestratorConfig = serde_json::from_value(json!({
            "max_turns": 5,
            "tool_timeout_ms": 1500,
            "instructions": "Be brief."
        }))
        .unwrap();
        assert_eq!(config.max_turns, 5);
        assert_eq!(config.tool_timeout, Some(Duration::from_millis(1500)));
        assert_eq!(config.max_model_retries, 3);

        let back = serde_json::to_value(&config).unwrap();
        assert_eq!(back["tool_timeout_ms"], 1500);
        assert_eq!(back["initial_backoff_ms"], 500);
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let zero_turns = OrchestratorConfig {
            max_turns: 0,
            ..Default::default()
        };
        assert!(zero_turns.validate().is_err());

        let inverted = OrchestratorConfig {
            initial_backoff: Duration::from_secs(10),
            max_backoff: Duration::from_secs(1),
            ..Default::default()
        };
        assert!(inverted.validate().is_err());
    }
}

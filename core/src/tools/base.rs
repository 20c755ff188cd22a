//! Base tool traits and structures

use crate::error::ToolError;
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Output returned to the model when a tool call fails. The failure itself is
/// carried in [`ToolResult::error`].
pub const TOOL_FAILURE_OUTPUT: &str = "Tool call failed; see the error field for details.";

/// Result of a single tool handler invocation
pub type ToolOutcome = std::result::Result<String, ToolError>;

/// Trait for all tools
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the name of the tool
    fn name(&self) -> &str;

    /// Get the description of the tool
    fn description(&self) -> &str;

    /// Get the JSON schema for the tool's arguments
    fn input_schema(&self) -> serde_json::Value;

    /// Run the tool with the given arguments
    async fn call(&self, arguments: ToolArguments) -> ToolOutcome;
}

/// Arguments passed to a tool, as a JSON object keyed by parameter name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolArguments(serde_json::Map<String, serde_json::Value>);

impl ToolArguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build arguments from an arbitrary JSON value. Non-object values are
    /// rejected because tool parameters are always named.
    pub fn from_value(value: serde_json::Value) -> std::result::Result<Self, ToolError> {
        match value {
            serde_json::Value::Object(map) => Ok(Self(map)),
            serde_json::Value::Null => Ok(Self::default()),
            other => Err(ToolError::InvalidArguments {
                message: format!("expected a JSON object, got {}", other),
            }),
        }
    }

    /// Insert an argument, builder style
    pub fn with<K: Into<String>>(mut self, key: K, value: serde_json::Value) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    /// Get a parameter value by key
    pub fn get<T>(&self, key: &str) -> std::result::Result<T, ToolError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let value = self.0.get(key).ok_or_else(|| ToolError::InvalidArguments {
            message: format!("Missing parameter: {}", key),
        })?;

        serde_json::from_value(value.clone()).map_err(|_| ToolError::InvalidArguments {
            message: format!("Invalid parameter type for: {}", key),
        })
    }

    /// Get a parameter value by key with a default
    pub fn get_or<T>(&self, key: &str, default: T) -> T
    where
        T: for<'de> Deserialize<'de>,
    {
        match self.0.get(key) {
            Some(value) => serde_json::from_value(value.clone()).unwrap_or(default),
            None => default,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.0
    }

    pub fn to_value(&self) -> serde_json::Value {
        serde_json::Value::Object(self.0.clone())
    }
}

/// A model-issued request to invoke a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Identifier, unique within one model turn
    pub id: String,

    /// Name of the tool to call
    pub name: String,

    /// Arguments to pass to the tool
    pub arguments: ToolArguments,
}

impl ToolCallRequest {
    pub fn new<I: Into<String>, N: Into<String>>(id: I, name: N, arguments: ToolArguments) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// Outcome of executing one [`ToolCallRequest`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// ID of the tool call this is a result for
    pub call_id: String,

    /// Result content shown to the model
    pub output: String,

    /// Human-readable failure description, if the call failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    /// Create a successful result
    pub fn success<I: Into<String>, O: Into<String>>(call_id: I, output: O) -> Self {
        Self {
            call_id: call_id.into(),
            output: output.into(),
            error: None,
        }
    }

    /// Create a failed result with the fallback output
    pub fn failure<I: Into<String>>(call_id: I, error: &ToolError) -> Self {
        Self {
            call_id: call_id.into(),
            output: TOOL_FAILURE_OUTPUT.to_string(),
            error: Some(error.to_string()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Text handed back to the model for this result
    pub fn model_content(&self) -> String {
        match &self.error {
            Some(error) => format!("{}\nError: {}", self.output, error),
            None => self.output.clone(),
        }
    }
}

type ToolHandler = Arc<dyn Fn(ToolArguments) -> BoxFuture<'static, ToolOutcome> + Send + Sync>;

/// A tool backed by an async closure
///
/// ```ignore
/// let echo = FnTool::new("echo", "Echo the text back", schema, |args| async move {
///     args.get::<String>("text")
/// });
/// ```
pub struct FnTool {
    name: String,
    description: String,
    input_schema: serde_json::Value,
    handler: ToolHandler,
}

impl FnTool {
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: serde_json::Value,
        handler: F,
    ) -> Self
    where
        F: Fn(ToolArguments) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ToolOutcome> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            handler: Arc::new(move |args| Box::pin(handler(args))),
        }
    }
}

#[async_trait]
impl Tool for FnTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn input_schema(&self) -> serde_json::Value {
        self.input_schema.clone()
    }

    async fn call(&self, arguments: ToolArguments) -> ToolOutcome {
        (self.handler)(arguments).await
    }
}

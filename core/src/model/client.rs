//! Model client trait and reply structures

use crate::conversation::ConversationState;
use crate::error::{ModelError, Result};
use crate::tools::ToolCallRequest;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Boundary to the language model.
///
/// Given the conversation so far and the tool catalog, the model answers with
/// either final text or one or more tool call requests.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Ask the model for its next turn
    async fn generate(
        &self,
        conversation: &ConversationState,
        tools: &[ToolDefinition],
    ) -> Result<Reply>;

    /// Get the model name
    fn model_name(&self) -> &str;

    /// Get the provider name
    fn provider_name(&self) -> &str;
}

/// The model's answer for one turn. Exactly one case is active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Reply {
    /// Final answer; the run terminates
    Text(String),

    /// Non-empty, ordered list of tool invocations
    ToolCalls(Vec<ToolCallRequest>),
}

impl Reply {
    /// Build a reply from a provider's raw text and tool calls. Tool calls
    /// win over any accompanying text; text alone is a final answer. A reply
    /// with neither is rejected.
    pub fn from_parts(
        text: Option<String>,
        calls: Vec<ToolCallRequest>,
    ) -> std::result::Result<Self, ModelError> {
        if calls.is_empty() {
            text.map(Reply::Text).ok_or_else(|| ModelError::InvalidResponse {
                message: "reply has neither text nor tool calls".to_string(),
            })
        } else {
            if let Some(text) = text.filter(|t| !t.trim().is_empty()) {
                tracing::debug!(
                    chars = text.len(),
                    "Dropping model text that accompanied tool calls"
                );
            }
            Ok(Reply::ToolCalls(calls))
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(self, Reply::Text(_))
    }

    pub fn tool_calls(&self) -> &[ToolCallRequest] {
        match self {
            Reply::ToolCalls(calls) => calls.as_slice(),
            Reply::Text(_) => &[],
        }
    }
}

/// Tool definition for function calling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Name of the tool
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON schema for the tool arguments
    pub input_schema: serde_json::Value,
}

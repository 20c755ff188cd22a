//! Conversation turns

use crate::model::Reply;
use crate::tools::{ToolCallRequest, ToolResult};
use serde::{Deserialize, Serialize};

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Role::User => "user",
            Role::Model => "model",
            Role::Tool => "tool",
        };
        f.write_str(name)
    }
}

/// One step of the conversation, attributable to exactly one role.
///
/// The payload is fixed by the role: users send text, the model sends a
/// [`Reply`] (final text or tool calls), tools send one result per call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Turn {
    User { content: String },
    Model { reply: Reply },
    Tool { results: Vec<ToolResult> },
}

impl Turn {
    pub fn user<S: Into<String>>(content: S) -> Self {
        Turn::User {
            content: content.into(),
        }
    }

    pub fn model(reply: Reply) -> Self {
        Turn::Model { reply }
    }

    pub fn tool(results: Vec<ToolResult>) -> Self {
        Turn::Tool { results }
    }

    pub fn role(&self) -> Role {
        match self {
            Turn::User { .. } => Role::User,
            Turn::Model { .. } => Role::Model,
            Turn::Tool { .. } => Role::Tool,
        }
    }

    /// Free text of a user turn or a final model turn
    pub fn text(&self) -> Option<&str> {
        match self {
            Turn::User { content } => Some(content.as_str()),
            Turn::Model {
                reply: Reply::Text(text),
            } => Some(text.as_str()),
            _ => None,
        }
    }

    /// Tool call requests of a model turn; empty otherwise
    pub fn tool_calls(&self) -> &[ToolCallRequest] {
        match self {
            Turn::Model {
                reply: Reply::ToolCalls(calls),
            } => calls.as_slice(),
            _ => &[],
        }
    }

    /// Tool results of a tool turn; empty otherwise
    pub fn tool_results(&self) -> &[ToolResult] {
        match self {
            Turn::Tool { results } => results.as_slice(),
            _ => &[],
        }
    }
}

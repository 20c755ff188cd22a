//! Append-only conversation state for a single run

use super::turn::{Role, Turn};
use crate::error::OrchestratorError;
use crate::model::Reply;
use crate::tools::{ToolCallRequest, ToolResult};
use serde::{Deserialize, Serialize};

/// Ordered turns of one query, plus the standing instructions for the model.
///
/// Only two mutations exist, and both check the turn sequence: a model turn
/// must follow a user or tool turn, and a tool turn must answer every call
/// of the preceding model turn exactly once, in request order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    /// System instructions sent alongside the turns (not a turn itself)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    instructions: Option<String>,

    turns: Vec<Turn>,
}

impl ConversationState {
    /// Start a conversation with a single user turn
    pub fn seed<S: Into<String>>(query: S) -> Self {
        Self {
            instructions: None,
            turns: vec![Turn::user(query)],
        }
    }

    pub fn with_instructions(mut self, instructions: Option<String>) -> Self {
        self.instructions = instructions;
        self
    }

    pub fn instructions(&self) -> Option<&str> {
        self.instructions.as_deref()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// The seed query
    pub fn query(&self) -> Option<&str> {
        self.turns.first().and_then(Turn::text)
    }

    /// Number of model turns so far
    pub fn model_turns(&self) -> usize {
        self.turns.iter().filter(|t| t.role() == Role::Model).count()
    }

    /// Calls of the latest model turn that have no tool turn yet
    pub fn pending_tool_calls(&self) -> &[ToolCallRequest] {
        match self.turns.last() {
            Some(turn) => turn.tool_calls(),
            None => &[],
        }
    }

    /// Final answer, if the conversation ended on a text model turn
    pub fn final_text(&self) -> Option<&str> {
        match self.turns.last() {
            Some(Turn::Model {
                reply: Reply::Text(text),
            }) => Some(text.as_str()),
            _ => None,
        }
    }

    /// Find the tool call a result answers, searching from the newest turn
    pub fn find_call(&self, call_id: &str) -> Option<&ToolCallRequest> {
        self.turns
            .iter()
            .rev()
            .flat_map(|turn| turn.tool_calls())
            .find(|call| call.id == call_id)
    }

    /// Append the model's reply
    pub fn push_model_turn(&mut self, reply: Reply) -> Result<(), OrchestratorError> {
        match self.turns.last().map(Turn::role) {
            Some(Role::User) | Some(Role::Tool) => {}
            other => {
                return Err(OrchestratorError::InvalidTurn {
                    message: format!(
                        "model turn cannot follow {}",
                        other.map(|r| r.to_string()).unwrap_or_else(|| "nothing".into())
                    ),
                })
            }
        }
        self.turns.push(Turn::model(reply));
        Ok(())
    }

    /// Append the results answering the latest model turn
    pub fn push_tool_turn(&mut self, results: Vec<ToolResult>) -> Result<(), OrchestratorError> {
        let calls = self.pending_tool_calls();
        if calls.is_empty() {
            return Err(OrchestratorError::InvalidTurn {
                message: "tool turn must follow a model turn with tool calls".into(),
            });
        }
        if calls.len() != results.len() {
            return Err(OrchestratorError::InvalidTurn {
                message: format!(
                    "expected {} tool results, got {}",
                    calls.len(),
                    results.len()
                ),
            });
        }
        if let Some((call, result)) = calls
            .iter()
            .zip(&results)
            .find(|(call, result)| call.id != result.call_id)
        {
            return Err(OrchestratorError::InvalidTurn {
                message: format!(
                    "tool result '{}' does not match call '{}'",
                    result.call_id, call.id
                ),
            });
        }
        self.turns.push(Turn::tool(results));
        Ok(())
    }
}

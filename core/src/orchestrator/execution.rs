//! Run result structures

use crate::conversation::ConversationState;
use serde::{Deserialize, Serialize};

/// Result of a run that reached a final answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    /// The model's final text
    pub final_text: String,

    /// Every turn of the run, ending with the terminal model turn
    pub transcript: ConversationState,

    /// Number of model calls that produced a turn
    pub model_turns: usize,

    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
}

impl RunOutcome {
    /// Number of tool calls made during the run
    pub fn tool_calls(&self) -> usize {
        self.transcript
            .turns()
            .iter()
            .map(|turn| turn.tool_calls().len())
            .sum()
    }
}

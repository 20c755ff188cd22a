//! Loop states

use serde::{Deserialize, Serialize};

/// Where the orchestration loop is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    /// Waiting for the model's next reply
    AwaitingModel,
    /// Running the tool calls of the latest model turn
    DispatchingTools,
    /// A final answer was appended; nothing more happens
    Terminated,
}

impl std::fmt::Display for LoopState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LoopState::AwaitingModel => "awaiting_model",
            LoopState::DispatchingTools => "dispatching_tools",
            LoopState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

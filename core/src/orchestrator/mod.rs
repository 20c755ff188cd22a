//! The orchestration loop

pub mod config;
pub mod core;
pub mod execution;
pub mod state;

pub use config::{OrchestratorBuilder, OrchestratorConfig};
pub use core::Orchestrator;
pub use execution::RunOutcome;
pub use state::LoopState;

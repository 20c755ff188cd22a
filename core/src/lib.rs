//! # conductor Core
//!
//! Core library for conductor - an orchestration loop that lets a language
//! model answer a query by calling tools.
//!
//! A run alternates between asking the model and executing the tool calls it
//! requests. Tool calls of one turn run concurrently and their results are
//! handed back in request order. Tool failures are reported to the model;
//! model failures, the turn ceiling and cancellation end the run.

// Core modules
pub mod config;
pub mod conversation;
pub mod error;
pub mod model;
pub mod orchestrator;
pub mod output;
pub mod tools;
pub mod trajectory;

// Re-export commonly used types
pub use config::{ModelParams, Protocol, ResolvedLlmConfig};
pub use conversation::{ConversationState, Role, Turn};
pub use error::{Error, ModelError, OrchestratorError, Result, ToolError};
pub use model::{create_model_client, ModelClient, Reply, ToolDefinition};
pub use orchestrator::{
    LoopState, Orchestrator, OrchestratorBuilder, OrchestratorConfig, RunOutcome,
};
pub use output::{LoopEvent, LoopObserver, NullObserver, ObserverSet};
pub use tools::{
    FnTool, Tool, ToolArguments, ToolCallRequest, ToolCatalog, ToolInvoker, ToolResult,
};
pub use trajectory::TrajectoryRecorder;

/// Current version of the conductor-core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize tracing for the library
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

/// Initialize tracing with a specific debug mode
pub fn init_tracing_with_debug(debug: bool) {
    let filter = if debug { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .init();
}

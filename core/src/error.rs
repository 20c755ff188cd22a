//! Error types and handling for Conductor Core

use crate::conversation::ConversationState;
use thiserror::Error;

/// Result type alias for Conductor operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Conductor Core
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Model client errors
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// Tool catalog and execution errors
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    /// Fatal orchestration loop errors
    #[error("Orchestrator error: {0}")]
    Orchestrator(#[from] OrchestratorError),

    /// Trajectory recording errors
    #[error("Trajectory error: {0}")]
    Trajectory(#[from] TrajectoryError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Generic error with message
    #[error("{0}")]
    Generic(String),
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for field '{field}': {value}")]
    InvalidValue { field: String, value: String },

    #[error("Unsupported protocol: {protocol}")]
    UnsupportedProtocol { protocol: String },
}

/// Errors raised while talking to the model endpoint
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Model request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Model unavailable: {message}")]
    Unavailable { message: String },

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Invalid model response: {message}")]
    InvalidResponse { message: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },
}

impl ModelError {
    /// Whether a fresh attempt may succeed where this one failed
    pub fn is_retryable(&self) -> bool {
        match self {
            ModelError::Timeout { .. }
            | ModelError::Unavailable { .. }
            | ModelError::RateLimit
            | ModelError::Network { .. } => true,
            ModelError::Api { status, .. } => *status == 429 || *status >= 500,
            ModelError::Authentication { .. }
            | ModelError::InvalidResponse { .. }
            | ModelError::InvalidRequest { .. } => false,
        }
    }
}

/// Tool catalog and execution errors.
///
/// Execution-side variants never escape the loop: the invoker turns them into
/// `ToolResult::error` text for the model to read.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },

    #[error("Duplicate tool: {name}")]
    DuplicateTool { name: String },

    #[error("Tool execution failed: {name} - {message}")]
    ExecutionFailed { name: String, message: String },

    #[error("Invalid tool arguments: {message}")]
    InvalidArguments { message: String },

    #[error("Tool timeout: {name} after {timeout_ms}ms")]
    Timeout { name: String, timeout_ms: u64 },

    #[error("Tool panicked: {name}")]
    Panicked { name: String },
}

/// Fatal orchestration errors. Each carries the transcript as it stood when
/// the loop stopped.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Maximum turns exceeded: {max_turns}")]
    MaxTurnsExceeded {
        max_turns: usize,
        transcript: Box<ConversationState>,
    },

    #[error("Run cancelled after {} turns", .transcript.len())]
    Cancelled { transcript: Box<ConversationState> },

    #[error("Model call failed: {source}")]
    ModelFailed {
        source: ModelError,
        transcript: Box<ConversationState>,
    },

    #[error("Invalid turn: {message}")]
    InvalidTurn { message: String },
}

impl OrchestratorError {
    /// The partial transcript, when the error carries one
    pub fn transcript(&self) -> Option<&ConversationState> {
        match self {
            OrchestratorError::MaxTurnsExceeded { transcript, .. }
            | OrchestratorError::Cancelled { transcript }
            | OrchestratorError::ModelFailed { transcript, .. } => Some(transcript),
            OrchestratorError::InvalidTurn { .. } => None,
        }
    }
}

/// Trajectory recording errors
#[derive(Error, Debug)]
pub enum TrajectoryError {
    #[error("Failed to record trajectory: {message}")]
    RecordingFailed { message: String },

    #[error("Failed to load trajectory: {path}")]
    LoadFailed { path: String },

    #[error("Invalid trajectory format")]
    InvalidFormat,
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Generic(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Generic(msg.to_string())
    }
}

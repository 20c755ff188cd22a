//! CLI-specific output implementations
//!
//! Concrete observers for command-line runs: colored progress on the
//! terminal.

pub mod cli_handler;

pub use cli_handler::{CliOutputConfig, CliOutputHandler};

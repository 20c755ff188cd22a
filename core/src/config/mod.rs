//! Resolved configuration types for conductor core
//!
//! Core only accepts fully resolved, validated configuration.
//! Discovery and merging of config sources happens in the CLI.

pub mod types;

pub use types::{ModelParams, Protocol, ResolvedLlmConfig};

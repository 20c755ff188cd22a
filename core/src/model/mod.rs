//! Model boundary: client trait, provider implementations, and retries

pub mod client;
pub mod providers;
pub mod retry;

pub use client::{ModelClient, Reply, ToolDefinition};
pub use providers::{create_model_client, GeminiClient, OpenAiClient};
pub use retry::{generate_with_retry, GenerateError, RetryPolicy};

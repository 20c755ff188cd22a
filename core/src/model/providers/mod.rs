//! Model provider implementations

pub mod gemini;
pub mod openai;

pub use gemini::GeminiClient;
pub use openai::OpenAiClient;

use crate::config::{Protocol, ResolvedLlmConfig};
use crate::error::Result;
use crate::model::ModelClient;
use std::sync::Arc;

/// Build the client for a validated provider configuration
pub fn create_model_client(config: &ResolvedLlmConfig) -> Result<Arc<dyn ModelClient>> {
    config.validate()?;
    let client: Arc<dyn ModelClient> = match config.protocol {
        Protocol::OpenAICompat => Arc::new(OpenAiClient::new(config)?),
        Protocol::GoogleAI => Arc::new(GeminiClient::new(config)?),
    };
    tracing::debug!(
        provider = client.provider_name(),
        model = client.model_name(),
        "Created model client"
    );
    Ok(client)
}

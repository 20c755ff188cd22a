//! Model provider configuration consumed by [`crate::model::create_model_client`]

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Wire protocol spoken by the model provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    /// OpenAI-compatible chat completions (OpenAI, proxies, local servers)
    #[serde(rename = "openai_compat")]
    OpenAICompat,
    /// Google AI generateContent API (Gemini)
    #[serde(rename = "google_ai")]
    GoogleAI,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::OpenAICompat => "openai_compat",
            Protocol::GoogleAI => "google_ai",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Protocol::OpenAICompat => "https://api.openai.com/v1",
            Protocol::GoogleAI => "https://generativelanguage.googleapis.com/v1beta",
        }
    }

    /// Model used when none is configured
    pub fn default_model(&self) -> &'static str {
        match self {
            Protocol::OpenAICompat => "gpt-4o",
            Protocol::GoogleAI => "gemini-2.0-flash",
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Protocol {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai_compat" | "openai" => Ok(Protocol::OpenAICompat),
            "google_ai" | "gemini" | "google" => Ok(Protocol::GoogleAI),
            other => Err(ConfigError::UnsupportedProtocol {
                protocol: other.to_string(),
            }),
        }
    }
}

/// Sampling parameters for model requests
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
    /// Temperature for sampling (0.0 to 2.0)
    pub temperature: Option<f32>,
    /// Top-p sampling parameter
    pub top_p: Option<f32>,
}

/// A fully resolved model configuration ready for use by core
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedLlmConfig {
    pub protocol: Protocol,
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    #[serde(default)]
    pub params: ModelParams,
    /// Additional headers for requests
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl ResolvedLlmConfig {
    pub fn new(protocol: Protocol, base_url: String, api_key: String, model: String) -> Self {
        Self {
            protocol,
            base_url,
            api_key,
            model,
            params: ModelParams::default(),
            headers: HashMap::new(),
        }
    }

    pub fn with_params(mut self, params: ModelParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_header(mut self, key: String, value: String) -> Self {
        self.headers.insert(key, value);
        self
    }

    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.is_empty() {
            return Err(ConfigError::MissingField {
                field: "api_key".into(),
            });
        }

        if self.model.is_empty() {
            return Err(ConfigError::MissingField {
                field: "model".into(),
            });
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                field: "base_url".into(),
                value: self.base_url.clone(),
            });
        }

        if let Some(temp) = self.params.temperature {
            if !(0.0..=2.0).contains(&temp) {
                return Err(ConfigError::InvalidValue {
                    field: "temperature".into(),
                    value: temp.to_string(),
                });
            }
        }

        if let Some(top_p) = self.params.top_p {
            if !(0.0..=1.0).contains(&top_p) {
                return Err(ConfigError::InvalidValue {
                    field: "top_p".into(),
                    value: top_p.to_string(),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(protocol: Protocol) -> ResolvedLlmConfig {
        ResolvedLlmConfig::new(
            protocol,
            protocol.default_base_url().to_string(),
            "key".into(),
            protocol.default_model().to_string(),
        )
    }

    #[test]
    fn test_protocol_parsing() {
        assert_eq!("gemini".parse::<Protocol>().unwrap(), Protocol::GoogleAI);
        assert_eq!(
            "OpenAI_Compat".parse::<Protocol>().unwrap(),
            Protocol::OpenAICompat
        );
        assert!(matches!(
            "anthropic".parse::<Protocol>(),
            Err(ConfigError::UnsupportedProtocol { .. })
        ));
    }

    #[test]
    fn test_validate() {
        assert!(config(Protocol::GoogleAI).validate().is_ok());

        let mut missing_key = config(Protocol::OpenAICompat);
        missing_key.api_key.clear();
        assert!(matches!(
            missing_key.validate(),
            Err(ConfigError::MissingField { field }) if field == "api_key"
        ));

        let mut bad_url = config(Protocol::OpenAICompat);
        bad_url.base_url = "ftp://example.com".into();
        assert!(bad_url.validate().is_err());

        let hot = config(Protocol::OpenAICompat).with_params(ModelParams {
            temperature: Some(3.0),
            ..Default::default()
        });
        assert!(hot.validate().is_err());
    }
}

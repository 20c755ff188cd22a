//! CLI configuration loader for conductor
//!
//! Implements single-source priority loading with flag overrides:
//! 1. --config file/dir (highest priority)
//! 2. Current working directory: ./conductor.json or ./.conductor/config.json
//! 3. User config: $XDG_CONFIG_HOME/conductor/config.json or the platform
//!    config directory
//! 4. Environment variables only (no files)

use anyhow::{anyhow, Context, Result};
use conductor_core::{ModelParams, OrchestratorConfig, Protocol, ResolvedLlmConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Raw configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawConfig {
    /// Protocol to use
    pub protocol: String,
    /// API key (can be "env:VAR_NAME" for environment variable)
    pub api_key: String,
    /// Base URL (optional, uses protocol default if not specified)
    pub base_url: Option<String>,
    /// Model name (optional, uses protocol default if not specified)
    pub model: Option<String>,
    #[serde(default)]
    pub params: ModelParams,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Loop limits and retry settings
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

/// Everything a run needs, resolved and validated
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub llm: ResolvedLlmConfig,
    pub orchestrator: OrchestratorConfig,
}

/// CLI configuration loader
#[derive(Default)]
pub struct CliConfigLoader {
    config_override: Option<PathBuf>,
    protocol_override: Option<String>,
    api_key_override: Option<String>,
    base_url_override: Option<String>,
    model_override: Option<String>,
    max_turns_override: Option<usize>,
    instructions_override: Option<String>,
}

impl CliConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set config file/directory override
    pub fn with_config_override(mut self, path: PathBuf) -> Self {
        self.config_override = Some(path);
        self
    }

    pub fn with_protocol_override(mut self, protocol: String) -> Self {
        self.protocol_override = Some(protocol);
        self
    }

    pub fn with_api_key_override(mut self, api_key: String) -> Self {
        self.api_key_override = Some(api_key);
        self
    }

    pub fn with_base_url_override(mut self, base_url: String) -> Self {
        self.base_url_override = Some(base_url);
        self
    }

    pub fn with_model_override(mut self, model: String) -> Self {
        self.model_override = Some(model);
        self
    }

    pub fn with_max_turns_override(mut self, max_turns: usize) -> Self {
        self.max_turns_override = Some(max_turns);
        self
    }

    pub fn with_instructions_override(mut self, instructions: String) -> Self {
        self.instructions_override = Some(instructions);
        self
    }

    /// Load and resolve configuration
    pub async fn load(&self) -> Result<LoadedConfig> {
        // Step 1: Find and load base configuration
        let mut config = if let Some(override_path) = &self.config_override {
            self.load_from_path(override_path).await.with_context(|| {
                format!(
                    "Failed to load config from override path: {}",
                    override_path.display()
                )
            })?
        } else {
            self.search_and_load().await?
        };

        // Step 2: Apply flag overrides
        if let Some(protocol) = &self.protocol_override {
            config.protocol = protocol.clone();
        }
        if let Some(api_key) = &self.api_key_override {
            config.api_key = api_key.clone();
        }
        if let Some(base_url) = &self.base_url_override {
            config.base_url = Some(base_url.clone());
        }
        if let Some(model) = &self.model_override {
            config.model = Some(model.clone());
        }
        if let Some(max_turns) = self.max_turns_override {
            config.orchestrator.max_turns = max_turns;
        }
        if let Some(instructions) = &self.instructions_override {
            config.orchestrator.instructions = Some(instructions.clone());
        }

        // Step 3: Resolve and validate
        self.resolve_config(config)
    }

    /// Search for config in priority order
    async fn search_and_load(&self) -> Result<RawConfig> {
        if let Some(config) = self.try_load_cwd().await? {
            return Ok(config);
        }

        if let Some(config) = self.try_load_user_dir().await? {
            return Ok(config);
        }

        self.try_load_env_only()
    }

    /// Try loading from current working directory
    async fn try_load_cwd(&self) -> Result<Option<RawConfig>> {
        let cwd = std::env::current_dir()?;

        let conductor_json = cwd.join("conductor.json");
        if conductor_json.exists() {
            return Ok(Some(self.load_file(&conductor_json).await?));
        }

        let dir_config = cwd.join(".conductor").join("config.json");
        if dir_config.exists() {
            return Ok(Some(self.load_file(&dir_config).await?));
        }

        Ok(None)
    }

    /// Try loading from the user config directory
    async fn try_load_user_dir(&self) -> Result<Option<RawConfig>> {
        if let Some(config_dir) = user_config_dir() {
            let config_path = config_dir.join("conductor").join("config.json");
            if config_path.exists() {
                return Ok(Some(self.load_file(&config_path).await?));
            }
        }
        Ok(None)
    }

    /// Build a config from environment variables alone
    fn try_load_env_only(&self) -> Result<RawConfig> {
        let gemini_key = std::env::var("GEMINI_API_KEY").ok();
        let openai_key = std::env::var("OPENAI_API_KEY").ok();

        let available: Vec<(Protocol, String)> = [
            gemini_key.map(|key| (Protocol::GoogleAI, key)),
            openai_key.map(|key| (Protocol::OpenAICompat, key)),
        ]
        .into_iter()
        .flatten()
        .collect();
        let available_names = available
            .iter()
            .map(|(protocol, _)| protocol.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        let env_protocol = std::env::var("CONDUCTOR_PROTOCOL").ok();
        let preference = self.protocol_override.as_ref().or(env_protocol.as_ref());

        let (protocol, api_key) = if let Some(preferred) = preference {
            let preferred_protocol: Protocol = preferred.parse()?;
            match available.into_iter().find(|(p, _)| *p == preferred_protocol) {
                Some(found) => found,
                // The --api-key flag may still supply the key
                None if self.api_key_override.is_some() => (preferred_protocol, String::new()),
                None => {
                    return Err(anyhow!(
                        "Protocol '{}' specified but no corresponding API key found. Available keys: {}",
                        preferred,
                        available_names
                    ))
                }
            }
        } else {
            let mut available = available;
            match available.len() {
                0 => {
                    return Err(anyhow!(
                        "No configuration found. Please create a conductor.json file or set GEMINI_API_KEY or OPENAI_API_KEY"
                    ))
                }
                1 => available.remove(0),
                _ => {
                    return Err(anyhow!(
                        "Multiple API keys detected: {}. Please specify which protocol to use with CONDUCTOR_PROTOCOL or --protocol",
                        available_names
                    ))
                }
            }
        };

        Ok(RawConfig {
            protocol: protocol.as_str().to_string(),
            api_key,
            base_url: std::env::var("CONDUCTOR_BASE_URL").ok(),
            model: std::env::var("CONDUCTOR_MODEL").ok(),
            params: ModelParams::default(),
            headers: HashMap::new(),
            orchestrator: OrchestratorConfig::default(),
        })
    }

    /// Load configuration from a specific path (file or directory)
    async fn load_from_path(&self, path: &Path) -> Result<RawConfig> {
        if path.is_file() {
            self.load_file(path).await
        } else if path.is_dir() {
            let config_file = path.join("config.json");
            if config_file.exists() {
                self.load_file(&config_file).await
            } else {
                Err(anyhow!(
                    "No config.json found in directory: {}",
                    path.display()
                ))
            }
        } else {
            Err(anyhow!("Config path does not exist: {}", path.display()))
        }
    }

    /// Load a single config file
    async fn load_file(&self, path: &Path) -> Result<RawConfig> {
        tracing::debug!("Loading config from {}", path.display());
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Resolve raw config into validated core configuration
    fn resolve_config(&self, config: RawConfig) -> Result<LoadedConfig> {
        let protocol: Protocol = config.protocol.parse()?;

        // Resolve API key (handle env: prefix)
        let api_key = match config.api_key.strip_prefix("env:") {
            Some(var_name) => std::env::var(var_name)
                .with_context(|| format!("Environment variable not found: {}", var_name))?,
            None => config.api_key,
        };

        let base_url = config
            .base_url
            .unwrap_or_else(|| protocol.default_base_url().to_string());
        let model = config
            .model
            .unwrap_or_else(|| protocol.default_model().to_string());

        let llm = ResolvedLlmConfig::new(protocol, base_url, api_key, model)
            .with_params(config.params)
            .with_headers(config.headers);

        llm.validate()
            .map_err(|e| anyhow!("Configuration validation failed: {}", e))?;
        config
            .orchestrator
            .validate()
            .map_err(|e| anyhow!("Configuration validation failed: {}", e))?;

        Ok(LoadedConfig {
            llm,
            orchestrator: config.orchestrator,
        })
    }
}

/// `$XDG_CONFIG_HOME` when set, otherwise the platform config directory
fn user_config_dir() -> Option<PathBuf> {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(dirs::config_dir)
}

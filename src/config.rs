//! codeshift configuration
//!
//! Every tunable lives here. Loaded from TOML at startup, falls back to
//! defaults when the file is missing or invalid.

use codeshift_actions::ValidationConfig;
use codeshift_core::RunConfig;
use codeshift_engine::ExecutorConfig;
use codeshift_llm::DEFAULT_MODEL;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeshiftConfig {
    /// Source, paths, languages, and queue wiring.
    pub run: RunConfig,
    /// Iteration cap, deadlines, retry policy.
    pub executor: ExecutorConfig,
    /// Model driving the run.
    pub oracle: OracleConfig,
    /// Model used by the translate action.
    pub translator: TranslatorConfig,
    /// Syntax checkers per language.
    pub validation: ValidationConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
    /// Replaces the built-in system prompt preamble.
    pub system_prompt: Option<String>,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Override for the Messages API endpoint.
    pub base_url: Option<String>,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 8192,
            temperature: Some(0.0),
            system_prompt: None,
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            base_url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    /// Falls back to the oracle model when unset.
    pub model: Option<String>,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            model: None,
            max_tokens: 8192,
            temperature: Some(0.2),
        }
    }
}

impl CodeshiftConfig {
    /// Load from a TOML file. Falls back to defaults if missing or invalid.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}, using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                tracing::info!("No config at {}, using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Serialize to TOML (for dumping the effective config).
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }

    pub fn translator_model(&self) -> &str {
        self.translator.model.as_deref().unwrap_or(&self.oracle.model)
    }
}

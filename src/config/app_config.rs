use std::collections::HashMap;

use serde::Deserialize;

use crate::domain::{ConfidencePolicy, PolicyTable, StepName};
use crate::orchestrator::OrchestratorConfig;

/// Application configuration, loaded once at startup and treated as
/// immutable for the process lifetime.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub engine: EngineConfig,
    pub policy: PolicySettings,
    pub reasoning: ReasoningConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

/// Sequencer and orchestrator tuning
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Default per-step tool timeout in milliseconds
    pub default_timeout_ms: u64,

    /// Per-step timeout overrides, keyed by step name
    pub step_timeouts_ms: HashMap<StepName, u64>,

    /// Upper bound on transitions per drive
    pub max_transitions: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: 60_000,
            step_timeouts_ms: HashMap::new(),
            max_transitions: 100,
        }
    }
}

impl EngineConfig {
    pub fn to_orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            default_timeout_ms: self.default_timeout_ms,
            step_timeouts_ms: self.step_timeouts_ms.clone(),
            max_transitions: self.max_transitions,
        }
    }
}

/// Confidence policy settings: one default plus per-step overrides
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PolicySettings {
    pub default: ConfidencePolicy,
    pub steps: HashMap<StepName, ConfidencePolicy>,
}

impl PolicySettings {
    pub fn to_table(&self) -> PolicyTable {
        PolicyTable::new(self.default).with_overrides(self.steps.clone())
    }
}

/// Reasoning provider settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReasoningConfig {
    /// OpenAI-compatible endpoint base URL
    pub base_url: String,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// Model identifier
    pub model: String,

    /// Request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            api_key_env: "RCM_REASONING_API_KEY".to_string(),
            model: "gpt-4o-mini".to_string(),
            timeout_ms: 30_000,
        }
    }
}

impl AppConfig {
    /// Load configuration from `config/default`, `config/local`, and
    /// `RCM__`-prefixed environment variables, in that order.
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("RCM")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

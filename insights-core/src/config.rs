use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Environment variable prefix, e.g. `INSIGHTS__MODEL__NAME=gpt-4o-mini`.
pub const ENV_PREFIX: &str = "INSIGHTS";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct InsightsConfig {
    pub service: ServiceConfig,
    pub model: ModelConfig,
    pub analysis: AnalysisConfig,
    pub pipeline: PipelineConfig,
    pub output: OutputConfig,
    pub credentials: CredentialsConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServiceConfig {
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ModelConfig {
    pub base_url: String,
    pub name: String,
    pub request_timeout_secs: u64,
    /// Zero disables retries: a failed call fails the run.
    pub max_retries: usize,
    pub retry_delay_ms: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            name: "gpt-4o".to_string(),
            request_timeout_secs: 60,
            max_retries: 0,
            retry_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ConsultantStrategy {
    #[default]
    PerPrompt,
    Batched,
}

/// Default window size, in characters, for one name-detection call.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AnalysisConfig {
    pub chunk_size: usize,
    pub max_name_chunks: usize,
    pub skip_failed_chunks: bool,
    pub max_prompts: usize,
    pub suggestions_per_prompt: usize,
    pub suggestion_cap: usize,
    pub consultant: ConsultantStrategy,
    pub tolerate_prompt_failures: bool,
    pub shuffle_seed: Option<u64>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_name_chunks: 10,
            skip_failed_chunks: false,
            max_prompts: 10,
            suggestions_per_prompt: 5,
            suggestion_cap: 10,
            consultant: ConsultantStrategy::PerPrompt,
            tolerate_prompt_failures: false,
            shuffle_seed: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PipelineConfig {
    pub call_timeout_secs: u64,
    pub run_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            call_timeout_secs: 90,
            run_timeout_secs: 900,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: String,
    pub file_prefix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: ".".to_string(),
            file_prefix: "chatgpt-insights".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CredentialsConfig {
    pub key_file: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            key_file: "~/.chatgpt-insights/openai_key.txt".to_string(),
        }
    }
}

impl InsightsConfig {
    /// Load from an optional TOML file, then apply `INSIGHTS__*` overrides.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        let config: Self = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.analysis.chunk_size == 0 {
            return Err(ConfigError::Message(
                "analysis.chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.pipeline.call_timeout_secs == 0 || self.pipeline.run_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "pipeline timeouts must be greater than zero".to_string(),
            ));
        }
        if self.model.name.trim().is_empty() {
            return Err(ConfigError::Message("model.name must not be empty".to_string()));
        }
        Ok(())
    }
}

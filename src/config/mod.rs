//! Configuration management.
//!
//! Settings are read once at startup from an optional TOML file layered
//! under `BABELDOC_MCP__*` environment variables (e.g.
//! `BABELDOC_MCP__DISPATCH__MAX_CONCURRENT_JOBS=4`). Provider credentials
//! additionally honour the conventional `OPENROUTER_API_KEY` style
//! variables; see [`crate::providers`].

mod file_config;

pub use file_config::{default_config_path, find_config_file, save_config, ConfigFileError};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::providers::ProviderKind;

/// Prefix for environment overrides of configuration values
pub const ENV_PREFIX: &str = "BABELDOC_MCP";

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Translation provider settings
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// External pipeline settings
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Job admission settings
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Copy with every configured API key masked, for display
    pub fn redacted(&self) -> Config {
        let mut config = self.clone();
        for section in [
            &mut config.providers.openrouter,
            &mut config.providers.openai,
        ] {
            if section.api_key.is_some() {
                section.api_key = Some(REDACTED.to_string());
            }
        }
        config
    }
}

const REDACTED: &str = "***";

/// Provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// Service used when a request names none
    #[serde(default = "default_service")]
    pub default_service: String,

    #[serde(default)]
    pub openrouter: ProviderSection,

    #[serde(default)]
    pub openai: ProviderSection,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            default_service: default_service(),
            openrouter: ProviderSection::default(),
            openai: ProviderSection::default(),
        }
    }
}

impl ProvidersConfig {
    /// Section for one provider kind
    pub fn section(&self, kind: ProviderKind) -> &ProviderSection {
        match kind {
            ProviderKind::OpenRouter => &self.openrouter,
            ProviderKind::OpenAi => &self.openai,
        }
    }
}

fn default_service() -> String {
    ProviderKind::OpenRouter.id().to_string()
}

/// Per-provider overrides; unset values fall back to the environment or built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qps: Option<u32>,
}

/// External pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// BabelDOC executable (name on PATH or absolute path)
    #[serde(default = "default_executable")]
    pub executable: PathBuf,

    /// Extra arguments placed before the generated ones
    #[serde(default)]
    pub extra_args: Vec<String>,

    /// Upper bound on a single pipeline run (0 = unbounded)
    #[serde(default)]
    pub job_timeout_seconds: u64,

    /// Maximum bytes of pipeline output kept as diagnostics
    #[serde(default = "default_diagnostics_max_bytes")]
    pub diagnostics_max_bytes: usize,

    /// Also pass the API key as `--openai-api-key` (visible in the process list).
    /// The key is always provided through `OPENAI_API_KEY`.
    #[serde(default)]
    pub key_on_command_line: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            executable: default_executable(),
            extra_args: Vec::new(),
            job_timeout_seconds: 0,
            diagnostics_max_bytes: default_diagnostics_max_bytes(),
            key_on_command_line: false,
        }
    }
}

impl PipelineConfig {
    pub fn job_timeout(&self) -> Option<Duration> {
        non_zero_secs(self.job_timeout_seconds)
    }
}

fn default_executable() -> PathBuf {
    PathBuf::from("babeldoc")
}

fn default_diagnostics_max_bytes() -> usize {
    8192
}

/// Admission gate configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Maximum number of simultaneously running translation jobs
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,

    /// Default wait for a free slot (0 = wait indefinitely)
    #[serde(default)]
    pub admission_timeout_seconds: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: default_max_concurrent_jobs(),
            admission_timeout_seconds: 0,
        }
    }
}

impl DispatchConfig {
    pub fn admission_timeout(&self) -> Option<Duration> {
        non_zero_secs(self.admission_timeout_seconds)
    }
}

fn default_max_concurrent_jobs() -> usize {
    2
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// "text" or "json"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn non_zero_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// Load configuration from a file, with environment overrides
pub fn load_config(path: &Path) -> Result<Config, config::ConfigError> {
    build_config(Some(path))
}

/// Load configuration from environment overrides and defaults only
pub fn get_config() -> Result<Config, config::ConfigError> {
    build_config(None)
}

fn build_config(path: Option<&Path>) -> Result<Config, config::ConfigError> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path));
    }
    let settings = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize()
}

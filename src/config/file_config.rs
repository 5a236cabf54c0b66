//! Configuration file discovery and writing.
//!
//! # Configuration File Format
//!
//! ```toml
//! [providers]
//! default_service = "openrouter"
//!
//! [providers.openrouter]
//! api_key = "sk-or-..."
//! model = "google/gemini-2.5-flash"
//! qps = 4
//!
//! [providers.openai]
//! base_url = "https://api.openai.com/v1"
//! model = "gpt-4o-mini"
//!
//! [pipeline]
//! executable = "babeldoc"
//! extra_args = []
//! job_timeout_seconds = 0
//! diagnostics_max_bytes = 8192
//!
//! [dispatch]
//! max_concurrent_jobs = 2
//! admission_timeout_seconds = 0
//!
//! [logging]
//! level = "info"
//! ```

use std::path::{Path, PathBuf};

use super::Config;

/// File name looked up in the working directory
const LOCAL_CONFIG_FILE: &str = "babeldoc-mcp.toml";

/// Default location of the user configuration file
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("babeldoc-mcp").join("config.toml"))
}

/// Find a configuration file in the working directory or the user config directory
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.is_file() {
        return Some(local);
    }

    default_config_path().filter(|path| path.is_file())
}

/// Write `config` as TOML to `path`, creating parent directories.
///
/// Refuses to replace an existing file unless `overwrite` is set.
pub fn save_config(config: &Config, path: &Path, overwrite: bool) -> Result<(), ConfigFileError> {
    if path.exists() && !overwrite {
        return Err(ConfigFileError::AlreadyExists(path.to_path_buf()));
    }

    let content =
        toml::to_string_pretty(config).map_err(|e| ConfigFileError::Serialize(e.to_string()))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ConfigFileError::Io(e.to_string()))?;
    }
    std::fs::write(path, content).map_err(|e| ConfigFileError::Io(e.to_string()))
}

/// Configuration file errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialize error: {0}")]
    Serialize(String),

    #[error("Config file already exists: {}", .0.display())]
    AlreadyExists(PathBuf),
}

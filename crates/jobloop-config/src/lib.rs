use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON5 parse error: {0}")]
    Json5(#[from] json5::Error),
    #[error("Config directory not found")]
    NoDirFound,
}

/// Top-level jobloop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Agent command template; `{prompt}` is substituted per run.
    #[serde(default)]
    pub agent_command: String,
    /// Notify when a run succeeds.
    #[serde(default = "default_true")]
    pub notify_on_success: bool,
    /// Notify when a run fails.
    #[serde(default = "default_true")]
    pub notify_on_failure: bool,
    /// Run-history retention in days; older rows are purged on startup.
    #[serde(default = "default_retention_days")]
    pub log_retention_days: u32,
    /// Directory holding the run-history database.
    #[serde(default = "default_logs_dir")]
    pub logs_dir: PathBuf,
    /// Directory for per-job plain-text result snapshots.
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
    /// Directory where the scheduler backend keeps task definitions.
    #[serde(default = "default_tasks_dir")]
    pub tasks_dir: PathBuf,
    #[serde(default)]
    pub debug_mode: bool,
}

fn default_true() -> bool {
    true
}

fn default_retention_days() -> u32 {
    30
}

fn data_root() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".jobloop"))
        .unwrap_or_else(|| PathBuf::from(".jobloop"))
}

fn default_logs_dir() -> PathBuf {
    data_root().join("logs")
}

fn default_results_dir() -> PathBuf {
    data_root().join("results")
}

fn default_tasks_dir() -> PathBuf {
    data_root().join("tasks")
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            agent_command: String::new(),
            notify_on_success: true,
            notify_on_failure: true,
            log_retention_days: default_retention_days(),
            logs_dir: default_logs_dir(),
            results_dir: default_results_dir(),
            tasks_dir: default_tasks_dir(),
            debug_mode: false,
        }
    }
}

/// Resolve the jobloop config directory (~/.jobloop/).
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|h| h.join(".jobloop"))
        .ok_or(ConfigError::NoDirFound)
}

/// Resolve the config file path (~/.jobloop/config.json5).
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.json5"))
}

/// Load settings from the default path, falling back to defaults.
pub fn load_settings() -> Result<Settings, ConfigError> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let path = config_file_path()?;
    load_settings_from(&path)
}

/// Load settings from a specific path, falling back to defaults if not found.
pub fn load_settings_from(path: &Path) -> Result<Settings, ConfigError> {
    if !path.exists() {
        tracing::debug!("Config file not found at {}, using defaults", path.display());
        return Ok(Settings::default());
    }

    let content = std::fs::read_to_string(path)?;
    let settings: Settings = json5::from_str(&content)?;
    Ok(settings)
}

/// Ensure the config directory exists.
pub fn ensure_config_dir() -> Result<PathBuf, ConfigError> {
    let dir = config_dir()?;
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
    }
    Ok(dir)
}

/// Save settings to the default path.
pub fn save_settings(settings: &Settings) -> Result<(), ConfigError> {
    let dir = ensure_config_dir()?;
    let path = dir.join("config.json5");
    let content = serde_json::to_string_pretty(settings)
        .map_err(|e| ConfigError::Io(std::io::Error::other(e)))?;
    std::fs::write(path, content)?;
    Ok(())
}

//! Configuration loading and logs directory resolution
//!
//! The logs directory is where the statistics and records documents live.
//! It is resolved once at startup and handed to the stores explicitly:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`MIGRATION_LOGS_DIR`)
//! 3. TOML config file (`logs_dir` key)
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the configured logs directory
pub const LOGS_DIR_ENV: &str = "MIGRATION_LOGS_DIR";

/// Application directory name used under the platform config/data dirs
const APP_DIR: &str = "migration-report";

/// What the batch driver does with an error that has no known category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop the batch at the first unclassified error; nothing is saved
    #[default]
    Abort,
    /// Log the error, skip the record and keep going
    Skip,
}

impl std::str::FromStr for FailurePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "abort" => Ok(Self::Abort),
            "skip" => Ok(Self::Skip),
            other => Err(Error::InvalidInput(format!(
                "Unknown failure policy '{}' (expected 'abort' or 'skip')",
                other
            ))),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr only if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Configuration as read from the TOML file
///
/// Every key is optional; a missing file yields `TomlConfig::default()`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Directory holding the statistics and records documents
    #[serde(default)]
    pub logs_dir: Option<PathBuf>,

    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Write one pretty-printed preview file per migrated record
    #[serde(default)]
    pub write_previews: bool,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl TomlConfig {
    /// Load the TOML configuration
    ///
    /// An explicitly requested file must exist. When no path is given the
    /// platform default location is tried, and its absence only produces a
    /// warning.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            let content = std::fs::read_to_string(path).map_err(|e| {
                Error::Config(format!("Read config {} failed: {}", path.display(), e))
            })?;
            return Self::parse(&content);
        }

        match default_config_path() {
            Some(path) if path.exists() => {
                info!("Loading config from {}", path.display());
                let content = std::fs::read_to_string(&path)?;
                Self::parse(&content)
            }
            Some(path) => {
                warn!(
                    "No config file at {}, using built-in defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            None => {
                warn!("Could not determine config directory, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    /// Parse TOML text into a config
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// Fully resolved configuration passed to the stores and the batch driver
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub logs_dir: PathBuf,
    pub failure_policy: FailurePolicy,
    pub write_previews: bool,
    pub logging: LoggingConfig,
}

impl ReportConfig {
    /// Configuration with defaults for everything except the logs directory
    pub fn new(logs_dir: impl Into<PathBuf>) -> Self {
        Self {
            logs_dir: logs_dir.into(),
            failure_policy: FailurePolicy::default(),
            write_previews: false,
            logging: LoggingConfig::default(),
        }
    }

    /// Merge a command-line override with the TOML config
    pub fn resolve(cli_logs_dir: Option<&Path>, toml_config: TomlConfig) -> Self {
        let logs_dir = resolve_logs_dir(cli_logs_dir, LOGS_DIR_ENV, toml_config.logs_dir.as_deref());
        Self {
            logs_dir,
            failure_policy: toml_config.failure_policy,
            write_previews: toml_config.write_previews,
            logging: toml_config.logging,
        }
    }
}

/// Logs directory resolution in priority order:
/// CLI argument, environment variable, TOML value, compiled default.
pub fn resolve_logs_dir(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    toml_value: Option<&Path>,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = toml_value {
        return path.to_path_buf();
    }

    default_logs_dir()
}

/// Platform config file location (`<config_dir>/migration-report/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
}

/// OS-dependent default logs directory
pub fn default_logs_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR).join("logs"))
        .unwrap_or_else(|| PathBuf::from("./migration_logs"))
}

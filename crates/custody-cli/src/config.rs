//! CLI configuration.
//!
//! Resolved in three layers, later layers winning:
//!
//! 1. Built-in defaults.
//! 2. An optional YAML file (`--config PATH`).
//! 3. Environment variables `CUSTODY_AUDIT_CAPACITY` and `CUSTODY_LOG_FORMAT`.
//!
//! Command-line flags are applied on top by `main`. Invalid values are
//! errors; nothing silently falls back to a default.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Environment variable overriding [`CliConfig::audit_capacity`].
pub const ENV_AUDIT_CAPACITY: &str = "CUSTODY_AUDIT_CAPACITY";
/// Environment variable overriding [`CliConfig::log_format`].
pub const ENV_LOG_FORMAT: &str = "CUSTODY_LOG_FORMAT";

/// Output format for log lines on stderr.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("expected `text` or `json`, got `{other}`")),
        }
    }
}

/// Effective configuration of the `custody` binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    /// Maximum number of audit records retained during a replay.
    pub audit_capacity: usize,
    /// Log line format.
    pub log_format: LogFormat,
    /// Also forward audit events to `tracing`.
    pub emit_tracing_events: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            audit_capacity: 10_000,
            log_format: LogFormat::Text,
            emit_tracing_events: true,
        }
    }
}

impl CliConfig {
    /// Load defaults, then the file at `path` if given, then the process
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed, or an
    /// override is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        base.with_overrides(|var| std::env::var(var).ok())
    }

    /// Parse a YAML configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&raw)
    }

    /// Parse YAML configuration text. Missing keys take their defaults.
    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(raw)?;
        config.validate()
    }

    /// Apply overrides read through `lookup` (normally the process
    /// environment).
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(value) = lookup(ENV_AUDIT_CAPACITY) {
            self.audit_capacity =
                value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidOverride {
                        var: ENV_AUDIT_CAPACITY,
                        value: value.clone(),
                        reason: "expected a positive integer".to_string(),
                    })?;
        }
        if let Some(value) = lookup(ENV_LOG_FORMAT) {
            self.log_format = value
                .parse()
                .map_err(|reason| ConfigError::InvalidOverride {
                    var: ENV_LOG_FORMAT,
                    value: value.clone(),
                    reason,
                })?;
        }
        self.validate()
    }

    /// Replace the log format when the command line specifies one.
    pub fn with_log_format(mut self, log_format: Option<LogFormat>) -> Self {
        if let Some(format) = log_format {
            self.log_format = format;
        }
        self
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.audit_capacity == 0 {
            return Err(ConfigError::Invalid(
                "audit_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(self)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid value {value:?} for {var}: {reason}")]
    InvalidOverride {
        var: &'static str,
        value: String,
        reason: String,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

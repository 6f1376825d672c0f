//! Application configuration loading.
//!
//! Provides a standardized way to load the `measureit` TOML configuration
//! file. The on-disk format is intentionally small: it only configures the
//! ambient stack (logging, persistence root); sweep parameters are
//! programmatic.
//!
//! # Usage
//!
//! ```rust,no_run
//! use measureit_common::config::AppConfig;
//! use std::path::Path;
//!
//! let cfg = AppConfig::load(Path::new("measureit.toml")).expect("load config");
//! println!("log level: {:?}", cfg.log_level);
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Log level for configuration.
///
/// Serializes to lowercase strings: "trace", "debug", "info", "warn", "error".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace-level verbosity.
    Trace,
    /// Debug-level verbosity.
    Debug,
    /// Info-level verbosity (default).
    Info,
    /// Warning-level verbosity.
    Warn,
    /// Error-level verbosity.
    Error,
}

impl LogLevel {
    /// The `tracing_subscriber::EnvFilter` directive for this level.
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parsing failed.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("configuration validation failed: {0}")]
    ValidationError(String),
}

/// Application-wide configuration for the `measureit` binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Verbosity for the stderr + file subscribers.
    pub log_level: LogLevel,

    /// Programmatic override for the persistence root. When
    /// `None`, resolution falls through to `MEASUREIT_HOME` and then the OS
    /// user-data directory.
    pub persistence_root: Option<String>,

    /// Default experiment label used when a sweep is started without one.
    pub default_experiment: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            persistence_root: None,
            default_experiment: "default".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns [`ConfigError::FileNotFound`] if the file does not exist, or
    /// [`ConfigError::ParseError`] if it cannot be parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path.display().to_string()))?;
        let cfg: AppConfig = toml::from_str(&text).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    /// Returns [`ConfigError::ValidationError`] if `default_experiment` is
    /// empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_experiment.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "default_experiment cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn empty_experiment_fails_validation() {
        let mut cfg = AppConfig::default();
        cfg.default_experiment = "  ".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn load_missing_file_returns_not_found() {
        let err = AppConfig::load(Path::new("/nonexistent/measureit.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn load_parses_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "log_level = \"debug\"\ndefault_experiment = \"demo\"").unwrap();
        let cfg = AppConfig::load(file.path()).unwrap();
        assert_eq!(cfg.log_level, LogLevel::Debug);
        assert_eq!(cfg.default_experiment, "demo");
    }
}

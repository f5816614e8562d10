//! Configuration model.
//!
//! [`MicroConfig`] is the root type. Every section falls back to its
//! defaults when omitted, and unknown fields are rejected.

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Complete Micro application configuration.
///
/// # Example
///
/// ```
/// use micro_config::MicroConfig;
///
/// let config = MicroConfig::default();
/// assert_eq!(config.app.name, "Micro App");
/// assert_eq!(config.app.environment, "dev");
/// assert!(!config.app.debug);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct MicroConfig {
    /// Application identity and debug switch.
    #[serde(default)]
    pub app: AppConfig,

    /// Logging output.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Error rendering.
    #[serde(default)]
    pub errors: ErrorsConfig,
}

impl MicroConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the application name, version,
    /// environment or log level is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("app.name", &self.app.name),
            ("app.version", &self.app.version),
            ("app.environment", &self.app.environment),
            ("logging.level", &self.logging.level),
        ];

        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::invalid_value(field, "must not be empty"));
            }
        }

        Ok(())
    }

    /// Development preset: debug output, pretty `debug` level logs.
    ///
    /// ```
    /// use micro_config::{LogFormat, MicroConfig};
    ///
    /// let config = MicroConfig::development();
    /// assert!(config.app.debug);
    /// assert_eq!(config.logging.format, LogFormat::Pretty);
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();

        config.app.debug = true;
        config.logging.level = "debug".to_string();
        config.logging.format = LogFormat::Pretty;
        config.logging.include_location = true;

        config
    }

    /// Production preset: no debug output, JSON `info` level logs.
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();

        config.app.environment = "prod".to_string();
        config.app.debug = false;
        config.logging.level = "info".to_string();
        config.logging.format = LogFormat::Json;

        config
    }
}

/// Application identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Application name.
    #[serde(default = "default_name")]
    pub name: String,

    /// Application version.
    #[serde(default = "default_version")]
    pub version: String,

    /// Deployment environment (e.g. "dev", "test", "prod").
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Include developer messages and traces in error responses.
    #[serde(default)]
    pub debug: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            version: default_version(),
            environment: default_environment(),
            debug: false,
        }
    }
}

fn default_name() -> String {
    "Micro App".to_string()
}

fn default_version() -> String {
    "1.0.0".to_string()
}

fn default_environment() -> String {
    "dev".to_string()
}

/// Log format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON formatted logs.
    #[default]
    Json,
    /// Human-readable output.
    Pretty,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Install a subscriber at startup.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive (e.g. "info", "micro_middleware=debug").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include source file and line.
    #[serde(default)]
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            include_location: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Error rendering configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ErrorsConfig {
    /// Log every failure caught by the error stage.
    #[serde(default = "default_true")]
    pub log_errors: bool,
}

impl Default for ErrorsConfig {
    fn default() -> Self {
        Self { log_errors: true }
    }
}

fn default_true() -> bool {
    true
}

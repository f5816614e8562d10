//! Layered configuration loading.
//!
//! [`ConfigLoader`] builds a [`MicroConfig`] from, in increasing priority:
//!
//! 1. defaults or a preset
//! 2. a TOML or JSON file (or string)
//! 3. prefixed environment variables (`PREFIX__SECTION__KEY`)
//! 4. the kernel variables `APP_NAME`, `APP_VERSION`, `APP_ENV` and
//!    `APP_DEBUG`, when enabled with [`ConfigLoader::with_kernel_env`]

use std::env;
use std::fs;
use std::path::Path;

use crate::{ConfigError, LogFormat, MicroConfig};

/// Kernel variables read by [`ConfigLoader::with_kernel_env`].
pub const KERNEL_ENV_VARS: [&str; 4] = ["APP_NAME", "APP_VERSION", "APP_ENV", "APP_DEBUG"];

/// Configuration loader with layered sources.
///
/// # Example
///
/// ```no_run
/// use micro_config::ConfigLoader;
///
/// # fn main() -> Result<(), micro_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_dotenv()?
///     .with_optional_file("micro.toml")?
///     .with_env_prefix("MICRO")
///     .with_kernel_env()
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: MicroConfig,
    env_prefix: Option<String>,
    kernel_env: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a loader starting from the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: MicroConfig::default(),
            env_prefix: None,
            kernel_env: false,
        }
    }

    /// Resets the current layer to the defaults.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.config = MicroConfig::default();
        self
    }

    /// Starts from the development preset.
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = MicroConfig::development();
        self
    }

    /// Starts from the production preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = MicroConfig::production();
        self
    }

    /// Loads a configuration file. The format follows the extension
    /// (`.toml` or `.json`).
    ///
    /// The file replaces the current layer. Sections and fields it omits take
    /// their default values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file is missing, unreadable, has an
    /// unsupported extension or does not parse (unknown fields included).
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;

        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .ok_or_else(|| ConfigError::unsupported_format(path.display().to_string()))?;

        self.config = parse(&content, &format)?;
        Ok(self)
    }

    /// Loads a configuration file if it exists.
    ///
    /// # Errors
    ///
    /// Same as [`with_file`](Self::with_file) for an existing file.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Loads configuration from a string in the given format
    /// (`"toml"` or `"json"`).
    ///
    /// ```
    /// use micro_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string("[app]\nname = \"Shop\"", "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.app.name, "Shop");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the format is unsupported or parsing fails.
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.config = parse(content, &format.to_lowercase())?;
        Ok(self)
    }

    /// Enables `PREFIX__SECTION__KEY` environment overrides, e.g.
    /// `MICRO__APP__DEBUG=true` or `MICRO__LOGGING__LEVEL=debug`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Enables the kernel variables (`APP_NAME`, `APP_VERSION`, `APP_ENV`,
    /// `APP_DEBUG`). They are applied last.
    #[must_use]
    pub fn with_kernel_env(mut self) -> Self {
        self.kernel_env = true;
        self
    }

    /// Loads `.env` from the current directory or its parents, if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Dotenv` if a `.env` file exists but cannot be
    /// parsed.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => Ok(self),
            Err(e) if e.not_found() => Ok(self),
            Err(e) => Err(e.into()),
        }
    }

    /// Loads environment variables from a specific dotenv file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Dotenv` if the file is missing or invalid.
    pub fn with_dotenv_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        dotenvy::from_path(path)?;
        Ok(self)
    }

    /// Applies environment overrides and validates the result.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an environment value cannot be parsed or
    /// validation fails.
    pub fn load(mut self) -> Result<MicroConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            self.apply_env_overrides(&prefix)?;
        }

        if self.kernel_env {
            for key in KERNEL_ENV_VARS {
                if let Ok(value) = env::var(key) {
                    self.apply_kernel_var(key, &value)?;
                }
            }
        }

        self.config.validate()?;
        Ok(self.config)
    }

    /// Returns the current layer without environment overrides or
    /// validation.
    #[must_use]
    pub fn load_unvalidated(self) -> MicroConfig {
        self.config
    }

    fn apply_env_overrides(&mut self, prefix: &str) -> Result<(), ConfigError> {
        let marker = format!("{prefix}__");
        let mut vars: Vec<(String, String)> =
            env::vars().filter(|(k, _)| k.starts_with(&marker)).collect();
        vars.sort();

        for (key, value) in vars {
            self.apply_env_var(&key, &value, prefix)?;
        }

        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let path = key
            .strip_prefix(prefix)
            .and_then(|k| k.strip_prefix("__"))
            .ok_or_else(|| ConfigError::env_parse_error(key, "invalid key format"))?;

        let parts: Vec<&str> = path.split("__").collect();

        match parts.as_slice() {
            ["APP", "NAME"] => self.config.app.name = value.to_string(),
            ["APP", "VERSION"] => self.config.app.version = value.to_string(),
            ["APP", "ENVIRONMENT"] => self.config.app.environment = value.to_string(),
            ["APP", "DEBUG"] => self.config.app.debug = bool_var(key, value)?,

            ["LOGGING", "ENABLED"] => self.config.logging.enabled = bool_var(key, value)?,
            ["LOGGING", "LEVEL"] => self.config.logging.level = value.to_string(),
            ["LOGGING", "FORMAT"] => {
                self.config.logging.format = match value.to_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'json' or 'pretty'",
                        ))
                    }
                };
            }
            ["LOGGING", "INCLUDE_LOCATION"] => {
                self.config.logging.include_location = bool_var(key, value)?;
            }

            ["ERRORS", "LOG_ERRORS"] => self.config.errors.log_errors = bool_var(key, value)?,

            _ => {}
        }

        Ok(())
    }

    fn apply_kernel_var(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "APP_NAME" => self.config.app.name = value.to_string(),
            "APP_VERSION" => self.config.app.version = value.to_string(),
            "APP_ENV" => self.config.app.environment = value.to_string(),
            "APP_DEBUG" => self.config.app.debug = bool_var(key, value)?,
            _ => {}
        }
        Ok(())
    }
}

fn parse(content: &str, format: &str) -> Result<MicroConfig, ConfigError> {
    match format {
        "toml" => Ok(toml::from_str(content)?),
        "json" => Ok(serde_json::from_str(content)?),
        other => Err(ConfigError::unsupported_format(other)),
    }
}

fn bool_var(key: &str, value: &str) -> Result<bool, ConfigError> {
    parse_bool(value).ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))
}

/// Parses a boolean the way environment variables are usually written.
fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

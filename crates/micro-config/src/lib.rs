//! Typed configuration for the Micro runtime.
//!
//! Configuration is loaded in layers, later layers overriding earlier ones:
//! defaults → TOML/JSON file → `PREFIX__SECTION__KEY` environment variables →
//! the kernel variables `APP_NAME`, `APP_VERSION`, `APP_ENV` and `APP_DEBUG`.
//!
//! # Configuration File Format
//!
//! ```toml
//! [app]
//! name = "Micro App"
//! version = "1.0.0"
//! environment = "dev"
//! debug = false
//!
//! [logging]
//! enabled = true
//! level = "info"
//! format = "json"
//! include_location = false
//!
//! [errors]
//! log_errors = true
//! ```
//!
//! # Example
//!
//! ```
//! use micro_config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .with_string("[app]\ndebug = true", "toml")
//!     .unwrap()
//!     .load()
//!     .unwrap();
//!
//! assert!(config.app.debug);
//! assert_eq!(config.app.name, "Micro App");
//! ```

#![doc(html_root_url = "https://docs.rs/micro-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;

pub use config::{AppConfig, ErrorsConfig, LogFormat, LoggingConfig, MicroConfig};
pub use error::ConfigError;
pub use loader::{ConfigLoader, KERNEL_ENV_VARS};

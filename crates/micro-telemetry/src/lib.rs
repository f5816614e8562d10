//! Logging setup for the Micro runtime.
//!
//! The runtime logs through `tracing` macros only. This crate installs the
//! subscriber that turns those events into JSON lines (production) or pretty
//! multi-line output (development).
//!
//! | Event | Level | Emitted by |
//! |-------|-------|------------|
//! | Route resolution status | `debug` | route stage |
//! | Controller dispatch | `debug` | dispatch stage, invoker |
//! | Request failure | `error` | error stage |
//! | Kernel ready | `info` | kernel |

#![doc(html_root_url = "https://docs.rs/micro-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, init_logging, LogConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

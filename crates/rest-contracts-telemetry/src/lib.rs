//! # REST Contracts Telemetry
//!
//! Logging setup for services built on REST contracts. The adapters emit
//! `tracing` events (`Added API` at `info`, per-request lines at `debug`,
//! handler failures at `warn`/`error`); [`init_logging`] routes them to
//! stdout as JSON or pretty text.

#![doc(html_root_url = "https://docs.rs/rest-contracts-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, init_logging, LogConfig, LogFormat};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

//! # REST Contracts Config
//!
//! Typed, layered configuration for servers and clients built on REST
//! contracts: defaults, then a TOML or JSON file, then environment
//! variables.
//!
//! ```toml
//! [server]
//! http_addr = "0.0.0.0:8080"
//! shutdown_timeout_secs = 30
//! request_timeout_ms = 30000
//! max_body_bytes = 2097152
//!
//! [client]
//! base_url = "http://localhost:8080"
//! timeout_ms = 5000
//! no_cache = true
//! with_credentials = true
//!
//! [client.headers]
//! x-api-key = "secret"
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```
//!
//! Each section converts into the runtime type of the crate it configures:
//! [`ServerSection::to_server_config`], [`ClientSection::to_request_options`]
//! and [`LoggingSection::to_log_config`].

#![doc(html_root_url = "https://docs.rs/rest-contracts-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod loader;
mod schema;

pub use error::ConfigError;
pub use loader::{ConfigLoader, DEFAULT_ENV_PREFIX};
pub use schema::{ClientSection, LogFormat, LoggingSection, RestContractsConfig, ServerSection};

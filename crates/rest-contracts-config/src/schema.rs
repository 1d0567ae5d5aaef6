//! Configuration schema types.
//!
//! Every field has a default, so a file only needs the values it changes.
//! Unknown fields are rejected.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::Duration;

use http::{HeaderName, HeaderValue};
use rest_contracts_client::RequestOptions;
use rest_contracts_server::config::{
    DEFAULT_HTTP_ADDR, DEFAULT_MAX_BODY_BYTES, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_SHUTDOWN_TIMEOUT_SECS,
};
use rest_contracts_server::ServerConfig;
use rest_contracts_telemetry::{create_env_filter, LogConfig};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RestContractsConfig {
    /// Self-hosted server settings.
    #[serde(default)]
    pub server: ServerSection,

    /// Client defaults.
    #[serde(default)]
    pub client: ClientSection,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingSection,
}

impl RestContractsConfig {
    /// Debug logging in pretty format.
    #[must_use]
    pub fn development() -> Self {
        Self {
            logging: LoggingSection {
                level: "debug".to_string(),
                format: LogFormat::Pretty,
                ..LoggingSection::default()
            },
            ..Self::default()
        }
    }

    /// Info logging in JSON format.
    #[must_use]
    pub fn production() -> Self {
        Self::default()
    }

    /// Checks values that deserialize fine but cannot be used.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.client.validate()?;
        self.logging.validate()
    }
}

/// `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    /// Bind address, e.g. `0.0.0.0:8080`.
    #[serde(default = "default_http_addr")]
    pub http_addr: String,

    /// Graceful shutdown timeout in seconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Per-request timeout in milliseconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// Largest accepted request body.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// HTTP/1.1 keep-alive.
    #[serde(default = "default_true")]
    pub keep_alive: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            request_timeout_ms: default_request_timeout(),
            max_body_bytes: default_max_body_bytes(),
            keep_alive: true,
        }
    }
}

impl ServerSection {
    /// Converts into the server's runtime configuration.
    #[must_use]
    pub fn to_server_config(&self) -> ServerConfig {
        ServerConfig::builder()
            .http_addr(self.http_addr.clone())
            .shutdown_timeout(Duration::from_secs(self.shutdown_timeout_secs))
            .request_timeout(Duration::from_millis(self.request_timeout_ms))
            .max_body_bytes(self.max_body_bytes)
            .keep_alive(self.keep_alive)
            .build()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.http_addr
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::invalid_value("server.http_addr", e.to_string()))?;
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::invalid_value(
                "server.request_timeout_ms",
                "must be greater than zero",
            ));
        }
        if self.max_body_bytes == 0 {
            return Err(ConfigError::invalid_value(
                "server.max_body_bytes",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

fn default_http_addr() -> String {
    DEFAULT_HTTP_ADDR.to_string()
}

fn default_shutdown_timeout() -> u64 {
    DEFAULT_SHUTDOWN_TIMEOUT_SECS
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS * 1000
}

fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

fn default_true() -> bool {
    true
}

/// `[client]` section. Unset options fall through to the call site.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClientSection {
    /// Base URL the client factory prefixes to every path.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Request timeout in milliseconds.
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Send `cache-control: no-cache`.
    #[serde(default)]
    pub no_cache: Option<bool>,

    /// Forward `authorization` and `cookie` headers.
    #[serde(default)]
    pub with_credentials: Option<bool>,

    /// Headers sent with every request.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl ClientSection {
    /// Converts into factory-level request options.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for a header that is not a
    /// valid HTTP header.
    pub fn to_request_options(&self) -> Result<RequestOptions, ConfigError> {
        let mut options = RequestOptions::new();
        if let Some(timeout_ms) = self.timeout_ms {
            options = options.with_timeout(Duration::from_millis(timeout_ms));
        }
        if let Some(no_cache) = self.no_cache {
            options = options.with_no_cache(no_cache);
        }
        if let Some(with_credentials) = self.with_credentials {
            options = options.with_credentials(with_credentials);
        }
        for (name, value) in &self.headers {
            let field = format!("client.headers.{name}");
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ConfigError::invalid_value(&field, e.to_string()))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ConfigError::invalid_value(&field, e.to_string()))?;
            options = options.with_header(name, value);
        }
        Ok(options)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(base_url) = &self.base_url {
            if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
                return Err(ConfigError::invalid_value(
                    "client.base_url",
                    "must start with http:// or https://",
                ));
            }
        }
        self.to_request_options().map(|_| ())
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Human-readable output.
    Pretty,
}

/// `[logging]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive (trace, debug, info, warn, error, or per-target).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include source file and line.
    #[serde(default)]
    pub include_location: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::Json,
            include_location: false,
        }
    }
}

impl LoggingSection {
    /// Converts into the telemetry crate's logging configuration.
    #[must_use]
    pub fn to_log_config(&self) -> LogConfig {
        let base = match self.format {
            LogFormat::Json => LogConfig::production(),
            LogFormat::Pretty => LogConfig::development(),
        };
        LogConfig {
            enabled: self.enabled,
            level: self.level.clone(),
            file_line_info: self.include_location,
            ..base
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        create_env_filter(&self.level)
            .map(|_| ())
            .map_err(|e| ConfigError::invalid_value("logging.level", e.to_string()))
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rest_contracts_telemetry::LogFormat as OutputFormat;

    #[test]
    fn test_defaults_match_server_defaults() {
        let config = RestContractsConfig::default();
        assert_eq!(config.server.to_server_config(), ServerConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_section_keeps_defaults() {
        let config: RestContractsConfig = toml::from_str(
            r#"
            [server]
            http_addr = "127.0.0.1:3000"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.http_addr, "127.0.0.1:3000");
        assert_eq!(config.server.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
        assert_eq!(config.logging, LoggingSection::default());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: Result<RestContractsConfig, _> = toml::from_str(
            r#"
            [server]
            port = 80
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_client_section_to_options() {
        let section = ClientSection {
            timeout_ms: Some(1500),
            no_cache: Some(true),
            with_credentials: Some(false),
            headers: BTreeMap::from([("x-api-key".to_string(), "secret".to_string())]),
            ..ClientSection::default()
        };
        let options = section.to_request_options().unwrap();
        assert_eq!(options.timeout(), Some(Duration::from_millis(1500)));
        assert!(options.no_cache());
        assert!(!options.forwards_credentials());
        assert_eq!(options.request_headers()["x-api-key"], "secret");
    }

    #[test]
    fn test_unset_client_options_stay_unset() {
        let options = ClientSection::default().to_request_options().unwrap();
        assert_eq!(options, RequestOptions::default());
    }

    #[test]
    fn test_invalid_values() {
        let mut config = RestContractsConfig::default();
        config.server.http_addr = "localhost".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "server.http_addr"
        ));

        let mut config = RestContractsConfig::default();
        config.client.base_url = Some("ftp://example".to_string());
        assert!(config.validate().is_err());

        let mut config = RestContractsConfig::default();
        config
            .client
            .headers
            .insert("bad header".to_string(), "x".to_string());
        assert!(config.validate().is_err());

        let mut config = RestContractsConfig::default();
        config.logging.level = "foo=notalevel".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_logging_section_to_log_config() {
        let log = RestContractsConfig::development().logging.to_log_config();
        assert_eq!(log.format, OutputFormat::Pretty);
        assert_eq!(log.level, "debug");
        assert!(!log.file_line_info);

        let log = RestContractsConfig::production().logging.to_log_config();
        assert_eq!(log.format, OutputFormat::Json);
    }
}

//! Error types for request functions.

use std::time::Duration;

use http::StatusCode;
use rest_contracts_core::ResolveError;
use serde_json::Value;
use thiserror::Error;

/// Status text reported when a successful response body is not valid JSON.
pub const JSON_PARSE_ERROR: &str = "JSON Parse error";

/// Errors produced by a request function.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered with a status outside 200..=299.
    #[error("Request failed with status {status}: {status_text}")]
    Status {
        /// Response status.
        status: StatusCode,
        /// Reason phrase for the status.
        status_text: String,
        /// Raw response body.
        response_text: String,
    },

    /// A successful response whose body could not be decoded.
    #[error("JSON Parse error: {source}")]
    Parse {
        /// Response status.
        status: StatusCode,
        /// Raw response body.
        response_text: String,
        /// Decoder error.
        #[source]
        source: serde_json::Error,
    },

    /// The server sent a structured `error` value.
    #[error("Server reported an error (status {status}): {error}")]
    Application {
        /// Response status.
        status: StatusCode,
        /// The unwrapped structured error.
        error: Value,
    },

    /// No response arrived before the timeout.
    #[error("Request timed out after {timeout:?}")]
    Timeout {
        /// The timeout that expired.
        timeout: Duration,
    },

    /// The transport failed to deliver the request.
    #[error("Transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
    },

    /// Error from the `reqwest` client.
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// The call arguments could not be turned into a request.
    #[error("Invalid request parameters: {0}")]
    Resolve(#[from] ResolveError),
}

impl ClientError {
    /// Creates a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Response status, for errors that carry one.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. }
            | Self::Parse { status, .. }
            | Self::Application { status, .. } => Some(*status),
            Self::Request(err) => err.status(),
            _ => None,
        }
    }

    /// Status text, for errors that carry a status.
    #[must_use]
    pub fn status_text(&self) -> Option<&str> {
        match self {
            Self::Status { status_text, .. } => Some(status_text),
            Self::Parse { .. } => Some(JSON_PARSE_ERROR),
            Self::Application { status, .. } => status.canonical_reason(),
            _ => None,
        }
    }

    /// Raw response body, for errors that kept it.
    #[must_use]
    pub fn response_text(&self) -> Option<&str> {
        match self {
            Self::Status { response_text, .. } | Self::Parse { response_text, .. } => {
                Some(response_text)
            }
            _ => None,
        }
    }

    /// The structured error sent by the server, if any.
    #[must_use]
    pub fn application_error(&self) -> Option<&Value> {
        match self {
            Self::Application { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Returns `true` for a 401 response.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }

    /// Returns `true` for a 403 response.
    #[must_use]
    pub fn is_forbidden(&self) -> bool {
        self.status() == Some(StatusCode::FORBIDDEN)
    }

    /// Returns `true` for a 401 or 403 response.
    #[must_use]
    pub fn is_unauthorized_or_forbidden(&self) -> bool {
        self.is_unauthorized() || self.is_forbidden()
    }

    /// Returns `true` for a 404 response.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    /// Returns `true` if the request timed out.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Request(err) => err.is_timeout(),
            _ => false,
        }
    }
}

/// Result type for request functions.
pub type ClientResult<T> = Result<T, ClientError>;

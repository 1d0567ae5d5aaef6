//! Error types for contracts and handlers.
//!
//! - [`ContractError`] - raised while declaring a descriptor
//! - [`ResolveError`] - raised while turning call arguments into a request
//! - [`ApiError`] - returned by handlers and turned into an HTTP response

use std::fmt;
use std::panic::Location;

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, StatusCode};
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::handler::{ApiResponse, ResponseBody};
use crate::method::Method;

/// Error-shape fields inspected for a status code, in priority order.
pub const STATUS_FIELDS: [&str; 3] = ["status", "statusCode", "code"];

/// Message used when an error carries none.
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// A `(method, path)` pair was declared twice.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "The same method ({method}) and path ({path}) cannot be used for more than one REST API. \
     Perhaps you copied a REST API and forgot to give the new one a unique path? \
     (first declared at {original}, declared again at {duplicate})"
)]
pub struct DuplicateRouteError {
    /// The conflicting method.
    pub method: Method,
    /// The conflicting path template.
    pub path: String,
    /// Where the pair was first declared.
    pub original: &'static Location<'static>,
    /// Where the duplicate declaration happened.
    pub duplicate: &'static Location<'static>,
}

/// Errors raised while finalizing a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    /// The `(method, path)` pair is already registered.
    #[error(transparent)]
    DuplicateRoute(#[from] DuplicateRouteError),

    /// The path has parameter segments but no path-parameter type was declared.
    #[error("{method} {path} has path parameters ({names}) but declares no path-parameter type")]
    UndeclaredPathParameters {
        /// Method of the rejected descriptor.
        method: Method,
        /// Path template of the rejected descriptor.
        path: String,
        /// Comma-separated parameter names found in the template.
        names: String,
    },
}

/// Errors raised while turning call arguments into a request.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// A path-parameter key has no matching segment in the template.
    #[error("path parameter `{name}` does not appear in the path template")]
    UnmatchedPathParameter {
        /// The unmatched key.
        name: String,
    },

    /// A path segment was given an array or object value.
    #[error("path parameter `{name}` must be a string, number or boolean")]
    UnsupportedPathValue {
        /// The offending parameter.
        name: String,
    },

    /// Parameters did not serialize to an object.
    #[error("{kind} must serialize to an object, got {found}")]
    NotAnObject {
        /// Which argument was rejected ("path parameters", "query parameters").
        kind: &'static str,
        /// JSON type that was produced instead.
        found: &'static str,
    },

    /// Serialization of an argument failed.
    #[error("failed to serialize request arguments: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Error returned by a handler.
///
/// Carries a structured error object. The HTTP status is sniffed from the
/// object's [`STATUS_FIELDS`] (`status`, then `statusCode`, then `code`);
/// the first numeric value in `100..=599` wins and anything else means 500.
///
/// Every adapter serializes errors the same way:
///
/// ```json
/// { "error": { "status": 403, "message": "nope" }, "message": "nope" }
/// ```
///
/// # Example
///
/// ```
/// use rest_contracts_core::ApiError;
/// use http::StatusCode;
/// use serde_json::json;
///
/// let err = ApiError::from_value(json!({ "statusCode": 409, "message": "taken" }));
/// assert_eq!(err.status_code(), StatusCode::CONFLICT);
/// assert_eq!(err.message(), "taken");
///
/// let err = ApiError::from_value(json!({ "code": "E_BUSY" }));
/// assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
/// assert_eq!(err.message(), "Unknown error");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    detail: Map<String, Value>,
}

impl ApiError {
    /// Creates an error with an explicit status and message.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        let mut detail = Map::new();
        detail.insert("status".to_string(), json!(status.as_u16()));
        detail.insert("message".to_string(), Value::String(message.into()));
        Self { detail }
    }

    /// Creates an error from an arbitrary structured value.
    ///
    /// Objects are kept as-is. A bare string becomes the message; any other
    /// value is stored under `error`.
    pub fn from_value(value: Value) -> Self {
        let detail = match value {
            Value::Object(map) => map,
            Value::String(message) => {
                let mut map = Map::new();
                map.insert("message".to_string(), Value::String(message));
                map
            }
            other => {
                let mut map = Map::new();
                map.insert("error".to_string(), other);
                map
            }
        };
        Self { detail }
    }

    /// Creates an error from any serializable value.
    pub fn from_serializable<T: serde::Serialize>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => Self::from_value(value),
            Err(err) => Self::internal(format!("unserializable error: {err}")),
        }
    }

    /// 400 Bad Request.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// 401 Unauthorized.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    /// 403 Forbidden.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    /// 404 Not Found.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// 500 Internal Server Error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Adds a field to the structured error object.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.detail.insert(key.into(), value.into());
        self
    }

    /// Returns the structured error object.
    #[must_use]
    pub fn detail(&self) -> &Map<String, Value> {
        &self.detail
    }

    /// Returns the sniffed status, or 500.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        STATUS_FIELDS
            .iter()
            .filter_map(|field| self.detail.get(*field))
            .filter_map(Value::as_u64)
            .find_map(|code| {
                u16::try_from(code)
                    .ok()
                    .filter(|code| (100..=599).contains(code))
                    .and_then(|code| StatusCode::from_u16(code).ok())
            })
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Returns the message, or `"Unknown error"`.
    #[must_use]
    pub fn message(&self) -> &str {
        self.detail
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or(UNKNOWN_ERROR)
    }

    /// Returns the JSON body every adapter sends for this error.
    #[must_use]
    pub fn to_body(&self) -> Value {
        json!({
            "error": Value::Object(self.detail.clone()),
            "message": self.message(),
        })
    }

    /// Builds the adapter-neutral error response.
    #[must_use]
    pub fn to_response(&self) -> ApiResponse {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        ApiResponse {
            status: self.status_code(),
            headers,
            body: ResponseBody::Json(Bytes::from(self.to_body().to_string())),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message(), self.status_code().as_u16())
    }
}

impl std::error::Error for ApiError {}

impl From<ResolveError> for ApiError {
    fn from(err: ResolveError) -> Self {
        Self::bad_request(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_field_priority() {
        let err = ApiError::from_value(json!({ "code": 418, "statusCode": 409, "status": 403 }));
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);

        let err = ApiError::from_value(json!({ "code": 418, "statusCode": 409 }));
        assert_eq!(err.status_code(), StatusCode::CONFLICT);

        let err = ApiError::from_value(json!({ "code": 418 }));
        assert_eq!(err.status_code().as_u16(), 418);
    }

    #[test]
    fn test_non_numeric_and_out_of_range_fields_are_skipped() {
        let err = ApiError::from_value(json!({ "status": "403", "statusCode": 42, "code": 404 }));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let err = ApiError::from_value(json!({ "status": 7000 }));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_message_defaults_to_unknown_error() {
        let err = ApiError::from_value(json!({ "status": 400 }));
        assert_eq!(err.message(), "Unknown error");
    }

    #[test]
    fn test_from_value_string_becomes_message() {
        let err = ApiError::from_value(json!("boom"));
        assert_eq!(err.message(), "boom");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_body_contains_structured_error_and_message() {
        let err = ApiError::from_value(json!({ "status": 403, "message": "nope", "reason": "acl" }));
        let body = err.to_body();
        assert_eq!(body["message"], "nope");
        assert_eq!(body["error"]["reason"], "acl");
        assert_eq!(body["error"]["status"], 403);
    }

    #[test]
    fn test_to_response_is_json() {
        let response = ApiError::forbidden("nope").to_response();
        assert_eq!(response.status, StatusCode::FORBIDDEN);
        assert_eq!(response.headers[CONTENT_TYPE], "application/json");
        let ResponseBody::Json(bytes) = response.body else {
            panic!("expected JSON body");
        };
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["message"], "nope");
    }

    #[test]
    fn test_with_field_and_display() {
        let err = ApiError::not_found("no such excuse").with_field("id", "42");
        assert_eq!(err.detail()["id"], "42");
        assert_eq!(err.to_string(), "no such excuse (404)");
    }

    #[test]
    fn test_resolve_error_maps_to_bad_request() {
        let err: ApiError = ResolveError::UnmatchedPathParameter { name: "id".into() }.into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.message().contains("`id`"));
    }

    #[test]
    fn test_duplicate_route_message() {
        let here = Location::caller();
        let err = DuplicateRouteError {
            method: Method::Get,
            path: "/x".into(),
            original: here,
            duplicate: here,
        };
        let message = err.to_string();
        assert!(message.starts_with(
            "The same method (GET) and path (/x) cannot be used for more than one REST API."
        ));
        assert!(message.contains("error.rs"));
    }
}

//! Request context types.
//!
//! The [`RequestContext`] gives handlers access to the underlying request
//! beyond the typed parameters: method, URI, headers, and a request ID for
//! log correlation.

use std::time::{Duration, Instant};

use http::{HeaderMap, Uri};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::method::Method;

/// A unique identifier for each request, using UUID v7.
///
/// UUID v7 is time-ordered, which keeps log lines for the same request
/// easy to find.
///
/// # Example
///
/// ```
/// use rest_contracts_core::RequestId;
///
/// let id = RequestId::new();
/// println!("Request ID: {}", id);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new request ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Parses a request ID, e.g. from an incoming `x-request-id` header.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        Uuid::parse_str(text).ok().map(Self)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-request information handed to handlers alongside their parameters.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: RequestId,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    started_at: Instant,
}

impl RequestContext {
    /// Creates a context with a fresh request ID.
    #[must_use]
    pub fn new(method: Method, uri: Uri, headers: HeaderMap) -> Self {
        let request_id = headers
            .get("x-request-id")
            .and_then(|value| value.to_str().ok())
            .and_then(RequestId::parse)
            .unwrap_or_default();

        Self {
            request_id,
            method,
            uri,
            headers,
            started_at: Instant::now(),
        }
    }

    /// Creates a context for unit-testing handlers.
    #[must_use]
    pub fn mock(method: Method, path: &'static str) -> Self {
        Self::new(method, Uri::from_static(path), HeaderMap::new())
    }

    /// Returns the request ID.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the request method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Returns the request URI.
    #[must_use]
    pub const fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns the request headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a header value as a string, if present and valid.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Time since the context was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn test_request_ids_are_unique() {
        assert_ne!(RequestId::new(), RequestId::new());
    }

    #[test]
    fn test_request_id_taken_from_header() {
        let id = RequestId::new();
        let mut headers = HeaderMap::new();
        headers.insert("x-request-id", HeaderValue::from_str(&id.to_string()).unwrap());

        let ctx = RequestContext::new(Method::Get, Uri::from_static("/x"), headers);
        assert_eq!(ctx.request_id(), id);
    }

    #[test]
    fn test_invalid_request_id_header_is_replaced() {
        let mut headers = HeaderMap::new();
        headers.insert("x-request-id", HeaderValue::from_static("not-a-uuid"));
        let ctx = RequestContext::new(Method::Get, Uri::from_static("/x"), headers);
        assert_ne!(ctx.request_id().to_string(), "not-a-uuid");
    }

    #[test]
    fn test_mock_context() {
        let ctx = RequestContext::mock(Method::Put, "/excuses/");
        assert_eq!(ctx.method(), Method::Put);
        assert_eq!(ctx.uri().path(), "/excuses/");
        assert!(ctx.header("accept").is_none());
    }
}

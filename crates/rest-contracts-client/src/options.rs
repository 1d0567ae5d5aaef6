//! Per-request options.
//!
//! Options exist at three levels: the factory, the request function and the
//! individual call. Each level is merged over the previous one field by
//! field, so a call that only sets a timeout keeps the headers configured on
//! the factory. Headers are replaced as a whole, never combined.

use std::time::Duration;

use http::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CACHE_CONTROL, COOKIE,
};

/// `accept` header sent unless the caller sets one.
pub const DEFAULT_ACCEPT: &str = "application/json, text/plain, text/javascript";

/// Options for a request.
///
/// Every field is optional; unset fields fall through to the level below.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use rest_contracts_client::RequestOptions;
///
/// let factory = RequestOptions::new().with_timeout(Duration::from_secs(10));
/// let call = RequestOptions::new().with_no_cache(true);
///
/// let merged = factory.merge(&call);
/// assert_eq!(merged.timeout(), Some(Duration::from_secs(10)));
/// assert!(merged.no_cache());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    /// Timeout for the whole exchange. Default: none.
    pub timeout: Option<Duration>,
    /// Headers sent with the request. Default: only `accept`.
    pub headers: Option<HeaderMap>,
    /// Ask caches to revalidate. Default: false.
    pub no_cache: Option<bool>,
    /// Forward credentials (`authorization`, `cookie`). Default: true.
    pub with_credentials: Option<bool>,
}

impl RequestOptions {
    /// Creates empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Replaces the headers.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = Some(headers);
        self
    }

    /// Adds one header.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers
            .get_or_insert_with(HeaderMap::new)
            .insert(name, value);
        self
    }

    /// Sets the no-cache flag.
    #[must_use]
    pub fn with_no_cache(mut self, no_cache: bool) -> Self {
        self.no_cache = Some(no_cache);
        self
    }

    /// Sets whether credentials are forwarded.
    #[must_use]
    pub fn with_credentials(mut self, with_credentials: bool) -> Self {
        self.with_credentials = Some(with_credentials);
        self
    }

    /// Returns `self` overridden by every field set in `overrides`.
    #[must_use]
    pub fn merge(&self, overrides: &Self) -> Self {
        Self {
            timeout: overrides.timeout.or(self.timeout),
            headers: overrides.headers.clone().or_else(|| self.headers.clone()),
            no_cache: overrides.no_cache.or(self.no_cache),
            with_credentials: overrides.with_credentials.or(self.with_credentials),
        }
    }

    /// Effective timeout.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Effective no-cache flag.
    #[must_use]
    pub fn no_cache(&self) -> bool {
        self.no_cache.unwrap_or(false)
    }

    /// Effective credentials flag.
    #[must_use]
    pub fn forwards_credentials(&self) -> bool {
        self.with_credentials.unwrap_or(true)
    }

    /// Headers to put on the wire.
    #[must_use]
    pub fn request_headers(&self) -> HeaderMap {
        let mut headers = self.headers.clone().unwrap_or_default();

        if !headers.contains_key(ACCEPT) {
            headers.insert(ACCEPT, HeaderValue::from_static(DEFAULT_ACCEPT));
        }
        if self.no_cache() {
            headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        }
        if !self.forwards_credentials() {
            headers.remove(AUTHORIZATION);
            headers.remove(COOKIE);
        }

        headers
    }
}

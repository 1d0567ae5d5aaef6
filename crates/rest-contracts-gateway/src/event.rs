//! Gateway proxy event and response shapes.
//!
//! These mirror the JSON documents exchanged with an API gateway that
//! proxies HTTP requests to a function: field names are camelCase and
//! every optional map may be `null`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// An HTTP request as delivered by the gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayEvent {
    /// Upper-case method name.
    pub http_method: String,
    /// Request path, without the query string.
    pub path: String,
    /// Path parameters extracted by the gateway's own routing.
    #[serde(default)]
    pub path_parameters: Option<BTreeMap<String, String>>,
    /// Query parameters, last value wins.
    #[serde(default)]
    pub query_string_parameters: Option<BTreeMap<String, String>>,
    /// Query parameters with every repeated value.
    #[serde(default)]
    pub multi_value_query_string_parameters: Option<BTreeMap<String, Vec<String>>>,
    /// Request headers.
    #[serde(default)]
    pub headers: Option<BTreeMap<String, String>>,
    /// Request body, base64-encoded when `is_base64_encoded` is set.
    #[serde(default)]
    pub body: Option<String>,
    /// Whether `body` is base64.
    #[serde(default)]
    pub is_base64_encoded: bool,
}

impl GatewayEvent {
    /// Creates an event with no parameters, headers or body.
    #[must_use]
    pub fn new(http_method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            http_method: http_method.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    /// Adds a gateway-extracted path parameter.
    #[must_use]
    pub fn with_path_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_parameters
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), value.into());
        self
    }

    /// Adds a query value; repeated names accumulate in the multi-value map.
    #[must_use]
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        self.query_string_parameters
            .get_or_insert_with(BTreeMap::new)
            .insert(name.clone(), value.clone());
        self.multi_value_query_string_parameters
            .get_or_insert_with(BTreeMap::new)
            .entry(name)
            .or_default()
            .push(value);
        self
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), value.into());
        self
    }

    /// Sets a plain text body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self.is_base64_encoded = false;
        self
    }

    /// Sets a base64-encoded body.
    #[must_use]
    pub fn with_base64_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self.is_base64_encoded = true;
        self
    }

    /// Looks up a header, ignoring case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.as_ref().and_then(|headers| {
            headers
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value.as_str())
        })
    }
}

/// The response handed back to the gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayResponse {
    /// HTTP status.
    pub status_code: u16,
    /// Response headers with a single value.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Response headers that carry more than one value, such as `set-cookie`.
    /// A name appears here or in `headers`, never both.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub multi_value_headers: BTreeMap<String, Vec<String>>,
    /// Response body, base64 when `is_base64_encoded` is set.
    #[serde(default)]
    pub body: String,
    /// Whether `body` is base64.
    #[serde(default)]
    pub is_base64_encoded: bool,
}

impl GatewayResponse {
    /// Looks up a header, ignoring case. For a repeated header this is its
    /// first value.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.header_values(name).into_iter().next()
    }

    /// Every value of a header, ignoring case.
    #[must_use]
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        let single = self
            .headers
            .iter()
            .filter(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str());
        let multi = self
            .multi_value_headers
            .iter()
            .filter(|(key, _)| key.eq_ignore_ascii_case(name))
            .flat_map(|(_, values)| values.iter().map(String::as_str));
        single.chain(multi).collect()
    }
}

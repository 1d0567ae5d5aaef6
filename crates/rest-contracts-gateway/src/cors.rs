//! Cross-origin response headers.

use std::collections::BTreeSet;

/// Header set on responses to allowed origins.
pub const ALLOW_ORIGIN: &str = "Access-Control-Allow-Origin";

/// Origins allowed to read responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigins {
    /// Any origin; responses always carry `*`.
    Any,
    /// Only these origins, stored lower-cased.
    List(BTreeSet<String>),
}

impl CorsOrigins {
    /// Builds an origin list. Matching is case-insensitive.
    pub fn list<I, T>(origins: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        Self::List(
            origins
                .into_iter()
                .map(|origin| origin.as_ref().trim().to_ascii_lowercase())
                .filter(|origin| !origin.is_empty())
                .collect(),
        )
    }

    /// Parses `*` or a comma-separated origin list.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        if text.trim() == "*" {
            Self::Any
        } else {
            Self::list(text.split(','))
        }
    }

    /// Value for `Access-Control-Allow-Origin`, if the request origin is
    /// allowed.
    ///
    /// A listed origin is reflected exactly as the request sent it.
    #[must_use]
    pub fn allow_origin(&self, request_origin: Option<&str>) -> Option<String> {
        match self {
            Self::Any => Some("*".to_string()),
            Self::List(allowed) => request_origin
                .filter(|origin| allowed.contains(&origin.to_ascii_lowercase()))
                .map(str::to_string),
        }
    }
}

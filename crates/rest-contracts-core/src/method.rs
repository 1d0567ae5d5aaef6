//! HTTP methods a contract can be declared with.
//!
//! [`Method`] is the runtime value stored in every descriptor. The zero-sized
//! markers ([`Get`], [`Post`], ...) carry the same information at the type
//! level so the builder can offer query parameters only to [`QueryMethod`]s
//! and bodies only to [`BodyMethod`]s.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An HTTP method supported by REST contracts.
///
/// # Example
///
/// ```
/// use rest_contracts_core::Method;
///
/// assert!(Method::Get.is_query_bearing());
/// assert!(Method::Put.is_body_bearing());
/// assert_eq!(Method::Patch.to_string(), "PATCH");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `PATCH`
    Patch,
    /// `DELETE`
    Delete,
}

impl Method {
    /// All supported methods.
    pub const ALL: [Method; 5] = [
        Method::Get,
        Method::Post,
        Method::Put,
        Method::Patch,
        Method::Delete,
    ];

    /// Returns the upper-case method name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// Returns `true` for methods that may carry query parameters (GET, DELETE).
    #[must_use]
    pub const fn is_query_bearing(self) -> bool {
        matches!(self, Self::Get | Self::Delete)
    }

    /// Returns `true` for methods that may carry a body (POST, PUT, PATCH).
    #[must_use]
    pub const fn is_body_bearing(self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Patch)
    }

    /// Converts to the `http` crate's method type.
    #[must_use]
    pub fn to_http(self) -> http::Method {
        match self {
            Self::Get => http::Method::GET,
            Self::Post => http::Method::POST,
            Self::Put => http::Method::PUT,
            Self::Patch => http::Method::PATCH,
            Self::Delete => http::Method::DELETE,
        }
    }

    /// Converts from the `http` crate's method type.
    ///
    /// Returns `None` for methods contracts cannot be declared with
    /// (`HEAD`, `OPTIONS`, extension methods, ...).
    #[must_use]
    pub fn from_http(method: &http::Method) -> Option<Self> {
        Self::parse(method.as_str())
    }

    /// Parses a method name, ignoring ASCII case.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|method| method.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for http::Method {
    fn from(method: Method) -> Self {
        method.to_http()
    }
}

mod sealed {
    pub trait Sealed {}
}

/// Type-level HTTP method.
///
/// Sealed: only the five markers in this module implement it.
pub trait MethodKind: sealed::Sealed + Send + Sync + 'static {
    /// The runtime method this marker stands for.
    const METHOD: Method;
}

/// Methods that may declare query parameters.
pub trait QueryMethod: MethodKind {}

/// Methods that may declare a request body.
pub trait BodyMethod: MethodKind {}

macro_rules! method_marker {
    ($(#[$doc:meta])* $name:ident => $method:ident, $kind:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
        pub struct $name;

        impl sealed::Sealed for $name {}

        impl MethodKind for $name {
            const METHOD: Method = Method::$method;
        }

        impl $kind for $name {}
    };
}

method_marker!(
    /// Type-level `GET`.
    Get => Get, QueryMethod
);
method_marker!(
    /// Type-level `DELETE`.
    Delete => Delete, QueryMethod
);
method_marker!(
    /// Type-level `POST`.
    Post => Post, BodyMethod
);
method_marker!(
    /// Type-level `PUT`.
    Put => Put, BodyMethod
);
method_marker!(
    /// Type-level `PATCH`.
    Patch => Patch, BodyMethod
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_and_body_methods_are_disjoint() {
        for method in Method::ALL {
            assert_ne!(method.is_query_bearing(), method.is_body_bearing(), "{method}");
        }
    }

    #[test]
    fn test_parse_ignores_case() {
        assert_eq!(Method::parse("get"), Some(Method::Get));
        assert_eq!(Method::parse("Patch"), Some(Method::Patch));
        assert_eq!(Method::parse("OPTIONS"), None);
    }

    #[test]
    fn test_http_round_trip() {
        for method in Method::ALL {
            assert_eq!(Method::from_http(&method.to_http()), Some(method));
        }
        assert_eq!(Method::from_http(&http::Method::HEAD), None);
    }

    #[test]
    fn test_markers_match_runtime_methods() {
        assert_eq!(Get::METHOD, Method::Get);
        assert_eq!(Delete::METHOD, Method::Delete);
        assert_eq!(Post::METHOD, Method::Post);
        assert_eq!(Put::METHOD, Method::Put);
        assert_eq!(Patch::METHOD, Method::Patch);
    }

    #[test]
    fn test_serde_uses_upper_case() {
        assert_eq!(serde_json::to_string(&Method::Delete).unwrap(), "\"DELETE\"");
        let parsed: Method = serde_json::from_str("\"PUT\"").unwrap();
        assert_eq!(parsed, Method::Put);
    }
}

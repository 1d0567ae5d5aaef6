//! Path templating and query strings.
//!
//! Every adapter goes through this module, so client-side assembly and
//! server-side extraction agree on what a path template means.
//!
//! # Template syntax
//!
//! A template is split on `/`. A segment is a parameter when it is not the
//! first segment, starts with `:`, and still has characters left once the
//! marker characters `:` and `?` are removed. A trailing `?` marks the
//! parameter optional for server-side matching.
//!
//! ```
//! use rest_contracts_core::PathTemplate;
//! use serde_json::json;
//!
//! let template = PathTemplate::parse("/excuses/:id/");
//! let params = json!({ "id": "a b", "verbose": true });
//!
//! let resolved = template.resolve(params.as_object().unwrap()).unwrap();
//! assert_eq!(resolved.path, "/excuses/a%20b/");
//! assert_eq!(resolved.leftover.len(), 1);
//! ```
//!
//! # Value coercion
//!
//! Everything that crosses the wire becomes a string. Numbers stringify in
//! decimal. In query strings `true` becomes `"true"` and `false` becomes the
//! empty string, so `false` and an absent key differ on the wire but both
//! read as falsy. Servers therefore see strings (or arrays of strings for
//! repeated query keys) where the client sent numbers or booleans, and
//! [`crate::serde_helpers::from_params`] reads them back into typed fields.
//!
//! An empty string is a path value, not an absent one: it resolves to an
//! empty component (`/pages//x`). No template matches an empty component, so
//! a required path parameter must not be empty if the request is to reach a
//! server built from the same template.

use std::borrow::Cow;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::error::ResolveError;

/// Marker that introduces a parameter segment.
pub const PARAM_MARKER: char = ':';

/// Suffix marking a parameter segment optional.
pub const OPTIONAL_MARKER: char = '?';

/// One `/`-delimited component of a path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Text matched and emitted verbatim.
    Literal(String),
    /// A named slot filled from the parameter object.
    Param {
        /// Parameter name with marker characters removed.
        name: String,
        /// Whether the segment was declared with a trailing `?`.
        optional: bool,
    },
}

impl Segment {
    fn classify(index: usize, text: &str) -> Self {
        if index > 0 && text.starts_with(PARAM_MARKER) {
            let name: String = text
                .chars()
                .filter(|c| *c != PARAM_MARKER && *c != OPTIONAL_MARKER)
                .collect();
            if !name.is_empty() {
                return Self::Param {
                    name,
                    optional: text.ends_with(OPTIONAL_MARKER),
                };
            }
        }
        Self::Literal(text.to_string())
    }

    /// Returns the parameter name if this is a parameter segment.
    #[must_use]
    pub fn param_name(&self) -> Option<&str> {
        match self {
            Self::Param { name, .. } => Some(name),
            Self::Literal(_) => None,
        }
    }
}

/// A parsed path template.
///
/// Parsing happens once per descriptor; the name to index map is reused
/// for every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
    slots: IndexMap<String, usize>,
}

/// Result of substituting a parameter object into a template.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPath {
    /// Concrete request path, always starting with a single `/`.
    pub path: String,
    /// Parameters that did not name a path segment, in input order.
    pub leftover: Map<String, Value>,
}

impl PathTemplate {
    /// Parses a template.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let segments: Vec<Segment> = raw
            .split('/')
            .enumerate()
            .map(|(index, text)| Segment::classify(index, text))
            .collect();

        let mut slots = IndexMap::new();
        for (index, segment) in segments.iter().enumerate() {
            if let Some(name) = segment.param_name() {
                slots.entry(name.to_string()).or_insert(index);
            }
        }

        Self {
            raw: raw.to_string(),
            segments,
            slots,
        }
    }

    /// Returns the template as declared.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns all segments, including the empty one before a leading slash.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Returns parameter names in template order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }

    /// Returns `true` if the template has at least one parameter segment.
    #[must_use]
    pub fn has_params(&self) -> bool {
        !self.slots.is_empty()
    }

    /// Returns the segment index of a named parameter.
    #[must_use]
    pub fn slot(&self, name: &str) -> Option<usize> {
        self.slots.get(name).copied()
    }

    /// Substitutes `params` into the template.
    ///
    /// Strings are percent-encoded, numbers and booleans stringified. A
    /// parameter that is absent or `null` drops its segment, so a missing
    /// optional parameter collapses the path instead of leaving an empty
    /// component. Empty strings and zero are values, not absence; an empty
    /// string yields an empty component, which [`match_path`](Self::match_path)
    /// rejects.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::UnsupportedPathValue`] when a parameter
    /// named by a segment holds an array or object.
    pub fn resolve(&self, params: &Map<String, Value>) -> Result<ResolvedPath, ResolveError> {
        let mut parts: Vec<Cow<'_, str>> = Vec::with_capacity(self.segments.len());

        for (index, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Literal(text) => {
                    if index == 0 && text.is_empty() {
                        continue;
                    }
                    parts.push(Cow::Borrowed(text));
                }
                Segment::Param { name, .. } => {
                    if let Some(value) = path_value(name, params.get(name))? {
                        parts.push(Cow::Owned(value));
                    }
                }
            }
        }

        let leftover = params
            .iter()
            .filter(|(key, _)| !self.slots.contains_key(key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Ok(ResolvedPath {
            path: format!("/{}", parts.join("/")),
            leftover,
        })
    }

    /// Matches a concrete request path, returning decoded parameters.
    ///
    /// A single trailing slash is ignored on both sides, optional
    /// parameters may be absent, and values are percent-decoded. An empty
    /// component never matches a parameter.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<Map<String, Value>> {
        let pattern = trim_edges(&self.segments[1..], self.raw.starts_with('/'), &self.segments[..]);
        let tokens: Vec<&str> = path.split('/').collect();
        let tokens = trim_edges(&tokens[1..], path.starts_with('/'), &tokens[..]);

        let mut required_left = pattern
            .iter()
            .filter(|segment| !matches!(segment, Segment::Param { optional: true, .. }))
            .count();
        if tokens.len() < required_left || tokens.len() > pattern.len() {
            return None;
        }

        let mut params = Map::new();
        let mut remaining = tokens.iter();
        let mut tokens_left = tokens.len();

        for segment in pattern {
            match segment {
                Segment::Literal(expected) => {
                    let actual = remaining.next()?;
                    if *actual != expected.as_str() {
                        return None;
                    }
                    required_left -= 1;
                }
                Segment::Param { name, optional } => {
                    if *optional && tokens_left <= required_left {
                        continue;
                    }
                    let actual = remaining.next()?;
                    if actual.is_empty() {
                        return None;
                    }
                    let decoded = urlencoding::decode(actual).ok()?;
                    params.insert(name.clone(), Value::String(decoded.into_owned()));
                    if !optional {
                        required_left -= 1;
                    }
                }
            }
            tokens_left -= 1;
        }

        if remaining.next().is_some() {
            return None;
        }
        Some(params)
    }
}

// Drops the leading-slash artifact and one trailing empty segment.
fn trim_edges<'a, T: EmptyText>(
    after_first: &'a [T],
    leading_slash: bool,
    all: &'a [T],
) -> &'a [T] {
    let mut slice = if leading_slash { after_first } else { all };
    if let Some((last, rest)) = slice.split_last() {
        if last.is_empty_text() {
            slice = rest;
        }
    }
    slice
}

trait EmptyText {
    fn is_empty_text(&self) -> bool;
}

impl EmptyText for Segment {
    fn is_empty_text(&self) -> bool {
        matches!(self, Segment::Literal(text) if text.is_empty())
    }
}

impl EmptyText for &str {
    fn is_empty_text(&self) -> bool {
        self.is_empty()
    }
}

fn path_value(name: &str, value: Option<&Value>) -> Result<Option<String>, ResolveError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(urlencoding::encode(text).into_owned())),
        Some(Value::Number(number)) => Ok(Some(number.to_string())),
        Some(Value::Bool(flag)) => Ok(Some(flag.to_string())),
        Some(Value::Array(_) | Value::Object(_)) => Err(ResolveError::UnsupportedPathValue {
            name: name.to_string(),
        }),
    }
}

fn query_value(value: &Value) -> Cow<'_, str> {
    match value {
        Value::Null | Value::Bool(false) => Cow::Borrowed(""),
        Value::Bool(true) => Cow::Borrowed("true"),
        Value::String(text) => Cow::Borrowed(text),
        Value::Number(number) => Cow::Owned(number.to_string()),
        Value::Array(_) | Value::Object(_) => Cow::Owned(value.to_string()),
    }
}

fn query_pair(key: &str, value: &Value) -> String {
    format!(
        "{}={}",
        urlencoding::encode(key),
        urlencoding::encode(&query_value(value))
    )
}

/// Encodes parameters as a query string without the leading `?`.
///
/// Keys are visited in the map's insertion order. `null` values are
/// skipped; arrays emit one pair per element, in element order.
///
/// ```
/// use rest_contracts_core::encode_query;
/// use serde_json::json;
///
/// let params = json!({ "tag": ["a", "b"], "draft": false, "page": 2, "skip": null });
/// assert_eq!(encode_query(params.as_object().unwrap()), "tag=a&tag=b&draft=&page=2");
/// ```
#[must_use]
pub fn encode_query(params: &Map<String, Value>) -> String {
    let mut pairs = Vec::with_capacity(params.len());
    for (key, value) in params {
        match value {
            Value::Null => {}
            Value::Array(items) => pairs.extend(items.iter().map(|item| query_pair(key, item))),
            other => pairs.push(query_pair(key, other)),
        }
    }
    pairs.join("&")
}

/// Appends encoded parameters to `url`.
///
/// Uses `?` when the URL has no query yet and `&` otherwise. Returns the URL
/// unchanged when nothing is left to encode.
#[must_use]
pub fn append_query(url: &str, params: &Map<String, Value>) -> String {
    let query = encode_query(params);
    if query.is_empty() {
        return url.to_string();
    }
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}{query}")
}

/// Parses a raw query string into a parameter object.
///
/// A key seen once maps to a string; a repeated key maps to an array of
/// strings in the order the pairs appeared.
///
/// # Errors
///
/// Returns an error if the query string is not valid
/// `application/x-www-form-urlencoded` data.
pub fn parse_query(raw: &str) -> Result<Map<String, Value>, serde_urlencoded::de::Error> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(raw)?;
    let mut params = Map::new();

    for (key, value) in pairs {
        match params.get_mut(&key) {
            Some(Value::Array(items)) => items.push(Value::String(value)),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, Value::String(value)]);
            }
            None => {
                params.insert(key, Value::String(value));
            }
        }
    }

    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn test_parse_finds_parameter_segments() {
        let template = PathTemplate::parse("/excuses/:id/");
        assert_eq!(template.param_names().collect::<Vec<_>>(), vec!["id"]);
        assert_eq!(template.slot("id"), Some(2));
        assert!(template.has_params());
    }

    #[test]
    fn test_parse_first_segment_is_never_a_parameter() {
        let template = PathTemplate::parse(":id/things");
        assert!(!template.has_params());
        assert_eq!(template.segments()[0], Segment::Literal(":id".into()));
    }

    #[test]
    fn test_parse_bare_marker_is_literal() {
        let template = PathTemplate::parse("/a/:/b/:?");
        assert!(!template.has_params());
    }

    #[test]
    fn test_parse_optional_marker() {
        let template = PathTemplate::parse("/users/:id?");
        assert_eq!(
            template.segments()[2],
            Segment::Param {
                name: "id".into(),
                optional: true
            }
        );
    }

    #[test]
    fn test_resolve_substitutes_in_place() {
        let template = PathTemplate::parse("/excuses/:id/");
        let resolved = template.resolve(&object(json!({ "id": "abc" }))).unwrap();
        assert_eq!(resolved.path, "/excuses/abc/");
        assert!(resolved.leftover.is_empty());
    }

    #[test]
    fn test_resolve_encodes_strings_and_stringifies_numbers() {
        let template = PathTemplate::parse("/files/:name/:version");
        let resolved = template
            .resolve(&object(json!({ "name": "a/b c", "version": 3 })))
            .unwrap();
        assert_eq!(resolved.path, "/files/a%2Fb%20c/3");
    }

    #[test]
    fn test_resolve_collapses_absent_parameters() {
        let template = PathTemplate::parse("/users/:id?/posts");
        let resolved = template.resolve(&Map::new()).unwrap();
        assert_eq!(resolved.path, "/users/posts");

        let resolved = template.resolve(&object(json!({ "id": null }))).unwrap();
        assert_eq!(resolved.path, "/users/posts");
    }

    #[test]
    fn test_resolve_keeps_falsy_values() {
        let template = PathTemplate::parse("/pages/:page/:flag");
        let resolved = template
            .resolve(&object(json!({ "page": 0, "flag": false })))
            .unwrap();
        assert_eq!(resolved.path, "/pages/0/false");

        let resolved = template
            .resolve(&object(json!({ "page": "", "flag": "x" })))
            .unwrap();
        assert_eq!(resolved.path, "/pages//x");
    }

    #[test]
    fn test_empty_path_value_resolves_but_does_not_match() {
        let template = PathTemplate::parse("/pages/:page/:flag");
        let resolved = template
            .resolve(&object(json!({ "page": "", "flag": "x" })))
            .unwrap();
        assert_eq!(resolved.path, "/pages//x");
        assert!(template.match_path(&resolved.path).is_none());

        let resolved = template
            .resolve(&object(json!({ "page": 0, "flag": false })))
            .unwrap();
        let matched = template.match_path(&resolved.path).unwrap();
        assert_eq!(matched["page"], "0");
        assert_eq!(matched["flag"], "false");
    }

    #[test]
    fn test_resolve_always_has_leading_slash() {
        let resolved = PathTemplate::parse("excuses/:id")
            .resolve(&object(json!({ "id": "1" })))
            .unwrap();
        assert_eq!(resolved.path, "/excuses/1");

        let resolved = PathTemplate::parse("").resolve(&Map::new()).unwrap();
        assert_eq!(resolved.path, "/");

        let resolved = PathTemplate::parse("/").resolve(&Map::new()).unwrap();
        assert_eq!(resolved.path, "/");
    }

    #[test]
    fn test_resolve_returns_leftovers_in_input_order() {
        let template = PathTemplate::parse("/excuses/:id");
        let resolved = template
            .resolve(&object(json!({ "z": 1, "id": "x", "a": 2 })))
            .unwrap();
        let keys: Vec<_> = resolved.leftover.keys().cloned().collect();
        assert_eq!(keys, vec!["z", "a"]);
    }

    #[test]
    fn test_resolve_rejects_structured_path_values() {
        let template = PathTemplate::parse("/excuses/:id");
        let err = template
            .resolve(&object(json!({ "id": ["a"] })))
            .unwrap_err();
        assert!(matches!(err, ResolveError::UnsupportedPathValue { ref name } if name == "id"));
    }

    #[test]
    fn test_match_path_extracts_and_decodes() {
        let template = PathTemplate::parse("/excuses/:id/");
        let params = template.match_path("/excuses/a%20b/").unwrap();
        assert_eq!(params.get("id"), Some(&json!("a b")));
    }

    #[test]
    fn test_match_path_ignores_trailing_slash() {
        let template = PathTemplate::parse("/excuses/");
        assert!(template.match_path("/excuses").is_some());
        assert!(template.match_path("/excuses/").is_some());
        assert!(template.match_path("/excuses/1").is_none());
    }

    #[test]
    fn test_match_path_root() {
        let template = PathTemplate::parse("/");
        assert!(template.match_path("/").is_some());
        assert!(template.match_path("/x").is_none());
    }

    #[test]
    fn test_match_path_optional_parameter() {
        let template = PathTemplate::parse("/users/:id?/posts");
        let with_id = template.match_path("/users/7/posts").unwrap();
        assert_eq!(with_id.get("id"), Some(&json!("7")));

        let without_id = template.match_path("/users/posts").unwrap();
        assert!(without_id.is_empty());
    }

    #[test]
    fn test_match_path_rejects_literal_mismatch_and_empty_params() {
        let template = PathTemplate::parse("/excuses/:id");
        assert!(template.match_path("/reasons/1").is_none());
        assert!(template.match_path("/excuses//").is_none());
        assert!(template.match_path("/excuses/1/extra").is_none());
    }

    #[test]
    fn test_encode_query_booleans() {
        let params = object(json!({ "yes": true, "no": false }));
        assert_eq!(encode_query(&params), "yes=true&no=");
    }

    #[test]
    fn test_encode_query_encodes_keys_and_values() {
        let params = object(json!({ "a key": "a&b=c" }));
        assert_eq!(encode_query(&params), "a%20key=a%26b%3Dc");
    }

    #[test]
    fn test_encode_query_null_array_elements_are_empty() {
        let params = object(json!({ "x": ["1", null, 2] }));
        assert_eq!(encode_query(&params), "x=1&x=&x=2");
    }

    #[test]
    fn test_append_query_separator() {
        let params = object(json!({ "quality": "Poor" }));
        assert_eq!(append_query("/excuses/", &params), "/excuses/?quality=Poor");
        assert_eq!(
            append_query("/excuses/?page=1", &params),
            "/excuses/?page=1&quality=Poor"
        );
        assert_eq!(append_query("/excuses/", &Map::new()), "/excuses/");
    }

    #[test]
    fn test_parse_query_groups_repeated_keys() {
        let params = parse_query("tag=a&quality=Poor&tag=b&tag=c").unwrap();
        assert_eq!(params.get("quality"), Some(&json!("Poor")));
        assert_eq!(params.get("tag"), Some(&json!(["a", "b", "c"])));
    }

    #[test]
    fn test_parse_query_decodes() {
        let params = parse_query("a%20key=a%26b%3Dc&plus=x+y").unwrap();
        assert_eq!(params.get("a key"), Some(&json!("a&b=c")));
        assert_eq!(params.get("plus"), Some(&json!("x y")));
    }

    fn segment_text() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9]{0,6}"
    }

    fn param_value() -> impl Strategy<Value = String> {
        "[ -~]{1,12}"
    }

    proptest! {
        #[test]
        fn prop_resolve_then_match_recovers_values(
            literals in proptest::collection::vec(segment_text(), 1..4),
            values in proptest::collection::vec(param_value(), 0..4),
        ) {
            let mut raw = String::new();
            let mut params = Map::new();
            for (index, literal) in literals.iter().enumerate() {
                raw.push('/');
                raw.push_str(literal);
                if let Some(value) = values.get(index) {
                    let name = format!("p{index}");
                    raw.push_str("/:");
                    raw.push_str(&name);
                    params.insert(name, Value::String(value.clone()));
                }
            }

            let template = PathTemplate::parse(&raw);
            let resolved = template.resolve(&params).unwrap();
            prop_assert!(resolved.leftover.is_empty());
            prop_assert!(resolved.path.starts_with('/'));

            let matched = template.match_path(&resolved.path).unwrap();
            prop_assert_eq!(matched, params);
        }

        #[test]
        fn prop_extra_keys_survive_as_leftovers(
            id in param_value(),
            extra in "[a-z]{3,8}",
            extra_value in param_value(),
        ) {
            prop_assume!(extra != "id");
            let template = PathTemplate::parse("/things/:id");
            let mut params = Map::new();
            params.insert("id".into(), Value::String(id));
            params.insert(extra.clone(), Value::String(extra_value.clone()));

            let resolved = template.resolve(&params).unwrap();
            prop_assert_eq!(resolved.leftover.len(), 1);
            prop_assert_eq!(resolved.leftover.get(&extra), Some(&Value::String(extra_value)));
        }

        #[test]
        fn prop_array_query_emits_one_pair_per_element(
            items in proptest::collection::vec("[a-z0-9]{0,5}", 0..6),
        ) {
            let mut params = Map::new();
            params.insert("k".into(), Value::Array(items.iter().cloned().map(Value::String).collect()));
            let query = encode_query(&params);

            let expected: Vec<String> = items.iter().map(|item| format!("k={item}")).collect();
            prop_assert_eq!(query, expected.join("&"));
        }
    }
}

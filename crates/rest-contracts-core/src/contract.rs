//! The contract model.
//!
//! An [`ApiDescriptor`] is the immutable description of one endpoint. Its
//! type parameters record which parameter kinds it takes (the *shape*) and
//! how its result is encoded (the *result kind*). Both client and server
//! read the same descriptor, so neither side restates the contract.
//!
//! # Shapes
//!
//! | Shape | Declared with | Client arguments | Server `params` / `body` |
//! |-------|---------------|------------------|--------------------------|
//! | [`NoParams`] | nothing | `()` | `()` / `()` |
//! | [`PathOnly`] | `path_parameters` | `&P` | `P` / `()` |
//! | [`QueryOnly`] | `query_parameters` | `&Q` | `Q` / `()` |
//! | [`PathAndQuery`] | both | `(&P, &Q)` | `(P, Q)` / `()` |
//! | [`BodyOnly`] | `body` | `&B` | `()` / `B` |
//! | [`PathAndBody`] | `path_parameters` + `body` | `(&P, &B)` | `P` / `B` |
//!
//! The six shapes collapse into the four [`CallShape`]s a client call can
//! take.

use std::fmt;
use std::marker::PhantomData;
use std::panic::Location;
use std::sync::Arc;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ResolveError;
use crate::handler::ResponseBody;
use crate::method::{BodyMethod, Method, MethodKind, QueryMethod};
use crate::resolve::PathTemplate;
use crate::serde_helpers;

/// Bound shared by every parameter, body and result type.
///
/// Implemented for all types that are serializable both ways and
/// thread-safe; there is nothing to implement by hand.
pub trait Parameters: Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> Parameters for T where T: Serialize + DeserializeOwned + Send + Sync + 'static {}

/// Runtime tag naming a descriptor's shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeTag {
    /// No parameters of any kind.
    NoParams,
    /// Path parameters only.
    PathOnly,
    /// Query parameters only.
    QueryOnly,
    /// Path and query parameters.
    PathAndQuery,
    /// Body only.
    BodyOnly,
    /// Path parameters and a body.
    PathAndBody,
}

/// The four call signatures a request function can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallShape {
    /// Called with no arguments.
    NoParams,
    /// Called with path parameters.
    PathOnly,
    /// Called with query parameters, optionally alongside path parameters.
    QueryOrPathAndQuery,
    /// Called with a body, optionally preceded by path parameters.
    Body,
}

impl ShapeTag {
    /// Whether a path-parameter type was declared.
    #[must_use]
    pub const fn has_path_shape(self) -> bool {
        matches!(self, Self::PathOnly | Self::PathAndQuery | Self::PathAndBody)
    }

    /// Whether a query-parameter type was declared.
    #[must_use]
    pub const fn has_query_shape(self) -> bool {
        matches!(self, Self::QueryOnly | Self::PathAndQuery)
    }

    /// Whether a body type was declared.
    #[must_use]
    pub const fn has_body_shape(self) -> bool {
        matches!(self, Self::BodyOnly | Self::PathAndBody)
    }

    /// Collapses the shape into its call signature.
    #[must_use]
    pub const fn call_shape(self) -> CallShape {
        match self {
            Self::NoParams => CallShape::NoParams,
            Self::PathOnly => CallShape::PathOnly,
            Self::QueryOnly | Self::PathAndQuery => CallShape::QueryOrPathAndQuery,
            Self::BodyOnly | Self::PathAndBody => CallShape::Body,
        }
    }
}

/// Call arguments split into their wire destinations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallParts {
    /// Values for path segments.
    pub path: Map<String, Value>,
    /// Values for the query string.
    pub query: Map<String, Value>,
    /// Request payload.
    pub body: Option<Value>,
}

/// A parameter shape, fixing the call signature on both sides of the wire.
pub trait Shape: Send + Sync + 'static {
    /// Type-level method.
    type Method: MethodKind;

    /// Client call arguments.
    type Args<'a>;

    /// Typed parameters handed to server handlers.
    type Params: Send + 'static;

    /// Typed body handed to server handlers.
    type Body: Send + 'static;

    /// Runtime tag.
    const TAG: ShapeTag;

    /// Serializes client call arguments.
    fn into_parts(args: Self::Args<'_>) -> Result<CallParts, ResolveError>;

    /// Deserializes typed parameters from the merged parameter object.
    fn extract_params(merged: &Map<String, Value>) -> Result<Self::Params, serde_json::Error>;

    /// Deserializes the typed body from the parsed request payload.
    fn extract_body(body: Option<&Value>) -> Result<Self::Body, serde_json::Error>;
}

fn to_object<T: Serialize>(value: &T, kind: &'static str) -> Result<Map<String, Value>, ResolveError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(ResolveError::NotAnObject {
            kind,
            found: json_type(&other),
        }),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn from_merged<T: DeserializeOwned>(merged: &Map<String, Value>) -> Result<T, serde_json::Error> {
    // Path and query values arrive as text.
    serde_helpers::from_params(merged)
}

fn from_body<T: DeserializeOwned>(body: Option<&Value>) -> Result<T, serde_json::Error> {
    serde_json::from_value(body.cloned().unwrap_or(Value::Null))
}

macro_rules! shape_marker {
    ($(#[$doc:meta])* $name:ident<$($param:ident),+>) => {
        $(#[$doc])*
        pub struct $name<$($param),+>(PhantomData<fn() -> ($($param,)+)>);

        impl<$($param),+> fmt::Debug for $name<$($param),+> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(stringify!($name))
            }
        }
    };
}

shape_marker!(
    /// Shape with no parameters.
    NoParams<M>
);
shape_marker!(
    /// Shape with path parameters `P`.
    PathOnly<M, P>
);
shape_marker!(
    /// Shape with query parameters `Q`.
    QueryOnly<M, Q>
);
shape_marker!(
    /// Shape with path parameters `P` and query parameters `Q`.
    PathAndQuery<M, P, Q>
);
shape_marker!(
    /// Shape with body `B`.
    BodyOnly<M, B>
);
shape_marker!(
    /// Shape with path parameters `P` and body `B`.
    PathAndBody<M, P, B>
);

impl<M: MethodKind> Shape for NoParams<M> {
    type Method = M;
    type Args<'a> = ();
    type Params = ();
    type Body = ();
    const TAG: ShapeTag = ShapeTag::NoParams;

    fn into_parts((): ()) -> Result<CallParts, ResolveError> {
        Ok(CallParts::default())
    }

    fn extract_params(_merged: &Map<String, Value>) -> Result<(), serde_json::Error> {
        Ok(())
    }

    fn extract_body(_body: Option<&Value>) -> Result<(), serde_json::Error> {
        Ok(())
    }
}

impl<M: MethodKind, P: Parameters> Shape for PathOnly<M, P> {
    type Method = M;
    type Args<'a> = &'a P;
    type Params = P;
    type Body = ();
    const TAG: ShapeTag = ShapeTag::PathOnly;

    fn into_parts(path: &P) -> Result<CallParts, ResolveError> {
        Ok(CallParts {
            path: to_object(path, "path parameters")?,
            ..CallParts::default()
        })
    }

    fn extract_params(merged: &Map<String, Value>) -> Result<P, serde_json::Error> {
        from_merged(merged)
    }

    fn extract_body(_body: Option<&Value>) -> Result<(), serde_json::Error> {
        Ok(())
    }
}

impl<M: QueryMethod, Q: Parameters> Shape for QueryOnly<M, Q> {
    type Method = M;
    type Args<'a> = &'a Q;
    type Params = Q;
    type Body = ();
    const TAG: ShapeTag = ShapeTag::QueryOnly;

    fn into_parts(query: &Q) -> Result<CallParts, ResolveError> {
        Ok(CallParts {
            query: to_object(query, "query parameters")?,
            ..CallParts::default()
        })
    }

    fn extract_params(merged: &Map<String, Value>) -> Result<Q, serde_json::Error> {
        from_merged(merged)
    }

    fn extract_body(_body: Option<&Value>) -> Result<(), serde_json::Error> {
        Ok(())
    }
}

impl<M: QueryMethod, P: Parameters, Q: Parameters> Shape for PathAndQuery<M, P, Q> {
    type Method = M;
    type Args<'a> = (&'a P, &'a Q);
    type Params = (P, Q);
    type Body = ();
    const TAG: ShapeTag = ShapeTag::PathAndQuery;

    fn into_parts((path, query): (&P, &Q)) -> Result<CallParts, ResolveError> {
        Ok(CallParts {
            path: to_object(path, "path parameters")?,
            query: to_object(query, "query parameters")?,
            body: None,
        })
    }

    fn extract_params(merged: &Map<String, Value>) -> Result<(P, Q), serde_json::Error> {
        Ok((from_merged(merged)?, from_merged(merged)?))
    }

    fn extract_body(_body: Option<&Value>) -> Result<(), serde_json::Error> {
        Ok(())
    }
}

impl<M: BodyMethod, B: Parameters> Shape for BodyOnly<M, B> {
    type Method = M;
    type Args<'a> = &'a B;
    type Params = ();
    type Body = B;
    const TAG: ShapeTag = ShapeTag::BodyOnly;

    fn into_parts(body: &B) -> Result<CallParts, ResolveError> {
        Ok(CallParts {
            body: Some(serde_json::to_value(body)?),
            ..CallParts::default()
        })
    }

    fn extract_params(_merged: &Map<String, Value>) -> Result<(), serde_json::Error> {
        Ok(())
    }

    fn extract_body(body: Option<&Value>) -> Result<B, serde_json::Error> {
        from_body(body)
    }
}

impl<M: BodyMethod, P: Parameters, B: Parameters> Shape for PathAndBody<M, P, B> {
    type Method = M;
    type Args<'a> = (&'a P, &'a B);
    type Params = P;
    type Body = B;
    const TAG: ShapeTag = ShapeTag::PathAndBody;

    fn into_parts((path, body): (&P, &B)) -> Result<CallParts, ResolveError> {
        Ok(CallParts {
            path: to_object(path, "path parameters")?,
            query: Map::new(),
            body: Some(serde_json::to_value(body)?),
        })
    }

    fn extract_params(merged: &Map<String, Value>) -> Result<P, serde_json::Error> {
        from_merged(merged)
    }

    fn extract_body(body: Option<&Value>) -> Result<B, serde_json::Error> {
        from_body(body)
    }
}

/// How a successful result travels over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultEncoding {
    /// JSON-encoded.
    Json,
    /// A string sent verbatim or binary data passed through.
    Raw,
}

/// A raw result payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawBody {
    /// Text, sent verbatim.
    Text(String),
    /// Binary data; base64-encoded where the host protocol needs it.
    Binary(Bytes),
}

impl From<String> for RawBody {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for RawBody {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Vec<u8>> for RawBody {
    fn from(data: Vec<u8>) -> Self {
        Self::Binary(Bytes::from(data))
    }
}

impl From<Bytes> for RawBody {
    fn from(data: Bytes) -> Self {
        Self::Binary(data)
    }
}

/// How a result type is encoded by servers and decoded by clients.
pub trait ResultKind: Send + Sync + 'static {
    /// The value handlers return and clients receive.
    type Output: Send + 'static;

    /// Wire encoding.
    const ENCODING: ResultEncoding;

    /// Encodes a handler's value.
    fn encode(value: Self::Output) -> Result<ResponseBody, serde_json::Error>;

    /// Decodes a successful response body.
    fn decode(body: Bytes, content_type: Option<&str>) -> Result<Self::Output, serde_json::Error>;
}

/// JSON-encoded result of type `T`.
pub struct Json<T>(PhantomData<fn() -> T>);

/// No result.
#[derive(Debug)]
pub struct Void;

/// Raw string or binary result.
#[derive(Debug)]
pub struct Raw;

impl<T> fmt::Debug for Json<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Json")
    }
}

impl<T: Parameters> ResultKind for Json<T> {
    type Output = T;
    const ENCODING: ResultEncoding = ResultEncoding::Json;

    fn encode(value: T) -> Result<ResponseBody, serde_json::Error> {
        Ok(ResponseBody::Json(Bytes::from(serde_json::to_vec(&value)?)))
    }

    fn decode(body: Bytes, _content_type: Option<&str>) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&body)
    }
}

impl ResultKind for Void {
    type Output = ();
    const ENCODING: ResultEncoding = ResultEncoding::Json;

    fn encode((): ()) -> Result<ResponseBody, serde_json::Error> {
        Ok(ResponseBody::Empty)
    }

    fn decode(_body: Bytes, _content_type: Option<&str>) -> Result<(), serde_json::Error> {
        Ok(())
    }
}

impl ResultKind for Raw {
    type Output = RawBody;
    const ENCODING: ResultEncoding = ResultEncoding::Raw;

    fn encode(value: RawBody) -> Result<ResponseBody, serde_json::Error> {
        Ok(match value {
            RawBody::Text(text) => ResponseBody::Text(text),
            RawBody::Binary(data) => ResponseBody::Binary(data),
        })
    }

    fn decode(body: Bytes, content_type: Option<&str>) -> Result<RawBody, serde_json::Error> {
        let textual = content_type.map_or(true, is_textual);
        if textual {
            if let Ok(text) = std::str::from_utf8(&body) {
                return Ok(RawBody::Text(text.to_string()));
            }
        }
        Ok(RawBody::Binary(body))
    }
}

fn is_textual(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence.starts_with("text/")
        || essence.ends_with("json")
        || essence.ends_with("xml")
        || essence.ends_with("javascript")
}

/// Untyped facts about a descriptor, shared by every adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiSpec {
    method: Method,
    template: PathTemplate,
    shape: ShapeTag,
    encoding: ResultEncoding,
    content_type: Option<String>,
    origin: &'static Location<'static>,
}

impl ApiSpec {
    pub(crate) fn new(
        method: Method,
        template: PathTemplate,
        shape: ShapeTag,
        encoding: ResultEncoding,
        content_type: Option<String>,
        origin: &'static Location<'static>,
    ) -> Self {
        Self {
            method,
            template,
            shape,
            encoding,
            content_type,
            origin,
        }
    }

    /// HTTP method.
    #[must_use]
    pub fn method(&self) -> Method {
        self.method
    }

    /// Path template as declared.
    #[must_use]
    pub fn path(&self) -> &str {
        self.template.as_str()
    }

    /// Parsed path template.
    #[must_use]
    pub fn template(&self) -> &PathTemplate {
        &self.template
    }

    /// Shape tag.
    #[must_use]
    pub fn shape(&self) -> ShapeTag {
        self.shape
    }

    /// Result encoding.
    #[must_use]
    pub fn encoding(&self) -> ResultEncoding {
        self.encoding
    }

    /// Declared content type for raw results.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Where the descriptor was declared.
    #[must_use]
    pub fn origin(&self) -> &'static Location<'static> {
        self.origin
    }

    /// Whether the descriptor declares query parameters.
    #[must_use]
    pub fn has_query_parameters(&self) -> bool {
        self.shape.has_query_shape()
    }

    /// Whether the descriptor declares a body.
    #[must_use]
    pub fn has_body(&self) -> bool {
        self.shape.has_body_shape()
    }

    /// Whether the descriptor declares path parameters and the template
    /// has at least one parameter segment to put them in.
    #[must_use]
    pub fn has_path_parameters(&self) -> bool {
        self.shape.has_path_shape() && self.template.has_params()
    }

    /// Whether the method may carry query parameters.
    #[must_use]
    pub fn is_query_parameter_api(&self) -> bool {
        self.method.is_query_bearing()
    }

    /// Whether the method may carry a body.
    #[must_use]
    pub fn is_body_parameter_api(&self) -> bool {
        self.method.is_body_bearing()
    }
}

impl fmt::Display for ApiSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path())
    }
}

/// An immutable, typed endpoint description.
///
/// Cloning is cheap; clones share the same [`ApiSpec`].
pub struct ApiDescriptor<S, K> {
    spec: Arc<ApiSpec>,
    _marker: PhantomData<fn() -> (S, K)>,
}

impl<S: Shape, K: ResultKind> ApiDescriptor<S, K> {
    pub(crate) fn new(spec: ApiSpec) -> Self {
        Self {
            spec: Arc::new(spec),
            _marker: PhantomData,
        }
    }
}

impl<S, K> ApiDescriptor<S, K> {
    /// Untyped facts about this descriptor.
    #[must_use]
    pub fn spec(&self) -> &ApiSpec {
        &self.spec
    }

    /// Shared handle to the untyped facts.
    #[must_use]
    pub fn shared_spec(&self) -> Arc<ApiSpec> {
        Arc::clone(&self.spec)
    }

    /// HTTP method.
    #[must_use]
    pub fn method(&self) -> Method {
        self.spec.method()
    }

    /// Path template as declared.
    #[must_use]
    pub fn path(&self) -> &str {
        self.spec.path()
    }

    /// See [`ApiSpec::has_query_parameters`].
    #[must_use]
    pub fn has_query_parameters(&self) -> bool {
        self.spec.has_query_parameters()
    }

    /// See [`ApiSpec::has_body`].
    #[must_use]
    pub fn has_body(&self) -> bool {
        self.spec.has_body()
    }

    /// See [`ApiSpec::has_path_parameters`].
    #[must_use]
    pub fn has_path_parameters(&self) -> bool {
        self.spec.has_path_parameters()
    }
}

impl<S, K> Clone for ApiDescriptor<S, K> {
    fn clone(&self) -> Self {
        Self {
            spec: Arc::clone(&self.spec),
            _marker: PhantomData,
        }
    }
}

impl<S, K> fmt::Debug for ApiDescriptor<S, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiDescriptor")
            .field("method", &self.spec.method)
            .field("path", &self.spec.path())
            .field("shape", &self.spec.shape)
            .field("encoding", &self.spec.encoding)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::{Get, Post};
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Id {
        id: String,
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Search {
        quality: Option<String>,
    }

    #[test]
    fn test_call_shapes_cover_all_tags() {
        assert_eq!(ShapeTag::NoParams.call_shape(), CallShape::NoParams);
        assert_eq!(ShapeTag::PathOnly.call_shape(), CallShape::PathOnly);
        assert_eq!(ShapeTag::QueryOnly.call_shape(), CallShape::QueryOrPathAndQuery);
        assert_eq!(ShapeTag::PathAndQuery.call_shape(), CallShape::QueryOrPathAndQuery);
        assert_eq!(ShapeTag::BodyOnly.call_shape(), CallShape::Body);
        assert_eq!(ShapeTag::PathAndBody.call_shape(), CallShape::Body);
    }

    #[test]
    fn test_query_and_body_shapes_are_exclusive() {
        for tag in [
            ShapeTag::NoParams,
            ShapeTag::PathOnly,
            ShapeTag::QueryOnly,
            ShapeTag::PathAndQuery,
            ShapeTag::BodyOnly,
            ShapeTag::PathAndBody,
        ] {
            assert!(!(tag.has_query_shape() && tag.has_body_shape()), "{tag:?}");
        }
    }

    #[test]
    fn test_path_and_query_parts_keep_sources_apart() {
        let parts = PathAndQuery::<Get, Id, Search>::into_parts((
            &Id { id: "7".into() },
            &Search {
                quality: Some("lame".into()),
            },
        ))
        .unwrap();
        assert_eq!(parts.path.get("id"), Some(&json!("7")));
        assert_eq!(parts.query.get("quality"), Some(&json!("lame")));
        assert!(parts.body.is_none());
    }

    #[test]
    fn test_body_parts_keep_body_whole() {
        let parts = PathAndBody::<Post, Id, Vec<u32>>::into_parts((&Id { id: "1".into() }, &vec![1, 2]))
            .unwrap();
        assert_eq!(parts.body, Some(json!([1, 2])));
    }

    #[test]
    fn test_non_object_parameters_are_rejected() {
        let err = QueryOnly::<Get, Vec<String>>::into_parts(&vec!["a".to_string()]).unwrap_err();
        assert!(matches!(err, ResolveError::NotAnObject { found: "an array", .. }));
    }

    #[test]
    fn test_extract_params_from_merged_object() {
        let merged = json!({ "id": "7", "quality": "iffy", "extra": 1 });
        let (id, search) =
            PathAndQuery::<Get, Id, Search>::extract_params(merged.as_object().unwrap()).unwrap();
        assert_eq!(id.id, "7");
        assert_eq!(search.quality.as_deref(), Some("iffy"));
    }

    #[test]
    fn test_extract_missing_body_as_null() {
        let body: Option<u32> = BodyOnly::<Post, Option<u32>>::extract_body(None).unwrap();
        assert_eq!(body, None);
        assert!(BodyOnly::<Post, Id>::extract_body(None).is_err());
    }

    #[test]
    fn test_raw_decode_respects_content_type() {
        let text = Raw::decode(Bytes::from_static(b"a,b"), Some("text/csv; charset=utf-8")).unwrap();
        assert_eq!(text, RawBody::Text("a,b".into()));

        let binary = Raw::decode(Bytes::from_static(b"abc"), Some("application/octet-stream")).unwrap();
        assert_eq!(binary, RawBody::Binary(Bytes::from_static(b"abc")));

        let invalid_utf8 = Raw::decode(Bytes::from_static(&[0xff, 0xfe]), None).unwrap();
        assert!(matches!(invalid_utf8, RawBody::Binary(_)));
    }

    #[test]
    fn test_void_ignores_body() {
        assert!(Void::decode(Bytes::from_static(b"not json"), None).is_ok());
        assert_eq!(Void::encode(()).unwrap(), ResponseBody::Empty);
    }

    #[test]
    fn test_json_round_trip_through_response_body() {
        let ResponseBody::Json(bytes) = Json::<Id>::encode(Id { id: "x".into() }).unwrap() else {
            panic!("expected JSON body");
        };
        let decoded = Json::<Id>::decode(bytes, Some("application/json")).unwrap();
        assert_eq!(decoded, Id { id: "x".into() });
    }
}

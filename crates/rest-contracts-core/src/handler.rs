//! The request pipeline shared by server adapters.
//!
//! An [`Endpoint`] binds a descriptor to a typed handler and erases both
//! behind a single function from [`RawRequest`] to [`ApiResponse`]. Host
//! adapters only translate their native request into a `RawRequest` and
//! the resulting `ApiResponse` back out.
//!
//! Per request the pipeline runs:
//!
//! 1. **Extract** - parse the body, merge path > query > body into one
//!    object, deserialize the typed parameters and body
//! 2. **Invoke** - await the handler
//! 3. **Status** - `PUT` gives 201, `GET`/`DELETE` without a value give 404,
//!    everything else 200, unless the handler chose a status
//! 4. **Encode** - JSON, verbatim text or binary per the result kind
//!
//! Failures in any step come back as an [`ApiError`] so the adapter can
//! apply its error policy.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, StatusCode};
use serde_json::{Map, Value};

use crate::contract::{ApiDescriptor, ApiSpec, ResultKind, Shape};
use crate::context::RequestContext;
use crate::error::ApiError;
use crate::method::Method;

/// A request as seen by a typed handler.
pub struct ApiRequest<S: Shape> {
    /// Typed parameters, deserialized from the merged parameter object.
    pub params: S::Params,
    /// Typed body for body-bearing shapes, `()` otherwise.
    pub body: S::Body,
    /// Merged parameter object (path > query > body).
    pub all_params: Map<String, Value>,
    /// Method, URI, headers and request ID.
    pub context: RequestContext,
}

/// A handler's successful outcome.
///
/// Carries the value (or none), an optional status override and extra
/// response headers.
///
/// # Example
///
/// ```
/// use rest_contracts_core::Reply;
/// use http::StatusCode;
///
/// let reply = Reply::ok("stored").with_status(StatusCode::ACCEPTED);
/// assert_eq!(reply.status(), Some(StatusCode::ACCEPTED));
///
/// let missing: Reply<String> = None.into();
/// assert!(missing.value().is_none());
/// ```
#[derive(Debug, Clone)]
pub struct Reply<T> {
    value: Option<T>,
    status: Option<StatusCode>,
    headers: HeaderMap,
}

impl<T> Reply<T> {
    /// A reply carrying `value`.
    pub fn ok(value: T) -> Self {
        Self {
            value: Some(value),
            status: None,
            headers: HeaderMap::new(),
        }
    }

    /// A reply carrying nothing.
    pub fn none() -> Self {
        Self {
            value: None,
            status: None,
            headers: HeaderMap::new(),
        }
    }

    /// Overrides the status the pipeline would pick.
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    /// Adds a response header. Adding a name again keeps every value.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Returns the value, if any.
    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Returns the status override, if any.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Returns the extra headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

impl<T> From<Option<T>> for Reply<T> {
    fn from(value: Option<T>) -> Self {
        Self {
            value,
            status: None,
            headers: HeaderMap::new(),
        }
    }
}

/// An encoded response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseBody {
    /// No body.
    Empty,
    /// JSON bytes.
    Json(Bytes),
    /// Text sent verbatim.
    Text(String),
    /// Binary data.
    Binary(Bytes),
}

impl ResponseBody {
    /// Returns `true` for [`ResponseBody::Empty`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Returns the raw bytes.
    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        match self {
            Self::Empty => Bytes::new(),
            Self::Json(bytes) | Self::Binary(bytes) => bytes,
            Self::Text(text) => Bytes::from(text),
        }
    }
}

/// A request translated out of the host's native representation.
#[derive(Debug)]
pub struct RawRequest {
    /// Decoded path parameters.
    pub path_params: Map<String, Value>,
    /// Decoded query parameters.
    pub query: Map<String, Value>,
    /// Unparsed body.
    pub body: Bytes,
    /// Method, URI, headers and request ID.
    pub context: RequestContext,
}

/// An adapter-neutral response.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    /// Status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Encoded body.
    pub body: ResponseBody,
}

impl ApiResponse {
    /// Converts into an `http` response.
    #[must_use]
    pub fn into_http(self) -> http::Response<Bytes> {
        let mut response = http::Response::new(self.body.into_bytes());
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// Boxed future produced by an erased handler.
pub type BoxedResponse = Pin<Box<dyn Future<Output = Result<ApiResponse, ApiError>> + Send>>;

/// A type-erased handler function.
pub type ErasedHandler = Arc<dyn Fn(RawRequest) -> BoxedResponse + Send + Sync>;

/// Status for a successful handler outcome when the handler chose none.
#[must_use]
pub fn status_for(method: Method, has_value: bool) -> StatusCode {
    match method {
        Method::Put => StatusCode::CREATED,
        Method::Get | Method::Delete if !has_value => StatusCode::NOT_FOUND,
        _ => StatusCode::OK,
    }
}

/// Merges parameter sources.
///
/// On a key collision path parameters win over query parameters, which win
/// over body fields. Only object bodies contribute fields.
#[must_use]
pub fn merge_params(
    path: Map<String, Value>,
    query: Map<String, Value>,
    body: Option<&Value>,
) -> Map<String, Value> {
    let mut merged = path;
    for (key, value) in query {
        merged.entry(key).or_insert(value);
    }
    if let Some(Value::Object(fields)) = body {
        for (key, value) in fields {
            merged.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }
    merged
}

fn parse_body(body: &Bytes) -> Result<Option<Value>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map(Some)
        .map_err(|err| ApiError::bad_request(format!("Invalid JSON body: {err}")))
}

fn default_content_type(spec: &ApiSpec, body: &ResponseBody) -> Option<HeaderValue> {
    if let Some(declared) = spec.content_type() {
        if let Ok(value) = HeaderValue::from_str(declared) {
            return Some(value);
        }
        tracing::warn!(content_type = %declared, api = %spec, "Ignoring invalid content type");
    }
    match body {
        ResponseBody::Empty => None,
        ResponseBody::Json(_) => Some(HeaderValue::from_static("application/json")),
        ResponseBody::Text(_) => Some(HeaderValue::from_static("text/plain; charset=utf-8")),
        ResponseBody::Binary(_) => Some(HeaderValue::from_static("application/octet-stream")),
    }
}

/// A descriptor bound to its handler.
#[derive(Clone)]
pub struct Endpoint {
    spec: Arc<ApiSpec>,
    handler: ErasedHandler,
}

impl Endpoint {
    /// Binds `handler` to `descriptor`.
    ///
    /// # Example
    ///
    /// ```
    /// use rest_contracts_core::{Api, ApiRequest, Endpoint, Reply, PathOnly, Get};
    /// use serde::{Deserialize, Serialize};
    ///
    /// #[derive(Serialize, Deserialize)]
    /// struct Id {
    ///     id: String,
    /// }
    ///
    /// let api = Api::get()
    ///     .path_parameters::<Id>()
    ///     .returns::<String>()
    ///     .path("/doc/endpoint/:id")
    ///     .unwrap();
    ///
    /// let endpoint = Endpoint::new(&api, |request: ApiRequest<PathOnly<Get, Id>>| async move {
    ///     Ok(Reply::ok(format!("excuse {}", request.params.id)))
    /// });
    /// assert_eq!(endpoint.spec().path(), "/doc/endpoint/:id");
    /// ```
    pub fn new<S, K, F, Fut>(descriptor: &ApiDescriptor<S, K>, handler: F) -> Self
    where
        S: Shape,
        K: ResultKind,
        F: Fn(ApiRequest<S>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Reply<K::Output>, ApiError>> + Send + 'static,
    {
        let spec = descriptor.shared_spec();
        let handler = Arc::new(handler);
        let pipeline_spec = Arc::clone(&spec);

        let erased: ErasedHandler = Arc::new(move |raw: RawRequest| -> BoxedResponse {
            let handler = Arc::clone(&handler);
            let spec = Arc::clone(&pipeline_spec);
            Box::pin(async move {
                let RawRequest {
                    path_params,
                    query,
                    body,
                    context,
                } = raw;

                let body_value = if spec.is_body_parameter_api() {
                    parse_body(&body)?
                } else {
                    None
                };
                let all_params = merge_params(path_params, query, body_value.as_ref());

                let params = S::extract_params(&all_params)
                    .map_err(|err| ApiError::bad_request(format!("Invalid parameters: {err}")))?;
                let body = S::extract_body(body_value.as_ref())
                    .map_err(|err| ApiError::bad_request(format!("Invalid request body: {err}")))?;

                let reply = handler(ApiRequest {
                    params,
                    body,
                    all_params,
                    context,
                })
                .await?;

                let status = reply
                    .status
                    .unwrap_or_else(|| status_for(spec.method(), reply.value.is_some()));
                let body = match reply.value {
                    Some(value) => K::encode(value).map_err(|err| {
                        ApiError::internal(format!("Failed to serialize response: {err}"))
                    })?,
                    None => ResponseBody::Empty,
                };

                let mut headers = reply.headers;
                if !headers.contains_key(CONTENT_TYPE) {
                    if let Some(content_type) = default_content_type(&spec, &body) {
                        headers.insert(CONTENT_TYPE, content_type);
                    }
                }

                Ok(ApiResponse {
                    status,
                    headers,
                    body,
                })
            })
        });

        Self {
            spec,
            handler: erased,
        }
    }

    /// Untyped facts about the bound descriptor.
    #[must_use]
    pub fn spec(&self) -> &ApiSpec {
        &self.spec
    }

    /// Runs the pipeline for one request.
    ///
    /// ```
    /// use rest_contracts_core::{Api, ApiRequest, Endpoint, Get, Method, NoParams, RawRequest, Reply, RequestContext};
    ///
    /// let api = Api::get().returns::<u32>().path("/doc/endpoint-call").unwrap();
    /// let endpoint = Endpoint::new(&api, |_request: ApiRequest<NoParams<Get>>| async move {
    ///     Ok(Reply::ok(7))
    /// });
    ///
    /// let response = tokio_test::block_on(endpoint.call(RawRequest {
    ///     path_params: Default::default(),
    ///     query: Default::default(),
    ///     body: Default::default(),
    ///     context: RequestContext::mock(Method::Get, "/doc/endpoint-call"),
    /// }))
    /// .unwrap();
    /// assert_eq!(response.status, http::StatusCode::OK);
    /// ```
    pub fn call(&self, request: RawRequest) -> BoxedResponse {
        (self.handler)(request)
    }
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint").field("api", &self.spec.to_string()).finish()
    }
}

//! Gateway handler.
//!
//! One [`GatewayHandler`] serves one descriptor, the way a gateway routes
//! each method and path to its own function. The request pipeline itself is
//! the [`Endpoint`] shared with the self-hosted server, so status codes,
//! parameter merging and error bodies are identical on both hosts.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode, Uri};
use rest_contracts_core::{
    ApiDescriptor, ApiError, ApiRequest, ApiResponse, ApiSpec, Endpoint, Method, RawRequest, Reply,
    ResponseBody, ResultKind, Shape,
};
use serde_json::{Map, Value};

use crate::cors::{CorsOrigins, ALLOW_ORIGIN};
use crate::error::GatewayError;
use crate::event::{GatewayEvent, GatewayResponse};

/// Turns a handler error into the gateway response.
pub type ErrorHandler = Arc<dyn Fn(&ApiError) -> GatewayResponse + Send + Sync>;

/// Per-handler response options.
#[derive(Clone, Default)]
pub struct GatewayOptions {
    /// Allowed origins; `None` sends no CORS header.
    pub cors: Option<CorsOrigins>,
    /// Headers added to every response unless the handler sets them.
    pub default_headers: BTreeMap<String, String>,
    /// Replaces the standard error response.
    pub error_handler: Option<ErrorHandler>,
}

impl GatewayOptions {
    /// Creates empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the allowed origins.
    #[must_use]
    pub fn with_cors(mut self, cors: CorsOrigins) -> Self {
        self.cors = Some(cors);
        self
    }

    /// Adds a default header.
    #[must_use]
    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }

    /// Sets a custom error handler.
    #[must_use]
    pub fn with_error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&ApiError) -> GatewayResponse + Send + Sync + 'static,
    {
        self.error_handler = Some(Arc::new(handler));
        self
    }
}

impl fmt::Debug for GatewayOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayOptions")
            .field("cors", &self.cors)
            .field("default_headers", &self.default_headers)
            .field("error_handler", &self.error_handler.is_some())
            .finish()
    }
}

/// A descriptor bound to a handler, invoked once per gateway event.
///
/// ```rust
/// use rest_contracts_core::{Api, ApiRequest, Get, PathOnly, Reply};
/// use rest_contracts_gateway::{GatewayEvent, GatewayHandler};
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
///     .path("/doc/gateway/:id")
///     .unwrap();
///
/// let handler = GatewayHandler::new(&api, |request: ApiRequest<PathOnly<Get, Id>>| async move {
///     Ok(Reply::ok(request.params.id))
/// });
///
/// # tokio_test::block_on(async {
/// let response = handler.handle(GatewayEvent::new("GET", "/doc/gateway/abc")).await;
/// assert_eq!(response.status_code, 200);
/// assert_eq!(response.body, "\"abc\"");
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct GatewayHandler {
    endpoint: Endpoint,
    options: GatewayOptions,
}

impl GatewayHandler {
    /// Binds `handler` to `descriptor` with default options.
    pub fn new<S, K, F, Fut>(descriptor: &ApiDescriptor<S, K>, handler: F) -> Self
    where
        S: Shape,
        K: ResultKind,
        F: Fn(ApiRequest<S>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Reply<K::Output>, ApiError>> + Send + 'static,
    {
        Self {
            endpoint: Endpoint::new(descriptor, handler),
            options: GatewayOptions::default(),
        }
    }

    /// Replaces the response options.
    #[must_use]
    pub fn with_options(mut self, options: GatewayOptions) -> Self {
        self.options = options;
        self
    }

    /// The bound descriptor.
    #[must_use]
    pub fn spec(&self) -> &ApiSpec {
        self.endpoint.spec()
    }

    /// The response options.
    #[must_use]
    pub fn options(&self) -> &GatewayOptions {
        &self.options
    }

    /// Handles one event. Every failure becomes an error response.
    pub async fn handle(&self, event: GatewayEvent) -> GatewayResponse {
        let allow_origin = self
            .options
            .cors
            .as_ref()
            .and_then(|cors| cors.allow_origin(event.header("origin")));
        let method = event.http_method.clone();
        let path = event.path.clone();

        let outcome = match self.translate(event) {
            Ok(request) => self.endpoint.call(request).await,
            Err(err) => Err(err),
        };

        let response = match outcome {
            Ok(response) => {
                tracing::debug!(
                    method = %method,
                    path = %path,
                    status = response.status.as_u16(),
                    "Handled gateway event"
                );
                to_gateway_response(response)
            }
            Err(err) => {
                let status = err.status_code();
                if status.is_server_error() {
                    tracing::error!(method = %method, path = %path, status = status.as_u16(), error = %err, "Handler failed");
                } else {
                    tracing::warn!(method = %method, path = %path, status = status.as_u16(), error = %err, "Request rejected");
                }
                match &self.options.error_handler {
                    Some(handler) => handler(&err),
                    None => to_gateway_response(err.to_response()),
                }
            }
        };

        self.decorate(response, allow_origin)
    }

    /// Handles a JSON-encoded event and returns the JSON-encoded response.
    ///
    /// # Errors
    ///
    /// Returns an error only if the event is not a valid event document or
    /// the response cannot be serialized.
    pub async fn handle_json(&self, event: &str) -> Result<String, GatewayError> {
        let event: GatewayEvent = serde_json::from_str(event).map_err(GatewayError::InvalidEvent)?;
        let response = self.handle(event).await;
        serde_json::to_string(&response).map_err(GatewayError::Serialize)
    }

    fn translate(&self, event: GatewayEvent) -> Result<RawRequest, ApiError> {
        let spec = self.endpoint.spec();
        let method = Method::parse(&event.http_method).filter(|method| *method == spec.method());
        let Some(method) = method else {
            return Err(ApiError::new(
                StatusCode::METHOD_NOT_ALLOWED,
                format!("Method {} not allowed for {}", event.http_method, spec.path()),
            ));
        };

        let path_params = match event.path_parameters {
            Some(params) => params
                .into_iter()
                .map(|(name, value)| (name, Value::String(value)))
                .collect(),
            None => spec.template().match_path(&event.path).unwrap_or_default(),
        };

        let query = query_params(
            event.query_string_parameters,
            event.multi_value_query_string_parameters,
        );

        let body = match event.body {
            Some(body) if event.is_base64_encoded => STANDARD
                .decode(body.as_bytes())
                .map(Bytes::from)
                .map_err(|err| ApiError::bad_request(format!("Invalid base64 body: {err}")))?,
            Some(body) => Bytes::from(body),
            None => Bytes::new(),
        };

        let uri = event
            .path
            .parse::<Uri>()
            .unwrap_or_else(|_| Uri::from_static("/"));

        Ok(RawRequest {
            path_params,
            query,
            body,
            context: rest_contracts_core::RequestContext::new(
                method,
                uri,
                header_map(event.headers.unwrap_or_default()),
            ),
        })
    }

    fn decorate(&self, mut response: GatewayResponse, allow_origin: Option<String>) -> GatewayResponse {
        for (name, value) in &self.options.default_headers {
            if response.header(name).is_none() {
                response.headers.insert(name.clone(), value.clone());
            }
        }
        if let Some(origin) = allow_origin {
            if response.header(ALLOW_ORIGIN).is_none() {
                response.headers.insert(ALLOW_ORIGIN.to_string(), origin);
            }
        }
        response
    }
}

// Repeated values become arrays; single values stay strings.
fn query_params(
    single: Option<BTreeMap<String, String>>,
    multi: Option<BTreeMap<String, Vec<String>>>,
) -> Map<String, Value> {
    match multi {
        Some(multi) => multi
            .into_iter()
            .filter_map(|(name, mut values)| match values.len() {
                0 => None,
                1 => values.pop().map(|value| (name, Value::String(value))),
                _ => Some((name, Value::Array(values.into_iter().map(Value::String).collect()))),
            })
            .collect(),
        None => single
            .unwrap_or_default()
            .into_iter()
            .map(|(name, value)| (name, Value::String(value)))
            .collect(),
    }
}

fn header_map(headers: BTreeMap<String, String>) -> HeaderMap {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            (Ok(name), Ok(value)) => {
                map.append(name, value);
            }
            _ => tracing::debug!(header = %name, "Skipping invalid header"),
        }
    }
    map
}

fn to_gateway_response(response: ApiResponse) -> GatewayResponse {
    let mut headers = BTreeMap::new();
    let mut multi_value_headers = BTreeMap::new();
    for name in response.headers.keys() {
        let values: Vec<String> = response
            .headers
            .get_all(name)
            .iter()
            .filter_map(|value| value.to_str().ok().map(str::to_string))
            .collect();
        match <[String; 1]>::try_from(values) {
            Ok([value]) => {
                headers.insert(name.as_str().to_string(), value);
            }
            Err(values) if values.is_empty() => {}
            Err(values) => {
                multi_value_headers.insert(name.as_str().to_string(), values);
            }
        }
    }

    let (body, is_base64_encoded) = match response.body {
        ResponseBody::Empty => (String::new(), false),
        ResponseBody::Json(bytes) => (String::from_utf8_lossy(&bytes).into_owned(), false),
        ResponseBody::Text(text) => (text, false),
        ResponseBody::Binary(bytes) => (STANDARD.encode(&bytes), true),
    };

    GatewayResponse {
        status_code: response.status.as_u16(),
        headers,
        multi_value_headers,
        body,
        is_base64_encoded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::SET_COOKIE;
    use rest_contracts_core::{
        Api, BodyOnly, Get, NoParams, PathOnly, Post, Put, QueryOnly, RawBody,
    };
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize)]
    struct Id {
        id: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct Tags {
        #[serde(deserialize_with = "rest_contracts_core::serde_helpers::one_or_many")]
        tag: Vec<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct Note {
        text: String,
    }

    fn echo_id(path: &str) -> GatewayHandler {
        let api = Api::get()
            .path_parameters::<Id>()
            .returns::<String>()
            .path(path)
            .unwrap();
        GatewayHandler::new(&api, |request: ApiRequest<PathOnly<Get, Id>>| async move {
            Ok(Reply::ok(request.params.id))
        })
    }

    #[tokio::test]
    async fn test_path_parameters_from_event() {
        let handler = echo_id("/gateway-a/items/:id");
        let response = handler
            .handle(GatewayEvent::new("GET", "/ignored").with_path_parameter("id", "abc"))
            .await;
        assert_eq!(response.status_code, 200);
        assert_eq!(response.body, "\"abc\"");
        assert_eq!(response.header("content-type"), Some("application/json"));
    }

    #[tokio::test]
    async fn test_path_parameters_matched_from_path() {
        let handler = echo_id("/gateway-b/items/:id/");
        let response = handler
            .handle(GatewayEvent::new("GET", "/gateway-b/items/a%20b/"))
            .await;
        assert_eq!(response.body, "\"a b\"");
    }

    #[tokio::test]
    async fn test_method_mismatch_is_405() {
        let handler = echo_id("/gateway-c/items/:id");
        let response = handler
            .handle(GatewayEvent::new("POST", "/gateway-c/items/abc"))
            .await;
        assert_eq!(response.status_code, 405);
        let body: Value = serde_json::from_str(&response.body).unwrap();
        assert!(body["message"].as_str().unwrap().contains("POST"));
    }

    #[tokio::test]
    async fn test_multi_value_query() {
        let api = Api::get()
            .query_parameters::<Tags>()
            .returns::<usize>()
            .path("/gateway-d/tags")
            .unwrap();
        let handler = GatewayHandler::new(&api, |request: ApiRequest<QueryOnly<Get, Tags>>| async move {
            Ok(Reply::ok(request.params.tag.len()))
        });

        let single = handler
            .handle(GatewayEvent::new("GET", "/gateway-d/tags").with_query("tag", "a"))
            .await;
        assert_eq!(single.body, "1");

        let repeated = handler
            .handle(
                GatewayEvent::new("GET", "/gateway-d/tags")
                    .with_query("tag", "a")
                    .with_query("tag", "b"),
            )
            .await;
        assert_eq!(repeated.body, "2");
    }

    #[tokio::test]
    async fn test_put_is_201_and_decodes_base64_body() {
        let api = Api::put()
            .body::<Note>()
            .returns::<Note>()
            .path("/gateway-e/notes")
            .unwrap();
        let handler = GatewayHandler::new(&api, |request: ApiRequest<BodyOnly<Put, Note>>| async move {
            Ok(Reply::ok(request.body))
        });

        let encoded = STANDARD.encode(br#"{"text":"hi"}"#);
        let response = handler
            .handle(GatewayEvent::new("PUT", "/gateway-e/notes").with_base64_body(encoded))
            .await;
        assert_eq!(response.status_code, 201);
        assert_eq!(serde_json::from_str::<Value>(&response.body).unwrap(), json!({"text": "hi"}));

        let invalid = handler
            .handle(GatewayEvent::new("PUT", "/gateway-e/notes").with_base64_body("***"))
            .await;
        assert_eq!(invalid.status_code, 400);
    }

    #[tokio::test]
    async fn test_get_without_value_is_404() {
        let api = Api::get().returns::<String>().path("/gateway-f/missing").unwrap();
        let handler = GatewayHandler::new(&api, |_request: ApiRequest<NoParams<Get>>| async move {
            Ok(Reply::none())
        });
        let response = handler.handle(GatewayEvent::new("GET", "/gateway-f/missing")).await;
        assert_eq!(response.status_code, 404);
        assert!(response.body.is_empty());
    }

    #[tokio::test]
    async fn test_handler_error_status_and_body() {
        let api = Api::post()
            .body::<Note>()
            .returns_void()
            .path("/gateway-g/notes")
            .unwrap();
        let handler = GatewayHandler::new(&api, |_request: ApiRequest<BodyOnly<Post, Note>>| async move {
            Err::<Reply<()>, _>(ApiError::from_value(json!({"status": 403, "message": "nope"})))
        });

        let response = handler
            .handle(GatewayEvent::new("POST", "/gateway-g/notes").with_body(r#"{"text":"x"}"#))
            .await;
        assert_eq!(response.status_code, 403);
        let body: Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body["message"], "nope");
        assert_eq!(body["error"]["status"], 403);
    }

    #[tokio::test]
    async fn test_custom_error_handler() {
        let api = Api::get().returns_void().path("/gateway-h/fail").unwrap();
        let handler = GatewayHandler::new(&api, |_request: ApiRequest<NoParams<Get>>| async move {
            Err::<Reply<()>, _>(ApiError::internal("boom"))
        })
        .with_options(GatewayOptions::new().with_error_handler(|err| GatewayResponse {
            status_code: 502,
            body: err.message().to_string(),
            ..GatewayResponse::default()
        }));

        let response = handler.handle(GatewayEvent::new("GET", "/gateway-h/fail")).await;
        assert_eq!(response.status_code, 502);
        assert_eq!(response.body, "boom");
    }

    #[tokio::test]
    async fn test_repeated_response_headers_keep_every_value() {
        let api = Api::post().returns_void().path("/gateway-n/login").unwrap();
        let handler = GatewayHandler::new(&api, |_request: ApiRequest<NoParams<Post>>| async move {
            Ok(Reply::ok(())
                .with_header(SET_COOKIE, HeaderValue::from_static("session=abc"))
                .with_header(SET_COOKIE, HeaderValue::from_static("theme=dark")))
        })
        .with_options(GatewayOptions::new().with_default_header("Set-Cookie", "ignored=1"));

        let response = handler.handle(GatewayEvent::new("POST", "/gateway-n/login")).await;
        assert_eq!(response.status_code, 200);
        assert!(response.header("set-cookie").is_some());
        assert!(!response.headers.contains_key("set-cookie"));
        assert_eq!(
            response.multi_value_headers["set-cookie"],
            vec!["session=abc".to_string(), "theme=dark".to_string()]
        );
        // The default does not overwrite a header the handler set.
        assert_eq!(response.header_values("Set-Cookie"), vec!["session=abc", "theme=dark"]);
    }

    #[tokio::test]
    async fn test_binary_raw_result_is_base64() {
        let api = Api::get()
            .returns_raw()
            .content_type("image/png")
            .path("/gateway-i/image")
            .unwrap();
        let handler = GatewayHandler::new(&api, |_request: ApiRequest<NoParams<Get>>| async move {
            Ok(Reply::ok(RawBody::Binary(Bytes::from_static(&[0, 159, 146, 150]))))
        });

        let response = handler.handle(GatewayEvent::new("GET", "/gateway-i/image")).await;
        assert!(response.is_base64_encoded);
        assert_eq!(STANDARD.decode(&response.body).unwrap(), vec![0, 159, 146, 150]);
        assert_eq!(response.header("content-type"), Some("image/png"));
    }

    #[tokio::test]
    async fn test_raw_text_is_verbatim() {
        let api = Api::get()
            .returns_raw()
            .content_type("text/csv")
            .path("/gateway-j/report")
            .unwrap();
        let handler = GatewayHandler::new(&api, |_request: ApiRequest<NoParams<Get>>| async move {
            Ok(Reply::ok(RawBody::Text("a,b\n1,2".into())))
        });

        let response = handler.handle(GatewayEvent::new("GET", "/gateway-j/report")).await;
        assert!(!response.is_base64_encoded);
        assert_eq!(response.body, "a,b\n1,2");
    }

    #[tokio::test]
    async fn test_cors_and_default_headers() {
        let handler = echo_id("/gateway-k/items/:id").with_options(
            GatewayOptions::new()
                .with_cors(CorsOrigins::list(["https://app.example"]))
                .with_default_header("Cache-Control", "no-store")
                .with_default_header("Content-Type", "text/plain"),
        );

        let allowed = handler
            .handle(
                GatewayEvent::new("GET", "/gateway-k/items/abc")
                    .with_header("Origin", "https://APP.example"),
            )
            .await;
        assert_eq!(allowed.header(ALLOW_ORIGIN), Some("https://APP.example"));
        assert_eq!(allowed.header("cache-control"), Some("no-store"));
        assert_eq!(allowed.header("content-type"), Some("application/json"));

        let denied = handler
            .handle(
                GatewayEvent::new("GET", "/gateway-k/items/abc")
                    .with_header("Origin", "https://evil.example"),
            )
            .await;
        assert_eq!(denied.header(ALLOW_ORIGIN), None);
    }

    #[tokio::test]
    async fn test_cors_any_applies_to_errors() {
        let handler = echo_id("/gateway-l/items/:id")
            .with_options(GatewayOptions::new().with_cors(CorsOrigins::Any));
        let response = handler
            .handle(GatewayEvent::new("DELETE", "/gateway-l/items/abc"))
            .await;
        assert_eq!(response.status_code, 405);
        assert_eq!(response.header(ALLOW_ORIGIN), Some("*"));
    }

    #[tokio::test]
    async fn test_handle_json() {
        let handler = echo_id("/gateway-m/items/:id");
        let response = handler
            .handle_json(r#"{"httpMethod":"GET","path":"/gateway-m/items/xyz","headers":null}"#)
            .await
            .unwrap();
        let value: Value = serde_json::from_str(&response).unwrap();
        assert_eq!(value["statusCode"], 200);
        assert_eq!(value["body"], "\"xyz\"");

        assert!(matches!(
            handler.handle_json("not json").await,
            Err(GatewayError::InvalidEvent(_))
        ));
    }
}

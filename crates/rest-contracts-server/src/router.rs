//! Route table and request dispatch.
//!
//! An [`ApiRouter`] holds the implemented descriptors in registration order.
//! For each request it finds the first descriptor whose template matches the
//! path, checks the method, and runs the endpoint pipeline.
//!
//! # Example
//!
//! ```rust
//! use rest_contracts_core::{Api, ApiRequest, Get, PathOnly, Reply};
//! use rest_contracts_server::ApiRouter;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Id {
//!     id: String,
//! }
//!
//! let get_excuse = Api::get()
//!     .path_parameters::<Id>()
//!     .returns::<String>()
//!     .path("/doc/router/excuses/:id/")
//!     .unwrap();
//!
//! let mut router = ApiRouter::new();
//! router.implement(&get_excuse, |request: ApiRequest<PathOnly<Get, Id>>| async move {
//!     Ok(Reply::ok(format!("excuse {}", request.params.id)))
//! });
//! assert_eq!(router.len(), 1);
//! ```

use std::future::Future;

use bytes::Bytes;
use http::header::{HeaderValue, ALLOW};
use http::{Request, Response, StatusCode};
use rest_contracts_core::{
    parse_query, ApiDescriptor, ApiError, ApiRequest, ApiSpec, Endpoint, Method, RawRequest,
    Reply, RequestContext, ResultKind, Shape,
};
use serde_json::{Map, Value};

/// Outcome of looking up a request.
#[derive(Debug)]
pub enum RouteMatch<'a> {
    /// A descriptor matches both path and method.
    Found {
        /// The matched endpoint.
        endpoint: &'a Endpoint,
        /// Decoded path parameters.
        path_params: Map<String, Value>,
    },
    /// The path matches, but only for other methods.
    MethodNotAllowed {
        /// Methods the path is implemented for.
        allowed: Vec<Method>,
    },
    /// Nothing matches the path.
    NotFound,
}

/// The route table of a server.
#[derive(Debug, Clone, Default)]
pub struct ApiRouter {
    endpoints: Vec<Endpoint>,
}

impl ApiRouter {
    /// Creates an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Implements `descriptor` with `handler`.
    ///
    /// The handler receives the typed parameters and body and returns a
    /// [`Reply`] or an [`ApiError`].
    pub fn implement<S, K, F, Fut>(
        &mut self,
        descriptor: &ApiDescriptor<S, K>,
        handler: F,
    ) -> &mut Self
    where
        S: Shape,
        K: ResultKind,
        F: Fn(ApiRequest<S>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Reply<K::Output>, ApiError>> + Send + 'static,
    {
        self.add_endpoint(Endpoint::new(descriptor, handler))
    }

    /// Adds an already bound endpoint.
    pub fn add_endpoint(&mut self, endpoint: Endpoint) -> &mut Self {
        let spec = endpoint.spec();
        tracing::info!(method = %spec.method(), path = %spec.path(), "Added API");
        self.endpoints.push(endpoint);
        self
    }

    /// Number of implemented descriptors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Returns `true` if nothing is implemented.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// The implemented descriptors, in registration order.
    pub fn specs(&self) -> impl Iterator<Item = &ApiSpec> {
        self.endpoints.iter().map(Endpoint::spec)
    }

    /// Looks up the endpoint for `method` and `path`.
    #[must_use]
    pub fn match_route(&self, method: Option<Method>, path: &str) -> RouteMatch<'_> {
        let mut allowed = Vec::new();

        for endpoint in &self.endpoints {
            let spec = endpoint.spec();
            let Some(path_params) = spec.template().match_path(path) else {
                continue;
            };
            if Some(spec.method()) == method {
                return RouteMatch::Found {
                    endpoint,
                    path_params,
                };
            }
            if !allowed.contains(&spec.method()) {
                allowed.push(spec.method());
            }
        }

        if allowed.is_empty() {
            RouteMatch::NotFound
        } else {
            RouteMatch::MethodNotAllowed { allowed }
        }
    }

    /// Handles one request with a fully read body.
    ///
    /// Never fails: every error becomes a JSON error response.
    pub async fn handle(&self, request: Request<Bytes>) -> Response<Bytes> {
        let (parts, body) = request.into_parts();
        let method = Method::from_http(&parts.method);
        let path = parts.uri.path().to_string();

        tracing::debug!(method = %parts.method, path = %path, "Handling request");

        let (endpoint, path_params) = match self.match_route(method, &path) {
            RouteMatch::Found {
                endpoint,
                path_params,
            } => (endpoint, path_params),
            RouteMatch::MethodNotAllowed { allowed } => {
                let err = ApiError::new(
                    StatusCode::METHOD_NOT_ALLOWED,
                    format!("Method {} is not allowed for {path}", parts.method),
                );
                let mut response = err.to_response().into_http();
                let allow = allowed
                    .iter()
                    .map(|method| method.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                if let Ok(value) = HeaderValue::from_str(&allow) {
                    response.headers_mut().insert(ALLOW, value);
                }
                return response;
            }
            RouteMatch::NotFound => {
                let err = ApiError::not_found(format!("No API for {} {path}", parts.method));
                return err.to_response().into_http();
            }
        };

        let query = match parse_query(parts.uri.query().unwrap_or_default()) {
            Ok(query) => query,
            Err(err) => {
                return ApiError::bad_request(format!("Invalid query string: {err}"))
                    .to_response()
                    .into_http();
            }
        };

        let spec = endpoint.spec();
        let context = RequestContext::new(spec.method(), parts.uri, parts.headers);
        let request_id = context.request_id();

        match endpoint
            .call(RawRequest {
                path_params,
                query,
                body,
                context,
            })
            .await
        {
            Ok(response) => {
                tracing::debug!(
                    request_id = %request_id,
                    api = %spec,
                    status = response.status.as_u16(),
                    "Request completed"
                );
                response.into_http()
            }
            Err(err) => {
                let status = err.status_code();
                if status.is_server_error() {
                    tracing::error!(request_id = %request_id, api = %spec, error = %err, "Handler failed");
                } else {
                    tracing::warn!(request_id = %request_id, api = %spec, error = %err, "Request rejected");
                }
                err.to_response().into_http()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::CONTENT_TYPE;
    use rest_contracts_core::{Api, BodyOnly, Get, NoParams, PathOnly, Put, QueryOnly};
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Id {
        id: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Search {
        quality: Option<String>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Excuse {
        id: Option<String>,
        description: String,
    }

    fn request(method: &str, uri: &str, body: &str) -> Request<Bytes> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Bytes::copy_from_slice(body.as_bytes()))
            .unwrap()
    }

    fn json_body(response: &Response<Bytes>) -> Value {
        serde_json::from_slice(response.body()).unwrap()
    }

    fn excuse_router(prefix: &str) -> ApiRouter {
        let get = Api::get()
            .path_parameters::<Id>()
            .returns::<Excuse>()
            .path(&format!("{prefix}/excuses/:id/"))
            .unwrap();
        let query = Api::get()
            .query_parameters::<Search>()
            .returns::<Vec<String>>()
            .path(&format!("{prefix}/excuses/"))
            .unwrap();
        let put = Api::put()
            .body::<Excuse>()
            .returns::<Excuse>()
            .path(&format!("{prefix}/excuses/"))
            .unwrap();

        let mut router = ApiRouter::new();
        router
            .implement(&get, |request: ApiRequest<PathOnly<Get, Id>>| async move {
                if request.params.id == "missing" {
                    return Ok(Reply::none());
                }
                Ok(Reply::ok(Excuse {
                    id: Some(request.params.id),
                    description: "dog ate it".into(),
                }))
            })
            .implement(&query, |request: ApiRequest<QueryOnly<Get, Search>>| async move {
                Ok(Reply::ok(request.params.quality.into_iter().collect::<Vec<_>>()))
            })
            .implement(&put, |request: ApiRequest<BodyOnly<Put, Excuse>>| async move {
                Ok(Reply::ok(Excuse {
                    id: Some("new".into()),
                    ..request.body
                }))
            });
        router
    }

    #[tokio::test]
    async fn test_path_parameters_reach_handler() {
        let router = excuse_router("/router-a");
        let response = router.handle(request("GET", "/router-a/excuses/abc/", "")).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(json_body(&response)["id"], "abc");
    }

    #[tokio::test]
    async fn test_query_parameters_reach_handler() {
        let router = excuse_router("/router-b");

        let response = router
            .handle(request("GET", "/router-b/excuses/?quality=Poor", ""))
            .await;
        assert_eq!(json_body(&response), json!(["Poor"]));

        let response = router.handle(request("GET", "/router-b/excuses/", "")).await;
        assert_eq!(json_body(&response), json!([]));
    }

    #[tokio::test]
    async fn test_put_returns_created() {
        let router = excuse_router("/router-c");
        let response = router
            .handle(request(
                "PUT",
                "/router-c/excuses/",
                r#"{"id": null, "description": "traffic"}"#,
            ))
            .await;

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            json_body(&response),
            json!({ "id": "new", "description": "traffic" })
        );
    }

    #[tokio::test]
    async fn test_get_without_value_is_404_with_empty_body() {
        let router = excuse_router("/router-d");
        let response = router
            .handle(request("GET", "/router-d/excuses/missing/", ""))
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.body().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_path_is_404_json() {
        let router = excuse_router("/router-e");
        let response = router.handle(request("GET", "/nowhere", "")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(&response)["error"]["status"], 404);
    }

    #[tokio::test]
    async fn test_wrong_method_is_405_with_allow() {
        let router = excuse_router("/router-f");
        let response = router
            .handle(request("DELETE", "/router-f/excuses/", ""))
            .await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers().get(ALLOW).unwrap(), "GET, PUT");

        let response = router
            .handle(request("OPTIONS", "/router-f/excuses/", ""))
            .await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_invalid_body_is_400() {
        let router = excuse_router("/router-g");
        let response = router
            .handle(request("PUT", "/router-g/excuses/", "{not json"))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(&response)["error"]["status"], 400);
    }

    #[tokio::test]
    async fn test_handler_error_uses_status_field() {
        let api = Api::get().returns_void().path("/router-h/forbidden").unwrap();
        let mut router = ApiRouter::new();
        router.implement(&api, |_request: ApiRequest<NoParams<Get>>| async move {
            Err::<Reply<()>, _>(ApiError::from_value(json!({ "status": 403, "message": "nope" })))
        });

        let response = router.handle(request("GET", "/router-h/forbidden", "")).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = json_body(&response);
        assert_eq!(body["message"], "nope");
        assert_eq!(body["error"]["status"], 403);
    }

    #[tokio::test]
    async fn test_registration_order_wins() {
        let literal = Api::get().returns::<String>().path("/router-i/excuses/latest").unwrap();
        let param = Api::get()
            .path_parameters::<Id>()
            .returns::<String>()
            .path("/router-i/excuses/:id")
            .unwrap();

        let mut router = ApiRouter::new();
        router
            .implement(&literal, |_request: ApiRequest<NoParams<Get>>| async move {
                Ok(Reply::ok("literal".to_string()))
            })
            .implement(&param, |request: ApiRequest<PathOnly<Get, Id>>| async move {
                Ok(Reply::ok(request.params.id))
            });

        let response = router
            .handle(request("GET", "/router-i/excuses/latest", ""))
            .await;
        assert_eq!(json_body(&response), json!("literal"));
        let response = router.handle(request("GET", "/router-i/excuses/7", "")).await;
        assert_eq!(json_body(&response), json!("7"));
        assert_eq!(router.specs().count(), 2);
    }
}

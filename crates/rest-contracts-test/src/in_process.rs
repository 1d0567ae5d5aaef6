//! Client-to-router transport without sockets.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::Request;
use rest_contracts_client::{
    ClientError, ClientFactory, ClientResult, Transport, TransportRequest, TransportResponse,
};
use rest_contracts_server::ApiRouter;

/// Base URL used by [`InProcessTransport::client_factory`].
pub const IN_PROCESS_BASE_URL: &str = "http://in-process";

/// Hands client requests straight to an [`ApiRouter`].
///
/// Requests go through the same dispatch as the HTTP server (route
/// matching, extraction, status rules, error bodies), only the socket is
/// skipped.
///
/// ```rust
/// use rest_contracts_core::{Api, ApiRequest, Get, NoParams, Reply};
/// use rest_contracts_server::ApiRouter;
/// use rest_contracts_test::InProcessTransport;
///
/// let ping = Api::get().returns::<String>().path("/doc/in-process/ping").unwrap();
///
/// let mut router = ApiRouter::new();
/// router.implement(&ping, |_request: ApiRequest<NoParams<Get>>| async move {
///     Ok(Reply::ok("pong".to_string()))
/// });
///
/// let client = InProcessTransport::new(router).client_factory();
/// let call = client.request_fn(&ping);
///
/// # tokio_test::block_on(async {
/// assert_eq!(call.call(()).await.unwrap(), "pong");
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct InProcessTransport {
    router: Arc<ApiRouter>,
}

impl InProcessTransport {
    /// Wraps a router.
    #[must_use]
    pub fn new(router: ApiRouter) -> Self {
        Self::from_arc(Arc::new(router))
    }

    /// Wraps a shared router.
    #[must_use]
    pub fn from_arc(router: Arc<ApiRouter>) -> Self {
        Self { router }
    }

    /// The wrapped router.
    #[must_use]
    pub fn router(&self) -> &ApiRouter {
        &self.router
    }

    /// A client factory whose requests land on this router.
    #[must_use]
    pub fn client_factory(self) -> ClientFactory {
        ClientFactory::with_transport(IN_PROCESS_BASE_URL, self)
    }
}

#[async_trait]
impl Transport for InProcessTransport {
    async fn send(&self, request: TransportRequest) -> ClientResult<TransportResponse> {
        let mut builder = Request::builder()
            .method(request.method.clone())
            .uri(request.path_and_query());
        if let Some(headers) = builder.headers_mut() {
            *headers = request.headers.clone();
        }
        let http_request = builder
            .body(request.body.unwrap_or_else(Bytes::new))
            .map_err(|e| ClientError::transport(format!("Invalid request: {e}")))?;

        let response = self.router.handle(http_request).await;
        let (parts, body) = response.into_parts();

        Ok(TransportResponse {
            status: parts.status,
            headers: parts.headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rest_contracts_core::{Api, ApiError, ApiRequest, BodyOnly, Get, NoParams, Post, Reply};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        text: String,
    }

    #[tokio::test]
    async fn test_round_trip_through_router() {
        let create = Api::post()
            .body::<Note>()
            .returns::<Note>()
            .path("/in-process-a/notes")
            .unwrap();

        let mut router = ApiRouter::new();
        router.implement(&create, |request: ApiRequest<BodyOnly<Post, Note>>| async move {
            Ok(Reply::ok(Note {
                text: request.body.text.to_uppercase(),
            }))
        });

        let client = InProcessTransport::new(router).client_factory();
        let note = client
            .request_fn(&create)
            .call(&Note { text: "hi".into() })
            .await
            .unwrap();
        assert_eq!(note, Note { text: "HI".into() });
    }

    #[tokio::test]
    async fn test_errors_reach_the_client() {
        let secret = Api::get().returns::<String>().path("/in-process-b/secret").unwrap();
        let unrouted = Api::get().returns::<String>().path("/in-process-b/unrouted").unwrap();

        let mut router = ApiRouter::new();
        router.implement(&secret, |_request: ApiRequest<NoParams<Get>>| async move {
            Err::<Reply<String>, _>(ApiError::forbidden("nope"))
        });
        let client = InProcessTransport::new(router).client_factory();

        let err = client.request_fn(&secret).call(()).await.unwrap_err();
        assert!(err.is_forbidden());

        let err = client.request_fn(&unrouted).call(()).await.unwrap_err();
        assert!(err.is_not_found());
    }
}

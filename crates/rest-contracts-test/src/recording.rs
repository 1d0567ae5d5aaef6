//! Transport that records requests and replays canned responses.

use std::collections::VecDeque;

use async_trait::async_trait;
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue, StatusCode};
use parking_lot::Mutex;
use rest_contracts_client::{
    ClientError, ClientFactory, ClientResult, Transport, TransportRequest, TransportResponse,
};
use serde::Serialize;

/// Records every request and answers from a queue of canned responses.
///
/// Cloning shares the queue and the log, so a test can keep one handle
/// while a [`ClientFactory`] owns another.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    state: std::sync::Arc<Mutex<State>>,
}

#[derive(Debug, Default)]
struct State {
    responses: VecDeque<TransportResponse>,
    requests: Vec<TransportRequest>,
}

impl RecordingTransport {
    /// Creates a transport with no canned responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response.
    pub fn push_response(&self, response: TransportResponse) -> &Self {
        self.state.lock().responses.push_back(response);
        self
    }

    /// Queues a JSON response.
    ///
    /// # Errors
    ///
    /// Returns an error if `body` cannot be serialized.
    pub fn push_json<T: Serialize>(&self, status: StatusCode, body: &T) -> serde_json::Result<&Self> {
        let body = serde_json::to_vec(body)?;
        Ok(self.push_body(status, "application/json", Bytes::from(body)))
    }

    /// Queues a plain text response.
    pub fn push_text(&self, status: StatusCode, body: impl Into<String>) -> &Self {
        self.push_body(status, "text/plain", Bytes::from(body.into()))
    }

    /// Queues a response with no body.
    pub fn push_empty(&self, status: StatusCode) -> &Self {
        self.push_response(TransportResponse {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        })
    }

    fn push_body(&self, status: StatusCode, content_type: &'static str, body: Bytes) -> &Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        self.push_response(TransportResponse {
            status,
            headers,
            body,
        })
    }

    /// Every request sent so far.
    #[must_use]
    pub fn requests(&self) -> Vec<TransportRequest> {
        self.state.lock().requests.clone()
    }

    /// The most recent request.
    #[must_use]
    pub fn last_request(&self) -> Option<TransportRequest> {
        self.state.lock().requests.last().cloned()
    }

    /// A client factory for `base_url` that sends through this transport.
    #[must_use]
    pub fn client_factory(&self, base_url: &str) -> ClientFactory {
        ClientFactory::with_transport(base_url, self.clone())
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, request: TransportRequest) -> ClientResult<TransportResponse> {
        let mut state = self.state.lock();
        let description = format!("{} {}", request.method, request.url);
        state.requests.push(request);
        state
            .responses
            .pop_front()
            .ok_or_else(|| ClientError::transport(format!("No canned response for {description}")))
    }
}

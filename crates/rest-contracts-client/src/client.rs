//! Request functions derived from descriptors.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use rest_contracts_core::{
    append_query, ApiDescriptor, ApiSpec, CallShape, ResolveError, ResultKind, Shape,
};
use serde_json::Value;

use crate::error::{ClientError, ClientResult};
use crate::options::RequestOptions;
use crate::transport::{ReqwestTransport, Transport, TransportRequest, TransportResponse};

/// Produces request functions for one server.
///
/// # Example
///
/// ```no_run
/// use rest_contracts_client::ClientFactory;
/// use rest_contracts_core::Api;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Id {
///     id: String,
/// }
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let get_excuse = Api::get()
///     .path_parameters::<Id>()
///     .returns::<String>()
///     .path("/excuses/:id/")?;
///
/// let factory = ClientFactory::new("http://localhost:8080/")?;
/// let get_excuse = factory.request_fn(&get_excuse);
///
/// let excuse = get_excuse.call(&Id { id: "abc".into() }).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ClientFactory {
    base_url: Arc<str>,
    defaults: RequestOptions,
    transport: Arc<dyn Transport>,
}

impl ClientFactory {
    /// Creates a factory that sends requests with `reqwest`.
    ///
    /// Trailing slashes are stripped from `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str) -> ClientResult<Self> {
        Ok(Self::with_transport(base_url, ReqwestTransport::new()?))
    }

    /// Creates a factory that sends requests through `transport`.
    pub fn with_transport(base_url: &str, transport: impl Transport) -> Self {
        Self {
            base_url: Arc::from(base_url.trim_end_matches('/')),
            defaults: RequestOptions::default(),
            transport: Arc::new(transport),
        }
    }

    /// Sets the factory-level default options.
    #[must_use]
    pub fn with_defaults(mut self, defaults: RequestOptions) -> Self {
        self.defaults = defaults;
        self
    }

    /// Base URL, without trailing slashes.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Factory-level default options.
    #[must_use]
    pub fn defaults(&self) -> &RequestOptions {
        &self.defaults
    }

    /// Creates the request function for `descriptor`.
    pub fn request_fn<S: Shape, K: ResultKind>(
        &self,
        descriptor: &ApiDescriptor<S, K>,
    ) -> RequestFn<S, K> {
        self.request_fn_with(descriptor, &RequestOptions::default())
    }

    /// Creates the request function for `descriptor` with client-level
    /// options layered over the factory defaults.
    pub fn request_fn_with<S: Shape, K: ResultKind>(
        &self,
        descriptor: &ApiDescriptor<S, K>,
        options: &RequestOptions,
    ) -> RequestFn<S, K> {
        RequestFn {
            spec: descriptor.shared_spec(),
            base_url: Arc::clone(&self.base_url),
            options: self.defaults.merge(options),
            transport: Arc::clone(&self.transport),
            _marker: PhantomData,
        }
    }
}

impl fmt::Debug for ClientFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientFactory")
            .field("base_url", &self.base_url)
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

/// A typed request function for one descriptor.
///
/// The argument of [`call`](Self::call) is fixed by the descriptor's shape:
///
/// | Shape | Argument |
/// |-------|----------|
/// | no parameters | `()` |
/// | path only | `&P` |
/// | query only | `&Q` |
/// | path and query | `(&P, &Q)` |
/// | body only | `&B` |
/// | path and body | `(&P, &B)` |
pub struct RequestFn<S, K> {
    spec: Arc<ApiSpec>,
    base_url: Arc<str>,
    options: RequestOptions,
    transport: Arc<dyn Transport>,
    _marker: PhantomData<fn() -> (S, K)>,
}

impl<S: Shape, K: ResultKind> RequestFn<S, K> {
    /// Sends the request with the client-level options.
    ///
    /// # Errors
    ///
    /// See [`call_with`](Self::call_with).
    pub async fn call(&self, args: S::Args<'_>) -> ClientResult<K::Output> {
        self.call_with(args, &RequestOptions::default()).await
    }

    /// Sends the request with call-site options layered on top.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Resolve`] if the arguments do not fit the path template
    /// - [`ClientError::Timeout`] if the timeout expires first
    /// - [`ClientError::Application`] if the server sent a structured error
    /// - [`ClientError::Status`] for any other status outside 200..=299
    /// - [`ClientError::Parse`] if a successful body cannot be decoded
    pub async fn call_with(
        &self,
        args: S::Args<'_>,
        options: &RequestOptions,
    ) -> ClientResult<K::Output> {
        let options = self.options.merge(options);
        let request = self.prepare(args, &options)?;

        let method = request.method.clone();
        let url = request.url.clone();
        tracing::debug!(method = %method, url = %url, "Sending request");
        let started = Instant::now();

        let response = match options.timeout() {
            Some(timeout) => tokio::time::timeout(timeout, self.transport.send(request))
                .await
                .map_err(|_| ClientError::Timeout { timeout })??,
            None => self.transport.send(request).await?,
        };

        tracing::debug!(
            method = %method,
            url = %url,
            status = response.status.as_u16(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Received response"
        );

        decode_response::<K>(response)
    }

    /// Assembles the request without sending it.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Resolve`] if the arguments do not serialize
    /// or a path-parameter key has no segment in the template.
    pub fn prepare(
        &self,
        args: S::Args<'_>,
        options: &RequestOptions,
    ) -> ClientResult<TransportRequest> {
        let parts = S::into_parts(args)?;
        let resolved = self.spec.template().resolve(&parts.path)?;

        if let Some((name, _)) = resolved.leftover.iter().find(|(_, value)| !value.is_null()) {
            return Err(ResolveError::UnmatchedPathParameter { name: name.clone() }.into());
        }

        let mut url = format!("{}{}", self.base_url, resolved.path);
        if self.spec.is_query_parameter_api() {
            url = append_query(&url, &parts.query);
        }

        let mut headers = options.request_headers();
        let body = match parts.body {
            Some(body) => {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                let encoded = serde_json::to_vec(&body).map_err(ResolveError::from)?;
                Some(Bytes::from(encoded))
            }
            None => None,
        };

        Ok(TransportRequest {
            method: self.spec.method().to_http(),
            url,
            headers,
            body,
        })
    }

    /// Untyped facts about the descriptor.
    #[must_use]
    pub fn spec(&self) -> &ApiSpec {
        &self.spec
    }

    /// Which of the four call signatures this function has.
    #[must_use]
    pub fn call_shape(&self) -> CallShape {
        S::TAG.call_shape()
    }

    /// Client-level options, already merged over the factory defaults.
    #[must_use]
    pub fn options(&self) -> &RequestOptions {
        &self.options
    }
}

impl<S, K> Clone for RequestFn<S, K> {
    fn clone(&self) -> Self {
        Self {
            spec: Arc::clone(&self.spec),
            base_url: Arc::clone(&self.base_url),
            options: self.options.clone(),
            transport: Arc::clone(&self.transport),
            _marker: PhantomData,
        }
    }
}

impl<S, K> fmt::Debug for RequestFn<S, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestFn")
            .field("api", &self.spec.to_string())
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

fn decode_response<K: ResultKind>(response: TransportResponse) -> ClientResult<K::Output> {
    if !response.is_success() {
        return Err(failure(&response));
    }

    let content_type = response.content_type().map(str::to_owned);
    K::decode(response.body.clone(), content_type.as_deref()).map_err(|source| {
        ClientError::Parse {
            status: response.status,
            response_text: response.text(),
            source,
        }
    })
}

fn failure(response: &TransportResponse) -> ClientError {
    if let Some(error) = structured_error(&response.body) {
        return ClientError::Application {
            status: response.status,
            error,
        };
    }

    ClientError::Status {
        status: response.status,
        status_text: response
            .status
            .canonical_reason()
            .unwrap_or_default()
            .to_string(),
        response_text: response.text(),
    }
}

/// Unwraps the `error` field of an error envelope.
///
/// The field may hold the structured error itself or a string containing
/// its JSON encoding.
fn structured_error(body: &[u8]) -> Option<Value> {
    let Ok(Value::Object(mut envelope)) = serde_json::from_slice::<Value>(body) else {
        return None;
    };

    match envelope.remove("error")? {
        Value::Null => None,
        Value::String(text) => {
            Some(serde_json::from_str(&text).unwrap_or(Value::String(text)))
        }
        error => Some(error),
    }
}

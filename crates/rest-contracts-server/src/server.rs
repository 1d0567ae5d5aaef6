//! HTTP server.
//!
//! Built on Hyper and Tokio. Each accepted connection runs in its own task;
//! each request is read in full (up to the size limit), handed to the
//! [`ApiRouter`], and bounded by the request timeout.
//!
//! # Example
//!
//! ```rust,no_run
//! use rest_contracts_server::{ApiRouter, Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let router = ApiRouter::new();
//!     let config = ServerConfig::builder().http_addr("0.0.0.0:8080").build();
//!
//!     Server::new(config, router).run().await?;
//!     Ok(())
//! }
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::{Request, Response, StatusCode};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use rest_contracts_core::ApiError;
use tokio::net::{TcpListener, TcpStream};

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::router::ApiRouter;
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// Response type written to connections.
pub type HttpResponse = Response<Full<Bytes>>;

/// An HTTP server for an [`ApiRouter`].
#[derive(Debug)]
pub struct Server {
    config: ServerConfig,
    router: Arc<ApiRouter>,
}

impl Server {
    /// Creates a server.
    #[must_use]
    pub fn new(config: ServerConfig, router: ApiRouter) -> Self {
        Self {
            config,
            router: Arc::new(router),
        }
    }

    /// Server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The route table.
    #[must_use]
    pub fn router(&self) -> &ApiRouter {
        &self.router
    }

    /// Runs until SIGTERM or SIGINT.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured address is invalid or cannot be
    /// bound.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_with_shutdown(ShutdownSignal::with_os_signals())
            .await
    }

    /// Binds the configured address and runs until `shutdown` fires.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured address is invalid or cannot be
    /// bound.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let addr = self
            .config
            .socket_addr()
            .map_err(|source| ServerError::InvalidAddress {
                addr: self.config.http_addr().to_string(),
                source,
            })?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.to_string(),
                source,
            })?;

        self.serve(listener, shutdown).await
    }

    /// Serves connections from an already bound listener until `shutdown`
    /// fires, then waits for open connections up to the shutdown timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener's local address cannot be read.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: ShutdownSignal,
    ) -> Result<(), ServerError> {
        let local_addr = listener.local_addr()?;
        tracing::info!(addr = %local_addr, apis = self.router.len(), "Server listening");

        let server = Arc::new(self);
        let tracker = ConnectionTracker::new();

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, remote_addr)) => {
                        let server = Arc::clone(&server);
                        let token = tracker.acquire();
                        let shutdown = shutdown.clone();

                        tokio::spawn(async move {
                            if let Err(err) = server.handle_connection(stream, remote_addr, shutdown).await {
                                tracing::debug!(remote_addr = %remote_addr, error = %err, "Connection error");
                            }
                            drop(token);
                        });
                    }
                    Err(err) => {
                        tracing::error!(error = %err, "Failed to accept connection");
                    }
                },

                () = shutdown.recv() => {
                    tracing::info!("Shutdown signal received, no longer accepting connections");
                    break;
                }
            }
        }

        let shutdown_timeout = server.config.shutdown_timeout();
        tracing::info!(
            open_connections = tracker.active_connections(),
            timeout = ?shutdown_timeout,
            "Waiting for connections to close"
        );

        if tokio::time::timeout(shutdown_timeout, tracker.drained())
            .await
            .is_err()
        {
            tracing::warn!(
                open_connections = tracker.active_connections(),
                "Shutdown timeout reached"
            );
        }

        tracing::info!("Server stopped");
        Ok(())
    }

    async fn handle_connection(
        self: Arc<Self>,
        stream: TcpStream,
        remote_addr: SocketAddr,
        shutdown: ShutdownSignal,
    ) -> Result<(), hyper::Error> {
        let io = TokioIo::new(stream);
        let keep_alive = self.config.keep_alive();

        let service = service_fn(move |request: Request<Incoming>| {
            let server = Arc::clone(&self);
            async move { Ok::<_, Infallible>(server.handle_request(request).await) }
        });

        let connection = http1::Builder::new()
            .keep_alive(keep_alive)
            .serve_connection(io, service);
        tokio::pin!(connection);

        tokio::select! {
            result = connection.as_mut() => result,
            () = shutdown.recv() => {
                tracing::debug!(remote_addr = %remote_addr, "Closing connection for shutdown");
                connection.as_mut().graceful_shutdown();
                connection.await
            }
        }
    }

    async fn handle_request(&self, request: Request<Incoming>) -> HttpResponse {
        let timeout = self.config.request_timeout();
        let method = request.method().clone();
        let path = request.uri().path().to_string();

        let outcome = tokio::time::timeout(timeout, async {
            let (parts, body) = request.into_parts();
            let body = match Limited::new(body, self.config.max_body_bytes()).collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => {
                    return ApiError::new(
                        StatusCode::PAYLOAD_TOO_LARGE,
                        format!(
                            "Request body exceeds {} bytes",
                            self.config.max_body_bytes()
                        ),
                    )
                    .to_response()
                    .into_http();
                }
                Err(err) => {
                    return ApiError::bad_request(format!("Failed to read request body: {err}"))
                        .to_response()
                        .into_http();
                }
            };

            self.router.handle(Request::from_parts(parts, body)).await
        })
        .await;

        let response = outcome.unwrap_or_else(|_| {
            tracing::warn!(method = %method, path = %path, timeout = ?timeout, "Request timed out");
            ApiError::new(StatusCode::GATEWAY_TIMEOUT, "Request timed out")
                .to_response()
                .into_http()
        });

        response.map(Full::new)
    }
}

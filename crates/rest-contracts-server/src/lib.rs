//! # REST Contracts Server
//!
//! Self-hosted HTTP server adapter for shared descriptors.
//!
//! - [`ApiRouter`] - Binds descriptors to handlers and dispatches requests
//! - [`Server`] - Hyper HTTP/1.1 accept loop with request timeout and body limit
//! - [`ShutdownSignal`] - Graceful shutdown on OS signals or on demand
//!
//! ## Status contract
//!
//! | Outcome | Status |
//! |---------|--------|
//! | `PUT` succeeded | 201 |
//! | `GET`/`DELETE` returned no value | 404, empty body |
//! | any other success | 200, or the status the handler chose |
//! | handler error | `status`/`statusCode`/`code` of the error, else 500 |
//! | invalid body or parameters | 400 |
//! | no matching path | 404 |
//! | path matches, method does not | 405 |
//! | body too large | 413 |
//! | request timed out | 504 |
//!
//! Errors are always sent as
//! `{"error": <structured error>, "message": <message>}`.

#![doc(html_root_url = "https://docs.rs/rest-contracts-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
mod error;
mod router;
mod server;
pub mod shutdown;

pub use config::{ServerConfig, ServerConfigBuilder};
pub use error::ServerError;
pub use router::{ApiRouter, RouteMatch};
pub use server::{HttpResponse, Server};
pub use shutdown::{ConnectionTracker, ShutdownSignal};

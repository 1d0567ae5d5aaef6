//! # REST Contracts Client
//!
//! Typed request functions derived from shared descriptors.
//!
//! A [`ClientFactory`] holds the base URL, default [`RequestOptions`] and a
//! [`Transport`]. For each descriptor it produces a [`RequestFn`] whose
//! argument type follows the descriptor's parameter shape, so a call with
//! the wrong parameters does not compile.
//!
//! ## Request flow
//!
//! 1. Path parameters are substituted into the template
//! 2. Query parameters are appended (`GET`, `DELETE`) or the body is
//!    JSON-encoded (`POST`, `PUT`, `PATCH`)
//! 3. The request goes through the transport, bounded by the timeout
//! 4. A 2xx body is decoded per the result kind; anything else becomes a
//!    [`ClientError`]
//!
//! ## Errors
//!
//! A server that answers with `{"error": ...}` gets that value back as
//! [`ClientError::Application`], so structured errors cross the wire
//! intact. The exception checks ([`ClientError::is_not_found`],
//! [`ClientError::is_unauthorized_or_forbidden`], ...) work on every
//! variant that carries a status.

#![doc(html_root_url = "https://docs.rs/rest-contracts-client/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod error;
mod options;
mod transport;

pub use client::{ClientFactory, RequestFn};
pub use error::{ClientError, ClientResult, JSON_PARSE_ERROR};
pub use options::{RequestOptions, DEFAULT_ACCEPT};
pub use transport::{ReqwestTransport, Transport, TransportRequest, TransportResponse};
pub use http::StatusCode;

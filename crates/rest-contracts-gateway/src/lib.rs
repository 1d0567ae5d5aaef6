//! # REST Contracts Gateway
//!
//! Adapter for serverless hosts behind an API gateway proxy integration.
//!
//! Each [`GatewayHandler`] binds one descriptor to one handler and turns a
//! [`GatewayEvent`] into a [`GatewayResponse`]. Status rules and error
//! bodies match the self-hosted server:
//!
//! - `PUT` success is 201, `GET`/`DELETE` without a value is 404
//! - handler errors use the error's `status`/`statusCode`/`code`, else 500
//! - an event whose method differs from the descriptor is 405
//!
//! Raw binary results are base64-encoded and flagged with
//! `isBase64Encoded`; base64 request bodies are decoded before parsing.

#![doc(html_root_url = "https://docs.rs/rest-contracts-gateway/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod cors;
mod error;
mod event;
mod handler;

pub use cors::CorsOrigins;
pub use error::GatewayError;
pub use event::{GatewayEvent, GatewayResponse};
pub use handler::{ErrorHandler, GatewayHandler, GatewayOptions};

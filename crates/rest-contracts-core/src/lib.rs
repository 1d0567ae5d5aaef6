//! # REST Contracts Core
//!
//! Shared, declarative descriptions of HTTP endpoints.
//!
//! A descriptor is declared once and consumed by both sides of the wire:
//! the client crate derives a typed request function from it, the server
//! and gateway crates derive a typed handler registration from it.
//!
//! - [`Api`] - Staged builder producing an [`ApiDescriptor`]
//! - [`registry`] - Process-wide `(method, path)` uniqueness check
//! - [`PathTemplate`] - Path tokenization, assembly and matching
//! - [`Endpoint`] - Descriptor plus handler, the request pipeline shared by server adapters
//! - [`ApiError`] - Handler error with status-field sniffing
//!
//! # Example
//!
//! ```
//! use rest_contracts_core::Api;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct ExcuseId {
//!     id: String,
//! }
//!
//! #[derive(Serialize, Deserialize)]
//! struct Excuse {
//!     id: String,
//!     description: String,
//! }
//!
//! let get_excuse = Api::get()
//!     .path_parameters::<ExcuseId>()
//!     .returns::<Excuse>()
//!     .path("/doc/excuses/:id/")
//!     .unwrap();
//!
//! assert!(get_excuse.has_path_parameters());
//! assert!(!get_excuse.has_query_parameters());
//! ```

#![doc(html_root_url = "https://docs.rs/rest-contracts-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod builder;
pub mod contract;
mod context;
mod error;
mod handler;
mod method;
pub mod registry;
pub mod resolve;
pub mod serde_helpers;

pub use builder::{Api, ApiBuilder, PathStage};
pub use context::{RequestContext, RequestId};
pub use contract::{
    ApiDescriptor, ApiSpec, BodyOnly, CallParts, CallShape, Json, NoParams, Parameters,
    PathAndBody, PathAndQuery, PathOnly, QueryOnly, Raw, RawBody, ResultEncoding, ResultKind,
    Shape, ShapeTag, Void,
};
pub use error::{ApiError, ContractError, DuplicateRouteError, ResolveError, STATUS_FIELDS};
pub use handler::{
    merge_params, status_for, ApiRequest, ApiResponse, BoxedResponse, Endpoint, ErasedHandler,
    RawRequest, Reply, ResponseBody,
};
pub use method::{BodyMethod, Delete, Get, Method, MethodKind, Patch, Post, Put, QueryMethod};
pub use resolve::{append_query, encode_query, parse_query, PathTemplate, ResolvedPath, Segment};

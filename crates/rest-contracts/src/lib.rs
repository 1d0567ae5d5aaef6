//! # REST Contracts
//!
//! **Declare an HTTP API once, call it and serve it from the same value.**
//!
//! A descriptor fixes an endpoint's method, path template, parameter
//! shapes and result type. The client adapter turns it into a typed
//! request function; the server and gateway adapters turn it into a typed
//! handler registration. Both sides share one path resolver, so a path the
//! client builds is always a path the server matches.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rest_contracts::prelude::*;
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
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let get_excuse = Api::get()
//!         .path_parameters::<ExcuseId>()
//!         .returns::<Excuse>()
//!         .path("/excuses/:id/")?;
//!
//!     // Server side
//!     let mut router = ApiRouter::new();
//!     router.implement(&get_excuse, |request: ApiRequest<PathOnly<Get, ExcuseId>>| async move {
//!         Ok(Reply::ok(Excuse {
//!             id: request.params.id,
//!             description: "The dog ate it".into(),
//!         }))
//!     });
//!     tokio::spawn(Server::new(ServerConfig::default(), router).run());
//!
//!     // Client side
//!     let client = ClientFactory::new("http://localhost:8080")?;
//!     let excuse = client
//!         .request_fn(&get_excuse)
//!         .call(&ExcuseId { id: "abc".into() })
//!         .await?;
//!     println!("{}", excuse.description);
//!     Ok(())
//! }
//! ```
//!
//! ## Crates
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`core`] | Builder, descriptors, registry, path resolver, request pipeline |
//! | [`client`] | `ClientFactory`, `RequestFn`, `RequestOptions`, transports |
//! | [`server`] | `ApiRouter` and the Hyper server |
//! | [`gateway`] | Serverless gateway adapter |
//! | [`telemetry`] | Logging setup |
//! | [`config`] | Layered configuration |

#![doc(html_root_url = "https://docs.rs/rest-contracts/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use rest_contracts_core as core;

// Re-export client types
pub use rest_contracts_client as client;

// Re-export server types
pub use rest_contracts_server as server;

// Re-export gateway types
pub use rest_contracts_gateway as gateway;

// Re-export logging setup
pub use rest_contracts_telemetry as telemetry;

// Re-export configuration
pub use rest_contracts_config as config;

/// Prelude module for convenient imports.
///
/// ```rust
/// use rest_contracts::prelude::*;
///
/// let api = Api::delete().returns_void().path("/doc/prelude").unwrap();
/// assert_eq!(api.method(), Method::Delete);
/// ```
pub mod prelude {
    pub use rest_contracts_core::{
        Api, ApiDescriptor, ApiError, ApiRequest, BodyOnly, CallShape, ContractError, Delete,
        Endpoint, Get, Json, Method, NoParams, Patch, PathAndBody, PathAndQuery, PathOnly, Post,
        Put, QueryOnly, Raw, RawBody, Reply, RequestContext, Void,
    };

    // Client
    pub use rest_contracts_client::{ClientError, ClientFactory, RequestFn, RequestOptions};

    // Server
    pub use rest_contracts_server::{ApiRouter, Server, ServerConfig, ShutdownSignal};

    // Gateway
    pub use rest_contracts_gateway::{
        CorsOrigins, GatewayEvent, GatewayHandler, GatewayOptions, GatewayResponse,
    };

    // Logging and configuration
    pub use rest_contracts_config::{ConfigLoader, RestContractsConfig};
    pub use rest_contracts_telemetry::{init_logging, LogConfig};
}

//! Staged construction of descriptors.
//!
//! Each stage is a distinct type exposing only the transitions still valid,
//! so declaring a body on a `GET`, query parameters on a `PUT`, or two
//! path-parameter types does not compile:
//!
//! ```compile_fail
//! use rest_contracts_core::Api;
//!
//! let _ = Api::put().query_parameters::<std::collections::HashMap<String, String>>();
//! ```
//!
//! ```compile_fail
//! use rest_contracts_core::Api;
//!
//! let _ = Api::get().path("/no-result-declared");
//! ```
//!
//! The stages are, in order: method, optional path parameters, optional
//! query parameters or body, result, path.

use std::marker::PhantomData;
use std::panic::Location;

use crate::contract::{
    ApiDescriptor, ApiSpec, BodyOnly, Json, NoParams, Parameters, PathAndBody, PathAndQuery,
    PathOnly, QueryOnly, Raw, ResultKind, Shape, Void,
};
use crate::error::ContractError;
use crate::method::{BodyMethod, Delete, Get, MethodKind, Patch, Post, Put, QueryMethod};
use crate::registry;
use crate::resolve::PathTemplate;

/// Entry point of the builder.
///
/// # Example
///
/// ```
/// use rest_contracts_core::Api;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Search {
///     quality: Option<String>,
/// }
///
/// let query_excuses = Api::get()
///     .query_parameters::<Search>()
///     .returns::<Vec<String>>()
///     .path("/doc/builder/excuses/")
///     .unwrap();
///
/// assert!(query_excuses.has_query_parameters());
/// assert!(!query_excuses.has_body());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Api;

impl Api {
    /// Starts a `GET` descriptor.
    #[must_use]
    pub fn get() -> ApiBuilder<NoParams<Get>> {
        ApiBuilder::new()
    }

    /// Starts a `DELETE` descriptor.
    #[must_use]
    pub fn delete() -> ApiBuilder<NoParams<Delete>> {
        ApiBuilder::new()
    }

    /// Starts a `POST` descriptor.
    #[must_use]
    pub fn post() -> ApiBuilder<NoParams<Post>> {
        ApiBuilder::new()
    }

    /// Starts a `PUT` descriptor.
    #[must_use]
    pub fn put() -> ApiBuilder<NoParams<Put>> {
        ApiBuilder::new()
    }

    /// Starts a `PATCH` descriptor.
    #[must_use]
    pub fn patch() -> ApiBuilder<NoParams<Patch>> {
        ApiBuilder::new()
    }
}

/// Builder stage holding the parameter shape declared so far.
#[derive(Debug)]
#[must_use = "a builder does nothing until `path` is called"]
pub struct ApiBuilder<S> {
    _shape: PhantomData<fn() -> S>,
}

impl<S> ApiBuilder<S> {
    fn new() -> Self {
        Self {
            _shape: PhantomData,
        }
    }
}

impl<M: MethodKind> ApiBuilder<NoParams<M>> {
    /// Declares the path-parameter type.
    pub fn path_parameters<P: Parameters>(self) -> ApiBuilder<PathOnly<M, P>> {
        ApiBuilder::new()
    }
}

impl<M: QueryMethod> ApiBuilder<NoParams<M>> {
    /// Declares the query-parameter type.
    pub fn query_parameters<Q: Parameters>(self) -> ApiBuilder<QueryOnly<M, Q>> {
        ApiBuilder::new()
    }
}

impl<M: QueryMethod, P: Parameters> ApiBuilder<PathOnly<M, P>> {
    /// Declares the query-parameter type.
    pub fn query_parameters<Q: Parameters>(self) -> ApiBuilder<PathAndQuery<M, P, Q>> {
        ApiBuilder::new()
    }
}

impl<M: BodyMethod> ApiBuilder<NoParams<M>> {
    /// Declares the body type.
    pub fn body<B: Parameters>(self) -> ApiBuilder<BodyOnly<M, B>> {
        ApiBuilder::new()
    }
}

impl<M: BodyMethod, P: Parameters> ApiBuilder<PathOnly<M, P>> {
    /// Declares the body type.
    pub fn body<B: Parameters>(self) -> ApiBuilder<PathAndBody<M, P, B>> {
        ApiBuilder::new()
    }
}

impl<S: Shape> ApiBuilder<S> {
    /// Declares a JSON-encoded result of type `T`.
    pub fn returns<T: Parameters>(self) -> PathStage<S, Json<T>> {
        PathStage::new(None)
    }

    /// Declares that the endpoint returns nothing.
    pub fn returns_void(self) -> PathStage<S, Void> {
        PathStage::new(None)
    }

    /// Declares a raw string or binary result.
    pub fn returns_raw(self) -> PathStage<S, Raw> {
        PathStage::new(None)
    }
}

/// Final stage: the result is declared, the path is not.
#[derive(Debug)]
#[must_use = "a builder does nothing until `path` is called"]
pub struct PathStage<S, K> {
    content_type: Option<String>,
    _marker: PhantomData<fn() -> (S, K)>,
}

impl<S, K> PathStage<S, K> {
    fn new(content_type: Option<String>) -> Self {
        Self {
            content_type,
            _marker: PhantomData,
        }
    }
}

impl<S: Shape> PathStage<S, Raw> {
    /// Sets the content type sent with raw results.
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

impl<S: Shape, K: ResultKind> PathStage<S, K> {
    /// Sets the path template and finalizes the descriptor.
    ///
    /// This is the only stage with a side effect: the `(method, path)` pair
    /// is claimed in the process-wide [`registry`].
    ///
    /// # Errors
    ///
    /// - [`ContractError::DuplicateRoute`] if the pair is already claimed
    /// - [`ContractError::UndeclaredPathParameters`] if the template has
    ///   parameter segments but no path-parameter type was declared
    #[track_caller]
    pub fn path(self, path: &str) -> Result<ApiDescriptor<S, K>, ContractError> {
        let origin = Location::caller();
        let method = <S::Method as MethodKind>::METHOD;
        let template = PathTemplate::parse(path);

        if template.has_params() && !S::TAG.has_path_shape() {
            return Err(ContractError::UndeclaredPathParameters {
                method,
                path: path.to_string(),
                names: template.param_names().collect::<Vec<_>>().join(", "),
            });
        }

        registry::register(method, path, origin)?;
        tracing::debug!(method = %method, path = %path, "Declared API");

        Ok(ApiDescriptor::new(ApiSpec::new(
            method,
            template,
            S::TAG,
            K::ENCODING,
            self.content_type,
            origin,
        )))
    }
}

//! Excuse contracts shared by the server and the client.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use rest_contracts::prelude::*;
use serde::{Deserialize, Serialize};

/// How convincing an excuse is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExcuseQuality {
    /// Holds up to scrutiny.
    #[serde(rename = "solid")]
    Good,
    /// Might work on a good day.
    #[serde(rename = "iffy")]
    Mediocre,
    /// Nobody believes it.
    #[serde(rename = "lame")]
    Poor,
}

/// Excuse identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExcuseId(String);

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

impl ExcuseId {
    /// Wraps an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Allocates a fresh sequential identifier.
    pub fn generate() -> Self {
        Self(format!("ExcuseId:{}", NEXT_ID.fetch_add(1, Ordering::Relaxed)))
    }

    /// The identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExcuseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored excuse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Excuse {
    /// Identifier.
    pub id: ExcuseId,
    /// Quality rating.
    pub quality: ExcuseQuality,
    /// The excuse itself.
    pub description: String,
}

/// An excuse to store; the server assigns an id when none is given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewExcuse {
    /// Identifier to store under, if already known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ExcuseId>,
    /// Quality rating.
    pub quality: ExcuseQuality,
    /// The excuse itself.
    pub description: String,
}

/// Path parameters of [`ExcuseApi::get`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExcuseKey {
    /// Excuse to fetch.
    pub id: ExcuseId,
}

/// Query parameters of [`ExcuseApi::query`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExcuseFilter {
    /// Only excuses of this quality; all excuses when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<ExcuseQuality>,
}

/// The Excuse API.
#[derive(Debug, Clone)]
pub struct ExcuseApi {
    /// `GET /excuses/:id/`
    pub get: ApiDescriptor<PathOnly<Get, ExcuseKey>, Json<Excuse>>,
    /// `GET /excuses/`
    pub query: ApiDescriptor<QueryOnly<Get, ExcuseFilter>, Json<Vec<Excuse>>>,
    /// `PUT /excuses/`
    pub put: ApiDescriptor<BodyOnly<Put, NewExcuse>, Json<Excuse>>,
}

impl ExcuseApi {
    /// Declares the descriptors. Call once per process.
    pub fn new() -> Result<Self, ContractError> {
        Ok(Self {
            get: Api::get()
                .path_parameters::<ExcuseKey>()
                .returns::<Excuse>()
                .path("/excuses/:id/")?,
            query: Api::get()
                .query_parameters::<ExcuseFilter>()
                .returns::<Vec<Excuse>>()
                .path("/excuses/")?,
            put: Api::put()
                .body::<NewExcuse>()
                .returns::<Excuse>()
                .path("/excuses/")?,
        })
    }
}

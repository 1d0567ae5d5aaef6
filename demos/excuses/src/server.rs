//! In-memory Excuse server.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use rest_contracts::prelude::*;

use crate::contract::{Excuse, ExcuseApi, ExcuseFilter, ExcuseId, ExcuseKey, NewExcuse};

/// Excuses keyed by id.
#[derive(Debug, Default)]
pub struct ExcuseStore {
    excuses: RwLock<BTreeMap<ExcuseId, Excuse>>,
}

impl ExcuseStore {
    /// Stores an excuse, assigning an id if it has none.
    pub fn put(&self, excuse: NewExcuse) -> Excuse {
        let excuse = Excuse {
            id: excuse.id.unwrap_or_else(ExcuseId::generate),
            quality: excuse.quality,
            description: excuse.description,
        };
        self.excuses.write().insert(excuse.id.clone(), excuse.clone());
        excuse
    }

    /// Looks up one excuse.
    pub fn get(&self, id: &ExcuseId) -> Option<Excuse> {
        self.excuses.read().get(id).cloned()
    }

    /// Every excuse matching the filter.
    pub fn query(&self, filter: &ExcuseFilter) -> Vec<Excuse> {
        self.excuses
            .read()
            .values()
            .filter(|excuse| filter.quality.map_or(true, |quality| excuse.quality == quality))
            .cloned()
            .collect()
    }
}

/// Implements every Excuse API against `store`.
pub fn router(api: &ExcuseApi, store: Arc<ExcuseStore>) -> ApiRouter {
    let mut router = ApiRouter::new();

    let put_store = Arc::clone(&store);
    router.implement(&api.put, move |request: ApiRequest<BodyOnly<Put, NewExcuse>>| {
        let store = Arc::clone(&put_store);
        async move { Ok(Reply::ok(store.put(request.body))) }
    });

    let get_store = Arc::clone(&store);
    router.implement(&api.get, move |request: ApiRequest<PathOnly<Get, ExcuseKey>>| {
        let store = Arc::clone(&get_store);
        async move { Ok(Reply::from(store.get(&request.params.id))) }
    });

    router.implement(&api.query, move |request: ApiRequest<QueryOnly<Get, ExcuseFilter>>| {
        let store = Arc::clone(&store);
        async move { Ok(Reply::ok(store.query(&request.params))) }
    });

    router
}

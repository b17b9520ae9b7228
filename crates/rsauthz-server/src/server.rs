//! The authorization server.
//!
//! [`AuthzServer`] owns the store handle, the namespace store cache and the
//! process-wide authorization context. The request handlers in
//! [`crate::handlers`] are implemented as methods on it.

use std::sync::Arc;

use rsauthz_common::TupleKey;
use rsauthz_store::TupleStore;
use tokio::sync::RwLock;

use crate::config::{EngineSettings, ServerConfig};
use crate::list_objects::ObjectLister;
use crate::store_cache::StoreCache;

pub struct AuthzServer<S: TupleStore> {
    pub(crate) store: Arc<S>,
    pub(crate) cache: Arc<StoreCache<S>>,
    pub(crate) lister: ObjectLister<S>,
    pub(crate) settings: EngineSettings,
    pub(crate) write_permission: String,
    /// Contextual tuples injected into every check and list request.
    pub(crate) authorization_context: RwLock<Vec<TupleKey>>,
}

impl<S: TupleStore> AuthzServer<S> {
    pub fn new(store: Arc<S>, config: &ServerConfig) -> Self {
        let cache = Arc::new(StoreCache::new(Arc::clone(&store)));
        Self::with_cache(store, cache, config)
    }

    /// Builds a server sharing `cache`, e.g. with the reconciler.
    pub fn with_cache(store: Arc<S>, cache: Arc<StoreCache<S>>, config: &ServerConfig) -> Self {
        Self {
            lister: ObjectLister::new(Arc::clone(&store), &config.engine),
            store,
            cache,
            settings: config.engine.clone(),
            write_permission: config.auth.write_permission.clone(),
            authorization_context: RwLock::new(Vec::new()),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn cache(&self) -> &Arc<StoreCache<S>> {
        &self.cache
    }
}

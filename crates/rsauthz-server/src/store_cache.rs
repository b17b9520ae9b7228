//! Namespace to store/model resolution.
//!
//! Each namespace maps to one physical store (named after the namespace)
//! and the id of the authorization model loaded into it. Entries are
//! created lazily and kept for the lifetime of the cache.

use std::collections::HashMap;
use std::sync::Arc;

use rsauthz_common::model::AuthorizationModel;
use rsauthz_common::schema::authorization_model;
use rsauthz_store::TupleStore;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::error::{AuthzError, AuthzResult};

/// Physical store and model backing a namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreInfo {
    pub id: String,
    pub model_id: String,
}

pub struct StoreCache<S: TupleStore> {
    store: Arc<S>,
    model: AuthorizationModel,
    // One lock covers lookup, store creation and model loading so two
    // first callers for a namespace cannot race each other.
    entries: Mutex<HashMap<String, StoreInfo>>,
}

impl<S: TupleStore> StoreCache<S> {
    /// Creates a cache that installs the built-in authorization model.
    pub fn new(store: Arc<S>) -> Self {
        Self::with_model(store, authorization_model())
    }

    pub fn with_model(store: Arc<S>, model: AuthorizationModel) -> Self {
        Self {
            store,
            model,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Resolves the store of `namespace`, creating it on first use.
    ///
    /// Failures are not cached; the next call retries from scratch.
    #[instrument(skip(self))]
    pub async fn get_store_info(&self, namespace: &str) -> AuthzResult<StoreInfo> {
        if namespace.is_empty() {
            return Err(AuthzError::invalid("namespace is required"));
        }

        let mut entries = self.entries.lock().await;
        if let Some(info) = entries.get(namespace) {
            return Ok(info.clone());
        }

        let store = self.store.get_or_create_store(namespace).await?;
        let model_id = self.load_model(&store.id).await?;
        let info = StoreInfo {
            id: store.id,
            model_id,
        };
        debug!(store_id = %info.id, model_id = %info.model_id, "cached store info");
        entries.insert(namespace.to_string(), info.clone());
        Ok(info)
    }

    /// Returns the latest model id, writing the built-in model first when
    /// the store has none or an outdated one.
    async fn load_model(&self, store_id: &str) -> AuthzResult<String> {
        if let Some(latest) = self.store.find_latest_authorization_model(store_id).await? {
            if latest.model == self.model {
                return Ok(latest.id);
            }
        }
        let written = self
            .store
            .write_authorization_model(store_id, self.model.clone())
            .await?;
        info!(store_id, model_id = %written.id, "wrote authorization model");
        Ok(written.id)
    }
}

//! In-memory tuple store.
//!
//! Tuples are kept per store in a `BTreeMap` keyed by their condition-free
//! identity, so reads come back in a stable order and the resolver can
//! range-scan `(object, relation)` prefixes.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::stream::{self, BoxStream, StreamExt};
use rsauthz_common::ident::{type_of, Ident};
use rsauthz_common::model::AuthorizationModel;
use rsauthz_common::{TupleIdentity, TupleKey};
use tracing::{debug, instrument};
use ulid::Ulid;

use crate::cel::ConditionEvaluator;
use crate::error::{StoreError, StoreResult};
use crate::resolver::{Resolver, DEFAULT_MAX_DEPTH};
use crate::traits::{
    paginate, CheckRequest, ListObjectsRequest, OnDuplicate, OnMissing, PaginatedResult,
    PaginationOptions, Store, StoredAuthorizationModel, TupleFilter, TupleStore, WriteRequest,
};

/// In-memory implementation of [`TupleStore`].
///
/// Uses DashMap for thread-safe concurrent access. Checks evaluate the
/// authorization model synchronously while holding shard read guards.
#[derive(Debug)]
pub struct MemoryTupleStore {
    stores: DashMap<String, Store>,
    /// Store name to store id.
    names: DashMap<String, String>,
    tuples: DashMap<String, BTreeMap<TupleIdentity, TupleKey>>,
    /// Models in insertion order; the newest is last.
    authorization_models: DashMap<String, Vec<StoredAuthorizationModel>>,
    conditions: ConditionEvaluator,
    max_depth: u32,
}

impl Default for MemoryTupleStore {
    fn default() -> Self {
        Self {
            stores: DashMap::new(),
            names: DashMap::new(),
            tuples: DashMap::new(),
            authorization_models: DashMap::new(),
            conditions: ConditionEvaluator::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl MemoryTupleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory tuple store wrapped in Arc.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    fn ensure_store(&self, store_id: &str) -> StoreResult<()> {
        if self.stores.contains_key(store_id) {
            Ok(())
        } else {
            Err(StoreError::StoreNotFound {
                store_id: store_id.to_string(),
            })
        }
    }

    /// Runs `f` against the requested model, or the newest one when
    /// `model_id` is empty.
    fn with_model<T>(
        &self,
        store_id: &str,
        model_id: &str,
        f: impl FnOnce(&AuthorizationModel) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let models = self.authorization_models.get(store_id);
        let stored = models.as_ref().and_then(|models| {
            if model_id.is_empty() {
                models.last()
            } else {
                models.iter().find(|m| m.id == model_id)
            }
        });
        match stored {
            Some(stored) => f(&stored.model),
            None => Err(StoreError::ModelNotFound {
                model_id: model_id.to_string(),
            }),
        }
    }

    fn evaluate<T>(
        &self,
        store_id: &str,
        model_id: &str,
        contextual_tuples: &[TupleKey],
        context: &BTreeMap<String, serde_json::Value>,
        f: impl FnOnce(&Resolver<'_>) -> StoreResult<T>,
    ) -> StoreResult<T> {
        self.ensure_store(store_id)?;
        self.with_model(store_id, model_id, |model| {
            let empty = BTreeMap::new();
            let tuples = self.tuples.get(store_id);
            let resolver = Resolver {
                model,
                tuples: tuples.as_deref().unwrap_or(&empty),
                contextual_tuples,
                context,
                conditions: &self.conditions,
                max_depth: self.max_depth,
            };
            f(&resolver)
        })
    }

    fn resolve_list_objects(&self, request: &ListObjectsRequest) -> StoreResult<Vec<String>> {
        validate_user(&request.user)?;
        self.evaluate(
            &request.store_id,
            &request.model_id,
            &request.contextual_tuples,
            &request.context,
            |resolver| {
                if resolver
                    .model
                    .relation(&request.type_name, &request.relation)
                    .is_none()
                {
                    return Err(StoreError::RelationNotFound {
                        type_name: request.type_name.clone(),
                        relation: request.relation.clone(),
                    });
                }

                let mut objects = Vec::new();
                for object in resolver.candidate_objects(&request.type_name) {
                    match resolver.check(&object, &request.relation, &request.user) {
                        Ok(true) => objects.push(object),
                        Ok(false) | Err(StoreError::DepthLimitExceeded { .. }) => {}
                        Err(e) => return Err(e),
                    }
                }
                Ok(objects)
            },
        )
    }
}

fn validate_user(user: &str) -> StoreResult<()> {
    Ident::parse(user)
        .map(|_| ())
        .map_err(|e| StoreError::InvalidInput {
            message: format!("invalid user '{user}': {e}"),
        })
}

fn validate_tuple(tuple: &TupleKey, model: Option<&AuthorizationModel>) -> StoreResult<()> {
    validate_user(&tuple.user)?;
    let object = Ident::parse(&tuple.object).map_err(|e| StoreError::InvalidInput {
        message: format!("invalid object '{}': {e}", tuple.object),
    })?;
    if object.is_userset() || object.is_wildcard() {
        return Err(StoreError::InvalidInput {
            message: format!("object must be a concrete object: {}", tuple.object),
        });
    }
    if tuple.relation.is_empty() {
        return Err(StoreError::InvalidInput {
            message: format!("empty relation in tuple {tuple}"),
        });
    }
    if let Some(model) = model {
        if model.relation(type_of(&tuple.object), &tuple.relation).is_none() {
            return Err(StoreError::InvalidInput {
                message: format!("relation not defined by the model: {tuple}"),
            });
        }
        if let Some(condition) = &tuple.condition {
            if model.condition(&condition.name).is_none() {
                return Err(StoreError::InvalidInput {
                    message: format!("condition not defined by the model: {tuple}"),
                });
            }
        }
    }
    Ok(())
}

#[async_trait]
impl TupleStore for MemoryTupleStore {
    #[instrument(skip(self))]
    async fn get_or_create_store(&self, name: &str) -> StoreResult<Store> {
        if name.is_empty() {
            return Err(StoreError::InvalidInput {
                message: "store name cannot be empty".to_string(),
            });
        }

        // The entry guard serializes concurrent creators of the same name.
        match self.names.entry(name.to_string()) {
            Entry::Occupied(entry) => self
                .stores
                .get(entry.get())
                .map(|s| s.value().clone())
                .ok_or_else(|| StoreError::StoreNotFound {
                    store_id: entry.get().clone(),
                }),
            Entry::Vacant(entry) => {
                let store = Store {
                    id: Ulid::new().to_string(),
                    name: name.to_string(),
                    created_at: chrono::Utc::now(),
                };
                self.stores.insert(store.id.clone(), store.clone());
                self.tuples.entry(store.id.clone()).or_default();
                entry.insert(store.id.clone());
                debug!(store_id = %store.id, "created store");
                Ok(store)
            }
        }
    }

    async fn list_stores(
        &self,
        pagination: &PaginationOptions,
    ) -> StoreResult<PaginatedResult<Store>> {
        let mut stores: Vec<Store> = self.stores.iter().map(|s| s.value().clone()).collect();
        stores.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        paginate(stores, pagination)
    }

    async fn write_authorization_model(
        &self,
        store_id: &str,
        model: AuthorizationModel,
    ) -> StoreResult<StoredAuthorizationModel> {
        self.ensure_store(store_id)?;
        let stored = StoredAuthorizationModel {
            id: Ulid::new().to_string(),
            store_id: store_id.to_string(),
            model,
            created_at: chrono::Utc::now(),
        };
        self.authorization_models
            .entry(store_id.to_string())
            .or_default()
            .push(stored.clone());
        Ok(stored)
    }

    async fn find_latest_authorization_model(
        &self,
        store_id: &str,
    ) -> StoreResult<Option<StoredAuthorizationModel>> {
        self.ensure_store(store_id)?;
        Ok(self
            .authorization_models
            .get(store_id)
            .and_then(|models| models.last().cloned()))
    }

    #[instrument(skip(self, request), fields(store_id = %request.store_id))]
    async fn check(&self, request: &CheckRequest) -> StoreResult<bool> {
        let key = &request.tuple_key;
        validate_user(&key.user)?;
        for tuple in &request.contextual_tuples {
            validate_tuple(tuple, None)?;
        }

        self.evaluate(
            &request.store_id,
            &request.model_id,
            &request.contextual_tuples,
            &request.context,
            |resolver| resolver.check(&key.object, &key.relation, &key.user),
        )
    }

    async fn read(
        &self,
        store_id: &str,
        filter: &TupleFilter,
        pagination: &PaginationOptions,
    ) -> StoreResult<PaginatedResult<TupleKey>> {
        self.ensure_store(store_id)?;
        if filter.object.is_none() && filter.user.is_some() {
            return Err(StoreError::InvalidFilter {
                message: "a user filter requires an object or object type".to_string(),
            });
        }

        let matching: Vec<TupleKey> = self
            .tuples
            .get(store_id)
            .map(|tuples| {
                tuples
                    .values()
                    .filter(|t| filter.matches(t))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        paginate(matching, pagination)
    }

    #[instrument(skip(self, request), fields(
        store_id = %request.store_id,
        writes = request.writes.len(),
        deletes = request.deletes.len(),
    ))]
    async fn write(&self, request: &WriteRequest) -> StoreResult<()> {
        self.ensure_store(&request.store_id)?;
        self.with_model(&request.store_id, &request.model_id, |model| {
            for tuple in request.writes.iter().chain(&request.deletes) {
                validate_tuple(tuple, Some(model))?;
            }
            Ok(())
        })?;

        let mut tuples = self.tuples.entry(request.store_id.clone()).or_default();

        // Validate everything before mutating so the change is all-or-nothing.
        let mut deleted = HashSet::new();
        for tuple in &request.deletes {
            let identity = tuple.identity();
            if !tuples.contains_key(&identity) && request.on_missing == OnMissing::Error {
                return Err(StoreError::InvalidInput {
                    message: format!("cannot delete a tuple which does not exist: {tuple}"),
                });
            }
            deleted.insert(identity);
        }
        if request.on_duplicate == OnDuplicate::Error {
            for tuple in &request.writes {
                let identity = tuple.identity();
                if tuples.contains_key(&identity) && !deleted.contains(&identity) {
                    return Err(StoreError::InvalidInput {
                        message: format!("cannot write a tuple which already exists: {tuple}"),
                    });
                }
            }
        }

        for identity in &deleted {
            tuples.remove(identity);
        }
        for tuple in &request.writes {
            // Existing tuples are kept as written.
            tuples
                .entry(tuple.identity())
                .or_insert_with(|| tuple.clone());
        }

        Ok(())
    }

    #[instrument(skip(self, request), fields(
        store_id = %request.store_id,
        type_name = %request.type_name,
        relation = %request.relation,
    ))]
    async fn list_objects(&self, request: &ListObjectsRequest) -> StoreResult<Vec<String>> {
        self.resolve_list_objects(request)
    }

    async fn streamed_list_objects(
        &self,
        request: &ListObjectsRequest,
    ) -> StoreResult<BoxStream<'static, StoreResult<String>>> {
        let objects = self.resolve_list_objects(request)?;
        Ok(stream::iter(objects.into_iter().map(Ok)).boxed())
    }
}

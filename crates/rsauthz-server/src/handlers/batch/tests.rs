//! Tests for the batch check handler.

use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use rsauthz_common::model::AuthorizationModel;
use rsauthz_common::tuple::{new_folder_resource_tuple, new_group_resource_tuple};
use rsauthz_common::TupleKey;
use rsauthz_store::{
    CheckRequest, ListObjectsRequest, MemoryTupleStore, OnDuplicate, OnMissing, PaginatedResult,
    PaginationOptions, Store, StoreResult, StoredAuthorizationModel, TupleFilter, TupleStore,
    WriteRequest,
};

use crate::auth::AuthInfo;
use crate::config::ServerConfig;
use crate::error::AuthzError;
use crate::server::AuthzServer;

// ============================================================
// Test Store
// ============================================================

/// Memory store that counts group-resource checks.
struct CountingStore {
    inner: MemoryTupleStore,
    group_checks: AtomicUsize,
}

#[async_trait]
impl TupleStore for CountingStore {
    async fn get_or_create_store(&self, name: &str) -> StoreResult<Store> {
        self.inner.get_or_create_store(name).await
    }

    async fn list_stores(
        &self,
        pagination: &PaginationOptions,
    ) -> StoreResult<PaginatedResult<Store>> {
        self.inner.list_stores(pagination).await
    }

    async fn write_authorization_model(
        &self,
        store_id: &str,
        model: AuthorizationModel,
    ) -> StoreResult<StoredAuthorizationModel> {
        self.inner.write_authorization_model(store_id, model).await
    }

    async fn find_latest_authorization_model(
        &self,
        store_id: &str,
    ) -> StoreResult<Option<StoredAuthorizationModel>> {
        self.inner.find_latest_authorization_model(store_id).await
    }

    async fn check(&self, request: &CheckRequest) -> StoreResult<bool> {
        if request.tuple_key.object.starts_with("group_resource:") {
            self.group_checks.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.check(request).await
    }

    async fn read(
        &self,
        store_id: &str,
        filter: &TupleFilter,
        pagination: &PaginationOptions,
    ) -> StoreResult<PaginatedResult<TupleKey>> {
        self.inner.read(store_id, filter, pagination).await
    }

    async fn write(&self, request: &WriteRequest) -> StoreResult<()> {
        self.inner.write(request).await
    }

    async fn list_objects(&self, request: &ListObjectsRequest) -> StoreResult<Vec<String>> {
        self.inner.list_objects(request).await
    }

    async fn streamed_list_objects(
        &self,
        request: &ListObjectsRequest,
    ) -> StoreResult<BoxStream<'static, StoreResult<String>>> {
        self.inner.streamed_list_objects(request).await
    }
}

async fn server_with(tuples: Vec<TupleKey>) -> (AuthzServer<CountingStore>, Arc<CountingStore>) {
    let store = Arc::new(CountingStore {
        inner: MemoryTupleStore::new(),
        group_checks: AtomicUsize::new(0),
    });
    let server = AuthzServer::new(Arc::clone(&store), &ServerConfig::default());
    let info = server.cache().get_store_info("org").await.unwrap();
    store
        .write(&WriteRequest {
            store_id: info.id,
            model_id: info.model_id,
            writes: tuples,
            deletes: Vec::new(),
            on_duplicate: OnDuplicate::Ignore,
            on_missing: OnMissing::Ignore,
        })
        .await
        .unwrap();
    (server, store)
}

fn dashboard(verb: &str, name: &str) -> BatchCheckItem {
    BatchCheckItem::new(verb, "dashboard.grafana.app", "dashboards", name)
}

fn request(items: Vec<BatchCheckItem>) -> BatchCheckRequest {
    BatchCheckRequest {
        namespace: "org".to_string(),
        subject: "user:1".to_string(),
        items,
        contextual_tuples: Vec::new(),
    }
}

const DASHBOARDS: &str = "dashboard.grafana.app/dashboards";

// ============================================================
// Section 1: Results
// ============================================================

/// Test: items are answered independently and grouped by group resource
#[tokio::test]
async fn test_batch_results_are_grouped_by_group_resource() {
    // Arrange
    let (server, _) = server_with(vec![
        new_folder_resource_tuple("user:1", "get", "dashboard.grafana.app", "dashboards", "", "f1"),
        TupleKey::new("user:1", "get", "folder:f2"),
    ])
    .await;
    let batch = request(vec![
        dashboard("get", "d1").with_folder("f1"),
        dashboard("get", "d2").with_folder("other"),
        BatchCheckItem::new("get", "folder.grafana.app", "folders", "f2"),
    ]);

    // Act
    let response = server
        .batch_check(&AuthInfo::new("org"), &batch)
        .await
        .unwrap();

    // Assert
    assert_eq!(response.allowed(DASHBOARDS, "d1"), Some(true));
    assert_eq!(response.allowed(DASHBOARDS, "d2"), Some(false));
    assert_eq!(
        response.allowed("folder.grafana.app/folders", "f2"),
        Some(true)
    );
    assert!(!response.all_allowed);
}

/// Test: all_allowed is set when every item is allowed
#[tokio::test]
async fn test_batch_all_allowed() {
    let (server, _) = server_with(vec![new_group_resource_tuple(
        "user:1",
        "view",
        "dashboard.grafana.app",
        "dashboards",
        "",
    )])
    .await;
    let batch = request(vec![dashboard("get", "d1"), dashboard("list", "d2")]);

    let response = server
        .batch_check(&AuthInfo::new("org"), &batch)
        .await
        .unwrap();

    assert!(response.all_allowed);
    assert_eq!(response.groups[DASHBOARDS].len(), 2);
}

/// Test: an empty batch fails closed
#[tokio::test]
async fn test_empty_batch_is_not_all_allowed() {
    let (server, store) = server_with(Vec::new()).await;

    let response = server
        .batch_check(&AuthInfo::new("org"), &request(Vec::new()))
        .await
        .unwrap();

    assert!(response.groups.is_empty());
    assert!(!response.all_allowed);
    assert_eq!(store.group_checks.load(Ordering::SeqCst), 0);
}

// ============================================================
// Section 2: Group-resource memo
// ============================================================

/// Test: the group-resource shortcut runs once per group resource and relation
#[tokio::test]
async fn test_group_resource_check_is_memoized() {
    let (server, store) = server_with(Vec::new()).await;
    let batch = request(vec![
        dashboard("get", "d1"),
        dashboard("get", "d2"),
        dashboard("list", "d3"),
        dashboard("update", "d4"),
        dashboard("get", "s1").with_subresource("status"),
    ]);

    server
        .batch_check(&AuthInfo::new("org"), &batch)
        .await
        .unwrap();

    // (dashboards, get), (dashboards, update), (dashboards/status, get)
    assert_eq!(store.group_checks.load(Ordering::SeqCst), 3);
}

// ============================================================
// Section 3: Validation
// ============================================================

/// Test: oversized batches are rejected before any store access
#[tokio::test]
async fn test_batch_too_large() {
    let (server, store) = server_with(Vec::new()).await;
    let items = (0..51).map(|i| dashboard("get", &format!("d{i}"))).collect();

    let result = server.batch_check(&AuthInfo::new("org"), &request(items)).await;

    assert!(matches!(result, Err(AuthzError::InvalidArgument { .. })));
    assert_eq!(store.group_checks.load(Ordering::SeqCst), 0);
}

/// Test: an invalid item fails the whole batch and names its index
#[tokio::test]
async fn test_invalid_item_reports_index() {
    let (server, store) = server_with(Vec::new()).await;
    let batch = request(vec![dashboard("get", "d1"), dashboard("fly", "d2")]);

    let err = server
        .batch_check(&AuthInfo::new("org"), &batch)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("index 1"), "{err}");
    assert_eq!(store.group_checks.load(Ordering::SeqCst), 0);
}

/// Test: two items with the same name in one group resource are rejected
#[tokio::test]
async fn test_duplicate_item_name_is_rejected() {
    let (server, store) = server_with(Vec::new()).await;
    let batch = request(vec![
        dashboard("get", "d1"),
        dashboard("get", "d1").with_subresource("status"),
        dashboard("update", "d1"),
    ]);

    let err = server
        .batch_check(&AuthInfo::new("org"), &batch)
        .await
        .unwrap_err();

    assert!(matches!(err, AuthzError::InvalidArgument { .. }));
    assert!(err.to_string().contains("index 2"), "{err}");
    assert_eq!(store.group_checks.load(Ordering::SeqCst), 0);
}

/// Test: the caller must be allowed in the namespace
#[tokio::test]
async fn test_batch_namespace_mismatch_is_denied() {
    let (server, _) = server_with(Vec::new()).await;

    let result = server
        .batch_check(&AuthInfo::new("other"), &request(vec![dashboard("get", "d1")]))
        .await;

    assert!(matches!(result, Err(AuthzError::PermissionDenied { .. })));
}

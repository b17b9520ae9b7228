//! Memory store integration tests.
//!
//! These tests drive the in-memory store through the `TupleStore` trait with
//! the built-in authorization model, the way the authorization server uses it.

use std::collections::BTreeMap;

use rsauthz_common::schema::authorization_model;
use rsauthz_common::tuple::{
    new_folder_parent_tuple, new_folder_resource_tuple, new_resource_tuple,
};
use rsauthz_common::TupleKey;
use rsauthz_store::{
    CheckRequest, MemoryTupleStore, OnDuplicate, OnMissing, TupleStore, WriteRequest,
};
use serde_json::{json, Value};

struct Fixture {
    store: MemoryTupleStore,
    store_id: String,
    model_id: String,
}

impl Fixture {
    async fn new(tuples: Vec<TupleKey>) -> Self {
        let store = MemoryTupleStore::new();
        let created = store.get_or_create_store("default").await.unwrap();
        let model = store
            .write_authorization_model(&created.id, authorization_model())
            .await
            .unwrap();
        let fixture = Self {
            store,
            store_id: created.id,
            model_id: model.id,
        };
        fixture
            .store
            .write(&WriteRequest {
                store_id: fixture.store_id.clone(),
                model_id: fixture.model_id.clone(),
                writes: tuples,
                deletes: Vec::new(),
                on_duplicate: OnDuplicate::Ignore,
                on_missing: OnMissing::Ignore,
            })
            .await
            .unwrap();
        fixture
    }

    async fn check(&self, user: &str, relation: &str, object: &str, context: Value) -> bool {
        let context: BTreeMap<String, Value> = serde_json::from_value(context).unwrap();
        self.store
            .check(&CheckRequest {
                store_id: self.store_id.clone(),
                model_id: self.model_id.clone(),
                tuple_key: TupleKey::new(user, relation, object),
                contextual_tuples: Vec::new(),
                context,
            })
            .await
            .unwrap()
    }
}

/// Test: a plain folder grant only covers the subresources it lists
#[tokio::test]
async fn test_plain_folder_grant_is_filtered_by_subresource() {
    // Arrange
    let fixture = Fixture::new(vec![new_folder_resource_tuple(
        "user:1", "get", "g", "r", "sub1", "f",
    )])
    .await;

    // Act
    let sub1 = fixture
        .check("user:1", "resource_get", "folder:f", json!({"subresource": "g/r/sub1"}))
        .await;
    let sub2 = fixture
        .check("user:1", "resource_get", "folder:f", json!({"subresource": "g/r/sub2"}))
        .await;

    // Assert
    assert!(sub1);
    assert!(!sub2);
}

/// Test: a set grant on a folder covers every subresource
#[tokio::test]
async fn test_set_folder_grant_covers_all_subresources() {
    let fixture = Fixture::new(vec![new_folder_resource_tuple(
        "user:1", "view", "g", "r", "sub1", "f",
    )])
    .await;

    for subresource in ["g/r/sub1", "g/r/sub2", "other/kind"] {
        assert!(
            fixture
                .check(
                    "user:1",
                    "resource_get",
                    "folder:f",
                    json!({"subresource": subresource})
                )
                .await,
            "{subresource}"
        );
    }
    assert!(
        !fixture
            .check("user:1", "resource_update", "folder:f", json!({"subresource": "g/r"}))
            .await
    );
}

/// Test: a resource grant is bound to the group/resource it was written for
#[tokio::test]
async fn test_resource_grant_requires_matching_group() {
    let fixture = Fixture::new(vec![new_resource_tuple(
        "user:1", "get", "dash.app", "dashboards", "", "1",
    )])
    .await;

    let object = "resource:dash.app/dashboards/1";
    assert!(
        fixture
            .check("user:1", "get", object, json!({"requested_group": "dash.app/dashboards"}))
            .await
    );
    assert!(
        !fixture
            .check("user:1", "get", object, json!({"requested_group": "other.app/dashboards"}))
            .await
    );
    // Without the request input the condition cannot hold.
    assert!(!fixture.check("user:1", "get", object, json!({})).await);
}

/// Test: folder grants flow down two levels of parents
#[tokio::test]
async fn test_folder_inheritance_two_hops() {
    let fixture = Fixture::new(vec![
        new_folder_parent_tuple("5", "4"),
        new_folder_parent_tuple("6", "5"),
        new_folder_resource_tuple("user:8", "edit", "g", "r", "", "5"),
    ])
    .await;

    let context = json!({"subresource": "g/r"});
    assert!(
        fixture
            .check("user:8", "resource_get", "folder:6", context.clone())
            .await
    );
    assert!(fixture.check("user:8", "resource_update", "folder:5", context).await);
    assert!(!fixture.check("user:8", "get", "folder:4", json!({})).await);
    assert!(!fixture.check("user:8", "get", "folder:6", json!({})).await);
}

/// Test: folder view implies view on the folder's resources
#[tokio::test]
async fn test_folder_view_implies_resource_view() {
    let fixture = Fixture::new(vec![TupleKey::new("user:1", "view", "folder:f")]).await;

    assert!(
        fixture
            .check("user:1", "resource_get", "folder:f", json!({"subresource": "g/r"}))
            .await
    );
    assert!(fixture.check("user:1", "get", "folder:f", json!({})).await);
    assert!(!fixture.check("user:1", "update", "folder:f", json!({})).await);
}

/// Test: role assignees receive the role's grants
#[tokio::test]
async fn test_role_assignee_grants() {
    let fixture = Fixture::new(vec![
        TupleKey::new("user:1", "assignee", "role:basic_viewer"),
        TupleKey::new("role:basic_viewer#assignee", "get", "group_resource:g/r"),
    ])
    .await;

    assert!(fixture.check("user:1", "get", "group_resource:g/r", json!({})).await);
    assert!(!fixture.check("user:2", "get", "group_resource:g/r", json!({})).await);
}

/// Test: a wildcard user grants to every subject of that type
#[tokio::test]
async fn test_wildcard_user_grant() {
    let fixture = Fixture::new(vec![TupleKey::new("user:*", "get", "group_resource:g/r")]).await;

    assert!(fixture.check("user:42", "get", "group_resource:g/r", json!({})).await);
    assert!(
        !fixture
            .check("service-account:42", "get", "group_resource:g/r", json!({}))
            .await
    );
}

//! TupleStore trait definition.

use std::collections::BTreeMap;

use async_trait::async_trait;
use futures::stream::BoxStream;
use rsauthz_common::model::AuthorizationModel;
use rsauthz_common::TupleKey;
use serde_json::Value;

use crate::error::{StoreError, StoreResult};

/// Default page size when the caller does not ask for one.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Store metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Store {
    pub id: String,
    pub name: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// A stored authorization model.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredAuthorizationModel {
    pub id: String,
    pub store_id: String,
    pub model: AuthorizationModel,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Pagination options for list operations.
#[derive(Debug, Clone, Default)]
pub struct PaginationOptions {
    /// Maximum number of items to return.
    pub page_size: Option<u32>,
    /// Continuation token from previous page.
    pub continuation_token: Option<String>,
}

impl PaginationOptions {
    pub fn new(page_size: u32) -> Self {
        Self {
            page_size: Some(page_size),
            continuation_token: None,
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.continuation_token = token;
        self
    }
}

/// Paginated result.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    /// Continuation token for the next page; `None` when exhausted.
    pub continuation_token: Option<String>,
}

/// Filter for reading tuples. Empty fields match everything.
#[derive(Debug, Clone, Default)]
pub struct TupleFilter {
    /// A full object (`folder:abc`) or a bare type (`folder:`).
    pub object: Option<String>,
    pub relation: Option<String>,
    pub user: Option<String>,
}

impl TupleFilter {
    pub fn object(object: impl Into<String>) -> Self {
        Self {
            object: Some(object.into()),
            ..Self::default()
        }
    }

    pub fn with_relation(mut self, relation: impl Into<String>) -> Self {
        self.relation = Some(relation.into());
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn matches(&self, tuple: &TupleKey) -> bool {
        let object_matches = match self.object.as_deref() {
            None => true,
            Some(object) if object.ends_with(':') => tuple.object.starts_with(object),
            Some(object) => tuple.object == object,
        };
        object_matches
            && self.relation.as_ref().map_or(true, |r| &tuple.relation == r)
            && self.user.as_ref().map_or(true, |u| &tuple.user == u)
    }
}

/// What to do when a written tuple already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OnDuplicate {
    #[default]
    Error,
    Ignore,
}

/// What to do when a deleted tuple does not exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OnMissing {
    #[default]
    Error,
    Ignore,
}

#[derive(Debug, Clone, Default)]
pub struct CheckRequest {
    pub store_id: String,
    pub model_id: String,
    pub tuple_key: TupleKey,
    /// Tuples visible only to this request.
    pub contextual_tuples: Vec<TupleKey>,
    /// Condition inputs supplied by the caller.
    pub context: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default)]
pub struct WriteRequest {
    pub store_id: String,
    pub model_id: String,
    pub writes: Vec<TupleKey>,
    pub deletes: Vec<TupleKey>,
    pub on_duplicate: OnDuplicate,
    pub on_missing: OnMissing,
}

impl WriteRequest {
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty() && self.deletes.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListObjectsRequest {
    pub store_id: String,
    pub model_id: String,
    pub type_name: String,
    pub relation: String,
    pub user: String,
    pub context: BTreeMap<String, Value>,
    pub contextual_tuples: Vec<TupleKey>,
}

/// The relationship-tuple engine consumed by the authorization server.
///
/// Implementations must be thread-safe (Send + Sync) and support
/// async operations.
#[async_trait]
pub trait TupleStore: Send + Sync + 'static {
    // Store operations

    /// Returns the store named `name`, creating it on first use. The same
    /// name always yields the same store id.
    async fn get_or_create_store(&self, name: &str) -> StoreResult<Store>;

    /// Lists stores, oldest first.
    async fn list_stores(&self, pagination: &PaginationOptions)
        -> StoreResult<PaginatedResult<Store>>;

    // Model operations

    async fn write_authorization_model(
        &self,
        store_id: &str,
        model: AuthorizationModel,
    ) -> StoreResult<StoredAuthorizationModel>;

    /// Returns the newest model of the store, if any.
    async fn find_latest_authorization_model(
        &self,
        store_id: &str,
    ) -> StoreResult<Option<StoredAuthorizationModel>>;

    // Tuple operations

    async fn check(&self, request: &CheckRequest) -> StoreResult<bool>;

    async fn read(
        &self,
        store_id: &str,
        filter: &TupleFilter,
        pagination: &PaginationOptions,
    ) -> StoreResult<PaginatedResult<TupleKey>>;

    /// Applies deletes then writes as one atomic change.
    async fn write(&self, request: &WriteRequest) -> StoreResult<()>;

    async fn list_objects(&self, request: &ListObjectsRequest) -> StoreResult<Vec<String>>;

    /// Streams the objects of [`TupleStore::list_objects`] as they resolve.
    async fn streamed_list_objects(
        &self,
        request: &ListObjectsRequest,
    ) -> StoreResult<BoxStream<'static, StoreResult<String>>>;
}

/// Parses an offset continuation token.
pub fn parse_continuation_token(token: &Option<String>) -> StoreResult<usize> {
    match token {
        None => Ok(0),
        Some(token) if token.is_empty() => Ok(0),
        Some(token) => token.parse().map_err(|_| StoreError::InvalidInput {
            message: format!("invalid continuation token: {token}"),
        }),
    }
}

/// Slices one page out of `items` and produces the next token.
pub fn paginate<T>(items: Vec<T>, pagination: &PaginationOptions) -> StoreResult<PaginatedResult<T>> {
    let page_size = pagination.page_size.unwrap_or(DEFAULT_PAGE_SIZE).max(1) as usize;
    let offset = parse_continuation_token(&pagination.continuation_token)?;
    let total = items.len();

    let items: Vec<T> = items.into_iter().skip(offset).take(page_size).collect();
    let next_offset = offset + items.len();
    let continuation_token = if next_offset < total {
        Some(next_offset.to_string())
    } else {
        None
    };

    Ok(PaginatedResult {
        items,
        continuation_token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_matches_type_prefix() {
        let tuple = TupleKey::new("user:1", "get", "folder:abc");
        assert!(TupleFilter::object("folder:").matches(&tuple));
        assert!(TupleFilter::object("folder:abc").matches(&tuple));
        assert!(!TupleFilter::object("folder:ab").matches(&tuple));
        assert!(!TupleFilter::object("folder:abc")
            .with_relation("parent")
            .matches(&tuple));
        assert!(TupleFilter::default().with_user("user:1").matches(&tuple));
    }

    #[test]
    fn test_paginate_walks_all_pages() {
        let items: Vec<u32> = (0..5).collect();
        let first = paginate(items.clone(), &PaginationOptions::new(2)).unwrap();
        assert_eq!(first.items, vec![0, 1]);
        let second = paginate(
            items.clone(),
            &PaginationOptions::new(2).with_token(first.continuation_token),
        )
        .unwrap();
        assert_eq!(second.items, vec![2, 3]);
        let third = paginate(
            items,
            &PaginationOptions::new(2).with_token(second.continuation_token),
        )
        .unwrap();
        assert_eq!(third.items, vec![4]);
        assert!(third.continuation_token.is_none());
    }

    #[test]
    fn test_exact_page_has_no_trailing_token() {
        let page = paginate(vec![1, 2], &PaginationOptions::new(2)).unwrap();
        assert!(page.continuation_token.is_none());
    }

    #[test]
    fn test_invalid_token_is_rejected() {
        let result = paginate(
            vec![1],
            &PaginationOptions::new(2).with_token(Some("abc".to_string())),
        );
        assert!(matches!(result, Err(StoreError::InvalidInput { .. })));
    }
}

//! Listing the objects a subject can access.
//!
//! The answer is one of: everything of the kind (`all`), or the folders and
//! items the subject was granted. Folder access stands for access to every
//! item inside the folder; the caller expands it.

use rsauthz_common::ident::{strip_type_prefix, TYPE_FOLDER, TYPE_RESOURCE};
use rsauthz_common::relations::{is_subresource_relation, subresource_relation};
use rsauthz_common::{ResourceInfo, TupleKey};
use rsauthz_store::{ListObjectsRequest, TupleStore};
use tracing::{debug, instrument};

use crate::auth::AuthInfo;
use crate::error::AuthzResult;
use crate::handlers::check::{parse_subject, require_group_resource};
use crate::server::AuthzServer;
use crate::store_cache::StoreInfo;

#[derive(Debug, Clone, Default)]
pub struct ListRequest {
    pub namespace: String,
    pub subject: String,
    pub verb: String,
    pub group: String,
    pub resource: String,
    pub subresource: String,
    pub contextual_tuples: Vec<TupleKey>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListResponse {
    /// The subject may access every object of the kind.
    pub all: bool,
    /// Folder uids whose items the subject may access.
    pub folders: Vec<String>,
    /// Object names the subject may access directly.
    pub items: Vec<String>,
}

impl<S: TupleStore> AuthzServer<S> {
    #[instrument(skip(self, caller, request), fields(
        namespace = %request.namespace,
        subject = %request.subject,
        verb = %request.verb,
    ))]
    pub async fn list(&self, caller: &AuthInfo, request: &ListRequest) -> AuthzResult<ListResponse> {
        caller.authorize_namespace(&request.namespace)?;
        let subject = parse_subject(&request.subject, &request.verb)?;
        require_group_resource(&request.group, &request.resource)?;

        let resource = ResourceInfo::new(
            request.group.as_str(),
            request.resource.as_str(),
            request.subresource.as_str(),
            "",
            "",
        );
        let info = self.cache.get_store_info(&request.namespace).await?;
        let contextual_tuples = self
            .contextual_tuples(&subject.ident, &request.contextual_tuples)
            .await;

        if self
            .check_group_resource(
                &info,
                &subject.ident,
                subject.relation,
                &resource,
                &contextual_tuples,
            )
            .await?
        {
            return Ok(ListResponse {
                all: true,
                ..ListResponse::default()
            });
        }

        let lookup = ObjectLookup {
            info: &info,
            subject: &subject.ident,
            contextual_tuples: &contextual_tuples,
        };
        let response = if resource.is_generic() {
            self.list_generic(&lookup, subject.relation, &resource).await?
        } else {
            self.list_typed(&lookup, subject.relation, &resource).await?
        };
        debug!(
            folders = response.folders.len(),
            items = response.items.len(),
            "list resolved"
        );
        Ok(response)
    }

    async fn list_typed(
        &self,
        lookup: &ObjectLookup<'_>,
        relation: &str,
        resource: &ResourceInfo,
    ) -> AuthzResult<ListResponse> {
        if !resource.is_valid_relation(relation) {
            return Ok(ListResponse::default());
        }
        let objects = self
            .list_object_names(lookup, resource.type_name, relation, None)
            .await?;
        Ok(ListResponse {
            items: objects,
            ..ListResponse::default()
        })
    }

    async fn list_generic(
        &self,
        lookup: &ObjectLookup<'_>,
        relation: &str,
        resource: &ResourceInfo,
    ) -> AuthzResult<ListResponse> {
        let mut response = ListResponse::default();

        let folder_relation = subresource_relation(relation);
        if is_subresource_relation(&folder_relation) {
            response.folders = self
                .list_object_names(lookup, TYPE_FOLDER, &folder_relation, Some(resource))
                .await?;
        }

        if resource.is_valid_relation(relation) {
            let prefix = format!("{}/", resource.group_resource());
            response.items = self
                .list_object_names(lookup, TYPE_RESOURCE, relation, Some(resource))
                .await?
                .into_iter()
                .filter_map(|name| name.strip_prefix(&prefix).map(str::to_string))
                .collect();
        }
        Ok(response)
    }

    /// ListObjects with the `type:` prefix stripped from each result.
    async fn list_object_names(
        &self,
        lookup: &ObjectLookup<'_>,
        type_name: &str,
        relation: &str,
        resource: Option<&ResourceInfo>,
    ) -> AuthzResult<Vec<String>> {
        let request = ListObjectsRequest {
            store_id: lookup.info.id.clone(),
            model_id: lookup.info.model_id.clone(),
            type_name: type_name.to_string(),
            relation: relation.to_string(),
            user: lookup.subject.to_string(),
            context: resource.and_then(ResourceInfo::context).unwrap_or_default(),
            contextual_tuples: lookup.contextual_tuples.to_vec(),
        };
        let objects = self.lister.list_objects(&request).await?;
        Ok(objects
            .iter()
            .map(|object| strip_type_prefix(type_name, object).to_string())
            .collect())
    }
}

/// Store and subject shared by the ListObjects calls of one request.
struct ObjectLookup<'a> {
    info: &'a StoreInfo,
    subject: &'a str,
    contextual_tuples: &'a [TupleKey],
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use rsauthz_common::tuple::{
        new_folder_resource_tuple, new_group_resource_tuple, new_resource_tuple,
    };
    use rsauthz_store::{MemoryTupleStore, OnDuplicate, OnMissing, WriteRequest};

    use crate::config::ServerConfig;

    async fn server_with(
        config: &ServerConfig,
        tuples: Vec<TupleKey>,
    ) -> AuthzServer<MemoryTupleStore> {
        let store = MemoryTupleStore::new_shared();
        let server = AuthzServer::new(Arc::clone(&store), config);
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
        server
    }

    fn dashboards() -> ListRequest {
        ListRequest {
            namespace: "org".to_string(),
            subject: "user:1".to_string(),
            verb: "list".to_string(),
            group: "dashboard.grafana.app".to_string(),
            resource: "dashboards".to_string(),
            ..ListRequest::default()
        }
    }

    fn grants() -> Vec<TupleKey> {
        let dashboards = ("dashboard.grafana.app", "dashboards");
        vec![
            new_folder_resource_tuple("user:1", "get", dashboards.0, dashboards.1, "", "f1"),
            new_folder_resource_tuple("user:1", "get", "alerting.grafana.app", "rules", "", "f2"),
            TupleKey::new("user:1", "view", "folder:f3"),
            new_resource_tuple("user:1", "get", dashboards.0, dashboards.1, "", "d1"),
            new_resource_tuple("user:1", "get", "other.grafana.app", "things", "", "x1"),
        ]
    }

    #[tokio::test]
    async fn test_group_resource_grant_lists_all() {
        let server = server_with(
            &ServerConfig::default(),
            vec![new_group_resource_tuple(
                "user:1",
                "get",
                "dashboard.grafana.app",
                "dashboards",
                "",
            )],
        )
        .await;

        let response = server.list(&AuthInfo::new("org"), &dashboards()).await.unwrap();
        assert!(response.all);
        assert!(response.folders.is_empty());
        assert!(response.items.is_empty());
    }

    #[tokio::test]
    async fn test_generic_resource_lists_folders_and_items() {
        let server = server_with(&ServerConfig::default(), grants()).await;

        let response = server.list(&AuthInfo::new("org"), &dashboards()).await.unwrap();

        assert!(!response.all);
        assert_eq!(response.folders, vec!["f1".to_string(), "f3".to_string()]);
        assert_eq!(response.items, vec!["d1".to_string()]);
    }

    #[tokio::test]
    async fn test_typed_resource_lists_objects() {
        let server = server_with(
            &ServerConfig::default(),
            vec![
                TupleKey::new("user:1", "get", "folder:a"),
                TupleKey::new("folder:a", "parent", "folder:b"),
                TupleKey::new("user:2", "get", "folder:c"),
            ],
        )
        .await;
        let request = ListRequest {
            group: "folder.grafana.app".to_string(),
            resource: "folders".to_string(),
            ..dashboards()
        };

        let response = server.list(&AuthInfo::new("org"), &request).await.unwrap();

        assert_eq!(response.items, vec!["a".to_string(), "b".to_string()]);
        assert!(response.folders.is_empty());
    }

    #[tokio::test]
    async fn test_streamed_listing_matches_plain_listing() {
        let plain = server_with(&ServerConfig::default(), grants()).await;
        let mut config = ServerConfig::default();
        config.engine.use_streamed_list_objects = true;
        config.engine.list_stream_buffer = 1;
        let streamed = server_with(&config, grants()).await;

        let caller = AuthInfo::new("org");
        assert_eq!(
            plain.list(&caller, &dashboards()).await.unwrap(),
            streamed.list(&caller, &dashboards()).await.unwrap()
        );
    }
}

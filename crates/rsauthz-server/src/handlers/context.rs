//! Contextual tuples injected into check and list requests.

use rsauthz_common::ident::{type_of, TYPE_RENDER};
use rsauthz_common::relations::RELATION_SET_VIEW;
use rsauthz_common::resource::{
    DASHBOARD_GROUP, DASHBOARD_RESOURCE, FOLDER_GROUP, FOLDER_RESOURCE,
};
use rsauthz_common::tuple::new_group_resource_tuple;
use rsauthz_common::{Ident, TupleKey};
use rsauthz_store::TupleStore;
use tracing::{info, instrument};

use crate::auth::{AuthInfo, ANY_NAMESPACE};
use crate::error::{AuthzError, AuthzResult};
use crate::server::AuthzServer;

/// Grants the render service needs to draw dashboards.
pub fn render_grants(subject: &str) -> Vec<TupleKey> {
    if type_of(subject) != TYPE_RENDER {
        return Vec::new();
    }
    vec![
        new_group_resource_tuple(
            subject,
            RELATION_SET_VIEW,
            DASHBOARD_GROUP,
            DASHBOARD_RESOURCE,
            "",
        ),
        new_group_resource_tuple(subject, RELATION_SET_VIEW, FOLDER_GROUP, FOLDER_RESOURCE, ""),
    ]
}

impl<S: TupleStore> AuthzServer<S> {
    /// Contextual tuples for one request: render grants, the process-wide
    /// authorization context, then the caller's own tuples.
    pub(crate) async fn contextual_tuples(
        &self,
        subject: &str,
        request_tuples: &[TupleKey],
    ) -> Vec<TupleKey> {
        let mut tuples = render_grants(subject);
        tuples.extend(self.authorization_context.read().await.iter().cloned());
        tuples.extend(request_tuples.iter().cloned());
        tuples
    }

    /// Replaces the process-wide authorization context.
    ///
    /// Only callers acting for every namespace with the write permission may
    /// do this, since the tuples apply to all requests.
    #[instrument(skip(self, caller, tuples), fields(count = tuples.len()))]
    pub async fn update_authorization_context(
        &self,
        caller: &AuthInfo,
        tuples: Vec<TupleKey>,
    ) -> AuthzResult<()> {
        if caller.namespace != ANY_NAMESPACE {
            return Err(AuthzError::denied(
                "updating the authorization context requires a cluster-wide caller",
            ));
        }
        caller.authorize_write(ANY_NAMESPACE, &self.write_permission)?;

        for tuple in &tuples {
            Ident::parse(&tuple.user)?;
            let object = Ident::parse(&tuple.object)?;
            if object.is_userset() || tuple.relation.is_empty() {
                return Err(AuthzError::invalid(format!(
                    "invalid contextual tuple: {tuple}"
                )));
            }
        }

        let mut context = self.authorization_context.write().await;
        *context = tuples;
        info!(count = context.len(), "updated authorization context");
        Ok(())
    }

    pub async fn authorization_context(&self) -> Vec<TupleKey> {
        self.authorization_context.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use rsauthz_store::MemoryTupleStore;

    fn server() -> AuthzServer<MemoryTupleStore> {
        AuthzServer::new(MemoryTupleStore::new_shared(), &ServerConfig::default())
    }

    #[test]
    fn test_render_grants_only_for_render_subjects() {
        let grants = render_grants("render:1");
        assert_eq!(grants.len(), 2);
        assert!(grants.iter().all(|t| t.user == "render:1" && t.relation == "view"));
        assert_eq!(
            grants[0].object,
            "group_resource:dashboard.grafana.app/dashboards"
        );
        assert!(render_grants("user:1").is_empty());
    }

    #[tokio::test]
    async fn test_update_authorization_context_requires_cluster_writer() {
        let server = server();
        let tuples = vec![TupleKey::new("user:1", "get", "group_resource:g/r")];

        let scoped = AuthInfo::new("org").with_permission("authz:write");
        assert!(matches!(
            server
                .update_authorization_context(&scoped, tuples.clone())
                .await,
            Err(AuthzError::PermissionDenied { .. })
        ));

        let reader = AuthInfo::new(ANY_NAMESPACE);
        assert!(matches!(
            server
                .update_authorization_context(&reader, tuples.clone())
                .await,
            Err(AuthzError::PermissionDenied { .. })
        ));

        let writer = AuthInfo::new(ANY_NAMESPACE).with_permission("authz:write");
        server
            .update_authorization_context(&writer, tuples.clone())
            .await
            .unwrap();
        assert_eq!(server.authorization_context().await, tuples);
    }

    #[tokio::test]
    async fn test_update_authorization_context_replaces_previous_set() {
        let server = server();
        let writer = AuthInfo::new(ANY_NAMESPACE).with_permission("authz:write");

        server
            .update_authorization_context(
                &writer,
                vec![TupleKey::new("user:1", "get", "group_resource:g/r")],
            )
            .await
            .unwrap();
        server
            .update_authorization_context(&writer, Vec::new())
            .await
            .unwrap();

        assert!(server.authorization_context().await.is_empty());
    }

    #[tokio::test]
    async fn test_update_authorization_context_rejects_malformed_tuples() {
        let server = server();
        let writer = AuthInfo::new(ANY_NAMESPACE).with_permission("authz:write");

        let result = server
            .update_authorization_context(&writer, vec![TupleKey::new("user1", "get", "folder:a")])
            .await;
        assert!(matches!(result, Err(AuthzError::InvalidArgument { .. })));
    }

    #[tokio::test]
    async fn test_contextual_tuples_are_merged_in_order() {
        let server = server();
        let writer = AuthInfo::new(ANY_NAMESPACE).with_permission("authz:write");
        let injected = TupleKey::new("user:9", "get", "group_resource:g/r");
        server
            .update_authorization_context(&writer, vec![injected.clone()])
            .await
            .unwrap();

        let request = TupleKey::new("render:1", "get", "folder:f");
        let tuples = server
            .contextual_tuples("render:1", std::slice::from_ref(&request))
            .await;

        assert_eq!(tuples.len(), 4);
        assert_eq!(tuples[2], injected);
        assert_eq!(tuples[3], request);
    }
}

//! Which relations does a subject hold on a resource?

use rsauthz_common::relations::{verb_for_relation, RELATIONS_TYPED};
use rsauthz_common::{ResourceInfo, TupleKey};
use rsauthz_store::TupleStore;
use tracing::instrument;

use crate::auth::AuthInfo;
use crate::error::AuthzResult;
use crate::handlers::check::{parse_subject_ident, require_group_resource};
use crate::server::AuthzServer;

#[derive(Debug, Clone, Default)]
pub struct CapabilitiesRequest {
    pub namespace: String,
    pub subject: String,
    pub group: String,
    pub resource: String,
    pub subresource: String,
    pub name: String,
    pub folder: String,
    pub contextual_tuples: Vec<TupleKey>,
}

impl<S: TupleStore> AuthzServer<S> {
    /// Runs one check per plain relation and returns the held ones, in
    /// relation table order.
    #[instrument(skip(self, caller, request), fields(
        namespace = %request.namespace,
        subject = %request.subject,
    ))]
    pub async fn capabilities(
        &self,
        caller: &AuthInfo,
        request: &CapabilitiesRequest,
    ) -> AuthzResult<Vec<String>> {
        caller.authorize_namespace(&request.namespace)?;
        let subject = parse_subject_ident(&request.subject)?;
        require_group_resource(&request.group, &request.resource)?;

        let info = self.cache.get_store_info(&request.namespace).await?;
        let contextual_tuples = self
            .contextual_tuples(&subject, &request.contextual_tuples)
            .await;

        let mut held = Vec::new();
        for relation in RELATIONS_TYPED {
            let Some(verb) = verb_for_relation(relation) else {
                continue;
            };
            let resource = ResourceInfo::for_verb(
                verb,
                request.group.as_str(),
                request.resource.as_str(),
                request.subresource.as_str(),
                request.name.as_str(),
                request.folder.as_str(),
            );
            if self
                .check_resource(&info, &subject, relation, &resource, &contextual_tuples)
                .await?
            {
                held.push(relation.to_string());
            }
        }
        Ok(held)
    }
}

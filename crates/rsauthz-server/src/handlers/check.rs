//! Single permission check.
//!
//! A check walks a short decision chain and stops at the first grant:
//!
//! 1. Group resource: a grant on every object of the kind.
//! 2. Generic resources: the containing folder's `resource_*` relation,
//!    then the resource itself.
//! 3. Typed resources (folders, teams, users, service accounts): the object
//!    itself. Folder nesting is resolved by the store's model.
//!
//! Relations the object type does not define are answered with "not
//! allowed" without a store round trip.

use std::collections::BTreeMap;

use rsauthz_common::relations::{
    is_group_resource_relation, is_resource_relation, is_subresource_relation,
    require_relation_for_verb, subresource_relation,
};
use rsauthz_common::{Ident, ResourceInfo, TupleKey};
use rsauthz_store::{CheckRequest as StoreCheckRequest, TupleStore};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::auth::AuthInfo;
use crate::error::{AuthzError, AuthzResult};
use crate::server::AuthzServer;
use crate::store_cache::StoreInfo;

/// Can `subject` perform `verb` on the described resource?
#[derive(Debug, Clone, Default)]
pub struct CheckRequest {
    pub namespace: String,
    pub subject: String,
    pub verb: String,
    pub group: String,
    pub resource: String,
    pub subresource: String,
    /// Object name; empty for collection requests.
    pub name: String,
    /// Containing folder uid, if any.
    pub folder: String,
    /// Tuples that only exist for this request.
    pub contextual_tuples: Vec<TupleKey>,
}

/// Validated subject and relation of a request.
pub(crate) struct Subject {
    pub(crate) ident: String,
    pub(crate) relation: &'static str,
}

pub(crate) fn parse_subject_ident(subject: &str) -> AuthzResult<String> {
    if subject.is_empty() {
        return Err(AuthzError::invalid("subject is required"));
    }
    Ok(Ident::parse(subject)?.to_string())
}

/// Fails before any store access when the subject or verb is malformed.
pub(crate) fn parse_subject(subject: &str, verb: &str) -> AuthzResult<Subject> {
    let ident = parse_subject_ident(subject)?;
    let relation = require_relation_for_verb(verb)?;
    Ok(Subject { ident, relation })
}

pub(crate) fn require_group_resource(group: &str, resource: &str) -> AuthzResult<()> {
    if group.is_empty() || resource.is_empty() {
        return Err(AuthzError::invalid("group and resource are required"));
    }
    Ok(())
}

impl<S: TupleStore> AuthzServer<S> {
    #[instrument(skip(self, caller, request), fields(
        namespace = %request.namespace,
        subject = %request.subject,
        verb = %request.verb,
    ))]
    pub async fn check(&self, caller: &AuthInfo, request: &CheckRequest) -> AuthzResult<bool> {
        caller.authorize_namespace(&request.namespace)?;
        let subject = parse_subject(&request.subject, &request.verb)?;
        require_group_resource(&request.group, &request.resource)?;

        let resource = ResourceInfo::for_verb(
            &request.verb,
            request.group.as_str(),
            request.resource.as_str(),
            request.subresource.as_str(),
            request.name.as_str(),
            request.folder.as_str(),
        );

        let info = self.cache.get_store_info(&request.namespace).await?;
        let contextual_tuples = self
            .contextual_tuples(&subject.ident, &request.contextual_tuples)
            .await;

        let allowed = self
            .check_resource(
                &info,
                &subject.ident,
                subject.relation,
                &resource,
                &contextual_tuples,
            )
            .await?;
        debug!(allowed, "check resolved");
        Ok(allowed)
    }

    /// The full decision chain for one resource.
    pub(crate) async fn check_resource(
        &self,
        info: &StoreInfo,
        subject: &str,
        relation: &str,
        resource: &ResourceInfo,
        contextual_tuples: &[TupleKey],
    ) -> AuthzResult<bool> {
        if self
            .check_group_resource(info, subject, relation, resource, contextual_tuples)
            .await?
        {
            return Ok(true);
        }
        self.check_object(info, subject, relation, resource, contextual_tuples)
            .await
    }

    /// Step 1: does the subject hold `relation` on the whole group resource?
    pub(crate) async fn check_group_resource(
        &self,
        info: &StoreInfo,
        subject: &str,
        relation: &str,
        resource: &ResourceInfo,
        contextual_tuples: &[TupleKey],
    ) -> AuthzResult<bool> {
        if !is_group_resource_relation(relation) {
            return Ok(false);
        }
        self.store_check(
            info,
            TupleKey::new(subject, relation, resource.group_resource_ident()),
            None,
            contextual_tuples,
        )
        .await
    }

    /// Steps 2 and 3: folder-inherited and direct access.
    pub(crate) async fn check_object(
        &self,
        info: &StoreInfo,
        subject: &str,
        relation: &str,
        resource: &ResourceInfo,
        contextual_tuples: &[TupleKey],
    ) -> AuthzResult<bool> {
        if !resource.is_generic() {
            if !resource.is_valid_relation(relation) {
                return Ok(false);
            }
            let Some(object) = resource.resource_ident() else {
                return Ok(false);
            };
            return self
                .store_check(
                    info,
                    TupleKey::new(subject, relation, object),
                    None,
                    contextual_tuples,
                )
                .await;
        }

        let folder_relation = subresource_relation(relation);
        if let Some(folder) = resource.folder_ident() {
            if is_subresource_relation(&folder_relation)
                && self
                    .store_check(
                        info,
                        TupleKey::new(subject, &folder_relation, folder),
                        resource.context(),
                        contextual_tuples,
                    )
                    .await?
            {
                return Ok(true);
            }
        }

        if !is_resource_relation(relation) {
            return Ok(false);
        }
        let Some(object) = resource.resource_ident() else {
            return Ok(false);
        };
        self.store_check(
            info,
            TupleKey::new(subject, relation, object),
            resource.context(),
            contextual_tuples,
        )
        .await
    }

    async fn store_check(
        &self,
        info: &StoreInfo,
        tuple_key: TupleKey,
        context: Option<BTreeMap<String, Value>>,
        contextual_tuples: &[TupleKey],
    ) -> AuthzResult<bool> {
        let request = StoreCheckRequest {
            store_id: info.id.clone(),
            model_id: info.model_id.clone(),
            tuple_key,
            contextual_tuples: contextual_tuples.to_vec(),
            context: context.unwrap_or_default(),
        };
        Ok(self.store.check(&request).await?)
    }
}

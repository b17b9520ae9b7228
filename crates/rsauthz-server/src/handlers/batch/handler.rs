use std::collections::{HashMap, HashSet};

use rsauthz_common::relations::require_relation_for_verb;
use rsauthz_common::ResourceInfo;
use rsauthz_store::TupleStore;
use tracing::{debug, instrument};

use super::types::{BatchCheckItem, BatchCheckRequest, BatchCheckResponse};
use crate::auth::AuthInfo;
use crate::error::{AuthzError, AuthzResult};
use crate::handlers::check::parse_subject_ident;
use crate::server::AuthzServer;

/// A batch item after validation.
struct PreparedItem<'a> {
    item: &'a BatchCheckItem,
    relation: &'static str,
    resource: ResourceInfo,
}

fn prepare(index: usize, item: &BatchCheckItem) -> AuthzResult<PreparedItem<'_>> {
    let invalid =
        |message: String| AuthzError::invalid(format!("invalid check at index {index}: {message}"));

    if item.name.is_empty() {
        return Err(invalid("name cannot be empty".to_string()));
    }
    if item.group.is_empty() || item.resource.is_empty() {
        return Err(invalid("group and resource cannot be empty".to_string()));
    }
    let relation = require_relation_for_verb(&item.verb).map_err(|e| invalid(e.to_string()))?;

    Ok(PreparedItem {
        item,
        relation,
        resource: ResourceInfo::for_verb(
            &item.verb,
            item.group.as_str(),
            item.resource.as_str(),
            item.subresource.as_str(),
            item.name.as_str(),
            item.folder.as_str(),
        ),
    })
}

impl<S: TupleStore> AuthzServer<S> {
    #[instrument(skip(self, caller, request), fields(
        namespace = %request.namespace,
        subject = %request.subject,
        items = request.items.len(),
    ))]
    pub async fn batch_check(
        &self,
        caller: &AuthInfo,
        request: &BatchCheckRequest,
    ) -> AuthzResult<BatchCheckResponse> {
        caller.authorize_namespace(&request.namespace)?;
        let subject = parse_subject_ident(&request.subject)?;

        if request.items.is_empty() {
            return Ok(BatchCheckResponse::default());
        }
        let max = self.settings.max_batch_check_items;
        if request.items.len() > max {
            return Err(AuthzError::invalid(format!(
                "batch size {} exceeds maximum allowed {max}",
                request.items.len()
            )));
        }

        // Validate everything before the first store call.
        let prepared = request
            .items
            .iter()
            .enumerate()
            .map(|(index, item)| prepare(index, item))
            .collect::<AuthzResult<Vec<_>>>()?;

        // Results are keyed by group resource and name.
        let mut keys = HashSet::with_capacity(prepared.len());
        for (index, entry) in prepared.iter().enumerate() {
            let group_resource = entry.resource.group_resource();
            if !keys.insert((group_resource.clone(), entry.item.name.as_str())) {
                return Err(AuthzError::invalid(format!(
                    "invalid check at index {index}: duplicate item {} in {group_resource}",
                    entry.item.name,
                )));
            }
        }

        let info = self.cache.get_store_info(&request.namespace).await?;
        let contextual_tuples = self
            .contextual_tuples(&subject, &request.contextual_tuples)
            .await;

        let mut memo: HashMap<(String, &'static str), bool> = HashMap::new();
        let mut response = BatchCheckResponse {
            all_allowed: true,
            ..BatchCheckResponse::default()
        };

        for PreparedItem {
            item,
            relation,
            resource,
        } in &prepared
        {
            let group_resource = resource.group_resource();
            let memo_key = (group_resource.clone(), *relation);
            let group_allowed = match memo.get(&memo_key) {
                Some(allowed) => *allowed,
                None => {
                    let allowed = self
                        .check_group_resource(
                            &info,
                            &subject,
                            relation,
                            resource,
                            &contextual_tuples,
                        )
                        .await?;
                    memo.insert(memo_key, allowed);
                    allowed
                }
            };

            let allowed = group_allowed
                || self
                    .check_object(&info, &subject, relation, resource, &contextual_tuples)
                    .await?;

            response.all_allowed &= allowed;
            response
                .groups
                .entry(group_resource)
                .or_default()
                .insert(item.name.clone(), allowed);
        }

        debug!(
            all_allowed = response.all_allowed,
            group_checks = memo.len(),
            "batch check resolved"
        );
        Ok(response)
    }
}

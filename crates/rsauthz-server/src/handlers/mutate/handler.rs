use std::collections::BTreeMap;

use rsauthz_common::ident::{new_folder_ident, validate_name};
use rsauthz_common::relations::RELATION_PARENT;
use rsauthz_common::translation::{
    new_org_role_tuple, new_role_binding_tuple, new_team_binding_tuple,
    translate_resource_permission, translate_role_permissions,
};
use rsauthz_common::tuple::new_folder_parent_tuple;
use rsauthz_common::{CommonResult, TupleKey};
use rsauthz_store::{
    OnDuplicate, OnMissing, PaginationOptions, TupleFilter, TupleStore,
    WriteRequest as StoreWriteRequest,
};
use tracing::{debug, info, instrument};

use super::dedup::TupleBatch;
use super::types::{
    MutateOperation, MutateRequest, OperationGroup, Permission, PermissionResource,
    RolePermission,
};
use crate::auth::AuthInfo;
use crate::error::{AuthzError, AuthzResult};
use crate::server::AuthzServer;
use crate::store_cache::StoreInfo;

/// The tuples one operation translates to.
#[derive(Debug, Default)]
struct Translation {
    batch: TupleBatch,
    /// Folder whose current parents must be looked up and deleted.
    replace_parents_of: Option<String>,
}

impl Translation {
    fn write(tuple: TupleKey) -> Self {
        Self {
            batch: TupleBatch {
                writes: vec![tuple],
                deletes: Vec::new(),
            },
            replace_parents_of: None,
        }
    }

    fn delete(tuple: TupleKey) -> Self {
        Self {
            batch: TupleBatch {
                writes: Vec::new(),
                deletes: vec![tuple],
            },
            replace_parents_of: None,
        }
    }

    fn replace(write: TupleKey, delete: TupleKey) -> Self {
        Self {
            batch: TupleBatch {
                writes: vec![write],
                deletes: vec![delete],
            },
            replace_parents_of: None,
        }
    }
}

fn validate_folder(folder: &str) -> AuthzResult<()> {
    if folder.is_empty() {
        return Err(AuthzError::invalid("folder uid is required"));
    }
    Ok(validate_name(folder)?)
}

fn validate_names<'a>(names: impl IntoIterator<Item = &'a str>) -> AuthzResult<()> {
    for name in names {
        validate_name(name)?;
    }
    Ok(())
}

/// Rejects names that would corrupt tuple identifiers.
fn validate(operation: &MutateOperation) -> AuthzResult<()> {
    match operation {
        MutateOperation::SetFolderParent { folder, parent, .. } => {
            validate_folder(folder)?;
            if !parent.is_empty() {
                validate_folder(parent)?;
            }
        }
        MutateOperation::DeleteFolder { folder, parent } => {
            validate_folder(folder)?;
            if let Some(parent) = parent {
                validate_folder(parent)?;
            }
        }
        MutateOperation::CreatePermission {
            resource,
            permission,
        }
        | MutateOperation::DeletePermission {
            resource,
            permission,
        } => validate_names([resource.name.as_str(), permission.name.as_str()])?,
        MutateOperation::UpdateUserOrgRole {
            user,
            role,
            old_role,
        } => validate_names(
            [user.as_str(), role.as_str()]
                .into_iter()
                .chain(old_role.as_deref()),
        )?,
        MutateOperation::DeleteUserOrgRole { user, role } => {
            validate_names([user.as_str(), role.as_str()])?
        }
        MutateOperation::CreateRoleBinding { subject, role_name }
        | MutateOperation::DeleteRoleBinding { subject, role_name } => {
            validate_names([subject.name.as_str(), role_name.as_str()])?
        }
        MutateOperation::UpdateRoleBinding {
            subject,
            role_name,
            old_role_name,
        } => validate_names([
            subject.name.as_str(),
            role_name.as_str(),
            old_role_name.as_str(),
        ])?,
        MutateOperation::CreateTeamBinding { user, team, .. }
        | MutateOperation::DeleteTeamBinding { user, team, .. }
        | MutateOperation::UpdateTeamBinding { user, team, .. } => {
            validate_names([user.as_str(), team.as_str()])?
        }
        MutateOperation::CreateRole { role_name, .. }
        | MutateOperation::DeleteRole { role_name, .. }
        | MutateOperation::UpdateRole { role_name, .. } => validate_name(role_name)?,
    }
    Ok(())
}

fn role_pairs(permissions: &[RolePermission]) -> impl Iterator<Item = (&str, &str)> {
    permissions
        .iter()
        .map(|p| (p.action.as_str(), p.scope.as_str()))
}

fn permission_tuple(
    resource: &PermissionResource,
    permission: &Permission,
) -> CommonResult<TupleKey> {
    translate_resource_permission(
        &resource.group,
        &resource.resource,
        &resource.name,
        &permission.kind,
        &permission.name,
        &permission.verb,
    )
}

/// Translates one operation without touching the store.
fn translate(operation: &MutateOperation) -> CommonResult<Translation> {
    let translation = match operation {
        MutateOperation::SetFolderParent {
            folder,
            parent,
            delete_existing,
        } => {
            let mut translation = Translation::default();
            if !parent.is_empty() {
                translation
                    .batch
                    .writes
                    .push(new_folder_parent_tuple(folder, parent));
            }
            if *delete_existing {
                translation.replace_parents_of = Some(folder.clone());
            }
            translation
        }
        MutateOperation::DeleteFolder { folder, parent } => match parent {
            Some(parent) => Translation::delete(new_folder_parent_tuple(folder, parent)),
            None => Translation {
                replace_parents_of: Some(folder.clone()),
                ..Translation::default()
            },
        },
        MutateOperation::CreatePermission {
            resource,
            permission,
        } => Translation::write(permission_tuple(resource, permission)?),
        MutateOperation::DeletePermission {
            resource,
            permission,
        } => Translation::delete(permission_tuple(resource, permission)?),
        MutateOperation::UpdateUserOrgRole {
            user,
            role,
            old_role,
        } => {
            let mut translation = Translation::write(new_org_role_tuple(user, role));
            if let Some(old_role) = old_role {
                translation
                    .batch
                    .deletes
                    .push(new_org_role_tuple(user, old_role));
            }
            translation
        }
        MutateOperation::DeleteUserOrgRole { user, role } => {
            Translation::delete(new_org_role_tuple(user, role))
        }
        MutateOperation::CreateRoleBinding { subject, role_name } => Translation::write(
            new_role_binding_tuple(&subject.kind, &subject.name, role_name)?,
        ),
        MutateOperation::DeleteRoleBinding { subject, role_name } => Translation::delete(
            new_role_binding_tuple(&subject.kind, &subject.name, role_name)?,
        ),
        MutateOperation::UpdateRoleBinding {
            subject,
            role_name,
            old_role_name,
        } => Translation::replace(
            new_role_binding_tuple(&subject.kind, &subject.name, role_name)?,
            new_role_binding_tuple(&subject.kind, &subject.name, old_role_name)?,
        ),
        MutateOperation::CreateTeamBinding {
            user,
            team,
            permission,
        } => Translation::write(new_team_binding_tuple(user, team, permission)?),
        MutateOperation::DeleteTeamBinding {
            user,
            team,
            permission,
        } => Translation::delete(new_team_binding_tuple(user, team, permission)?),
        MutateOperation::UpdateTeamBinding {
            user,
            team,
            permission,
            old_permission,
        } => Translation::replace(
            new_team_binding_tuple(user, team, permission)?,
            new_team_binding_tuple(user, team, old_permission)?,
        ),
        MutateOperation::CreateRole {
            role_name,
            permissions,
        } => Translation {
            batch: TupleBatch {
                writes: translate_role_permissions(role_name, role_pairs(permissions)),
                deletes: Vec::new(),
            },
            replace_parents_of: None,
        },
        MutateOperation::DeleteRole {
            role_name,
            permissions,
        } => Translation {
            batch: TupleBatch {
                writes: Vec::new(),
                deletes: translate_role_permissions(role_name, role_pairs(permissions)),
            },
            replace_parents_of: None,
        },
        MutateOperation::UpdateRole {
            role_name,
            permissions,
            old_permissions,
        } => Translation {
            batch: TupleBatch {
                writes: translate_role_permissions(role_name, role_pairs(permissions)),
                deletes: translate_role_permissions(role_name, role_pairs(old_permissions)),
            },
            replace_parents_of: None,
        },
    };
    Ok(translation)
}

impl<S: TupleStore> AuthzServer<S> {
    /// Applies a list of operations.
    ///
    /// Operations are grouped by kind and each group is committed as one
    /// store write, in [`OperationGroup`] order. Every operation is
    /// translated before the first write, so a bad operation aborts the
    /// whole request. Replaying a request is harmless: duplicate writes and
    /// missing deletes are ignored.
    #[instrument(skip(self, caller, request), fields(
        namespace = %request.namespace,
        operations = request.operations.len(),
    ))]
    pub async fn mutate(&self, caller: &AuthInfo, request: &MutateRequest) -> AuthzResult<()> {
        caller.authorize_write(&request.namespace, &self.write_permission)?;
        if request.operations.is_empty() {
            return Ok(());
        }

        for operation in &request.operations {
            validate(operation)?;
        }

        let mut translations = Vec::with_capacity(request.operations.len());
        for (index, operation) in request.operations.iter().enumerate() {
            let translation = translate(operation).map_err(|e| AuthzError::Translation {
                message: format!("operation {index}: {e}"),
            })?;
            translations.push((operation.group(), translation));
        }

        let info = self.cache.get_store_info(&request.namespace).await?;

        let mut groups: BTreeMap<OperationGroup, TupleBatch> = BTreeMap::new();
        for (group, translation) in translations {
            let batch = groups.entry(group).or_default();
            if let Some(folder) = &translation.replace_parents_of {
                let object = new_folder_ident(folder);
                batch
                    .writes
                    .retain(|t| !(t.object == object && t.relation == RELATION_PARENT));
                batch.deletes.extend(self.folder_parents(&info, folder).await?);
            }
            batch.extend(translation.batch);
        }

        for (group, batch) in groups {
            let batch = batch.dedup();
            if batch.is_empty() {
                continue;
            }
            debug!(
                ?group,
                writes = batch.writes.len(),
                deletes = batch.deletes.len(),
                "committing operation group"
            );
            self.store
                .write(&StoreWriteRequest {
                    store_id: info.id.clone(),
                    model_id: info.model_id.clone(),
                    writes: batch.writes,
                    deletes: batch.deletes,
                    on_duplicate: OnDuplicate::Ignore,
                    on_missing: OnMissing::Ignore,
                })
                .await?;
        }

        info!("applied mutation");
        Ok(())
    }

    /// Every stored `parent` tuple of `folder`, across all pages.
    async fn folder_parents(&self, info: &StoreInfo, folder: &str) -> AuthzResult<Vec<TupleKey>> {
        let filter = TupleFilter::object(new_folder_ident(folder)).with_relation(RELATION_PARENT);
        let mut pagination = PaginationOptions::new(self.settings.read_page_size);
        let mut parents = Vec::new();
        loop {
            let page = self.store.read(&info.id, &filter, &pagination).await?;
            parents.extend(page.items);
            match page.continuation_token {
                Some(token) => pagination = pagination.with_token(Some(token)),
                None => return Ok(parents),
            }
        }
    }
}

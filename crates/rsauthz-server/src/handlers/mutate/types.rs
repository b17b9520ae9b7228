//! Data types for mutate operations.

/// The object a resource permission is granted on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionResource {
    pub group: String,
    pub resource: String,
    pub name: String,
}

/// A subject and the verb (or set relation) it is granted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Permission {
    /// `User`, `ServiceAccount`, `Team` or `BasicRole`.
    pub kind: String,
    pub name: String,
    pub verb: String,
}

/// A role binding subject.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleSubject {
    pub kind: String,
    pub name: String,
}

/// An RBAC permission of a role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RolePermission {
    pub action: String,
    pub scope: String,
}

impl RolePermission {
    pub fn new(action: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            scope: scope.into(),
        }
    }
}

/// A single change to the tuple store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutateOperation {
    /// Sets the parent of a folder. An empty parent leaves the folder at
    /// the root. With `delete_existing`, every current parent is removed.
    SetFolderParent {
        folder: String,
        parent: String,
        delete_existing: bool,
    },
    /// Removes a folder's parent tuple. Without a known parent, every
    /// current parent is removed.
    DeleteFolder {
        folder: String,
        parent: Option<String>,
    },
    CreatePermission {
        resource: PermissionResource,
        permission: Permission,
    },
    DeletePermission {
        resource: PermissionResource,
        permission: Permission,
    },
    UpdateUserOrgRole {
        user: String,
        role: String,
        old_role: Option<String>,
    },
    DeleteUserOrgRole {
        user: String,
        role: String,
    },
    CreateRoleBinding {
        subject: RoleSubject,
        role_name: String,
    },
    DeleteRoleBinding {
        subject: RoleSubject,
        role_name: String,
    },
    UpdateRoleBinding {
        subject: RoleSubject,
        role_name: String,
        old_role_name: String,
    },
    CreateTeamBinding {
        user: String,
        team: String,
        permission: String,
    },
    DeleteTeamBinding {
        user: String,
        team: String,
        permission: String,
    },
    UpdateTeamBinding {
        user: String,
        team: String,
        permission: String,
        old_permission: String,
    },
    CreateRole {
        role_name: String,
        permissions: Vec<RolePermission>,
    },
    DeleteRole {
        role_name: String,
        permissions: Vec<RolePermission>,
    },
    UpdateRole {
        role_name: String,
        permissions: Vec<RolePermission>,
        old_permissions: Vec<RolePermission>,
    },
}

/// Operation groups, in commit order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OperationGroup {
    Folder,
    Permission,
    UserOrgRole,
    RoleBinding,
    TeamBinding,
    Role,
}

impl MutateOperation {
    pub fn group(&self) -> OperationGroup {
        match self {
            Self::SetFolderParent { .. } | Self::DeleteFolder { .. } => OperationGroup::Folder,
            Self::CreatePermission { .. } | Self::DeletePermission { .. } => {
                OperationGroup::Permission
            }
            Self::UpdateUserOrgRole { .. } | Self::DeleteUserOrgRole { .. } => {
                OperationGroup::UserOrgRole
            }
            Self::CreateRoleBinding { .. }
            | Self::DeleteRoleBinding { .. }
            | Self::UpdateRoleBinding { .. } => OperationGroup::RoleBinding,
            Self::CreateTeamBinding { .. }
            | Self::DeleteTeamBinding { .. }
            | Self::UpdateTeamBinding { .. } => OperationGroup::TeamBinding,
            Self::CreateRole { .. } | Self::DeleteRole { .. } | Self::UpdateRole { .. } => {
                OperationGroup::Role
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MutateRequest {
    pub namespace: String,
    pub operations: Vec<MutateOperation>,
}

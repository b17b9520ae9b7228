//! Relation vocabulary and verb translation.
//!
//! Every check or list request arrives with a platform verb. The verb is
//! translated to a store relation here, and the relation is validated against
//! the vocabulary of the object type before any store call is made.

use crate::error::{CommonError, CommonResult};

pub const VERB_GET: &str = "get";
pub const VERB_LIST: &str = "list";
pub const VERB_WATCH: &str = "watch";
pub const VERB_CREATE: &str = "create";
pub const VERB_UPDATE: &str = "update";
pub const VERB_PATCH: &str = "patch";
pub const VERB_DELETE: &str = "delete";
pub const VERB_DELETE_COLLECTION: &str = "deletecollection";
pub const VERB_GET_PERMISSIONS: &str = "get_permissions";
pub const VERB_SET_PERMISSIONS: &str = "set_permissions";

pub const RELATION_PARENT: &str = "parent";
pub const RELATION_ASSIGNEE: &str = "assignee";
pub const RELATION_TEAM_MEMBER: &str = "member";
pub const RELATION_TEAM_ADMIN: &str = "admin";

pub const RELATION_SET_VIEW: &str = "view";
pub const RELATION_SET_EDIT: &str = "edit";
pub const RELATION_SET_ADMIN: &str = "admin";

pub const RELATION_GET: &str = "get";
pub const RELATION_UPDATE: &str = "update";
pub const RELATION_CREATE: &str = "create";
pub const RELATION_DELETE: &str = "delete";
pub const RELATION_GET_PERMISSIONS: &str = "get_permissions";
pub const RELATION_SET_PERMISSIONS: &str = "set_permissions";

/// Prefix turning a plain relation into its folder-scoped subresource form.
pub const SUBRESOURCE_PREFIX: &str = "resource_";

pub const RELATION_SUBRESOURCE_SET_VIEW: &str = "resource_view";
pub const RELATION_SUBRESOURCE_SET_EDIT: &str = "resource_edit";
pub const RELATION_SUBRESOURCE_SET_ADMIN: &str = "resource_admin";

pub const RELATION_SUBRESOURCE_GET: &str = "resource_get";
pub const RELATION_SUBRESOURCE_UPDATE: &str = "resource_update";
pub const RELATION_SUBRESOURCE_CREATE: &str = "resource_create";
pub const RELATION_SUBRESOURCE_DELETE: &str = "resource_delete";
pub const RELATION_SUBRESOURCE_GET_PERMISSIONS: &str = "resource_get_permissions";
pub const RELATION_SUBRESOURCE_SET_PERMISSIONS: &str = "resource_set_permissions";

/// Plain relations held on typed objects.
pub const RELATIONS_TYPED: &[&str] = &[
    RELATION_GET,
    RELATION_UPDATE,
    RELATION_CREATE,
    RELATION_DELETE,
    RELATION_GET_PERMISSIONS,
    RELATION_SET_PERMISSIONS,
];

/// Relations checkable on `resource` objects.
pub const RELATIONS_RESOURCE: &[&str] = RELATIONS_TYPED;

/// Relations checkable on `group_resource` objects.
pub const RELATIONS_GROUP_RESOURCE: &[&str] = RELATIONS_TYPED;

/// Folder-scoped relations covering the resources inside a folder.
pub const RELATIONS_SUBRESOURCE: &[&str] = &[
    RELATION_SUBRESOURCE_GET,
    RELATION_SUBRESOURCE_UPDATE,
    RELATION_SUBRESOURCE_CREATE,
    RELATION_SUBRESOURCE_DELETE,
    RELATION_SUBRESOURCE_GET_PERMISSIONS,
    RELATION_SUBRESOURCE_SET_PERMISSIONS,
];

/// Relations checkable on folders: subresource relations plus plain ones.
pub const RELATIONS_FOLDER: &[&str] = &[
    RELATION_SUBRESOURCE_GET,
    RELATION_SUBRESOURCE_UPDATE,
    RELATION_SUBRESOURCE_CREATE,
    RELATION_SUBRESOURCE_DELETE,
    RELATION_SUBRESOURCE_GET_PERMISSIONS,
    RELATION_SUBRESOURCE_SET_PERMISSIONS,
    RELATION_GET,
    RELATION_UPDATE,
    RELATION_CREATE,
    RELATION_DELETE,
    RELATION_GET_PERMISSIONS,
    RELATION_SET_PERMISSIONS,
];

/// Folder set relations. Grants on these are never subresource-filtered.
pub const RELATIONS_SUBRESOURCE_SET: &[&str] = &[
    RELATION_SUBRESOURCE_SET_VIEW,
    RELATION_SUBRESOURCE_SET_EDIT,
    RELATION_SUBRESOURCE_SET_ADMIN,
];

/// Translates a platform verb to a store relation.
pub fn relation_for_verb(verb: &str) -> Option<&'static str> {
    match verb {
        VERB_GET | VERB_LIST | VERB_WATCH => Some(RELATION_GET),
        VERB_CREATE => Some(RELATION_CREATE),
        VERB_UPDATE | VERB_PATCH => Some(RELATION_UPDATE),
        VERB_DELETE | VERB_DELETE_COLLECTION => Some(RELATION_DELETE),
        VERB_GET_PERMISSIONS => Some(RELATION_GET_PERMISSIONS),
        VERB_SET_PERMISSIONS => Some(RELATION_SET_PERMISSIONS),
        _ => None,
    }
}

/// Like [`relation_for_verb`] but fails with [`CommonError::UnknownVerb`].
pub fn require_relation_for_verb(verb: &str) -> CommonResult<&'static str> {
    relation_for_verb(verb).ok_or_else(|| CommonError::UnknownVerb {
        verb: verb.to_string(),
    })
}

/// Translates a store relation back to its canonical verb.
pub fn verb_for_relation(relation: &str) -> Option<&'static str> {
    match relation {
        RELATION_GET => Some(VERB_GET),
        RELATION_CREATE => Some(VERB_CREATE),
        RELATION_UPDATE => Some(VERB_UPDATE),
        RELATION_DELETE => Some(VERB_DELETE),
        RELATION_GET_PERMISSIONS => Some(VERB_GET_PERMISSIONS),
        RELATION_SET_PERMISSIONS => Some(VERB_SET_PERMISSIONS),
        _ => None,
    }
}

/// `get` -> `resource_get`
pub fn subresource_relation(relation: &str) -> String {
    format!("{SUBRESOURCE_PREFIX}{relation}")
}

pub fn is_group_resource_relation(relation: &str) -> bool {
    RELATIONS_GROUP_RESOURCE.contains(&relation)
}

pub fn is_resource_relation(relation: &str) -> bool {
    RELATIONS_RESOURCE.contains(&relation)
}

pub fn is_subresource_relation(relation: &str) -> bool {
    RELATIONS_SUBRESOURCE.contains(&relation)
}

pub fn is_subresource_set_relation(relation: &str) -> bool {
    RELATIONS_SUBRESOURCE_SET.contains(&relation)
}

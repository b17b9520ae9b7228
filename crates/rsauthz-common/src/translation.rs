//! Translation of RBAC actions and permission subjects into tuples.
//!
//! Each platform kind (`folders`, `dashboards`) has a static table mapping
//! `"<resource>:<action>"` strings to a relation and, for folder-scoped
//! actions on another kind, the group/resource the grant applies to.
//! Unknown `(kind, action)` pairs translate to `None`: there is no wildcard
//! fallback.

use crate::error::{CommonError, CommonResult};
use crate::ident::{
    new_typed_ident, new_userset_ident, validate_name, TYPE_FOLDER, TYPE_RESOURCE, TYPE_ROLE,
    TYPE_SERVICE_ACCOUNT, TYPE_TEAM, TYPE_USER, WILDCARD,
};
use crate::relations::{
    require_relation_for_verb, RELATION_ASSIGNEE, RELATION_CREATE, RELATION_DELETE, RELATION_GET,
    RELATION_GET_PERMISSIONS, RELATION_SET_ADMIN, RELATION_SET_EDIT, RELATION_SET_PERMISSIONS,
    RELATION_SET_VIEW, RELATION_TEAM_ADMIN, RELATION_TEAM_MEMBER, RELATION_UPDATE,
};
use crate::resource::{DASHBOARD_GROUP, DASHBOARD_RESOURCE, FOLDER_GROUP, FOLDER_RESOURCE};
use crate::tuple::{
    merge_folder_resource_tuples, new_folder_resource_tuple, new_folder_tuple,
    new_group_resource_tuple, new_resource_tuple, new_typed_tuple, TupleKey,
};

pub const KIND_FOLDERS: &str = "folders";
pub const KIND_DASHBOARDS: &str = "dashboards";

/// Prefix of the role objects backing basic org roles.
pub const BASIC_ROLE_PREFIX: &str = "basic_";

pub const SUBJECT_KIND_USER: &str = "User";
pub const SUBJECT_KIND_SERVICE_ACCOUNT: &str = "ServiceAccount";
pub const SUBJECT_KIND_TEAM: &str = "Team";
pub const SUBJECT_KIND_BASIC_ROLE: &str = "BasicRole";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScopedGroupResource {
    group: &'static str,
    resource: &'static str,
    subresource: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ActionMapping {
    relation: &'static str,
    scope: Option<ScopedGroupResource>,
}

impl ActionMapping {
    const fn plain(relation: &'static str) -> Self {
        Self {
            relation,
            scope: None,
        }
    }

    const fn scoped(
        relation: &'static str,
        group: &'static str,
        resource: &'static str,
        subresource: &'static str,
    ) -> Self {
        Self {
            relation,
            scope: Some(ScopedGroupResource {
                group,
                resource,
                subresource,
            }),
        }
    }
}

struct ResourceTranslation {
    type_name: &'static str,
    group: &'static str,
    resource: &'static str,
    mappings: &'static [(&'static str, ActionMapping)],
}

impl ResourceTranslation {
    fn mapping(&self, action: &str) -> Option<ActionMapping> {
        self.mappings
            .iter()
            .find(|(a, _)| *a == action)
            .map(|(_, m)| *m)
    }
}

const FOLDER_TRANSLATION: ResourceTranslation = ResourceTranslation {
    type_name: TYPE_FOLDER,
    group: FOLDER_GROUP,
    resource: FOLDER_RESOURCE,
    mappings: &[
        ("folders:read", ActionMapping::plain(RELATION_GET)),
        ("folders:write", ActionMapping::plain(RELATION_UPDATE)),
        ("folders:create", ActionMapping::plain(RELATION_CREATE)),
        ("folders:delete", ActionMapping::plain(RELATION_DELETE)),
        (
            "folders.permissions:read",
            ActionMapping::plain(RELATION_GET_PERMISSIONS),
        ),
        (
            "folders.permissions:write",
            ActionMapping::plain(RELATION_SET_PERMISSIONS),
        ),
        (
            "dashboards:read",
            ActionMapping::scoped(RELATION_GET, DASHBOARD_GROUP, DASHBOARD_RESOURCE, ""),
        ),
        (
            "dashboards:write",
            ActionMapping::scoped(RELATION_UPDATE, DASHBOARD_GROUP, DASHBOARD_RESOURCE, ""),
        ),
        (
            "dashboards:create",
            ActionMapping::scoped(RELATION_CREATE, DASHBOARD_GROUP, DASHBOARD_RESOURCE, ""),
        ),
        (
            "dashboards:delete",
            ActionMapping::scoped(RELATION_DELETE, DASHBOARD_GROUP, DASHBOARD_RESOURCE, ""),
        ),
        (
            "dashboards.permissions:read",
            ActionMapping::scoped(
                RELATION_GET_PERMISSIONS,
                DASHBOARD_GROUP,
                DASHBOARD_RESOURCE,
                "",
            ),
        ),
        (
            "dashboards.permissions:write",
            ActionMapping::scoped(
                RELATION_SET_PERMISSIONS,
                DASHBOARD_GROUP,
                DASHBOARD_RESOURCE,
                "",
            ),
        ),
    ],
};

const DASHBOARD_TRANSLATION: ResourceTranslation = ResourceTranslation {
    type_name: TYPE_RESOURCE,
    group: DASHBOARD_GROUP,
    resource: DASHBOARD_RESOURCE,
    mappings: &[
        ("dashboards:read", ActionMapping::plain(RELATION_GET)),
        ("dashboards:write", ActionMapping::plain(RELATION_UPDATE)),
        ("dashboards:create", ActionMapping::plain(RELATION_CREATE)),
        ("dashboards:delete", ActionMapping::plain(RELATION_DELETE)),
        (
            "dashboards.permissions:read",
            ActionMapping::plain(RELATION_GET_PERMISSIONS),
        ),
        (
            "dashboards.permissions:write",
            ActionMapping::plain(RELATION_SET_PERMISSIONS),
        ),
    ],
};

fn translation_for(kind: &str) -> Option<&'static ResourceTranslation> {
    match kind {
        KIND_FOLDERS => Some(&FOLDER_TRANSLATION),
        KIND_DASHBOARDS => Some(&DASHBOARD_TRANSLATION),
        _ => None,
    }
}

/// Translates an RBAC action on `kind` object `name` into a tuple for
/// `subject`. A `name` of `*` grants on the whole group/resource. Names
/// with reserved characters are not translatable.
pub fn translate_to_resource_tuple(
    subject: &str,
    action: &str,
    kind: &str,
    name: &str,
) -> Option<TupleKey> {
    let translation = translation_for(kind)?;
    let mapping = translation.mapping(action)?;
    validate_name(name).ok()?;

    if name == WILDCARD {
        let tuple = match mapping.scope {
            Some(scope) => new_group_resource_tuple(
                subject,
                mapping.relation,
                scope.group,
                scope.resource,
                scope.subresource,
            ),
            None => new_group_resource_tuple(
                subject,
                mapping.relation,
                translation.group,
                translation.resource,
                "",
            ),
        };
        return Some(tuple);
    }

    let tuple = match (translation.type_name, mapping.scope) {
        (TYPE_FOLDER, Some(scope)) => new_folder_resource_tuple(
            subject,
            mapping.relation,
            scope.group,
            scope.resource,
            scope.subresource,
            name,
        ),
        (TYPE_FOLDER, None) => new_folder_tuple(subject, mapping.relation, name),
        (TYPE_RESOURCE, _) => new_resource_tuple(
            subject,
            mapping.relation,
            translation.group,
            translation.resource,
            "",
            name,
        ),
        (type_name, _) => TupleKey::new(subject, mapping.relation, new_typed_ident(type_name, name)),
    };
    Some(tuple)
}

/// Splits an RBAC scope into `(kind, name)`.
///
/// `folders:uid:abc` -> `("folders", "abc")`, `dashboards:*` ->
/// `("dashboards", "*")`, `*` -> `("*", "*")`. Everything after the
/// attribute is the name, reserved characters included.
pub fn parse_scope(scope: &str) -> (&str, &str) {
    if scope == WILDCARD {
        return (WILDCARD, WILDCARD);
    }
    let mut parts = scope.splitn(3, ':');
    let kind = parts.next().unwrap_or(scope);
    match (parts.next(), parts.next()) {
        (_, Some(name)) | (Some(name), None) => (kind, name),
        (None, None) => (kind, WILDCARD),
    }
}

/// Translates an RBAC permission `(action, scope)` for `subject`.
pub fn translate_permission(subject: &str, action: &str, scope: &str) -> Option<TupleKey> {
    let (kind, name) = parse_scope(scope);
    if kind == WILDCARD {
        // Unscoped permission: derive the kind from the action prefix.
        let kind = action.split([':', '.']).next().unwrap_or(action);
        return translate_to_resource_tuple(subject, action, kind, WILDCARD);
    }
    translate_to_resource_tuple(subject, action, kind, name)
}

/// `role:<name>#assignee`
pub fn role_subject(role_name: &str) -> String {
    new_userset_ident(TYPE_ROLE, role_name, RELATION_ASSIGNEE)
}

/// Role object name backing a basic org role (`Viewer` -> `basic_viewer`).
pub fn basic_role_name(role: &str) -> String {
    format!("{BASIC_ROLE_PREFIX}{}", role.to_lowercase())
}

/// Translates a permission subject `(kind, name)` to a tuple user.
pub fn subject_ident(kind: &str, name: &str) -> CommonResult<String> {
    match kind {
        SUBJECT_KIND_USER => Ok(new_typed_ident(TYPE_USER, name)),
        SUBJECT_KIND_SERVICE_ACCOUNT => Ok(new_typed_ident(TYPE_SERVICE_ACCOUNT, name)),
        SUBJECT_KIND_TEAM => Ok(new_userset_ident(TYPE_TEAM, name, RELATION_TEAM_MEMBER)),
        SUBJECT_KIND_BASIC_ROLE => Ok(role_subject(&basic_role_name(name))),
        _ => Err(CommonError::UnknownSubjectKind {
            kind: kind.to_string(),
        }),
    }
}

/// Relation granted by a resource permission verb. Accepts the set
/// relations (`view`, `edit`, `admin`) as well as plain verbs.
pub fn permission_relation(verb: &str) -> CommonResult<&'static str> {
    match verb {
        RELATION_SET_VIEW => Ok(RELATION_SET_VIEW),
        RELATION_SET_EDIT => Ok(RELATION_SET_EDIT),
        RELATION_SET_ADMIN => Ok(RELATION_SET_ADMIN),
        _ => require_relation_for_verb(verb),
    }
}

/// Grant of `verb` on the named `group/resource` object to a permission
/// subject. Folders get a typed folder tuple; everything else a
/// group-bound resource tuple.
pub fn translate_resource_permission(
    group: &str,
    resource: &str,
    name: &str,
    subject_kind: &str,
    subject_name: &str,
    verb: &str,
) -> CommonResult<TupleKey> {
    let subject = subject_ident(subject_kind, subject_name)?;
    let relation = permission_relation(verb)?;
    if group == FOLDER_GROUP && resource == FOLDER_RESOURCE {
        validate_name(name)?;
        return Ok(new_folder_tuple(&subject, relation, name));
    }
    Ok(new_resource_tuple(&subject, relation, group, resource, "", name))
}

/// `user:<user>` is `assignee` of the basic role backing `role`.
pub fn new_org_role_tuple(user: &str, role: &str) -> TupleKey {
    new_typed_tuple(
        &new_typed_ident(TYPE_USER, user),
        RELATION_ASSIGNEE,
        TYPE_ROLE,
        &basic_role_name(role),
    )
}

/// The subject is `assignee` of `role:<role_name>`.
pub fn new_role_binding_tuple(
    subject_kind: &str,
    subject_name: &str,
    role_name: &str,
) -> CommonResult<TupleKey> {
    let subject = subject_ident(subject_kind, subject_name)?;
    Ok(new_typed_tuple(&subject, RELATION_ASSIGNEE, TYPE_ROLE, role_name))
}

/// `user:<user>` is `member` or `admin` of `team:<team>`.
pub fn new_team_binding_tuple(user: &str, team: &str, permission: &str) -> CommonResult<TupleKey> {
    let relation = match permission {
        RELATION_TEAM_MEMBER => RELATION_TEAM_MEMBER,
        RELATION_TEAM_ADMIN => RELATION_TEAM_ADMIN,
        _ => {
            return Err(CommonError::UnknownTeamPermission {
                permission: permission.to_string(),
            })
        }
    };
    Ok(new_typed_tuple(
        &new_typed_ident(TYPE_USER, user),
        relation,
        TYPE_TEAM,
        team,
    ))
}

/// Translates the `(action, scope)` permissions of a role into tuples for
/// its assignees. Untranslatable permissions are skipped; folder resource
/// grants on the same folder and relation are merged.
pub fn translate_role_permissions<'a>(
    role_name: &str,
    permissions: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> Vec<TupleKey> {
    let subject = role_subject(role_name);
    let mut tuples: Vec<TupleKey> = Vec::new();
    for (action, scope) in permissions {
        let Some(tuple) = translate_permission(&subject, action, scope) else {
            continue;
        };
        let merged = tuples
            .iter_mut()
            .any(|existing| merge_folder_resource_tuples(existing, &tuple));
        if !merged && !tuples.iter().any(|t| t.identity() == tuple.identity()) {
            tuples.push(tuple);
        }
    }
    tuples
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuple::CONDITION_SUBRESOURCE_FILTER;

    #[test]
    fn test_folder_action_on_folder() {
        let tuple = translate_to_resource_tuple("role:r#assignee", "folders:read", "folders", "f1")
            .unwrap();
        assert_eq!(tuple, TupleKey::new("role:r#assignee", "get", "folder:f1"));
    }

    #[test]
    fn test_dashboard_action_scoped_to_folder() {
        let tuple =
            translate_to_resource_tuple("role:r#assignee", "dashboards:write", "folders", "f1")
                .unwrap();
        assert_eq!(tuple.relation, "resource_update");
        assert_eq!(tuple.object, "folder:f1");
        let condition = tuple.condition.unwrap();
        assert_eq!(condition.name, CONDITION_SUBRESOURCE_FILTER);
        assert_eq!(
            condition.subresources(),
            vec!["dashboard.grafana.app/dashboards".to_string()]
        );
    }

    #[test]
    fn test_dashboard_action_on_dashboard() {
        let tuple =
            translate_to_resource_tuple("user:1", "dashboards:read", "dashboards", "d1").unwrap();
        assert_eq!(tuple.object, "resource:dashboard.grafana.app/dashboards/d1");
        assert_eq!(tuple.relation, "get");
    }

    #[test]
    fn test_wildcard_name_grants_group_resource() {
        let tuple =
            translate_to_resource_tuple("user:1", "dashboards:read", "dashboards", "*").unwrap();
        assert_eq!(
            tuple,
            TupleKey::new("user:1", "get", "group_resource:dashboard.grafana.app/dashboards")
        );

        let scoped =
            translate_to_resource_tuple("user:1", "dashboards:read", "folders", "*").unwrap();
        assert_eq!(
            scoped.object,
            "group_resource:dashboard.grafana.app/dashboards"
        );
    }

    #[test]
    fn test_unknown_translation_fails_closed() {
        assert!(translate_to_resource_tuple("user:1", "dashboards:read", "alerts", "a").is_none());
        assert!(translate_to_resource_tuple("user:1", "folders:explode", "folders", "f").is_none());
        assert!(translate_to_resource_tuple("user:1", "teams:read", "dashboards", "*").is_none());
    }

    #[test]
    fn test_parse_scope() {
        assert_eq!(parse_scope("folders:uid:abc"), ("folders", "abc"));
        assert_eq!(parse_scope("dashboards:*"), ("dashboards", "*"));
        assert_eq!(parse_scope("dashboards:uid:*"), ("dashboards", "*"));
        assert_eq!(parse_scope("*"), ("*", "*"));
        assert_eq!(parse_scope("folders"), ("folders", "*"));
        assert_eq!(parse_scope("folders:uid:a:b"), ("folders", "a:b"));
    }

    #[test]
    fn test_reserved_characters_in_scope_name_are_not_translatable() {
        assert!(translate_permission("user:1", "folders:read", "folders:uid:a#b").is_none());
        assert!(translate_permission("user:1", "dashboards:read", "folders:uid:a:b").is_none());
        assert!(translate_permission("user:1", "dashboards:read", "dashboards:uid:d#1").is_none());

        let tuples = translate_role_permissions(
            "editor",
            [
                ("folders:read", "folders:uid:a#b"),
                ("folders:read", "folders:uid:ok"),
            ],
        );
        assert_eq!(tuples, vec![TupleKey::new("role:editor#assignee", "get", "folder:ok")]);
    }

    #[test]
    fn test_translate_permission_unscoped() {
        let tuple = translate_permission("role:r#assignee", "folders:create", "*").unwrap();
        assert_eq!(
            tuple.object,
            "group_resource:folder.grafana.app/folders"
        );
        assert_eq!(tuple.relation, "create");
    }

    #[test]
    fn test_subject_ident() {
        assert_eq!(subject_ident("User", "u1").unwrap(), "user:u1");
        assert_eq!(
            subject_ident("ServiceAccount", "s1").unwrap(),
            "service-account:s1"
        );
        assert_eq!(subject_ident("Team", "t1").unwrap(), "team:t1#member");
        assert_eq!(
            subject_ident("BasicRole", "Editor").unwrap(),
            "role:basic_editor#assignee"
        );
        assert!(subject_ident("Robot", "r").is_err());
    }

    #[test]
    fn test_resource_permission_on_folder_and_dashboard() {
        let folder =
            translate_resource_permission(FOLDER_GROUP, FOLDER_RESOURCE, "f1", "User", "u1", "edit")
                .unwrap();
        assert_eq!(folder, TupleKey::new("user:u1", "edit", "folder:f1"));

        let dashboard = translate_resource_permission(
            DASHBOARD_GROUP,
            DASHBOARD_RESOURCE,
            "d1",
            "Team",
            "t1",
            "view",
        )
        .unwrap();
        assert_eq!(dashboard.user, "team:t1#member");
        assert_eq!(dashboard.object, "resource:dashboard.grafana.app/dashboards/d1");
        assert!(dashboard.condition.is_some());

        assert!(translate_resource_permission(
            FOLDER_GROUP,
            FOLDER_RESOURCE,
            "bad:uid",
            "User",
            "u1",
            "view"
        )
        .is_err());
        assert!(
            translate_resource_permission("g", "r", "n", "User", "u1", "explode").is_err()
        );
    }

    #[test]
    fn test_binding_tuples() {
        assert_eq!(
            new_org_role_tuple("u1", "Viewer"),
            TupleKey::new("user:u1", "assignee", "role:basic_viewer")
        );
        assert_eq!(
            new_role_binding_tuple("Team", "t1", "custom").unwrap(),
            TupleKey::new("team:t1#member", "assignee", "role:custom")
        );
        assert_eq!(
            new_team_binding_tuple("u1", "t1", "admin").unwrap(),
            TupleKey::new("user:u1", "admin", "team:t1")
        );
        assert!(matches!(
            new_team_binding_tuple("u1", "t1", "owner"),
            Err(CommonError::UnknownTeamPermission { .. })
        ));
    }

    #[test]
    fn test_role_permissions_skip_unknown_and_dedup() {
        let tuples = translate_role_permissions(
            "editor",
            [
                ("dashboards:read", "folders:uid:f1"),
                ("dashboards:read", "folders:uid:f1"),
                ("dashboards:write", "folders:uid:f1"),
                ("alerts:read", "alerts:*"),
                ("folders:read", "folders:uid:f1"),
            ],
        );
        assert_eq!(tuples.len(), 3);
        assert!(tuples.iter().all(|t| t.user == "role:editor#assignee"));
        assert!(tuples
            .iter()
            .any(|t| t.relation == "resource_get" && t.object == "folder:f1"));
        assert!(tuples.iter().any(|t| t.relation == "get" && t.object == "folder:f1"));
    }
}

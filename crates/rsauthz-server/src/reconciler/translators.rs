//! Declarative object to tuple translation.
//!
//! Each object maps to zero or more tuples from its own fields only.

use std::collections::BTreeMap;

use rsauthz_common::ident::validate_name;
use rsauthz_common::translation::{
    new_org_role_tuple, new_role_binding_tuple, new_team_binding_tuple,
    translate_resource_permission, translate_role_permissions,
};
use rsauthz_common::tuple::new_folder_parent_tuple;
use rsauthz_common::{CommonError, TupleKey};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::source::ObjectKind;

/// Annotation naming a folder's parent folder.
pub const FOLDER_PARENT_ANNOTATION: &str = "grafana.app/folder";

/// Why a single object could not be translated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslateError {
    /// Object name, or empty when the object has none.
    pub name: String,
    pub message: String,
}

impl TranslateError {
    fn new(name: &str, err: impl ToString) -> Self {
        Self {
            name: name.to_string(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Metadata {
    name: String,
    #[serde(default)]
    annotations: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct Object<T> {
    metadata: Metadata,
    #[serde(default)]
    spec: T,
}

#[derive(Debug, Default, Deserialize)]
struct Empty {}

#[derive(Debug, Default, Deserialize)]
struct RoleSpec {
    #[serde(default)]
    permissions: Vec<RolePermissionSpec>,
}

#[derive(Debug, Deserialize)]
struct RolePermissionSpec {
    action: String,
    #[serde(default)]
    scope: String,
}

#[derive(Debug, Default, Deserialize)]
struct Named {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct Subject {
    kind: String,
    name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoleBindingSpec {
    subject: Subject,
    #[serde(default)]
    role_refs: Vec<Named>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PermissionTarget {
    api_group: String,
    resource: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct PermissionSpec {
    kind: String,
    name: String,
    verb: String,
}

#[derive(Debug, Default, Deserialize)]
struct ResourcePermissionSpec {
    resource: PermissionTarget,
    #[serde(default)]
    permissions: Vec<PermissionSpec>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TeamBindingSpec {
    subject: Named,
    team_ref: Named,
    permission: String,
}

#[derive(Debug, Default, Deserialize)]
struct UserSpec {
    #[serde(default)]
    role: String,
}

fn parse<T: DeserializeOwned + Default>(value: &Value) -> Result<Object<T>, TranslateError> {
    let name = value
        .pointer("/metadata/name")
        .and_then(Value::as_str)
        .unwrap_or_default();
    serde_json::from_value(value.clone()).map_err(|e| TranslateError::new(name, e))
}

fn common(name: &str) -> impl Fn(CommonError) -> TranslateError + '_ {
    move |e| TranslateError::new(name, e)
}

/// Translates one object of `kind` into its tuples.
pub fn translate(kind: ObjectKind, value: &Value) -> Result<Vec<TupleKey>, TranslateError> {
    match kind {
        ObjectKind::Folders => translate_folder(value),
        ObjectKind::Roles => translate_role(value),
        ObjectKind::RoleBindings => translate_role_binding(value),
        ObjectKind::ResourcePermissions => translate_resource_permission_object(value),
        ObjectKind::TeamBindings => translate_team_binding(value),
        ObjectKind::Users => translate_user(value),
    }
}

fn translate_folder(value: &Value) -> Result<Vec<TupleKey>, TranslateError> {
    let folder: Object<Empty> = parse(value)?;
    let name = folder.metadata.name.as_str();
    let parent = folder
        .metadata
        .annotations
        .get(FOLDER_PARENT_ANNOTATION)
        .map(String::as_str)
        .unwrap_or_default();
    if parent.is_empty() {
        return Ok(Vec::new());
    }
    validate_name(name).map_err(common(name))?;
    validate_name(parent).map_err(common(name))?;
    Ok(vec![new_folder_parent_tuple(name, parent)])
}

fn translate_role(value: &Value) -> Result<Vec<TupleKey>, TranslateError> {
    let role: Object<RoleSpec> = parse(value)?;
    let permissions = role
        .spec
        .permissions
        .iter()
        .map(|p| (p.action.as_str(), p.scope.as_str()));
    Ok(translate_role_permissions(&role.metadata.name, permissions))
}

fn translate_role_binding(value: &Value) -> Result<Vec<TupleKey>, TranslateError> {
    let binding: Object<RoleBindingSpec> = parse(value)?;
    let name = binding.metadata.name.as_str();
    let subject = &binding.spec.subject;
    binding
        .spec
        .role_refs
        .iter()
        .map(|role| {
            new_role_binding_tuple(&subject.kind, &subject.name, &role.name).map_err(common(name))
        })
        .collect()
}

fn translate_resource_permission_object(value: &Value) -> Result<Vec<TupleKey>, TranslateError> {
    let object: Object<ResourcePermissionSpec> = parse(value)?;
    let name = object.metadata.name.as_str();
    let target = &object.spec.resource;
    object
        .spec
        .permissions
        .iter()
        .map(|permission| {
            translate_resource_permission(
                &target.api_group,
                &target.resource,
                &target.name,
                &permission.kind,
                &permission.name,
                &permission.verb,
            )
            .map_err(common(name))
        })
        .collect()
}

fn translate_team_binding(value: &Value) -> Result<Vec<TupleKey>, TranslateError> {
    let binding: Object<TeamBindingSpec> = parse(value)?;
    let spec = &binding.spec;
    let tuple = new_team_binding_tuple(&spec.subject.name, &spec.team_ref.name, &spec.permission)
        .map_err(common(&binding.metadata.name))?;
    Ok(vec![tuple])
}

fn translate_user(value: &Value) -> Result<Vec<TupleKey>, TranslateError> {
    let user: Object<UserSpec> = parse(value)?;
    if user.spec.role.is_empty() {
        return Ok(Vec::new());
    }
    Ok(vec![new_org_role_tuple(&user.metadata.name, &user.spec.role)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_folder_with_parent_yields_one_tuple() {
        let folder = json!({
            "metadata": {"name": "child", "annotations": {"grafana.app/folder": "root"}},
        });
        assert_eq!(
            translate(ObjectKind::Folders, &folder).unwrap(),
            vec![TupleKey::new("folder:root", "parent", "folder:child")]
        );
    }

    #[test]
    fn test_folder_without_parent_yields_nothing() {
        let folder = json!({"metadata": {"name": "root"}});
        assert!(translate(ObjectKind::Folders, &folder).unwrap().is_empty());

        let folder = json!({
            "metadata": {"name": "root", "annotations": {"grafana.app/folder": ""}},
        });
        assert!(translate(ObjectKind::Folders, &folder).unwrap().is_empty());
    }

    #[test]
    fn test_folder_with_reserved_characters_fails() {
        let folder = json!({
            "metadata": {"name": "a#b", "annotations": {"grafana.app/folder": "root"}},
        });
        let err = translate(ObjectKind::Folders, &folder).unwrap_err();
        assert_eq!(err.name, "a#b");
    }

    #[test]
    fn test_role_translates_known_permissions() {
        let role = json!({
            "metadata": {"name": "custom"},
            "spec": {"permissions": [
                {"action": "folders:read", "scope": "folders:uid:f1"},
                {"action": "dashboards:write", "scope": "dashboards:*"},
                {"action": "alerts:read", "scope": "folders:uid:f1"},
            ]},
        });
        let tuples = translate(ObjectKind::Roles, &role).unwrap();

        assert_eq!(tuples.len(), 2);
        assert!(tuples.iter().all(|t| t.user == "role:custom#assignee"));
        assert_eq!(tuples[0], TupleKey::new("role:custom#assignee", "get", "folder:f1"));
        assert_eq!(
            tuples[1].object,
            "group_resource:dashboard.grafana.app/dashboards"
        );
    }

    #[test]
    fn test_role_binding_yields_one_tuple_per_role() {
        let binding = json!({
            "metadata": {"name": "rb"},
            "spec": {
                "subject": {"kind": "User", "name": "u1"},
                "roleRefs": [{"name": "a"}, {"name": "b"}],
            },
        });
        assert_eq!(
            translate(ObjectKind::RoleBindings, &binding).unwrap(),
            vec![
                TupleKey::new("user:u1", "assignee", "role:a"),
                TupleKey::new("user:u1", "assignee", "role:b"),
            ]
        );
    }

    #[test]
    fn test_role_binding_with_unknown_subject_kind_fails() {
        let binding = json!({
            "metadata": {"name": "rb"},
            "spec": {"subject": {"kind": "Robot", "name": "r"}, "roleRefs": [{"name": "a"}]},
        });
        assert!(translate(ObjectKind::RoleBindings, &binding).is_err());
    }

    #[test]
    fn test_resource_permission() {
        let permission = json!({
            "metadata": {"name": "rp"},
            "spec": {
                "resource": {
                    "apiGroup": "dashboard.grafana.app",
                    "resource": "dashboards",
                    "name": "d1",
                },
                "permissions": [
                    {"kind": "Team", "name": "eng", "verb": "edit"},
                    {"kind": "BasicRole", "name": "Viewer", "verb": "view"},
                ],
            },
        });
        let tuples = translate(ObjectKind::ResourcePermissions, &permission).unwrap();

        assert_eq!(tuples.len(), 2);
        assert_eq!(tuples[0].user, "team:eng#member");
        assert_eq!(tuples[0].relation, "edit");
        assert_eq!(tuples[0].object, "resource:dashboard.grafana.app/dashboards/d1");
        assert!(tuples[0].condition.is_some());
        assert_eq!(tuples[1].user, "role:basic_viewer#assignee");
    }

    #[test]
    fn test_folder_resource_permission_is_typed() {
        let permission = json!({
            "metadata": {"name": "rp"},
            "spec": {
                "resource": {"apiGroup": "folder.grafana.app", "resource": "folders", "name": "f1"},
                "permissions": [{"kind": "User", "name": "u1", "verb": "admin"}],
            },
        });
        assert_eq!(
            translate(ObjectKind::ResourcePermissions, &permission).unwrap(),
            vec![TupleKey::new("user:u1", "admin", "folder:f1")]
        );
    }

    #[test]
    fn test_team_binding() {
        let binding = json!({
            "metadata": {"name": "tb"},
            "spec": {"subject": {"name": "u1"}, "teamRef": {"name": "eng"}, "permission": "admin"},
        });
        assert_eq!(
            translate(ObjectKind::TeamBindings, &binding).unwrap(),
            vec![TupleKey::new("user:u1", "admin", "team:eng")]
        );
    }

    #[test]
    fn test_user_role() {
        let user = json!({"metadata": {"name": "u1"}, "spec": {"role": "Editor"}});
        assert_eq!(
            translate(ObjectKind::Users, &user).unwrap(),
            vec![TupleKey::new("user:u1", "assignee", "role:basic_editor")]
        );

        let user = json!({"metadata": {"name": "u2"}, "spec": {"role": ""}});
        assert!(translate(ObjectKind::Users, &user).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_object_reports_name() {
        let user = json!({"metadata": {"name": "u1"}, "spec": {"role": 7}});
        let err = translate(ObjectKind::Users, &user).unwrap_err();
        assert_eq!(err.name, "u1");
    }
}

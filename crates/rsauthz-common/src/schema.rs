//! The authorization model written into every namespace store.

use crate::ident::{
    TYPE_ANONYMOUS, TYPE_FOLDER, TYPE_GROUP_RESOURCE, TYPE_RENDER, TYPE_RESOURCE, TYPE_ROLE,
    TYPE_SERVICE_ACCOUNT, TYPE_TEAM, TYPE_USER,
};
use crate::model::{
    AuthorizationModel, ConditionDefinition, RelationDefinition, TypeDefinition, Userset,
};
use crate::relations::{
    subresource_relation, RELATION_ASSIGNEE, RELATION_CREATE, RELATION_DELETE, RELATION_GET,
    RELATION_PARENT, RELATION_SET_ADMIN, RELATION_SET_EDIT, RELATION_SET_VIEW,
    RELATION_TEAM_ADMIN, RELATION_TEAM_MEMBER, RELATION_UPDATE, RELATIONS_TYPED,
};
use crate::tuple::{
    CONDITION_GROUP_FILTER, CONDITION_SUBRESOURCE_FILTER, PARAM_GROUP_RESOURCE,
    PARAM_REQUESTED_GROUP, PARAM_SUBRESOURCE, PARAM_SUBRESOURCES,
};

pub const SCHEMA_VERSION: &str = "1.1";

/// Direct assignment unioned with the given rewrites.
fn direct_or(children: Vec<Userset>) -> Userset {
    let mut all = vec![Userset::This];
    all.extend(children);
    Userset::union(all)
}

/// The set relation each plain relation is implied by.
fn implied_by(relation: &str) -> &'static str {
    match relation {
        RELATION_GET => RELATION_SET_VIEW,
        RELATION_CREATE | RELATION_UPDATE | RELATION_DELETE => RELATION_SET_EDIT,
        _ => RELATION_SET_ADMIN,
    }
}

/// `admin ⊇ edit ⊇ view ⊇ get` and friends, without inheritance.
fn flat_permission_relations() -> Vec<RelationDefinition> {
    let mut relations = vec![
        RelationDefinition::new(RELATION_SET_ADMIN, Userset::This),
        RelationDefinition::new(
            RELATION_SET_EDIT,
            direct_or(vec![Userset::computed(RELATION_SET_ADMIN)]),
        ),
        RelationDefinition::new(
            RELATION_SET_VIEW,
            direct_or(vec![Userset::computed(RELATION_SET_EDIT)]),
        ),
    ];
    for relation in RELATIONS_TYPED {
        relations.push(RelationDefinition::new(
            *relation,
            direct_or(vec![Userset::computed(implied_by(relation))]),
        ));
    }
    relations
}

/// Folder relations: every grant is inherited from the parent folder, and
/// the `resource_*` relations cover the resources inside the folder.
fn folder_relations() -> Vec<RelationDefinition> {
    let inherited = |relation: &str, implied: Option<&str>, extra: Option<&str>| {
        let mut children = Vec::new();
        if let Some(implied) = implied {
            children.push(Userset::computed(implied));
        }
        if let Some(extra) = extra {
            children.push(Userset::computed(extra));
        }
        children.push(Userset::from_parent(RELATION_PARENT, relation));
        RelationDefinition::new(relation, direct_or(children))
    };

    let resource_admin = subresource_relation(RELATION_SET_ADMIN);
    let resource_edit = subresource_relation(RELATION_SET_EDIT);
    let resource_view = subresource_relation(RELATION_SET_VIEW);

    let mut relations = vec![
        RelationDefinition::new(RELATION_PARENT, Userset::This),
        inherited(RELATION_SET_ADMIN, None, None),
        inherited(RELATION_SET_EDIT, Some(RELATION_SET_ADMIN), None),
        inherited(RELATION_SET_VIEW, Some(RELATION_SET_EDIT), None),
        inherited(&resource_admin, Some(RELATION_SET_ADMIN), None),
        inherited(&resource_edit, Some(RELATION_SET_EDIT), Some(&resource_admin)),
        inherited(&resource_view, Some(RELATION_SET_VIEW), Some(&resource_edit)),
    ];

    for relation in RELATIONS_TYPED {
        let set = implied_by(relation);
        relations.push(inherited(relation, Some(set), None));

        let subresource = subresource_relation(relation);
        let subresource_set = subresource_relation(set);
        relations.push(inherited(&subresource, Some(&subresource_set), None));
    }
    relations
}

fn team_relations() -> Vec<RelationDefinition> {
    let mut relations = vec![
        RelationDefinition::new(RELATION_TEAM_ADMIN, Userset::This),
        RelationDefinition::new(
            RELATION_TEAM_MEMBER,
            direct_or(vec![Userset::computed(RELATION_TEAM_ADMIN)]),
        ),
    ];
    for relation in RELATIONS_TYPED {
        let implied = if *relation == RELATION_GET {
            RELATION_TEAM_MEMBER
        } else {
            RELATION_TEAM_ADMIN
        };
        relations.push(RelationDefinition::new(
            *relation,
            direct_or(vec![Userset::computed(implied)]),
        ));
    }
    relations
}

fn direct_relations(names: &[&str]) -> Vec<RelationDefinition> {
    names
        .iter()
        .map(|name| RelationDefinition::new(*name, Userset::This))
        .collect()
}

/// Builds the built-in authorization model.
pub fn authorization_model() -> AuthorizationModel {
    let mut model = AuthorizationModel::new(SCHEMA_VERSION);
    model.type_definitions = vec![
        TypeDefinition::new(TYPE_USER, direct_relations(RELATIONS_TYPED)),
        TypeDefinition::new(TYPE_SERVICE_ACCOUNT, direct_relations(RELATIONS_TYPED)),
        TypeDefinition::new(TYPE_RENDER, Vec::new()),
        TypeDefinition::new(TYPE_ANONYMOUS, Vec::new()),
        TypeDefinition::new(TYPE_ROLE, direct_relations(&[RELATION_ASSIGNEE])),
        TypeDefinition::new(TYPE_TEAM, team_relations()),
        TypeDefinition::new(TYPE_FOLDER, folder_relations()),
        TypeDefinition::new(TYPE_RESOURCE, flat_permission_relations()),
        TypeDefinition::new(TYPE_GROUP_RESOURCE, flat_permission_relations()),
    ];
    model.conditions = vec![
        ConditionDefinition::new(
            CONDITION_SUBRESOURCE_FILTER,
            format!("{PARAM_SUBRESOURCE} in {PARAM_SUBRESOURCES}"),
            &[PARAM_SUBRESOURCE, PARAM_SUBRESOURCES],
        ),
        ConditionDefinition::new(
            CONDITION_GROUP_FILTER,
            format!("{PARAM_REQUESTED_GROUP} == {PARAM_GROUP_RESOURCE}"),
            &[PARAM_REQUESTED_GROUP, PARAM_GROUP_RESOURCE],
        ),
    ];
    model
}

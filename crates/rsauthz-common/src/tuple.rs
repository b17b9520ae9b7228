//! Tuple keys, conditions and grant constructors.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ident::{
    format_group_resource, new_folder_ident, new_group_resource_ident, new_resource_ident,
    new_typed_ident,
};
use crate::relations::{is_subresource_set_relation, subresource_relation, RELATION_PARENT};

/// Condition restricting folder-scoped grants to listed subresources.
pub const CONDITION_SUBRESOURCE_FILTER: &str = "subresource_filter";
/// Condition binding a resource grant to its group/resource.
pub const CONDITION_GROUP_FILTER: &str = "group_filter";

/// Parameter names used by the built-in conditions.
pub const PARAM_SUBRESOURCE: &str = "subresource";
pub const PARAM_SUBRESOURCES: &str = "subresources";
pub const PARAM_REQUESTED_GROUP: &str = "requested_group";
pub const PARAM_GROUP_RESOURCE: &str = "group_resource";

/// A named condition attached to a tuple, with its stored parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub name: String,
    #[serde(default)]
    pub context: BTreeMap<String, Value>,
}

impl Condition {
    pub fn new(name: impl Into<String>, context: BTreeMap<String, Value>) -> Self {
        Self {
            name: name.into(),
            context,
        }
    }

    /// Returns the `subresources` list of a `subresource_filter` condition.
    pub fn subresources(&self) -> Vec<String> {
        self.context
            .get(PARAM_SUBRESOURCES)
            .and_then(Value::as_array)
            .map(|values| {
                values
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// The `(user, relation, object)` identity of a tuple, ignoring its condition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TupleIdentity {
    pub object: String,
    pub relation: String,
    pub user: String,
}

/// A relationship fact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TupleKey {
    pub user: String,
    pub relation: String,
    pub object: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
}

impl TupleKey {
    /// Creates an unconditioned tuple.
    pub fn new(
        user: impl Into<String>,
        relation: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            user: user.into(),
            relation: relation.into(),
            object: object.into(),
            condition: None,
        }
    }

    /// Attaches a condition.
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Returns the condition-free identity used for deduplication.
    pub fn identity(&self) -> TupleIdentity {
        TupleIdentity {
            object: self.object.clone(),
            relation: self.relation.clone(),
            user: self.user.clone(),
        }
    }

    /// Returns a copy with the condition removed. Deletes never carry one.
    pub fn without_condition(&self) -> Self {
        Self::new(&self.user, &self.relation, &self.object)
    }

    /// True when the tuple is a folder grant filtered by subresource.
    pub fn is_folder_resource_tuple(&self) -> bool {
        self.condition
            .as_ref()
            .is_some_and(|c| c.name == CONDITION_SUBRESOURCE_FILTER)
    }
}

impl fmt::Display for TupleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}@{}", self.object, self.relation, self.user)?;
        if let Some(condition) = &self.condition {
            let context = serde_json::to_string(&condition.context).map_err(|_| fmt::Error)?;
            write!(f, " ({}:{context})", condition.name)?;
        }
        Ok(())
    }
}

/// Grant on a single generic resource, bound to its group/resource.
pub fn new_resource_tuple(
    subject: &str,
    relation: &str,
    group: &str,
    resource: &str,
    subresource: &str,
    name: &str,
) -> TupleKey {
    let mut context = BTreeMap::new();
    context.insert(
        PARAM_GROUP_RESOURCE.to_string(),
        Value::String(format_group_resource(group, resource, subresource)),
    );
    TupleKey::new(
        subject,
        relation,
        new_resource_ident(group, resource, subresource, name),
    )
    .with_condition(Condition::new(CONDITION_GROUP_FILTER, context))
}

/// Grant on every resource of a group/resource kind inside a folder.
///
/// The relation is rewritten to its `resource_` form. Set relations
/// (`resource_view/edit/admin`) apply to all subresources and are stored
/// unconditioned; every other relation carries a `subresource_filter`
/// listing the single group/resource it was granted for.
pub fn new_folder_resource_tuple(
    subject: &str,
    relation: &str,
    group: &str,
    resource: &str,
    subresource: &str,
    folder: &str,
) -> TupleKey {
    let relation = subresource_relation(relation);
    let tuple = TupleKey::new(subject, &relation, new_folder_ident(folder));
    if is_subresource_set_relation(&relation) {
        return tuple;
    }

    let mut context = BTreeMap::new();
    context.insert(
        PARAM_SUBRESOURCES.to_string(),
        Value::Array(vec![Value::String(format_group_resource(
            group,
            resource,
            subresource,
        ))]),
    );
    tuple.with_condition(Condition::new(CONDITION_SUBRESOURCE_FILTER, context))
}

/// Grant on all instances of a group/resource.
pub fn new_group_resource_tuple(
    subject: &str,
    relation: &str,
    group: &str,
    resource: &str,
    subresource: &str,
) -> TupleKey {
    TupleKey::new(
        subject,
        relation,
        new_group_resource_ident(group, resource, subresource),
    )
}

/// `folder:<parent>` is `parent` of `folder:<folder>`.
pub fn new_folder_parent_tuple(folder: &str, parent: &str) -> TupleKey {
    TupleKey::new(
        new_folder_ident(parent),
        RELATION_PARENT,
        new_folder_ident(folder),
    )
}

/// Grant on the folder object itself.
pub fn new_folder_tuple(subject: &str, relation: &str, folder: &str) -> TupleKey {
    TupleKey::new(subject, relation, new_folder_ident(folder))
}

/// Grant on a typed object.
pub fn new_typed_tuple(subject: &str, relation: &str, type_name: &str, name: &str) -> TupleKey {
    TupleKey::new(subject, relation, new_typed_ident(type_name, name))
}

/// Merges the subresource list of `other` into `target`.
///
/// Both tuples must be folder resource tuples with the same identity;
/// returns false and leaves `target` untouched otherwise.
pub fn merge_folder_resource_tuples(target: &mut TupleKey, other: &TupleKey) -> bool {
    if target.identity() != other.identity()
        || !target.is_folder_resource_tuple()
        || !other.is_folder_resource_tuple()
    {
        return false;
    }

    let (Some(target_condition), Some(other_condition)) =
        (target.condition.as_mut(), other.condition.as_ref())
    else {
        return false;
    };

    let mut merged = target_condition.subresources();
    merged.extend(other_condition.subresources());
    merged.sort();
    merged.dedup();

    target_condition.context.insert(
        PARAM_SUBRESOURCES.to_string(),
        Value::Array(merged.into_iter().map(Value::String).collect()),
    );
    true
}

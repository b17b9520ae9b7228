//! Authorization model types.
//!
//! The model is written into every store by the service and interpreted by
//! the tuple store; this crate only describes it.

use serde::{Deserialize, Serialize};

/// An authorization model defining types, their relations and conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationModel {
    /// Schema version (e.g., "1.1").
    pub schema_version: String,
    /// Type definitions in the model.
    pub type_definitions: Vec<TypeDefinition>,
    /// Conditions referenced by conditioned tuples.
    #[serde(default)]
    pub conditions: Vec<ConditionDefinition>,
}

impl AuthorizationModel {
    pub fn new(schema_version: impl Into<String>) -> Self {
        Self {
            schema_version: schema_version.into(),
            type_definitions: Vec::new(),
            conditions: Vec::new(),
        }
    }

    pub fn type_definition(&self, type_name: &str) -> Option<&TypeDefinition> {
        self.type_definitions
            .iter()
            .find(|t| t.type_name == type_name)
    }

    pub fn relation(&self, type_name: &str, relation: &str) -> Option<&RelationDefinition> {
        self.type_definition(type_name)?
            .relations
            .iter()
            .find(|r| r.name == relation)
    }

    pub fn condition(&self, name: &str) -> Option<&ConditionDefinition> {
        self.conditions.iter().find(|c| c.name == name)
    }
}

/// A type definition within the authorization model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDefinition {
    /// The type name (e.g., "folder").
    pub type_name: String,
    /// Relations defined on this type.
    pub relations: Vec<RelationDefinition>,
}

impl TypeDefinition {
    pub fn new(type_name: impl Into<String>, relations: Vec<RelationDefinition>) -> Self {
        Self {
            type_name: type_name.into(),
            relations,
        }
    }
}

/// A relation definition on a type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationDefinition {
    /// The relation name.
    pub name: String,
    /// The userset rewrite for this relation.
    pub rewrite: Userset,
}

impl RelationDefinition {
    pub fn new(name: impl Into<String>, rewrite: Userset) -> Self {
        Self {
            name: name.into(),
            rewrite,
        }
    }
}

/// A userset defines how a relation is computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Userset {
    /// Direct assignment (this).
    This,
    /// Computed userset from another relation.
    ComputedUserset { relation: String },
    /// Tuple to userset (relation from parent).
    TupleToUserset {
        tupleset: String,
        computed_userset: String,
    },
    /// Union of multiple usersets.
    Union { children: Vec<Userset> },
    /// Intersection of multiple usersets.
    Intersection { children: Vec<Userset> },
    /// Exclusion (base but not subtract).
    Exclusion {
        base: Box<Userset>,
        subtract: Box<Userset>,
    },
}

impl Userset {
    pub fn computed(relation: impl Into<String>) -> Self {
        Self::ComputedUserset {
            relation: relation.into(),
        }
    }

    pub fn from_parent(tupleset: impl Into<String>, computed_userset: impl Into<String>) -> Self {
        Self::TupleToUserset {
            tupleset: tupleset.into(),
            computed_userset: computed_userset.into(),
        }
    }

    pub fn union(children: Vec<Userset>) -> Self {
        Self::Union { children }
    }
}

/// A CEL condition over named parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionDefinition {
    pub name: String,
    pub expression: String,
    /// Parameters the expression reads. All must be bound for it to hold.
    pub parameters: Vec<String>,
}

impl ConditionDefinition {
    pub fn new(name: impl Into<String>, expression: impl Into<String>, parameters: &[&str]) -> Self {
        Self {
            name: name.into(),
            expression: expression.into(),
            parameters: parameters.iter().map(|p| p.to_string()).collect(),
        }
    }
}

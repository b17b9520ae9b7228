//! Graph evaluation of the authorization model over a tuple snapshot.
//!
//! The resolver walks userset rewrites recursively:
//! - `This` matches stored and contextual tuples, following userset users
//!   (`team:eng#member`) and type wildcards (`user:*`)
//! - `ComputedUserset` re-enters the same object with another relation
//! - `TupleToUserset` follows tupleset edges (e.g. `parent`) to other objects
//!
//! Conditioned tuples only count when their condition evaluates to true.
//! Traversal is bounded by a depth limit and cut at already-visited nodes.

use std::collections::{BTreeMap, HashSet};
use std::ops::Bound;
use std::sync::Arc;

use rsauthz_common::ident::{type_of, Ident, TYPE_SEPARATOR, WILDCARD};
use rsauthz_common::model::{AuthorizationModel, Userset};
use rsauthz_common::{TupleIdentity, TupleKey};
use serde_json::Value;

use crate::cel::ConditionEvaluator;
use crate::error::{StoreError, StoreResult};

/// Matches the usual depth limit of relationship engines.
pub const DEFAULT_MAX_DEPTH: u32 = 25;

#[derive(Debug, Clone)]
struct TraversalContext {
    depth: u32,
    visited: Arc<HashSet<String>>,
}

impl TraversalContext {
    fn new() -> Self {
        Self {
            depth: 0,
            visited: Arc::new(HashSet::new()),
        }
    }

    fn increment_depth(&self) -> Self {
        Self {
            depth: self.depth + 1,
            visited: Arc::clone(&self.visited),
        }
    }

    fn with_visited(&self, key: String) -> Self {
        let mut visited = (*self.visited).clone();
        visited.insert(key);
        Self {
            depth: self.depth,
            visited: Arc::new(visited),
        }
    }
}

pub(crate) struct Resolver<'a> {
    pub(crate) model: &'a AuthorizationModel,
    pub(crate) tuples: &'a BTreeMap<TupleIdentity, TupleKey>,
    pub(crate) contextual_tuples: &'a [TupleKey],
    pub(crate) context: &'a BTreeMap<String, Value>,
    pub(crate) conditions: &'a ConditionEvaluator,
    pub(crate) max_depth: u32,
}

impl<'a> Resolver<'a> {
    pub(crate) fn check(&self, object: &str, relation: &str, user: &str) -> StoreResult<bool> {
        // Wildcards are only meaningful in stored tuples.
        if user.ends_with(&format!("{TYPE_SEPARATOR}{WILDCARD}")) {
            return Ok(false);
        }
        self.resolve(object, relation, user, &TraversalContext::new())
    }

    /// Every object of `type_name` that appears in a stored or contextual tuple.
    pub(crate) fn candidate_objects(&self, type_name: &str) -> Vec<String> {
        let prefix = format!("{type_name}{TYPE_SEPARATOR}");
        let mut objects: Vec<String> = self
            .tuples
            .keys()
            .map(|identity| identity.object.as_str())
            .chain(self.contextual_tuples.iter().map(|t| t.object.as_str()))
            .filter(|object| object.starts_with(&prefix))
            .map(str::to_string)
            .collect();
        objects.sort();
        objects.dedup();
        objects
    }

    fn resolve(
        &self,
        object: &str,
        relation: &str,
        user: &str,
        ctx: &TraversalContext,
    ) -> StoreResult<bool> {
        if ctx.depth >= self.max_depth {
            return Err(StoreError::DepthLimitExceeded {
                max_depth: self.max_depth,
            });
        }

        let key = format!("{object}#{relation}@{user}");
        if ctx.visited.contains(&key) {
            return Ok(false);
        }
        let ctx = ctx.with_visited(key);

        let type_name = type_of(object);
        let definition =
            self.model
                .relation(type_name, relation)
                .ok_or_else(|| StoreError::RelationNotFound {
                    type_name: type_name.to_string(),
                    relation: relation.to_string(),
                })?;

        self.resolve_userset(&definition.rewrite, object, relation, user, &ctx)
    }

    fn resolve_userset(
        &self,
        rewrite: &Userset,
        object: &str,
        relation: &str,
        user: &str,
        ctx: &TraversalContext,
    ) -> StoreResult<bool> {
        match rewrite {
            Userset::This => self.resolve_direct(object, relation, user, ctx),
            Userset::ComputedUserset { relation: computed } => {
                self.resolve(object, computed, user, &ctx.increment_depth())
            }
            Userset::TupleToUserset {
                tupleset,
                computed_userset,
            } => {
                for tuple in self.tuples_for(object, tupleset) {
                    if !self.condition_holds(tuple)? {
                        continue;
                    }
                    let parent = tuple.user.as_str();
                    if self
                        .model
                        .relation(type_of(parent), computed_userset)
                        .is_none()
                    {
                        continue;
                    }
                    if self.resolve(parent, computed_userset, user, &ctx.increment_depth())? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Userset::Union { children } => {
                for child in children {
                    match self.resolve_userset(child, object, relation, user, ctx) {
                        Ok(true) => return Ok(true),
                        Ok(false) => {}
                        // A branch that runs too deep does not fail its siblings.
                        Err(StoreError::DepthLimitExceeded { .. }) => {}
                        Err(e) => return Err(e),
                    }
                }
                Ok(false)
            }
            Userset::Intersection { children } => {
                if children.is_empty() {
                    return Ok(false);
                }
                for child in children {
                    if !self.resolve_userset(child, object, relation, user, ctx)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Userset::Exclusion { base, subtract } => {
                if !self.resolve_userset(base, object, relation, user, ctx)? {
                    return Ok(false);
                }
                Ok(!self.resolve_userset(subtract, object, relation, user, ctx)?)
            }
        }
    }

    fn resolve_direct(
        &self,
        object: &str,
        relation: &str,
        user: &str,
        ctx: &TraversalContext,
    ) -> StoreResult<bool> {
        for tuple in self.tuples_for(object, relation) {
            if !self.condition_holds(tuple)? {
                continue;
            }
            if user_matches(user, &tuple.user) {
                return Ok(true);
            }

            let Ok(ident) = Ident::parse(&tuple.user) else {
                continue;
            };
            let Some(userset_relation) = ident.relation.as_deref() else {
                continue;
            };
            let userset_object = ident.object();
            if self
                .model
                .relation(&ident.type_name, userset_relation)
                .is_none()
            {
                continue;
            }
            if self.resolve(
                &userset_object,
                userset_relation,
                user,
                &ctx.increment_depth(),
            )? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn condition_holds(&self, tuple: &TupleKey) -> StoreResult<bool> {
        let Some(condition) = &tuple.condition else {
            return Ok(true);
        };
        let definition =
            self.model
                .condition(&condition.name)
                .ok_or_else(|| StoreError::ConditionError {
                    name: condition.name.clone(),
                    message: "condition is not defined in the model".to_string(),
                })?;
        self.conditions
            .evaluate(definition, condition, self.context)
    }

    fn tuples_for(&self, object: &str, relation: &str) -> Vec<&'a TupleKey> {
        let start = TupleIdentity {
            object: object.to_string(),
            relation: relation.to_string(),
            user: String::new(),
        };
        let stored = self
            .tuples
            .range((Bound::Included(start), Bound::Unbounded))
            .take_while(|(identity, _)| identity.object == object && identity.relation == relation)
            .map(|(_, tuple)| tuple);
        let contextual = self
            .contextual_tuples
            .iter()
            .filter(|t| t.object == object && t.relation == relation);
        stored.chain(contextual).collect()
    }
}

/// True when the stored `tuple_user` grants to `user`, directly or through a
/// type wildcard.
fn user_matches(user: &str, tuple_user: &str) -> bool {
    if user == tuple_user {
        return true;
    }
    match tuple_user.split_once(TYPE_SEPARATOR) {
        Some((tuple_type, WILDCARD)) => type_of(user) == tuple_type && !user.contains('#'),
        _ => false,
    }
}

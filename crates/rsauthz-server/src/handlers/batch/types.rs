//! Data types for batch check operations.

use std::collections::BTreeMap;

use rsauthz_common::TupleKey;

/// A single check within a batch request.
#[derive(Debug, Clone, Default)]
pub struct BatchCheckItem {
    /// Object name, used as the result key.
    pub name: String,
    pub verb: String,
    pub group: String,
    pub resource: String,
    pub subresource: String,
    pub folder: String,
}

impl BatchCheckItem {
    pub fn new(
        verb: impl Into<String>,
        group: impl Into<String>,
        resource: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            verb: verb.into(),
            group: group.into(),
            resource: resource.into(),
            ..Self::default()
        }
    }

    pub fn with_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = folder.into();
        self
    }

    pub fn with_subresource(mut self, subresource: impl Into<String>) -> Self {
        self.subresource = subresource.into();
        self
    }
}

/// Request for batch permission checks of one subject.
#[derive(Debug, Clone, Default)]
pub struct BatchCheckRequest {
    pub namespace: String,
    pub subject: String,
    pub items: Vec<BatchCheckItem>,
    pub contextual_tuples: Vec<TupleKey>,
}

/// Results grouped by `group/resource[/subresource]`, then item name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchCheckResponse {
    pub groups: BTreeMap<String, BTreeMap<String, bool>>,
    /// True when the batch is non-empty and every item is allowed.
    pub all_allowed: bool,
}

impl BatchCheckResponse {
    /// Looks up the result of one item.
    pub fn allowed(&self, group_resource: &str, name: &str) -> Option<bool> {
        self.groups
            .get(group_resource)
            .and_then(|items| items.get(name))
            .copied()
    }
}

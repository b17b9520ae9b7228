//! Write/delete deduplication for one commit.

use std::collections::HashSet;

use rsauthz_common::tuple::merge_folder_resource_tuples;
use rsauthz_common::{TupleIdentity, TupleKey};

/// Tuples to commit in one store write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct TupleBatch {
    pub(crate) writes: Vec<TupleKey>,
    pub(crate) deletes: Vec<TupleKey>,
}

impl TupleBatch {
    pub(crate) fn is_empty(&self) -> bool {
        self.writes.is_empty() && self.deletes.is_empty()
    }

    pub(crate) fn extend(&mut self, other: TupleBatch) {
        self.writes.extend(other.writes);
        self.deletes.extend(other.deletes);
    }

    /// Deduplicates by `(user, relation, object)`.
    ///
    /// A write and a delete of the same key keep only the write. Repeated
    /// folder resource writes merge their subresource lists; other repeated
    /// writes keep the first. Deletes lose their conditions.
    pub(crate) fn dedup(self) -> TupleBatch {
        let mut writes: Vec<TupleKey> = Vec::with_capacity(self.writes.len());
        for tuple in self.writes {
            let merged = writes
                .iter_mut()
                .any(|existing| merge_folder_resource_tuples(existing, &tuple));
            if !merged && !writes.iter().any(|w| w.identity() == tuple.identity()) {
                writes.push(tuple);
            }
        }

        let written: HashSet<TupleIdentity> = writes.iter().map(TupleKey::identity).collect();
        let mut seen = HashSet::new();
        let deletes = self
            .deletes
            .into_iter()
            .map(|tuple| tuple.without_condition())
            .filter(|tuple| {
                let identity = tuple.identity();
                !written.contains(&identity) && seen.insert(identity)
            })
            .collect();

        TupleBatch { writes, deletes }
    }
}

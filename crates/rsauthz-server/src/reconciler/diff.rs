//! Expected/current tuple set difference.

use std::collections::BTreeMap;

use rsauthz_common::TupleKey;

/// Tuples to add and delete to turn the current set into the expected one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileDiff {
    pub to_add: Vec<TupleKey>,
    pub to_delete: Vec<TupleKey>,
}

impl ReconcileDiff {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_delete.is_empty()
    }
}

fn index(tuples: Vec<TupleKey>) -> BTreeMap<String, TupleKey> {
    tuples.into_iter().map(|t| (t.to_string(), t)).collect()
}

/// Compares tuple sets by their full rendering, condition included, so a
/// changed condition shows up as one delete plus one add.
pub fn compute_diff(expected: Vec<TupleKey>, current: Vec<TupleKey>) -> ReconcileDiff {
    let expected = index(expected);
    let current = index(current);

    let to_add = expected
        .iter()
        .filter(|(key, _)| !current.contains_key(*key))
        .map(|(_, tuple)| tuple.clone())
        .collect();
    let to_delete = current
        .into_iter()
        .filter(|(key, _)| !expected.contains_key(key))
        .map(|(_, tuple)| tuple)
        .collect();

    ReconcileDiff { to_add, to_delete }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rsauthz_common::tuple::new_folder_resource_tuple;

    fn tuple_strategy() -> impl Strategy<Value = TupleKey> {
        ("[a-c]", "(get|update|admin)", "[a-c]").prop_map(|(user, relation, folder)| {
            TupleKey::new(
                &format!("user:{user}"),
                &relation,
                &format!("folder:{folder}"),
            )
        })
    }

    #[test]
    fn test_diff_adds_and_deletes() {
        let keep = TupleKey::new("user:1", "get", "folder:a");
        let stale = TupleKey::new("user:2", "get", "folder:a");
        let new = TupleKey::new("user:3", "get", "folder:a");

        let diff = compute_diff(
            vec![keep.clone(), new.clone()],
            vec![keep, stale.clone()],
        );

        assert_eq!(diff.to_add, vec![new]);
        assert_eq!(diff.to_delete, vec![stale]);
    }

    #[test]
    fn test_changed_condition_is_replaced() {
        let old = new_folder_resource_tuple("user:1", "get", "g", "dashboards", "", "f");
        let new = new_folder_resource_tuple("user:1", "get", "g", "alerts", "", "f");

        let diff = compute_diff(vec![new.clone()], vec![old.clone()]);

        assert_eq!(diff.to_add, vec![new]);
        assert_eq!(diff.to_delete, vec![old]);
    }

    #[test]
    fn test_duplicates_collapse() {
        let tuple = TupleKey::new("user:1", "get", "folder:a");
        let diff = compute_diff(vec![tuple.clone(), tuple.clone()], Vec::new());
        assert_eq!(diff.to_add, vec![tuple]);
    }

    proptest! {
        #[test]
        fn prop_equal_sets_are_in_sync(tuples in prop::collection::vec(tuple_strategy(), 0..20)) {
            let diff = compute_diff(tuples.clone(), tuples);
            prop_assert!(diff.is_empty());
        }

        #[test]
        fn prop_empty_current_adds_everything(tuples in prop::collection::vec(tuple_strategy(), 0..20)) {
            let diff = compute_diff(tuples.clone(), Vec::new());
            let expected = index(tuples);
            prop_assert_eq!(diff.to_add.len(), expected.len());
            prop_assert!(diff.to_delete.is_empty());
        }

        #[test]
        fn prop_swapping_sides_swaps_result(
            expected in prop::collection::vec(tuple_strategy(), 0..20),
            current in prop::collection::vec(tuple_strategy(), 0..20),
        ) {
            let forward = compute_diff(expected.clone(), current.clone());
            let backward = compute_diff(current, expected);
            prop_assert_eq!(forward.to_add, backward.to_delete);
            prop_assert_eq!(forward.to_delete, backward.to_add);
        }
    }
}

//! Additions-only set difference between two fetched collections.

use std::collections::HashSet;

use crate::items::Identified;

/// Items of `new` whose id does not appear in `old`, in `new`'s order.
///
/// One-directional by design: removals are never reported, they only
/// show up as the stored snapshot shrinking. Runs in O(n + m) via a set
/// of old ids.
pub fn new_items<T>(new: &[T], old: &[T]) -> Vec<T>
where
    T: Identified + Clone,
{
    let seen: HashSet<&str> = old.iter().map(|item| item.id()).collect();
    new.iter()
        .filter(|item| !seen.contains(item.id()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        id: String,
    }

    impl Identified for Row {
        fn id(&self) -> &str {
            &self.id
        }
    }

    fn rows(ids: &[&str]) -> Vec<Row> {
        ids.iter().map(|id| Row { id: id.to_string() }).collect()
    }

    #[test]
    fn additions_are_reported() {
        let old = rows(&["a", "b"]);
        let new = rows(&["a", "b", "c"]);
        assert_eq!(new_items(&new, &old), rows(&["c"]));
    }

    #[test]
    fn removals_are_ignored() {
        let old = rows(&["a", "b", "c"]);
        let new = rows(&["a"]);
        assert!(new_items(&new, &old).is_empty());
    }

    #[test]
    fn diff_against_empty_returns_everything() {
        let new = rows(&["a", "b"]);
        assert_eq!(new_items(&new, &[]), new);
    }

    #[test]
    fn order_follows_the_new_collection() {
        let old = rows(&["b"]);
        let new = rows(&["c", "b", "a"]);
        assert_eq!(new_items(&new, &old), rows(&["c", "a"]));
    }

    #[test]
    fn replaced_item_counts_as_new() {
        // Same sizes, one id swapped: the swapped-in item is an addition.
        let old = rows(&["a", "b"]);
        let new = rows(&["a", "c"]);
        assert_eq!(new_items(&new, &old), rows(&["c"]));
    }

    fn id_set() -> impl Strategy<Value = Vec<String>> {
        proptest::collection::hash_set("[a-z][a-z0-9]{0,5}", 0..16)
            .prop_map(|ids| ids.into_iter().collect())
    }

    proptest! {
        #[test]
        fn diff_with_itself_is_empty(ids in id_set()) {
            let collection: Vec<Row> = ids.into_iter().map(|id| Row { id }).collect();
            prop_assert!(new_items(&collection, &collection).is_empty());
        }

        #[test]
        fn every_reported_id_is_absent_from_old(new_ids in id_set(), old_ids in id_set()) {
            let new: Vec<Row> = new_ids.into_iter().map(|id| Row { id }).collect();
            let old: Vec<Row> = old_ids.iter().cloned().map(|id| Row { id }).collect();

            let fresh = new_items(&new, &old);
            for row in &fresh {
                prop_assert!(!old_ids.contains(&row.id));
            }
        }

        #[test]
        fn every_absent_id_is_reported_exactly_once(new_ids in id_set(), old_ids in id_set()) {
            let new: Vec<Row> = new_ids.iter().cloned().map(|id| Row { id }).collect();
            let old: Vec<Row> = old_ids.iter().cloned().map(|id| Row { id }).collect();

            let fresh = new_items(&new, &old);
            for id in new_ids.iter().filter(|id| !old_ids.contains(*id)) {
                prop_assert_eq!(fresh.iter().filter(|row| &row.id == id).count(), 1);
            }
        }
    }
}

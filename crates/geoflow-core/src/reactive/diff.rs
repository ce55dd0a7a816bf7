//! KeySetDiff - incremental change between two key sets
//!
//! The joiner never rebuilds its per-key subscriptions. It diffs the previous
//! key set against the next one and applies only the difference.

use std::collections::BTreeSet;

/// Partition of two key sets into added, kept and removed keys.
///
/// # Example
///
/// ```rust
/// use geoflow_core::reactive::KeySetDiff;
///
/// let diff = KeySetDiff::between(["a", "b"].iter(), ["b", "c"].iter());
/// assert_eq!(diff.added, vec!["c"]);
/// assert_eq!(diff.kept, vec!["b"]);
/// assert_eq!(diff.removed, vec!["a"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySetDiff<K> {
    /// Keys only in the next set
    pub added: Vec<K>,
    /// Keys in both sets
    pub kept: Vec<K>,
    /// Keys only in the previous set
    pub removed: Vec<K>,
}

impl<K: Ord + Clone> KeySetDiff<K> {
    /// Diff `previous` against `next`. Output vectors are sorted.
    pub fn between<'a, P, N>(previous: P, next: N) -> Self
    where
        K: 'a,
        P: IntoIterator<Item = &'a K>,
        N: IntoIterator<Item = &'a K>,
    {
        let previous: BTreeSet<&K> = previous.into_iter().collect();
        let next: BTreeSet<&K> = next.into_iter().collect();

        Self {
            added: next.difference(&previous).map(|k| (*k).clone()).collect(),
            kept: next.intersection(&previous).map(|k| (*k).clone()).collect(),
            removed: previous.difference(&next).map(|k| (*k).clone()).collect(),
        }
    }

    /// True when membership did not change.
    pub fn is_unchanged(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_diff_from_empty() {
        let previous: Vec<u32> = Vec::new();
        let diff = KeySetDiff::between(previous.iter(), [1, 2].iter());
        assert_eq!(diff.added, vec![1, 2]);
        assert!(diff.kept.is_empty());
        assert!(diff.removed.is_empty());
        assert!(!diff.is_unchanged());
    }

    #[test]
    fn test_diff_to_empty() {
        let next: Vec<u32> = Vec::new();
        let diff = KeySetDiff::between([1, 2].iter(), next.iter());
        assert_eq!(diff.removed, vec![1, 2]);
        assert!(diff.added.is_empty());
    }

    #[test]
    fn test_same_keys_unchanged() {
        let diff = KeySetDiff::between([3, 1].iter(), [1, 3].iter());
        assert!(diff.is_unchanged());
        assert_eq!(diff.kept, vec![1, 3]);
    }

    proptest! {
        #[test]
        fn test_diff_partitions_both_sets(
            previous in proptest::collection::btree_set(0u8..32, 0..16),
            next in proptest::collection::btree_set(0u8..32, 0..16),
        ) {
            let diff = KeySetDiff::between(previous.iter(), next.iter());

            let mut rebuilt_next: BTreeSet<u8> = diff.added.iter().copied().collect();
            rebuilt_next.extend(diff.kept.iter().copied());
            prop_assert_eq!(&rebuilt_next, &next);

            let mut rebuilt_previous: BTreeSet<u8> = diff.removed.iter().copied().collect();
            rebuilt_previous.extend(diff.kept.iter().copied());
            prop_assert_eq!(&rebuilt_previous, &previous);

            prop_assert!(diff.added.iter().all(|k| !previous.contains(k)));
            prop_assert!(diff.removed.iter().all(|k| !next.contains(k)));
        }
    }
}

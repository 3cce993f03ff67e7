//! Range bookkeeping for move detection
//!
//! All ranges are half-open line ranges on one side of the diff.

use std::collections::BTreeMap;
use std::ops::Range;

/// A set of pairwise disjoint ranges
///
/// Used to claim lines: once a range is in the tree no overlapping range can
/// be added.
#[derive(Debug, Clone, Default)]
pub struct NonOverlappingRangeTree {
    /// start -> end
    ranges: BTreeMap<usize, usize>,
}

impl NonOverlappingRangeTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `range` unless it is empty or overlaps a stored range
    pub fn try_insert(&mut self, range: Range<usize>) -> bool {
        if range.is_empty() || self.overlaps(&range) {
            return false;
        }
        self.ranges.insert(range.start, range.end);
        true
    }

    /// Whether any stored range shares a line with `range`
    pub fn overlaps(&self, range: &Range<usize>) -> bool {
        // Stored ranges are disjoint, so the last one starting before
        // `range.end` reaches furthest.
        self.ranges
            .range(..range.end)
            .next_back()
            .is_some_and(|(_, &end)| end > range.start)
    }

    /// Whether `line` lies inside a stored range
    pub fn contains(&self, line: usize) -> bool {
        self.ranges
            .range(..=line)
            .next_back()
            .is_some_and(|(_, &end)| end > line)
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Stored ranges in order
    pub fn iter(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        self.ranges.iter().map(|(&start, &end)| start..end)
    }
}

/// Sorted ranges, none wrapping another, each carrying a value
///
/// Candidate moves are keyed by their range here so that a candidate covered
/// by a larger one is dropped, and a larger one replaces every candidate it
/// covers.
#[derive(Debug, Clone)]
pub struct MoveRangeList<V> {
    entries: Vec<(Range<usize>, V)>,
}

impl<V> Default for MoveRangeList<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

fn wraps(outer: &Range<usize>, inner: &Range<usize>) -> bool {
    outer.start <= inner.start && inner.end <= outer.end
}

impl<V> MoveRangeList<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a stored range wraps `range`
    pub fn is_wrapped(&self, range: &Range<usize>) -> bool {
        // With no nesting, ends increase along with starts: the last range
        // starting at or before `range.start` reaches furthest.
        let after = self
            .entries
            .partition_point(|(stored, _)| stored.start <= range.start);
        after > 0 && wraps(&self.entries[after - 1].0, range)
    }

    /// Replace every stored range that `range` wraps with `range`
    pub fn replace_wrapped(&mut self, range: Range<usize>, value: V) {
        let first = self
            .entries
            .partition_point(|(stored, _)| stored.start < range.start);
        let mut last = first;
        while last < self.entries.len() && wraps(&range, &self.entries[last].0) {
            last += 1;
        }
        self.entries.splice(first..last, std::iter::once((range, value)));
    }

    /// Add `range` unless a stored range already wraps it
    pub fn insert(&mut self, range: Range<usize>, value: V) -> bool {
        if range.is_empty() || self.is_wrapped(&range) {
            return false;
        }
        self.replace_wrapped(range, value);
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Range<usize>, V)> {
        self.entries.iter()
    }

    pub fn into_values(self) -> impl Iterator<Item = V> {
        self.entries.into_iter().map(|(_, value)| value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_rejects_overlap() {
        let mut tree = NonOverlappingRangeTree::new();
        assert!(tree.try_insert(10..20));
        assert!(!tree.try_insert(15..25));
        assert!(!tree.try_insert(5..11));
        assert!(!tree.try_insert(12..14));
        assert!(!tree.try_insert(0..100));
        assert!(tree.try_insert(20..30));
        assert!(tree.try_insert(0..10));
        assert!(!tree.try_insert(40..40));
        assert_eq!(tree.iter().collect::<Vec<_>>(), vec![0..10, 10..20, 20..30]);
    }

    #[test]
    fn test_tree_contains() {
        let mut tree = NonOverlappingRangeTree::new();
        tree.try_insert(10..20);
        assert!(!tree.contains(9));
        assert!(tree.contains(10));
        assert!(tree.contains(19));
        assert!(!tree.contains(20));
        assert!(tree.overlaps(&(19..25)));
        assert!(!tree.overlaps(&(20..25)));
    }

    #[test]
    fn test_range_list_drops_wrapped() {
        let mut list = MoveRangeList::new();
        assert!(list.insert(10..20, "a"));
        assert!(!list.insert(12..15, "b"));
        assert!(!list.insert(10..20, "c"));
        assert!(list.insert(15..25, "d"));
        assert_eq!(list.len(), 2);
        assert!(list.is_wrapped(&(16..25)));
        assert!(!list.is_wrapped(&(9..12)));
    }

    #[test]
    fn test_range_list_replaces_wrapped() {
        let mut list = MoveRangeList::new();
        list.insert(2..4, 1);
        list.insert(5..7, 2);
        list.insert(6..9, 3);
        list.insert(20..22, 4);
        assert!(list.insert(1..10, 5));
        let ranges: Vec<_> = list.iter().map(|(range, value)| (range.clone(), *value)).collect();
        assert_eq!(ranges, vec![(1..10, 5), (20..22, 4)]);
        assert_eq!(list.into_values().collect::<Vec<_>>(), vec![5, 4]);
    }
}

/*! A sorted multiset backed by the augmented AVL core

# About
`AvlMultiset<K>` allows duplicate keys. Rank is always maintained (`index`/`last_index`/
`count` are the whole point of a multiset), so unlike [`AvlSet`](super::avl_set::AvlSet)
and [`AvlMap`](super::avl_map::AvlMap), the rank layer here isn't optional — `Idx` is
fixed to [`WithIndex`] rather than exposed as a type parameter.

Insertion never rejects a key: on a tie it steers into whichever child subtree is
currently shorter, so a long run of one duplicated key doesn't chain down a single
branch (see [`AvlCore::insert_multi`](crate::hierarchies::avl_core::AvlCore::insert_multi)
for the exact rule). `remove` still removes at most one matching node.

# Example
```rust
use avl_collections::associative::avl_multiset::AvlMultiset;

let mut ms = AvlMultiset::<i32>::new();
for key in [2, 2, 2, 5, 5, 7] {
    ms.insert(key);
}
assert_eq!(ms.index(&2), 0);
assert_eq!(ms.last_index(&2), 2);
assert_eq!(ms.count(&2), 3);
ms.remove(&2);
assert_eq!(ms.count(&2), 2);
let collected: Vec<i32> = ms.iter().copied().collect();
assert_eq!(collected, vec![2, 2, 5, 5, 7]);
```
*/

use crate::hierarchies::avl_core::{AvlCore, WithIndex};
use crate::monoid::{Aggregate, NoAggregate};

/// A sorted collection that allows duplicate keys.
///
/// See the [module-level documentation](self) for more.
#[derive(Debug)]
pub struct AvlMultiset<K, Agg: Aggregate<K, ()> = NoAggregate> {
    core: AvlCore<K, (), WithIndex, Agg>,
}

impl<K, Agg> Default for AvlMultiset<K, Agg>
where
    K: Ord + std::fmt::Debug,
    Agg: Aggregate<K, ()>,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, Agg> AvlMultiset<K, Agg>
where
    K: Ord + std::fmt::Debug,
    Agg: Aggregate<K, ()>,
{
    pub fn new() -> Self {
        AvlMultiset { core: AvlCore::new() }
    }

    pub fn size(&self) -> usize {
        self.core.size()
    }

    pub fn is_empty(&self) -> bool {
        self.core.is_empty()
    }

    /// Inserts `key`. Always succeeds, unlike [`AvlSet::insert`](super::avl_set::AvlSet::insert).
    pub fn insert(&mut self, key: K) {
        self.core.insert_multi(key)
    }

    /// Removes a single occurrence of `key`, if any.
    pub fn remove(&mut self, key: &K) -> Option<K> {
        self.core.remove(key).map(|(k, _)| k)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.core.contains(key)
    }

    /// Leftmost occurrence `>= key`.
    pub fn find_ge(&self, key: &K) -> Option<&K> {
        self.core.find_ge(key).map(|(k, _)| k)
    }

    pub fn find_gt(&self, key: &K) -> Option<&K> {
        self.core.find_gt(key).map(|(k, _)| k)
    }

    /// Rightmost occurrence `<= key`.
    pub fn find_le(&self, key: &K) -> Option<&K> {
        self.core.find_le(key).map(|(k, _)| k)
    }

    pub fn find_lt(&self, key: &K) -> Option<&K> {
        self.core.find_lt(key).map(|(k, _)| k)
    }

    pub fn first(&self) -> Option<&K> {
        self.core.first().map(|(k, _)| k)
    }

    pub fn last(&self) -> Option<&K> {
        self.core.last().map(|(k, _)| k)
    }

    pub fn pop_first(&mut self) -> Option<K> {
        self.core.pop_first().map(|(k, _)| k)
    }

    pub fn pop_last(&mut self) -> Option<K> {
        self.core.pop_last().map(|(k, _)| k)
    }

    pub fn at(&self, index: usize) -> Option<&K> {
        self.core.at(index).map(|(k, _)| k)
    }

    /// Rank of the first occurrence of `key`, or [`AvlMultiset::size`] if absent.
    pub fn index(&self, key: &K) -> usize {
        self.core.index(key)
    }

    /// Rank of the last occurrence of `key`, or [`AvlMultiset::size`] if absent.
    pub fn last_index(&self, key: &K) -> usize {
        self.core.last_index(key)
    }

    /// Number of occurrences of `key`.
    pub fn count(&self, key: &K) -> usize {
        self.core.count_of(key)
    }

    pub fn summarize(&self, lo: &K, hi: &K) -> Agg::Value {
        self.core.summarize(lo, hi)
    }

    pub fn summarize_by_index(&self, lo: usize, hi: usize) -> Agg::Value {
        self.core.summarize_by_index(lo, hi)
    }

    pub fn iter(&self) -> Iter<'_, K, Agg> {
        Iter { inner: self.core.iter() }
    }
}

/// Borrowed in-order iterator over an [`AvlMultiset`]'s keys, duplicates included.
pub struct Iter<'a, K, Agg: Aggregate<K, ()>> {
    inner: crate::hierarchies::avl_iter::Iter<'a, K, (), WithIndex, Agg>,
}

impl<'a, K: Ord, Agg: Aggregate<K, ()>> Iterator for Iter<'a, K, Agg> {
    type Item = &'a K;
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }
}

impl<'a, K: Ord, Agg: Aggregate<K, ()>> DoubleEndedIterator for Iter<'a, K, Agg> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(k, _)| k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiset_rank_and_count_after_removal() {
        let mut ms: AvlMultiset<i32> = AvlMultiset::new();
        for key in [2, 2, 2, 5, 5, 7] {
            ms.insert(key);
        }
        assert_eq!(ms.index(&2), 0);
        assert_eq!(ms.last_index(&2), 2);
        assert_eq!(ms.count(&2), 3);
        let collected: Vec<i32> = ms.iter().copied().collect();
        assert_eq!(collected, vec![2, 2, 2, 5, 5, 7]);

        ms.remove(&2);
        assert_eq!(ms.count(&2), 2);
        let collected: Vec<i32> = ms.iter().copied().collect();
        assert_eq!(collected, vec![2, 2, 5, 5, 7]);
    }

    #[test]
    fn absent_key_rank_queries() {
        let mut ms: AvlMultiset<i32> = AvlMultiset::new();
        for key in [1, 3, 5] {
            ms.insert(key);
        }
        assert_eq!(ms.index(&2), ms.size());
        assert_eq!(ms.last_index(&2), ms.size());
        assert_eq!(ms.count(&2), 0);
    }

    #[test]
    fn duplicate_runs_preserve_order_across_rotations() {
        let mut ms: AvlMultiset<i32> = AvlMultiset::new();
        for _ in 0..50 {
            ms.insert(7);
        }
        assert_eq!(ms.size(), 50);
        assert_eq!(ms.count(&7), 50);
        let collected: Vec<i32> = ms.iter().copied().collect();
        assert!(collected.iter().all(|&k| k == 7));
    }
}

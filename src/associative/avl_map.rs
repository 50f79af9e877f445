/*! A sorted map backed by the augmented AVL core

# About
`AvlMap<K, V>` pairs each key with an owned value. Insertion overwrites the value of an
existing key and reports the value it replaced, the same convention as
`std::collections::BTreeMap::insert`, returning the bare old value rather than a wrapper
entry since this core doesn't need a combined key+value `Entry` type to drive its
ordering — the map is generic over `V` directly.

# Example
```rust
use avl_collections::associative::avl_map::AvlMap;

let text = "and the final paragraph clearly came from the heart, \
    or whatever cool yet sensitive organ kept in place of one.";

let mut map = AvlMap::<char, usize>::new();
for ch in text.chars() {
    match map.get(&ch) {
        Some(count) => {
            let count = *count;
            map.insert(ch, count + 1);
        }
        None => {
            map.insert(ch, 1);
        }
    }
}
assert!(map.get(&'e').unwrap() > &0);
```
*/

use crate::hierarchies::avl_core::{AvlCore, IndexMode, NoIndex, WithIndex};
use crate::monoid::{Aggregate, NoAggregate};

/// A sorted key/value map.
///
/// See the [module-level documentation](self) for the augmentation type parameters.
#[derive(Debug)]
pub struct AvlMap<K, V, Idx: IndexMode = NoIndex, Agg: Aggregate<K, V> = NoAggregate> {
    core: AvlCore<K, V, Idx, Agg>,
}

impl<K, V, Idx, Agg> Default for AvlMap<K, V, Idx, Agg>
where
    K: Ord + std::fmt::Debug,
    Idx: IndexMode,
    Agg: Aggregate<K, V>,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, Idx, Agg> AvlMap<K, V, Idx, Agg>
where
    K: Ord + std::fmt::Debug,
    Idx: IndexMode,
    Agg: Aggregate<K, V>,
{
    pub fn new() -> Self {
        AvlMap { core: AvlCore::new() }
    }

    pub fn size(&self) -> usize {
        self.core.len()
    }

    pub fn is_empty(&self) -> bool {
        self.core.is_empty()
    }

    /// Inserts `key`/`value`. If `key` was already present, the old value is overwritten
    /// and returned; summaries on the path to root are refreshed either way.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.core.insert(key, value)
    }

    pub fn remove(&mut self, key: &K) -> Option<(K, V)> {
        self.core.remove(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.core.contains(key)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.core.get(key)
    }

    pub fn find(&self, key: &K) -> Option<(&K, &V)> {
        self.core.find(key)
    }

    pub fn find_ge(&self, key: &K) -> Option<(&K, &V)> {
        self.core.find_ge(key)
    }

    pub fn find_gt(&self, key: &K) -> Option<(&K, &V)> {
        self.core.find_gt(key)
    }

    pub fn find_le(&self, key: &K) -> Option<(&K, &V)> {
        self.core.find_le(key)
    }

    pub fn find_lt(&self, key: &K) -> Option<(&K, &V)> {
        self.core.find_lt(key)
    }

    pub fn first(&self) -> Option<(&K, &V)> {
        self.core.first()
    }

    pub fn last(&self) -> Option<(&K, &V)> {
        self.core.last()
    }

    pub fn pop_first(&mut self) -> Option<(K, V)> {
        self.core.pop_first()
    }

    pub fn pop_last(&mut self) -> Option<(K, V)> {
        self.core.pop_last()
    }

    pub fn summarize(&self, lo: &K, hi: &K) -> Agg::Value {
        self.core.summarize(lo, hi)
    }

    pub fn iter(&self) -> Iter<'_, K, V, Idx, Agg> {
        Iter { inner: self.core.iter() }
    }

    pub fn keys(&self) -> Keys<'_, K, V, Idx, Agg> {
        Keys { inner: self.core.iter() }
    }

    pub fn values(&self) -> Values<'_, K, V, Idx, Agg> {
        Values { inner: self.core.iter() }
    }
}

impl<K, V, Agg> AvlMap<K, V, WithIndex, Agg>
where
    K: Ord + std::fmt::Debug,
    Agg: Aggregate<K, V>,
{
    pub fn at(&self, index: usize) -> Option<(&K, &V)> {
        self.core.at(index)
    }

    pub fn index(&self, key: &K) -> usize {
        self.core.index(key)
    }

    pub fn pop_at(&mut self, index: usize) -> Option<(K, V)> {
        self.core.pop_at(index)
    }

    pub fn summarize_by_index(&self, lo: usize, hi: usize) -> Agg::Value {
        self.core.summarize_by_index(lo, hi)
    }
}

/// Borrowed in-order iterator over `(&K, &V)` pairs.
pub struct Iter<'a, K, V, Idx: IndexMode, Agg: Aggregate<K, V>> {
    inner: crate::hierarchies::avl_iter::Iter<'a, K, V, Idx, Agg>,
}

impl<'a, K: Ord, V, Idx: IndexMode, Agg: Aggregate<K, V>> Iterator for Iter<'a, K, V, Idx, Agg> {
    type Item = (&'a K, &'a V);
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

impl<'a, K: Ord, V, Idx: IndexMode, Agg: Aggregate<K, V>> DoubleEndedIterator for Iter<'a, K, V, Idx, Agg> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back()
    }
}

/// Borrowed in-order iterator over keys only.
pub struct Keys<'a, K, V, Idx: IndexMode, Agg: Aggregate<K, V>> {
    inner: crate::hierarchies::avl_iter::Iter<'a, K, V, Idx, Agg>,
}

impl<'a, K: Ord, V, Idx: IndexMode, Agg: Aggregate<K, V>> Iterator for Keys<'a, K, V, Idx, Agg> {
    type Item = &'a K;
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }
}

/// Borrowed in-order iterator over values only.
pub struct Values<'a, K, V, Idx: IndexMode, Agg: Aggregate<K, V>> {
    inner: crate::hierarchies::avl_iter::Iter<'a, K, V, Idx, Agg>,
}

impl<'a, K: Ord, V, Idx: IndexMode, Agg: Aggregate<K, V>> Iterator for Values<'a, K, V, Idx, Agg> {
    type Item = &'a V;
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }
}

impl<'a, K, V, Idx: IndexMode, Agg: Aggregate<K, V>> IntoIterator for &'a AvlMap<K, V, Idx, Agg>
where
    K: Ord + std::fmt::Debug,
{
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V, Idx, Agg>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monoid::{Sum, ValueSum};

    #[test]
    fn insert_overwrites_and_reports_old_value() {
        let mut map: AvlMap<&str, u8> = AvlMap::new();
        assert_eq!(map.insert("Peter", 40), None);
        assert_eq!(map.insert("Peter", 41), Some(40));
        assert_eq!(map.get(&"Peter"), Some(&41));
        assert_eq!(map.size(), 1);
    }

    #[test]
    fn value_sum_summary_tracks_overwrite() {
        let mut map: AvlMap<i32, i32, WithIndex, ValueSum> = AvlMap::new();
        for (k, v) in [(1, 10), (2, 20), (3, 30), (4, 40)] {
            map.insert(k, v);
        }
        assert_eq!(map.summarize_by_index(1, 3), Sum(50));
        map.insert(2, 200);
        assert_eq!(map.summarize_by_index(0, 4), Sum(280));
    }

    #[test]
    fn keys_and_values_projections() {
        let mut map: AvlMap<i32, &str> = AvlMap::new();
        map.insert(2, "two");
        map.insert(1, "one");
        map.insert(3, "three");
        let keys: Vec<i32> = map.keys().copied().collect();
        assert_eq!(keys, vec![1, 2, 3]);
        let values: Vec<&str> = map.values().copied().collect();
        assert_eq!(values, vec!["one", "two", "three"]);
    }

    #[test]
    fn remove_then_insert_round_trip() {
        let mut map: AvlMap<i32, i32> = AvlMap::new();
        map.insert(5, 50);
        let removed = map.remove(&5);
        assert_eq!(removed, Some((5, 50)));
        map.insert(5, 500);
        assert_eq!(map.get(&5), Some(&500));
        assert_eq!(map.size(), 1);
    }
}

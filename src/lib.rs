/*! # About
A self-balancing ordered-key container library built on the AVL tree discipline. It
exposes three container shapes — [`AvlSet`](associative::avl_set::AvlSet),
[`AvlMultiset`](associative::avl_multiset::AvlMultiset), and
[`AvlMap`](associative::avl_map::AvlMap) — each optionally augmented with positional
(rank) access and one or more user-defined monoidal range summaries, selected entirely
through generic type parameters rather than a runtime configuration object.

The engineering weight sits in [`hierarchies::avl_core`]: the invariant-preserving
rotation/rebalance machinery that repairs balance, subtree count, and every attached
summary in a single bottom-up pass per structural edit, plus the rank and range-query
algorithms that exploit those augmentations.

# Containers

- [Ordered set](associative::avl_set): unique keys, optional rank layer, optional summary.
- [Ordered multiset](associative::avl_multiset): duplicate keys allowed, rank always on.
- [Ordered map](associative::avl_map): key/value pairs, optional rank layer, optional summary.

# Augmentation

- [`hierarchies::avl_core::WithIndex`] / [`hierarchies::avl_core::NoIndex`]: enables or
  disables `at`/`index`/rank-annotated nearest-key queries.
- [`monoid::Aggregate`]: names a (possibly tupled) [`monoid::Monoid`] summary maintained
  per subtree and queryable by key range or index range. [`monoid::NoAggregate`] is the
  zero-cost absence of a summary.

This crate does not install a `tracing` subscriber; structural mutations that trigger a
rotation emit `trace`-level events, and it is left to the embedding application to wire
up a subscriber if it wants to see them.
*/

pub mod monoid;

pub mod hierarchies {
    pub mod avl_core;
    pub mod avl_iter;
}

pub mod associative {
    pub mod avl_map;
    pub mod avl_multiset;
    pub mod avl_set;
}

/*! The augmented AVL core

# About
This is the hard part of the crate: a safe, owned (`Box`-backed) AVL tree that keeps
balance, subtree size, and an arbitrary tuple of monoidal summaries all correct through
every insert, remove, and rotation — in a single bottom-up pass per operation.

# Design
Nodes own their children outright and carry no parent pointer. Ascent (the "walk back up
repairing augmentations" step) is realized as the *return path of a recursive descent*:
each recursive call takes ownership of a subtree, edits it (or recurses further down),
repairs its own height/count/summary/balance once its children are final, and hands the
(possibly rotated) subtree back to its caller. This is the textbook safe-Rust rendition of
an owned, parent-pointer-free tree: `Box`-owned nodes, just with two children and a
repair step instead of one child and nothing to repair.

Two axes of augmentation are selected by generic type parameters rather than a runtime
flag set, so that an unaugmented tree carries zero extra bytes per node:
- `Idx: `[`IndexMode`]` ` — [`WithIndex`] stores a subtree `count: usize`; [`NoIndex`]
  stores nothing (`Count = ()`).
- `Agg: `[`Aggregate`]`<K, V>` — a marker type naming a (possibly tupled) monoid; trees
  without a summary use [`NoAggregate`] (`Value = ()`).

Subtree height is always stored explicitly (`height: u32`); the balance factor used by
the rebalance step is always derived from it on demand rather than persisted separately
— see `DESIGN.md` for why a separately-maintained balance-factor field isn't
maintained as a second code path.

See the [module-level documentation](crate::hierarchies::avl_core) for more information.
*/

use crate::monoid::{Aggregate, Monoid};
use std::cmp::Ordering;

/// Selects whether a tree maintains per-node subtree counts (the "rank layer").
///
/// Implemented by the zero-sized marker types [`WithIndex`] and [`NoIndex`]; a tree's
/// `Idx` type parameter is fixed for its whole lifetime, so the rank layer's cost is
/// either paid everywhere or nowhere, never per-node.
pub trait IndexMode: Copy + Default {
    /// The field type used to store a subtree's node count. `usize` when indexed,
    /// `()` (zero bytes) otherwise.
    type Count: Copy;

    /// True for [`WithIndex`]. Used by debug assertions that cross-check the tree's
    /// separately maintained `len` against `count(root)`.
    const ENABLED: bool;

    /// Reads a stored count back out as a plain `usize`.
    fn as_usize(count: Self::Count) -> usize;

    /// Builds a stored count from a freshly computed subtree total.
    fn make(total: usize) -> Self::Count;
}

/// Enables the rank layer: `at`, `index`, `pop_at`, rank-annotated nearest-key queries.
#[derive(Debug, Clone, Copy, Default)]
pub struct WithIndex;

impl IndexMode for WithIndex {
    type Count = usize;
    const ENABLED: bool = true;
    fn as_usize(count: usize) -> usize {
        count
    }
    fn make(total: usize) -> usize {
        total
    }
}

/// Disables the rank layer. Nodes store no count at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoIndex;

impl IndexMode for NoIndex {
    type Count = ();
    const ENABLED: bool = false;
    fn as_usize(_count: ()) -> usize {
        0
    }
    fn make(_total: usize) {}
}

/// A single tree node. Owns its children; carries no parent pointer (see the
/// module-level design note on recursive ascent).
#[derive(Debug)]
pub(crate) struct Node<K, V, Idx: IndexMode, Agg: Aggregate<K, V>> {
    pub(crate) key: K,
    pub(crate) value: V,
    pub(crate) left: Link<K, V, Idx, Agg>,
    pub(crate) right: Link<K, V, Idx, Agg>,
    pub(crate) height: u32,
    pub(crate) count: Idx::Count,
    pub(crate) summary: Agg::Value,
}

pub(crate) type Link<K, V, Idx, Agg> = Option<Box<Node<K, V, Idx, Agg>>>;

fn height_of<K, V, Idx: IndexMode, Agg: Aggregate<K, V>>(node: Option<&Node<K, V, Idx, Agg>>) -> u32 {
    node.map_or(0, |n| n.height)
}

fn summary_of<K, V, Idx: IndexMode, Agg: Aggregate<K, V>>(
    node: Option<&Node<K, V, Idx, Agg>>,
) -> Agg::Value {
    match node {
        Some(n) => n.summary.clone(),
        None => Agg::Value::identity(),
    }
}

/// `height(left) - height(right)`, derived on demand rather than stored.
fn balance_of<K, V, Idx: IndexMode, Agg: Aggregate<K, V>>(node: &Node<K, V, Idx, Agg>) -> i64 {
    height_of::<K, V, Idx, Agg>(node.left.as_deref()) as i64
        - height_of::<K, V, Idx, Agg>(node.right.as_deref()) as i64
}

/// Recomputes a node's height, count, and summary from its (already-correct)
/// children. Does not rebalance; call [`fix`] for the full insert/remove repair step.
fn recompute<K, V, Idx: IndexMode, Agg: Aggregate<K, V>>(node: &mut Node<K, V, Idx, Agg>) {
    let lh = height_of::<K, V, Idx, Agg>(node.left.as_deref());
    let rh = height_of::<K, V, Idx, Agg>(node.right.as_deref());
    node.height = 1 + lh.max(rh);

    let ln = node.left.as_ref().map_or(0, |n| Idx::as_usize(n.count));
    let rn = node.right.as_ref().map_or(0, |n| Idx::as_usize(n.count));
    node.count = Idx::make(1 + ln + rn);

    let own = Agg::project(&node.key, &node.value);
    let left_summary = summary_of::<K, V, Idx, Agg>(node.left.as_deref());
    let right_summary = summary_of::<K, V, Idx, Agg>(node.right.as_deref());
    node.summary = left_summary.combine(&own).combine(&right_summary);
}

/// Single rotation: promotes `root`'s right child to the top. `root` becomes the new
/// root's left child. Requires `root.right` to be `Some`.
fn rotate_left<K, V, Idx: IndexMode, Agg: Aggregate<K, V>>(
    mut root: Box<Node<K, V, Idx, Agg>>,
) -> Box<Node<K, V, Idx, Agg>>
where
    K: std::fmt::Debug,
{
    tracing::trace!(key = ?root.key, side = "left", "rotation");
    let mut new_root = root.right.take().expect("rotate_left requires a right child");
    root.right = new_root.left.take();
    recompute(&mut root);
    new_root.left = Some(root);
    recompute(&mut new_root);
    new_root
}

/// Mirror of [`rotate_left`]: promotes `root`'s left child. Requires `root.left` to be `Some`.
fn rotate_right<K, V, Idx: IndexMode, Agg: Aggregate<K, V>>(
    mut root: Box<Node<K, V, Idx, Agg>>,
) -> Box<Node<K, V, Idx, Agg>>
where
    K: std::fmt::Debug,
{
    tracing::trace!(key = ?root.key, side = "right", "rotation");
    let mut new_root = root.left.take().expect("rotate_right requires a left child");
    root.left = new_root.right.take();
    recompute(&mut root);
    new_root.right = Some(root);
    recompute(&mut new_root);
    new_root
}

/// Restores `|balance| <= 1` at `node` via single or double rotation, assuming both
/// children already satisfy the AVL invariant. `node`'s own height/count/summary must
/// already be up to date (i.e. [`recompute`] has just run) before calling this.
fn rebalance<K, V, Idx: IndexMode, Agg: Aggregate<K, V>>(
    mut node: Box<Node<K, V, Idx, Agg>>,
) -> Box<Node<K, V, Idx, Agg>>
where
    K: std::fmt::Debug,
{
    let balance = balance_of(&node);
    if balance > 1 {
        // Left-heavy. LR case: left child is right-heavy, so it needs a left
        // rotation first to turn this into a plain LL case.
        let left = node.left.as_ref().expect("balance > 1 implies a left child");
        if balance_of(left) < 0 {
            tracing::trace!(key = ?node.key, kind = "double", "rotation");
            let rotated = rotate_left(node.left.take().unwrap());
            node.left = Some(rotated);
        }
        rotate_right(node)
    } else if balance < -1 {
        let right = node.right.as_ref().expect("balance < -1 implies a right child");
        if balance_of(right) > 0 {
            tracing::trace!(key = ?node.key, kind = "double", "rotation");
            let rotated = rotate_right(node.right.take().unwrap());
            node.right = Some(rotated);
        }
        rotate_left(node)
    } else {
        node
    }
}

/// The per-node repair step: recompute this node's augmentations, then rebalance if
/// needed.
fn fix<K, V, Idx: IndexMode, Agg: Aggregate<K, V>>(
    mut node: Box<Node<K, V, Idx, Agg>>,
) -> Box<Node<K, V, Idx, Agg>>
where
    K: std::fmt::Debug,
{
    recompute(&mut node);
    rebalance(node)
}

/// Detaches the in-order leftmost node of `node`'s subtree, returning the replacement
/// subtree (the leftmost node's former right child spliced into its place, with every
/// ancestor on the path repaired) and the detached key/value.
fn pop_leftmost<K, V, Idx: IndexMode, Agg: Aggregate<K, V>>(
    mut node: Box<Node<K, V, Idx, Agg>>,
) -> (Link<K, V, Idx, Agg>, (K, V))
where
    K: std::fmt::Debug,
{
    match node.left.take() {
        None => {
            let right = node.right.take();
            let Node { key, value, .. } = *node;
            (right, (key, value))
        }
        Some(left) => {
            let (new_left, donor) = pop_leftmost(left);
            node.left = new_left;
            (Some(fix(node)), donor)
        }
    }
}

/// Mirror of [`pop_leftmost`]: detaches the in-order rightmost node.
fn pop_rightmost<K, V, Idx: IndexMode, Agg: Aggregate<K, V>>(
    mut node: Box<Node<K, V, Idx, Agg>>,
) -> (Link<K, V, Idx, Agg>, (K, V))
where
    K: std::fmt::Debug,
{
    match node.right.take() {
        None => {
            let left = node.left.take();
            let Node { key, value, .. } = *node;
            (left, (key, value))
        }
        Some(right) => {
            let (new_right, donor) = pop_rightmost(right);
            node.right = new_right;
            (Some(fix(node)), donor)
        }
    }
}

/// Removes `node` itself (already located), splicing a donor in when it has two
/// children. Ties (`balance == 0`) go to the in-order successor; see DESIGN.md for why.
fn detach<K, V, Idx: IndexMode, Agg: Aggregate<K, V>>(
    mut node: Box<Node<K, V, Idx, Agg>>,
) -> (Link<K, V, Idx, Agg>, (K, V))
where
    K: std::fmt::Debug,
{
    match (node.left.is_none(), node.right.is_none()) {
        (true, true) => {
            let Node { key, value, .. } = *node;
            (None, (key, value))
        }
        (false, true) => {
            let left = node.left.take();
            let Node { key, value, .. } = *node;
            (left, (key, value))
        }
        (true, false) => {
            let right = node.right.take();
            let Node { key, value, .. } = *node;
            (right, (key, value))
        }
        (false, false) => {
            if balance_of(&node) < 0 {
                let left = node.left.take().unwrap();
                let (new_left, (donor_key, donor_value)) = pop_rightmost(left);
                node.left = new_left;
                let key = std::mem::replace(&mut node.key, donor_key);
                let value = std::mem::replace(&mut node.value, donor_value);
                (Some(fix(node)), (key, value))
            } else {
                let right = node.right.take().unwrap();
                let (new_right, (donor_key, donor_value)) = pop_leftmost(right);
                node.right = new_right;
                let key = std::mem::replace(&mut node.key, donor_key);
                let value = std::mem::replace(&mut node.value, donor_value);
                (Some(fix(node)), (key, value))
            }
        }
    }
}

fn insert_rec<K, V, Idx, Agg>(
    link: Link<K, V, Idx, Agg>,
    key: K,
    value: V,
) -> (Link<K, V, Idx, Agg>, Option<V>)
where
    K: Ord + std::fmt::Debug,
    Idx: IndexMode,
    Agg: Aggregate<K, V>,
{
    let mut node = match link {
        None => {
            let mut leaf = Box::new(Node {
                key,
                value,
                left: None,
                right: None,
                height: 1,
                count: Idx::make(1),
                summary: Agg::Value::identity(),
            });
            recompute(&mut leaf);
            return (Some(leaf), None);
        }
        Some(node) => node,
    };

    match key.cmp(&node.key) {
        Ordering::Less => {
            let (new_left, previous) = insert_rec(node.left.take(), key, value);
            node.left = new_left;
            (Some(fix(node)), previous)
        }
        Ordering::Greater => {
            let (new_right, previous) = insert_rec(node.right.take(), key, value);
            node.right = new_right;
            (Some(fix(node)), previous)
        }
        Ordering::Equal => {
            let previous = std::mem::replace(&mut node.value, value);
            recompute(&mut node);
            (Some(node), Some(previous))
        }
    }
}

/// Multiset insertion: on an equal key, steers towards the subtree with the smaller
/// height ("the lighter side") instead of stopping, so duplicate runs stay spread
/// across the tree rather than chaining down one side.
fn insert_multi_rec<K, Idx, Agg>(link: Link<K, (), Idx, Agg>, key: K) -> Link<K, (), Idx, Agg>
where
    K: Ord + std::fmt::Debug,
    Idx: IndexMode,
    Agg: Aggregate<K, ()>,
{
    let mut node = match link {
        None => {
            let mut leaf = Box::new(Node {
                key,
                value: (),
                left: None,
                right: None,
                height: 1,
                count: Idx::make(1),
                summary: Agg::Value::identity(),
            });
            recompute(&mut leaf);
            return Some(leaf);
        }
        Some(node) => node,
    };

    let go_left = match key.cmp(&node.key) {
        Ordering::Less => true,
        Ordering::Greater => false,
        Ordering::Equal => balance_of(&node) <= 0,
    };

    if go_left {
        node.left = insert_multi_rec(node.left.take(), key);
    } else {
        node.right = insert_multi_rec(node.right.take(), key);
    }
    Some(fix(node))
}

fn remove_rec<K, V, Idx, Agg>(link: Link<K, V, Idx, Agg>, key: &K) -> (Link<K, V, Idx, Agg>, Option<(K, V)>)
where
    K: Ord + std::fmt::Debug,
    Idx: IndexMode,
    Agg: Aggregate<K, V>,
{
    let mut node = match link {
        Some(node) => node,
        None => return (None, None),
    };

    match key.cmp(&node.key) {
        Ordering::Less => {
            let (new_left, removed) = remove_rec(node.left.take(), key);
            node.left = new_left;
            (Some(fix(node)), removed)
        }
        Ordering::Greater => {
            let (new_right, removed) = remove_rec(node.right.take(), key);
            node.right = new_right;
            (Some(fix(node)), removed)
        }
        Ordering::Equal => {
            let (new_subtree, removed) = detach(node);
            (new_subtree, Some(removed))
        }
    }
}

fn contains_rec<K: Ord, V, Idx: IndexMode, Agg: Aggregate<K, V>>(
    mut cur: Option<&Node<K, V, Idx, Agg>>,
    key: &K,
) -> bool {
    while let Some(n) = cur {
        cur = match key.cmp(&n.key) {
            Ordering::Less => n.left.as_deref(),
            Ordering::Greater => n.right.as_deref(),
            Ordering::Equal => return true,
        };
    }
    false
}

fn find_rec<'a, K: Ord, V, Idx: IndexMode, Agg: Aggregate<K, V>>(
    mut cur: Option<&'a Node<K, V, Idx, Agg>>,
    key: &K,
) -> Option<&'a Node<K, V, Idx, Agg>> {
    while let Some(n) = cur {
        cur = match key.cmp(&n.key) {
            Ordering::Less => n.left.as_deref(),
            Ordering::Greater => n.right.as_deref(),
            Ordering::Equal => return Some(n),
        };
    }
    None
}

/// Smallest key `>= key`. Candidate comparisons use `<=`/`>=` rather than strict `<`/`>`
/// so that, on a multiset, the *earliest* (leftmost, smallest-ranked) duplicate wins.
fn find_ge_rec<'a, K: Ord, V, Idx: IndexMode, Agg: Aggregate<K, V>>(
    mut cur: Option<&'a Node<K, V, Idx, Agg>>,
    key: &K,
) -> Option<&'a Node<K, V, Idx, Agg>> {
    let mut best = None;
    while let Some(n) = cur {
        if n.key < *key {
            cur = n.right.as_deref();
        } else {
            best = Some(n);
            cur = n.left.as_deref();
        }
    }
    best
}

/// Smallest key `> key`.
fn find_gt_rec<'a, K: Ord, V, Idx: IndexMode, Agg: Aggregate<K, V>>(
    mut cur: Option<&'a Node<K, V, Idx, Agg>>,
    key: &K,
) -> Option<&'a Node<K, V, Idx, Agg>> {
    let mut best = None;
    while let Some(n) = cur {
        if n.key <= *key {
            cur = n.right.as_deref();
        } else {
            best = Some(n);
            cur = n.left.as_deref();
        }
    }
    best
}

/// Largest key `<= key`. On a multiset, the *latest* (rightmost, largest-ranked)
/// duplicate wins, the mirror of [`find_ge_rec`]'s tie-break.
fn find_le_rec<'a, K: Ord, V, Idx: IndexMode, Agg: Aggregate<K, V>>(
    mut cur: Option<&'a Node<K, V, Idx, Agg>>,
    key: &K,
) -> Option<&'a Node<K, V, Idx, Agg>> {
    let mut best = None;
    while let Some(n) = cur {
        if n.key > *key {
            cur = n.left.as_deref();
        } else {
            best = Some(n);
            cur = n.right.as_deref();
        }
    }
    best
}

/// Largest key `< key`.
fn find_lt_rec<'a, K: Ord, V, Idx: IndexMode, Agg: Aggregate<K, V>>(
    mut cur: Option<&'a Node<K, V, Idx, Agg>>,
    key: &K,
) -> Option<&'a Node<K, V, Idx, Agg>> {
    let mut best = None;
    while let Some(n) = cur {
        if n.key >= *key {
            cur = n.left.as_deref();
        } else {
            best = Some(n);
            cur = n.right.as_deref();
        }
    }
    best
}

fn summarize_rec<K: Ord, V, Idx: IndexMode, Agg: Aggregate<K, V>>(
    node: Option<&Node<K, V, Idx, Agg>>,
    lo: &K,
    hi: &K,
) -> Agg::Value {
    let n = match node {
        Some(n) => n,
        None => return Agg::Value::identity(),
    };
    if *hi < n.key {
        return summarize_rec(n.left.as_deref(), lo, hi);
    }
    if *lo > n.key {
        return summarize_rec(n.right.as_deref(), lo, hi);
    }
    // n.key is inside [lo, hi]: this node contributes fully, plus the part of each
    // child subtree that also falls inside the range.
    let left = left_spine(n.left.as_deref(), lo);
    let own = Agg::project(&n.key, &n.value);
    let right = right_spine(n.right.as_deref(), hi);
    left.combine(&own).combine(&right)
}

/// Aggregates every key `>= lo` within `node`'s subtree.
fn left_spine<K: Ord, V, Idx: IndexMode, Agg: Aggregate<K, V>>(
    node: Option<&Node<K, V, Idx, Agg>>,
    lo: &K,
) -> Agg::Value {
    let n = match node {
        Some(n) => n,
        None => return Agg::Value::identity(),
    };
    if n.key < *lo {
        // n and everything in its left subtree are excluded.
        return left_spine(n.right.as_deref(), lo);
    }
    // n and its whole right subtree qualify outright; only the left subtree needs
    // a further, narrower spine.
    let left = left_spine(n.left.as_deref(), lo);
    let own = Agg::project(&n.key, &n.value);
    let right = summary_of::<K, V, Idx, Agg>(n.right.as_deref());
    left.combine(&own).combine(&right)
}

/// Aggregates every key `<= hi` within `node`'s subtree. Mirror of [`left_spine`].
fn right_spine<K: Ord, V, Idx: IndexMode, Agg: Aggregate<K, V>>(
    node: Option<&Node<K, V, Idx, Agg>>,
    hi: &K,
) -> Agg::Value {
    let n = match node {
        Some(n) => n,
        None => return Agg::Value::identity(),
    };
    if n.key > *hi {
        return right_spine(n.left.as_deref(), hi);
    }
    let left = summary_of::<K, V, Idx, Agg>(n.left.as_deref());
    let own = Agg::project(&n.key, &n.value);
    let right = right_spine(n.right.as_deref(), hi);
    left.combine(&own).combine(&right)
}

/// The shared tree core. Facades in [crate::associative] wrap this with set/map/multiset
/// semantics; see the [module-level documentation](self) for the augmentation axes.
#[derive(Debug)]
pub struct AvlCore<K, V, Idx: IndexMode = NoIndex, Agg: Aggregate<K, V> = crate::monoid::NoAggregate> {
    root: Link<K, V, Idx, Agg>,
    len: usize,
}

impl<K, V, Idx: IndexMode, Agg: Aggregate<K, V>> Default for AvlCore<K, V, Idx, Agg>
where
    K: Ord,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, Idx, Agg> AvlCore<K, V, Idx, Agg>
where
    K: Ord + std::fmt::Debug,
    Idx: IndexMode,
    Agg: Aggregate<K, V>,
{
    pub fn new() -> Self {
        AvlCore { root: None, len: 0 }
    }

    /// Number of entries. Maintained as a plain counter independent of the `Idx`
    /// augmentation, satisfying the "size equals a separately maintained counter when
    /// counts aren't present" invariant; when `Idx::ENABLED`, a debug assertion cross-
    /// checks this against `count(root)`.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Height of the tree (0 for an empty tree, 1 for a single node). Exposed mainly so
    /// callers (and this crate's own stress tests) can check the AVL height bound without
    /// reaching into the node structure.
    pub fn height(&self) -> u32 {
        height_of(&self.root)
    }

    /// Inserts `key`/`value`. Returns the previous value if `key` was already present
    /// (overwriting it); `None` means the tree grew by one entry.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let (new_root, previous) = insert_rec(self.root.take(), key, value);
        self.root = new_root;
        if previous.is_none() {
            self.len += 1;
        }
        self.debug_check_len();
        previous
    }

    /// Multiset-style insertion: always succeeds, never overwrites.
    pub fn insert_multi(&mut self, key: K) {
        self.root = insert_multi_rec(self.root.take(), key);
        self.len += 1;
        self.debug_check_len();
    }

    pub fn remove(&mut self, key: &K) -> Option<(K, V)> {
        let (new_root, removed) = remove_rec(self.root.take(), key);
        self.root = new_root;
        if removed.is_some() {
            self.len -= 1;
        }
        self.debug_check_len();
        removed
    }

    pub fn pop_first(&mut self) -> Option<(K, V)> {
        let root = self.root.take()?;
        let (new_root, donor) = pop_leftmost(root);
        self.root = new_root;
        self.len -= 1;
        self.debug_check_len();
        Some(donor)
    }

    pub fn pop_last(&mut self) -> Option<(K, V)> {
        let root = self.root.take()?;
        let (new_root, donor) = pop_rightmost(root);
        self.root = new_root;
        self.len -= 1;
        self.debug_check_len();
        Some(donor)
    }

    pub fn contains(&self, key: &K) -> bool {
        contains_rec(self.root.as_deref(), key)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        find_rec(self.root.as_deref(), key).map(|n| &n.value)
    }

    pub fn find(&self, key: &K) -> Option<(&K, &V)> {
        find_rec(self.root.as_deref(), key).map(|n| (&n.key, &n.value))
    }

    pub fn find_ge(&self, key: &K) -> Option<(&K, &V)> {
        find_ge_rec(self.root.as_deref(), key).map(|n| (&n.key, &n.value))
    }

    pub fn find_gt(&self, key: &K) -> Option<(&K, &V)> {
        find_gt_rec(self.root.as_deref(), key).map(|n| (&n.key, &n.value))
    }

    pub fn find_le(&self, key: &K) -> Option<(&K, &V)> {
        find_le_rec(self.root.as_deref(), key).map(|n| (&n.key, &n.value))
    }

    pub fn find_lt(&self, key: &K) -> Option<(&K, &V)> {
        find_lt_rec(self.root.as_deref(), key).map(|n| (&n.key, &n.value))
    }

    pub fn first(&self) -> Option<(&K, &V)> {
        let mut cur = self.root.as_deref()?;
        while let Some(left) = cur.left.as_deref() {
            cur = left;
        }
        Some((&cur.key, &cur.value))
    }

    pub fn last(&self) -> Option<(&K, &V)> {
        let mut cur = self.root.as_deref()?;
        while let Some(right) = cur.right.as_deref() {
            cur = right;
        }
        Some((&cur.key, &cur.value))
    }

    /// Aggregates every node whose key lies in `[lo, hi]`. Available on every tree,
    /// indexed or not — this range shape needs only BST order, not rank.
    pub fn summarize(&self, lo: &K, hi: &K) -> Agg::Value {
        summarize_rec(self.root.as_deref(), lo, hi)
    }

    pub fn iter(&self) -> super::avl_iter::Iter<'_, K, V, Idx, Agg> {
        super::avl_iter::Iter::full(self.root.as_deref(), self.len)
    }

    #[cfg(debug_assertions)]
    fn debug_check_len(&self) {
        if Idx::ENABLED {
            let root_count = self.root.as_ref().map_or(0, |n| Idx::as_usize(n.count));
            debug_assert_eq!(root_count, self.len, "count(root) must track len when indexed");
        }
    }

    #[cfg(not(debug_assertions))]
    fn debug_check_len(&self) {}
}

impl<K, V, Agg> AvlCore<K, V, WithIndex, Agg>
where
    K: Ord + std::fmt::Debug,
    Agg: Aggregate<K, V>,
{
    /// Alias of [`AvlCore::len`], named to match the rank layer's other positional methods.
    pub fn size(&self) -> usize {
        self.len
    }

    /// 0-based positional access.
    pub fn at(&self, index: usize) -> Option<(&K, &V)> {
        let mut cur = self.root.as_deref();
        let mut idx = index;
        while let Some(n) = cur {
            let left_count = n.left.as_ref().map_or(0, |l| l.count);
            match idx.cmp(&left_count) {
                Ordering::Less => cur = n.left.as_deref(),
                Ordering::Equal => return Some((&n.key, &n.value)),
                Ordering::Greater => {
                    idx -= left_count + 1;
                    cur = n.right.as_deref();
                }
            }
        }
        None
    }

    /// 0-based in-order rank of `key`, or [`AvlCore::len`] if absent. For a multiset
    /// this is the rank of the *first* (leftmost) occurrence.
    ///
    /// Multiset insertion (see [`insert_multi_rec`]) scatters a run of equal keys onto
    /// *either* side of an existing equal-key node, so a plain descent that stops at the
    /// first node it finds equal to `key` can land on a node with further occurrences of
    /// `key` still in its own left subtree. This has to keep descending left past a tie,
    /// the same way [`rank_seek`] (behind `find_ge_with_index`) does, rather than
    /// stopping there.
    pub fn index(&self, key: &K) -> usize {
        match rank_seek(self.root.as_deref(), |n| n.key < *key) {
            Some((n, rank)) if n.key == *key => rank,
            _ => self.len,
        }
    }

    /// Rank of the *last* occurrence of `key`, or [`AvlCore::len`] if absent. Meaningful
    /// for multisets; on a unique-key tree this equals [`AvlCore::index`].
    pub fn last_index(&self, key: &K) -> usize {
        match self.find_le_with_index(key) {
            Some((k, _, rank)) if k == key => rank,
            _ => self.len,
        }
    }

    /// Number of occurrences of `key` (1 on a unique-key tree, 0 if absent, `>= 1` on a
    /// multiset).
    pub fn count_of(&self, key: &K) -> usize {
        let first = self.index(key);
        if first == self.len {
            return 0;
        }
        self.last_index(key) - first + 1
    }

    pub fn pop_at(&mut self, index: usize) -> Option<(K, V)> {
        if index >= self.len {
            return None;
        }
        let root = self.root.take()?;
        let (new_root, removed) = pop_at_rec(root, index);
        self.root = new_root;
        self.len -= 1;
        Some(removed.expect("index already bounds-checked against len"))
    }

    pub fn find_ge_with_index(&self, key: &K) -> Option<(&K, &V, usize)> {
        rank_seek(self.root.as_deref(), |n| n.key < *key).map(|(n, rank)| (&n.key, &n.value, rank))
    }

    pub fn find_gt_with_index(&self, key: &K) -> Option<(&K, &V, usize)> {
        rank_seek(self.root.as_deref(), |n| n.key <= *key).map(|(n, rank)| (&n.key, &n.value, rank))
    }

    pub fn find_le_with_index(&self, key: &K) -> Option<(&K, &V, usize)> {
        rank_seek_rightward(self.root.as_deref(), |n| n.key > *key)
            .map(|(n, rank)| (&n.key, &n.value, rank))
    }

    pub fn find_lt_with_index(&self, key: &K) -> Option<(&K, &V, usize)> {
        rank_seek_rightward(self.root.as_deref(), |n| n.key >= *key)
            .map(|(n, rank)| (&n.key, &n.value, rank))
    }

    pub fn summarize_by_index(&self, lo: usize, hi: usize) -> Agg::Value {
        summarize_by_index_rec(self.root.as_deref(), lo, hi)
    }

    pub fn iter_at(&self, index: usize) -> super::avl_iter::Iter<'_, K, V, WithIndex, Agg> {
        super::avl_iter::Iter::suffix_from_index(self.root.as_deref(), self.len, index)
    }
}

/// Shared walk for `find_ge`/`find_gt` with rank: `go_right(n)` decides whether `n` (and
/// its left subtree) are strictly excluded from the candidate set.
fn rank_seek<'a, K, V, Agg, F>(
    mut cur: Option<&'a Node<K, V, WithIndex, Agg>>,
    mut go_right: F,
) -> Option<(&'a Node<K, V, WithIndex, Agg>, usize)>
where
    Agg: Aggregate<K, V>,
    F: FnMut(&Node<K, V, WithIndex, Agg>) -> bool,
{
    let mut best = None;
    let mut acc = 0usize;
    while let Some(n) = cur {
        let left_count = n.left.as_ref().map_or(0, |l| l.count);
        if go_right(n) {
            acc += left_count + 1;
            cur = n.right.as_deref();
        } else {
            best = Some((n, acc + left_count));
            cur = n.left.as_deref();
        }
    }
    best
}

/// Shared walk for `find_le`/`find_lt` with rank: `go_left(n)` decides whether `n` (and
/// its right subtree) are strictly excluded from the candidate set.
fn rank_seek_rightward<'a, K, V, Agg, F>(
    mut cur: Option<&'a Node<K, V, WithIndex, Agg>>,
    mut go_left: F,
) -> Option<(&'a Node<K, V, WithIndex, Agg>, usize)>
where
    Agg: Aggregate<K, V>,
    F: FnMut(&Node<K, V, WithIndex, Agg>) -> bool,
{
    let mut best = None;
    let mut acc = 0usize;
    while let Some(n) = cur {
        let left_count = n.left.as_ref().map_or(0, |l| l.count);
        if go_left(n) {
            cur = n.left.as_deref();
        } else {
            best = Some((n, acc + left_count));
            acc += left_count + 1;
            cur = n.right.as_deref();
        }
    }
    best
}

fn pop_at_rec<K, V, Agg: Aggregate<K, V>>(
    mut node: Box<Node<K, V, WithIndex, Agg>>,
    index: usize,
) -> (Link<K, V, WithIndex, Agg>, Option<(K, V)>)
where
    K: std::fmt::Debug,
{
    let left_count = node.left.as_ref().map_or(0, |l| l.count);
    match index.cmp(&left_count) {
        Ordering::Less => {
            let left = node.left.take().unwrap();
            let (new_left, removed) = pop_at_rec(left, index);
            node.left = new_left;
            (Some(fix(node)), removed)
        }
        Ordering::Equal => {
            let (new_subtree, removed) = detach(node);
            (new_subtree, Some(removed))
        }
        Ordering::Greater => {
            let right = node.right.take().unwrap();
            let (new_right, removed) = pop_at_rec(right, index - left_count - 1);
            node.right = new_right;
            (Some(fix(node)), removed)
        }
    }
}

fn summarize_by_index_rec<K, V, Agg: Aggregate<K, V>>(
    node: Option<&Node<K, V, WithIndex, Agg>>,
    lo: usize,
    hi: usize,
) -> Agg::Value {
    if lo >= hi {
        return Agg::Value::identity();
    }
    let n = match node {
        Some(n) => n,
        None => return Agg::Value::identity(),
    };
    let total = n.count;
    if lo == 0 && hi >= total {
        return n.summary.clone();
    }
    let left_count = n.left.as_ref().map_or(0, |l| l.count);
    if lo >= left_count + 1 {
        return summarize_by_index_rec(n.right.as_deref(), lo - left_count - 1, hi - left_count - 1);
    }
    if hi <= left_count {
        return summarize_by_index_rec(n.left.as_deref(), lo, hi);
    }
    let left = summarize_by_index_rec(n.left.as_deref(), lo, left_count);
    let own = Agg::project(&n.key, &n.value);
    let right = summarize_by_index_rec(n.right.as_deref(), 0, hi - left_count - 1);
    left.combine(&own).combine(&right)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monoid::NoAggregate;

    fn sample_tree() -> AvlCore<i32, (), NoIndex, NoAggregate> {
        let mut tree = AvlCore::new();
        for key in [5, 3, 8, 1, 4, 7, 9, 2] {
            tree.insert(key, ());
        }
        tree
    }

    #[test]
    fn insert_maintains_avl_balance_and_order() {
        let tree = sample_tree();
        assert_eq!(tree.len(), 8);
        let collected: Vec<i32> = tree.iter().map(|(k, _)| *k).collect();
        assert_eq!(collected, vec![1, 2, 3, 4, 5, 7, 8, 9]);
        assert_eq!(tree.find_ge(&6).map(|(k, _)| *k), Some(7));
        assert_eq!(tree.find_lt(&5).map(|(k, _)| *k), Some(4));
    }

    #[test]
    fn height_invariant_holds_after_rotations() {
        let mut tree: AvlCore<i32, (), NoIndex, NoAggregate> = AvlCore::new();
        for key in 0..100 {
            tree.insert(key, ());
        }
        fn check<K: Ord, V, Idx: IndexMode, Agg: Aggregate<K, V>>(
            node: Option<&Node<K, V, Idx, Agg>>,
        ) -> u32 {
            match node {
                None => 0,
                Some(n) => {
                    let lh = check(n.left.as_deref());
                    let rh = check(n.right.as_deref());
                    assert!((lh as i64 - rh as i64).abs() <= 1, "AVL balance violated");
                    let expected = 1 + lh.max(rh);
                    assert_eq!(n.height, expected);
                    expected
                }
            }
        }
        check(tree.root.as_deref());
    }

    #[test]
    fn remove_then_insert_round_trips() {
        let mut tree = sample_tree();
        let removed = tree.remove(&4);
        assert_eq!(removed, Some((4, ())));
        assert!(!tree.contains(&4));
        tree.insert(4, ());
        assert!(tree.contains(&4));
        assert_eq!(tree.len(), 8);
    }

    #[test]
    fn pop_first_and_last() {
        let mut tree = sample_tree();
        assert_eq!(tree.pop_first(), Some((1, ())));
        assert_eq!(tree.pop_last(), Some((9, ())));
        assert_eq!(tree.len(), 6);
    }

    #[test]
    fn rank_layer_round_trip() {
        let mut tree: AvlCore<i32, (), WithIndex, NoAggregate> = AvlCore::new();
        for key in 0..100 {
            tree.insert(key, ());
        }
        for i in 0..100usize {
            assert_eq!(tree.at(i).map(|(k, _)| *k), Some(i as i32));
            assert_eq!(tree.index(&(i as i32)), i);
        }
        for key in (0..100).step_by(2) {
            tree.remove(&key);
        }
        assert_eq!(tree.size(), 50);
        for i in 0..50usize {
            assert_eq!(tree.at(i).map(|(k, _)| *k), Some(2 * i as i32 + 1));
        }
    }

    #[test]
    fn out_of_range_positional_queries_are_empty() {
        let mut tree: AvlCore<i32, (), WithIndex, NoAggregate> = AvlCore::new();
        for key in 0..10 {
            tree.insert(key, ());
        }
        assert_eq!(tree.at(10), None);
        assert_eq!(tree.at(1000), None);
        assert_eq!(tree.pop_at(10), None);
        assert_eq!(tree.pop_at(usize::MAX), None);
        assert_eq!(tree.size(), 10, "out-of-range pop_at must not mutate the tree");
    }

    #[test]
    fn summarize_by_key_bounds() {
        use crate::monoid::{KeySum, Sum};
        let mut tree: AvlCore<i32, (), NoIndex, KeySum> = AvlCore::new();
        for key in 1..=10 {
            tree.insert(key, ());
        }
        assert_eq!(tree.summarize(&3, &7), Sum(25));
        assert_eq!(tree.summarize(&0, &100), Sum(55));
        assert_eq!(tree.summarize(&8, &2), Sum(0)); // empty range -> identity
    }

    #[test]
    fn summarize_by_index_matches_root_and_splits() {
        use crate::monoid::{KeySum, Sum};
        let mut tree: AvlCore<i32, (), WithIndex, KeySum> = AvlCore::new();
        for key in 1..=10 {
            tree.insert(key, ());
        }
        assert_eq!(tree.summarize_by_index(0, tree.size()), Sum(55));
        for m in 0..=tree.size() {
            let whole = tree.summarize_by_index(0, tree.size());
            let split = tree
                .summarize_by_index(0, m)
                .combine(&tree.summarize_by_index(m, tree.size()));
            assert_eq!(whole, split);
        }
    }

    #[test]
    fn multiset_insert_and_rank_queries() {
        let mut tree: AvlCore<i32, (), WithIndex, NoAggregate> = AvlCore::new();
        for key in [2, 2, 2, 5, 5, 7] {
            tree.insert_multi(key);
        }
        assert_eq!(tree.index(&2), 0);
        assert_eq!(tree.last_index(&2), 2);
        assert_eq!(tree.count_of(&2), 3);
        let collected: Vec<i32> = tree.iter().map(|(k, _)| *k).collect();
        assert_eq!(collected, vec![2, 2, 2, 5, 5, 7]);

        tree.remove(&2);
        assert_eq!(tree.count_of(&2), 2);
        let collected: Vec<i32> = tree.iter().map(|(k, _)| *k).collect();
        assert_eq!(collected, vec![2, 2, 5, 5, 7]);
    }
}

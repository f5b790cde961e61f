//! # balanced-maps
//!
//! Self-balancing ordered key-value containers built from two orthogonal
//! design axes: **storage strategy** (keys and values in every node vs. only
//! in leaves, with internal nodes carrying routing keys) and **balancing
//! strategy** (height balance / AVL vs. color balance / red-black).
//!
//! Four engines, one contract:
//!
//! - [`AvlMap`] - node-keyed AVL tree (every node holds a key and a value)
//! - [`AvlLeafMap`] - leaf-keyed AVL tree (values only at leaves)
//! - [`RedBlackMap`] - node-keyed red-black tree
//! - [`RedBlackLeafMap`] - leaf-keyed red-black tree
//!
//! The engines are independent; a caller picks exactly one storage+balance
//! combination per container instance, either as a concrete type or through
//! the [`OrderedMapEngine`] trait.
//!
//! ## Example
//!
//! ```rust
//! use balanced_maps::AvlMap;
//!
//! let mut map: AvlMap<u64, &str> = AvlMap::new();
//! map.insert(2, "two");
//! map.insert(1, "one");
//!
//! assert_eq!(map.get(&1), Some(&"one"));
//! assert_eq!(map.len(), 2);
//! assert!(map.remove(&2));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod arena;
pub mod avl;
pub mod avl_leaf;
pub mod rb;
pub mod rb_leaf;

#[cfg(test)]
mod proptests;

pub use avl::AvlMap;
pub use avl_leaf::AvlLeafMap;
pub use rb::RedBlackMap;
pub use rb_leaf::RedBlackLeafMap;

/// Common contract of the four tree engines.
///
/// Duplicate keys are not an error: `insert` overwrites the stored value in
/// place without changing the structure or the size. Missing keys are not an
/// error either: `get` reports them as `None` and `remove` as `false`.
///
/// `height` and `is_balanced` are diagnostics. Both recompute their answer
/// from the structure rather than trusting cached metadata, so they double as
/// invariant checks; normal operation never needs them.
pub trait OrderedMapEngine<K: Ord, V> {
    /// Insert a key-value pair, overwriting the value if the key is present.
    fn insert(&mut self, key: K, value: V);

    /// Look up the value stored under a key.
    fn get(&self, key: &K) -> Option<&V>;

    /// Remove a key. Returns `true` iff the key was present.
    fn remove(&mut self, key: &K) -> bool;

    /// Number of keys in the map.
    fn len(&self) -> usize;

    /// `true` iff the map holds no keys.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Height of the tree: 0 when empty, 1 for a single node.
    fn height(&self) -> usize;

    /// Whether the engine's balance invariant currently holds everywhere.
    fn is_balanced(&self) -> bool;

    /// Visit every entry in ascending key order.
    fn for_each(&self, f: impl FnMut(&K, &V));
}

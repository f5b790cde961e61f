//! Leaf-keyed AVL tree.
//!
//! Values live only at leaves. Internal nodes carry a routing key and always
//! have exactly two children, so the tree is a full binary tree with one leaf
//! per stored entry. The routing key of an internal node is the largest key
//! of its left subtree, and descent goes left iff `key <= routing`. Rotations
//! never disturb that convention (neither rotation changes any subtree's
//! maximum from the viewpoint of the separator above it), and a deletion may
//! leave a separator that is merely an upper bound for the left side, which
//! still routes every key to the correct half.
//!
//! Balancing is plain AVL over the leaf-depth heights: a leaf has height 1,
//! splitting a leaf grows the subtree, collapsing an internal shrinks it, and
//! the rebalancing on the unwind is the same as the node-keyed engine's.

use std::cmp::Ordering;

use crate::OrderedMapEngine;

type Link<K, V> = Option<Box<Node<K, V>>>;

/// A leaf holds `Some(value)`; an internal node holds `None` and two children.
struct Node<K, V> {
    key: K,
    val: Option<V>,
    height: usize,
    left: Link<K, V>,
    right: Link<K, V>,
}

impl<K, V> Node<K, V> {
    fn leaf(key: K, val: V) -> Self {
        Self {
            key,
            val: Some(val),
            height: 1,
            left: None,
            right: None,
        }
    }

    fn is_leaf(&self) -> bool {
        self.left.is_none()
    }

    fn update_height(&mut self) {
        self.height = 1 + height(&self.left).max(height(&self.right));
    }

    fn balance(&self) -> isize {
        height(&self.left) as isize - height(&self.right) as isize
    }
}

fn height<K, V>(link: &Link<K, V>) -> usize {
    link.as_ref().map_or(0, |node| node.height)
}

/// Ordered map backed by a leaf-keyed AVL tree.
///
/// Requires `K: Clone` because splitting a leaf copies its smaller key into
/// the routing position of the new internal node.
pub struct AvlLeafMap<K, V> {
    root: Link<K, V>,
    len: usize,
}

impl<K: Ord + Clone, V> AvlLeafMap<K, V> {
    /// Create an empty map.
    pub fn new() -> Self {
        Self { root: None, len: 0 }
    }

    /// Number of keys in the map.
    pub fn len(&self) -> usize {
        self.len
    }

    /// `true` iff the map holds no keys.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert a key-value pair, overwriting the value if the key is present.
    pub fn insert(&mut self, key: K, value: V) {
        match self.root.take() {
            None => {
                self.root = Some(Box::new(Node::leaf(key, value)));
                self.len += 1;
            }
            Some(root) => {
                let (root, _) = self.insert_at(root, key, value);
                self.root = Some(root);
            }
        }
    }

    /// Look up the value stored under a key.
    pub fn get(&self, key: &K) -> Option<&V> {
        let mut node = self.root.as_deref()?;
        while !node.is_leaf() {
            node = if *key <= node.key {
                node.left.as_deref().expect("internal node requires two children")
            } else {
                node.right.as_deref().expect("internal node requires two children")
            };
        }
        (*key == node.key).then(|| {
            node.val.as_ref().expect("leaf node requires a value")
        })
    }

    /// `true` iff the key is present.
    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Remove a key. Returns `true` iff the key was present.
    pub fn remove(&mut self, key: &K) -> bool {
        let Some(root) = self.root.take() else {
            return false;
        };
        let (root, removed) = Self::remove_at(root, key);
        self.root = root;
        if removed {
            self.len -= 1;
        }
        removed
    }

    /// Visit every entry in ascending key order.
    pub fn for_each<F: FnMut(&K, &V)>(&self, mut f: F) {
        Self::visit(self.root.as_deref(), &mut f);
    }

    /// Height of the tree, recomputed from the structure.
    pub fn height(&self) -> usize {
        Self::subtree_height(self.root.as_deref())
    }

    /// `true` iff every node satisfies |balance factor| <= 1, judged over
    /// recomputed heights rather than the stored ones.
    pub fn is_balanced(&self) -> bool {
        Self::balanced_height(self.root.as_deref()).is_some()
    }

    fn visit(node: Option<&Node<K, V>>, f: &mut impl FnMut(&K, &V)) {
        if let Some(node) = node {
            if let Some(val) = node.val.as_ref() {
                f(&node.key, val);
            } else {
                Self::visit(node.left.as_deref(), f);
                Self::visit(node.right.as_deref(), f);
            }
        }
    }

    fn subtree_height(node: Option<&Node<K, V>>) -> usize {
        node.map_or(0, |node| {
            1 + Self::subtree_height(node.left.as_deref())
                .max(Self::subtree_height(node.right.as_deref()))
        })
    }

    fn balanced_height(node: Option<&Node<K, V>>) -> Option<usize> {
        let Some(node) = node else { return Some(0) };
        let left = Self::balanced_height(node.left.as_deref())?;
        let right = Self::balanced_height(node.right.as_deref())?;
        (left.abs_diff(right) <= 1).then_some(1 + left.max(right))
    }

    /// Split a leaf into an internal node over the old and the new leaf. The
    /// smaller key becomes the left leaf and the internal's routing key.
    /// Returns the direction the new key took, for rotation classification.
    fn split_leaf(&mut self, mut old: Box<Node<K, V>>, key: K, value: V) -> (Box<Node<K, V>>, Ordering) {
        self.len += 1;
        let dir = key.cmp(&old.key);
        let fresh = Box::new(Node::leaf(key, value));
        let (left, right) = match dir {
            Ordering::Less => (fresh, old),
            Ordering::Greater => (old, fresh),
            Ordering::Equal => unreachable!("equal keys overwrite, never split"),
        };
        let mut internal = Box::new(Node {
            key: left.key.clone(),
            val: None,
            height: 2,
            left: Some(left),
            right: Some(right),
        });
        internal.update_height();
        (internal, dir)
    }

    /// Insert below a non-empty subtree. The second return value is the
    /// direction the key descended from this node, carried up one level so
    /// the parent can classify a rotation.
    fn insert_at(&mut self, mut node: Box<Node<K, V>>, key: K, value: V) -> (Box<Node<K, V>>, Ordering) {
        if node.is_leaf() {
            return if key == node.key {
                node.val = Some(value);
                (node, Ordering::Equal)
            } else {
                self.split_leaf(node, key, value)
            };
        }
        let (ord, child_dir) = if key <= node.key {
            let left = node.left.take().expect("internal node requires two children");
            let (child, dir) = self.insert_at(left, key, value);
            node.left = Some(child);
            (Ordering::Less, dir)
        } else {
            let right = node.right.take().expect("internal node requires two children");
            let (child, dir) = self.insert_at(right, key, value);
            node.right = Some(child);
            (Ordering::Greater, dir)
        };
        node.update_height();
        (Self::rebalance_insert(node, child_dir), ord)
    }

    /// Remove below a non-empty subtree. A removed leaf leaves `None` behind;
    /// its parent collapses by promoting the surviving sibling in its place.
    fn remove_at(mut node: Box<Node<K, V>>, key: &K) -> (Link<K, V>, bool) {
        if node.is_leaf() {
            return if *key == node.key {
                (None, true)
            } else {
                (Some(node), false)
            };
        }
        let removed = if *key <= node.key {
            let left = node.left.take().expect("internal node requires two children");
            let (left, removed) = Self::remove_at(left, key);
            match left {
                Some(left) => {
                    node.left = Some(left);
                    removed
                }
                None => {
                    let sibling = node.right.take().expect("internal node requires two children");
                    return (Some(sibling), true);
                }
            }
        } else {
            let right = node.right.take().expect("internal node requires two children");
            let (right, removed) = Self::remove_at(right, key);
            match right {
                Some(right) => {
                    node.right = Some(right);
                    removed
                }
                None => {
                    let sibling = node.left.take().expect("internal node requires two children");
                    return (Some(sibling), true);
                }
            }
        };
        if removed {
            (Some(Self::rebalance_remove(node)), true)
        } else {
            (Some(node), false)
        }
    }

    fn rebalance_insert(mut node: Box<Node<K, V>>, child_dir: Ordering) -> Box<Node<K, V>> {
        let balance = node.balance();
        if balance > 1 {
            if child_dir == Ordering::Less {
                Self::rotate_right(node)
            } else {
                let left = node.left.take().expect("left-heavy node requires a left child");
                node.left = Some(Self::rotate_left(left));
                Self::rotate_right(node)
            }
        } else if balance < -1 {
            if child_dir == Ordering::Greater {
                Self::rotate_left(node)
            } else {
                let right = node.right.take().expect("right-heavy node requires a right child");
                node.right = Some(Self::rotate_right(right));
                Self::rotate_left(node)
            }
        } else {
            node
        }
    }

    fn rebalance_remove(mut node: Box<Node<K, V>>) -> Box<Node<K, V>> {
        node.update_height();
        let balance = node.balance();
        if balance > 1 {
            let left = node.left.take().expect("left-heavy node requires a left child");
            if left.balance() >= 0 {
                node.left = Some(left);
                Self::rotate_right(node)
            } else {
                node.left = Some(Self::rotate_left(left));
                Self::rotate_right(node)
            }
        } else if balance < -1 {
            let right = node.right.take().expect("right-heavy node requires a right child");
            if right.balance() <= 0 {
                node.right = Some(right);
                Self::rotate_left(node)
            } else {
                node.right = Some(Self::rotate_right(right));
                Self::rotate_left(node)
            }
        } else {
            node
        }
    }

    // Only internal nodes ever pivot (an unbalanced side is at least two
    // deep), so routing keys stay put: the separator above the rotation still
    // bounds the same set of leaves.
    fn rotate_right(mut y: Box<Node<K, V>>) -> Box<Node<K, V>> {
        let mut x = y.left.take().expect("right rotation requires a left child");
        y.left = x.right.take();
        y.update_height();
        x.right = Some(y);
        x.update_height();
        x
    }

    fn rotate_left(mut x: Box<Node<K, V>>) -> Box<Node<K, V>> {
        let mut y = x.right.take().expect("left rotation requires a right child");
        x.right = y.left.take();
        x.update_height();
        y.left = Some(x);
        y.update_height();
        y
    }

    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        // Returns (height, leaf count, min leaf key, max leaf key).
        fn check<'a, K: Ord, V>(node: &'a Node<K, V>) -> (usize, usize, &'a K, &'a K) {
            if node.is_leaf() {
                assert!(node.val.is_some(), "leaf must hold a value");
                assert!(node.right.is_none(), "leaf must have no children");
                assert_eq!(node.height, 1, "stored height out of sync");
                return (1, 1, &node.key, &node.key);
            }
            assert!(node.val.is_none(), "internal node must not hold a value");
            let left = node.left.as_deref().expect("internal node requires two children");
            let right = node.right.as_deref().expect("internal node requires two children");
            let (lh, lc, lmin, lmax) = check(left);
            let (rh, rc, rmin, rmax) = check(right);
            // The separator bounds the left leaves (it may sit above the
            // actual maximum after deletions) and excludes the right leaves.
            assert!(*lmax <= node.key, "routing key below its left subtree");
            assert!(node.key < *rmin, "routing key overlaps its right subtree");
            assert_eq!(node.height, 1 + lh.max(rh), "stored height out of sync");
            assert!(lh.abs_diff(rh) <= 1, "balance factor out of range");
            (1 + lh.max(rh), lc + rc, lmin, rmax)
        }
        match self.root.as_deref() {
            None => assert_eq!(self.len, 0, "empty tree must have len 0"),
            Some(root) => {
                let (_, count, _, _) = check(root);
                assert_eq!(count, self.len, "len must match the number of leaves");
            }
        }
    }
}

impl<K: Ord + Clone, V> Default for AvlLeafMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Drop for AvlLeafMap<K, V> {
    fn drop(&mut self) {
        let mut stack = Vec::new();
        if let Some(root) = self.root.take() {
            stack.push(root);
        }
        while let Some(mut node) = stack.pop() {
            if let Some(left) = node.left.take() {
                stack.push(left);
            }
            if let Some(right) = node.right.take() {
                stack.push(right);
            }
        }
    }
}

impl<K: Ord + Clone, V> OrderedMapEngine<K, V> for AvlLeafMap<K, V> {
    fn insert(&mut self, key: K, value: V) {
        AvlLeafMap::insert(self, key, value);
    }

    fn get(&self, key: &K) -> Option<&V> {
        AvlLeafMap::get(self, key)
    }

    fn remove(&mut self, key: &K) -> bool {
        AvlLeafMap::remove(self, key)
    }

    fn len(&self) -> usize {
        AvlLeafMap::len(self)
    }

    fn height(&self) -> usize {
        AvlLeafMap::height(self)
    }

    fn is_balanced(&self) -> bool {
        AvlLeafMap::is_balanced(self)
    }

    fn for_each(&self, f: impl FnMut(&K, &V)) {
        AvlLeafMap::for_each(self, f);
    }
}

//! Node-keyed AVL tree.
//!
//! Every node stores a key, a value and an explicit height. Children are
//! exclusively owned (`Option<Box<_>>`); there are no parent pointers, the
//! recursive unwind is the walk back toward the root. Insertion restores
//! balance with at most one rotation event; deletion may rotate at several
//! ancestors on the way up.

use std::cmp::Ordering;

use crate::OrderedMapEngine;

type Link<K, V> = Option<Box<Node<K, V>>>;

struct Node<K, V> {
    key: K,
    val: V,
    height: usize,
    left: Link<K, V>,
    right: Link<K, V>,
}

impl<K, V> Node<K, V> {
    fn new(key: K, val: V) -> Self {
        Self {
            key,
            val,
            height: 1,
            left: None,
            right: None,
        }
    }

    fn update_height(&mut self) {
        self.height = 1 + height(&self.left).max(height(&self.right));
    }

    /// Balance factor: left subtree height minus right subtree height.
    fn balance(&self) -> isize {
        height(&self.left) as isize - height(&self.right) as isize
    }
}

fn height<K, V>(link: &Link<K, V>) -> usize {
    link.as_ref().map_or(0, |node| node.height)
}

/// Ordered map backed by a node-keyed AVL tree.
///
/// ```rust
/// use balanced_maps::AvlMap;
///
/// let mut map: AvlMap<i32, &str> = AvlMap::new();
/// map.insert(10, "ten");
/// map.insert(20, "twenty");
/// assert_eq!(map.get(&10), Some(&"ten"));
/// assert!(map.is_balanced());
/// ```
pub struct AvlMap<K, V> {
    root: Link<K, V>,
    len: usize,
}

impl<K: Ord, V> AvlMap<K, V> {
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
        let root = self.root.take();
        let (root, _) = self.insert_at(root, key, value);
        self.root = Some(root);
    }

    /// Look up the value stored under a key.
    pub fn get(&self, key: &K) -> Option<&V> {
        let mut cur = self.root.as_deref();
        while let Some(node) = cur {
            match key.cmp(&node.key) {
                Ordering::Less => cur = node.left.as_deref(),
                Ordering::Greater => cur = node.right.as_deref(),
                Ordering::Equal => return Some(&node.val),
            }
        }
        None
    }

    /// `true` iff the key is present.
    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Remove a key. Returns `true` iff the key was present.
    pub fn remove(&mut self, key: &K) -> bool {
        let root = self.root.take();
        let (root, removed) = Self::remove_at(root, key);
        self.root = root;
        if removed {
            self.len -= 1;
        }
        removed
    }

    /// Entry with the smallest key.
    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        let mut node = self.root.as_deref()?;
        while let Some(left) = node.left.as_deref() {
            node = left;
        }
        Some((&node.key, &node.val))
    }

    /// Entry with the largest key.
    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        let mut node = self.root.as_deref()?;
        while let Some(right) = node.right.as_deref() {
            node = right;
        }
        Some((&node.key, &node.val))
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
            Self::visit(node.left.as_deref(), f);
            f(&node.key, &node.val);
            Self::visit(node.right.as_deref(), f);
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

    /// Insert below `link`. The second return value is the ordering the new
    /// key had against this subtree's root before the insertion (`None` when
    /// the subtree was empty); the caller needs it to classify a rotation,
    /// since the key itself has moved into the tree by then.
    fn insert_at(&mut self, link: Link<K, V>, key: K, value: V) -> (Box<Node<K, V>>, Option<Ordering>) {
        let Some(mut node) = link else {
            self.len += 1;
            return (Box::new(Node::new(key, value)), None);
        };
        let ord = key.cmp(&node.key);
        let child_dir = match ord {
            Ordering::Equal => {
                node.val = value;
                return (node, Some(Ordering::Equal));
            }
            Ordering::Less => {
                let (child, dir) = self.insert_at(node.left.take(), key, value);
                node.left = Some(child);
                dir
            }
            Ordering::Greater => {
                let (child, dir) = self.insert_at(node.right.take(), key, value);
                node.right = Some(child);
                dir
            }
        };
        node.update_height();
        (Self::rebalance_insert(node, child_dir), Some(ord))
    }

    /// The four insertion cases, classified by the inserted key's position
    /// relative to the unbalanced node's child: LL and RR take one rotation,
    /// LR and RL rotate the child first.
    fn rebalance_insert(mut node: Box<Node<K, V>>, child_dir: Option<Ordering>) -> Box<Node<K, V>> {
        let balance = node.balance();
        if balance > 1 {
            if child_dir == Some(Ordering::Less) {
                Self::rotate_right(node)
            } else {
                let left = node.left.take().expect("left-heavy node requires a left child");
                node.left = Some(Self::rotate_left(left));
                Self::rotate_right(node)
            }
        } else if balance < -1 {
            if child_dir == Some(Ordering::Greater) {
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

    /// The four deletion cases. No single key identifies the imbalance
    /// direction after a removal, so ties break on the child's balance
    /// factor instead, and every ancestor on the unwind is checked.
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

    fn remove_at(link: Link<K, V>, key: &K) -> (Link<K, V>, bool) {
        let Some(mut node) = link else {
            return (None, false);
        };
        let removed = match key.cmp(&node.key) {
            Ordering::Less => {
                let (left, removed) = Self::remove_at(node.left.take(), key);
                node.left = left;
                removed
            }
            Ordering::Greater => {
                let (right, removed) = Self::remove_at(node.right.take(), key);
                node.right = right;
                removed
            }
            Ordering::Equal => {
                return match (node.left.take(), node.right.take()) {
                    (None, None) => (None, true),
                    (Some(child), None) | (None, Some(child)) => (Some(child), true),
                    (Some(left), Some(right)) => {
                        // Pull up the in-order successor; the extraction
                        // rebalances the right spine on its own unwind.
                        let (right, (succ_key, succ_val)) = Self::take_min(right);
                        node.key = succ_key;
                        node.val = succ_val;
                        node.left = Some(left);
                        node.right = right;
                        (Some(Self::rebalance_remove(node)), true)
                    }
                };
            }
        };
        if removed {
            (Some(Self::rebalance_remove(node)), true)
        } else {
            (Some(node), false)
        }
    }

    /// Detach the minimum node of a subtree, returning its key and value.
    fn take_min(mut node: Box<Node<K, V>>) -> (Link<K, V>, (K, V)) {
        match node.left.take() {
            Some(left) => {
                let (left, entry) = Self::take_min(left);
                node.left = left;
                (Some(Self::rebalance_remove(node)), entry)
            }
            None => {
                let right = node.right.take();
                let Node { key, val, .. } = *node;
                (right, (key, val))
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        fn check<K: Ord, V>(
            node: Option<&Node<K, V>>,
            lo: Option<&K>,
            hi: Option<&K>,
        ) -> (usize, usize) {
            let Some(node) = node else { return (0, 0) };
            if let Some(lo) = lo {
                assert!(node.key > *lo, "keys must be strictly increasing in-order");
            }
            if let Some(hi) = hi {
                assert!(node.key < *hi, "keys must be strictly increasing in-order");
            }
            let (lh, lc) = check(node.left.as_deref(), lo, Some(&node.key));
            let (rh, rc) = check(node.right.as_deref(), Some(&node.key), hi);
            assert_eq!(node.height, 1 + lh.max(rh), "stored height out of sync");
            assert!(lh.abs_diff(rh) <= 1, "balance factor out of range");
            (1 + lh.max(rh), 1 + lc + rc)
        }
        let (_, count) = check(self.root.as_deref(), None, None);
        assert_eq!(count, self.len, "len must match the number of keys");
    }
}

impl<K: Ord, V> Default for AvlMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Drop for AvlMap<K, V> {
    // Iterative teardown: unlink children onto a worklist so a long spine
    // never recurses through nested Box drops.
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

impl<K: Ord, V> OrderedMapEngine<K, V> for AvlMap<K, V> {
    fn insert(&mut self, key: K, value: V) {
        AvlMap::insert(self, key, value);
    }

    fn get(&self, key: &K) -> Option<&V> {
        AvlMap::get(self, key)
    }

    fn remove(&mut self, key: &K) -> bool {
        AvlMap::remove(self, key)
    }

    fn len(&self) -> usize {
        AvlMap::len(self)
    }

    fn height(&self) -> usize {
        AvlMap::height(self)
    }

    fn is_balanced(&self) -> bool {
        AvlMap::is_balanced(self)
    }

    fn for_each(&self, f: impl FnMut(&K, &V)) {
        AvlMap::for_each(self, f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inorder_keys(map: &AvlMap<i32, &str>) -> Vec<i32> {
        let mut keys = Vec::new();
        map.for_each(|k, _| keys.push(*k));
        keys
    }

    #[test]
    fn test_basic_operations() {
        let mut map: AvlMap<i32, &str> = AvlMap::new();
        assert!(map.is_empty());
        assert_eq!(map.get(&1), None);

        map.insert(1, "one");
        map.insert(2, "two");
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&1), Some(&"one"));
        assert_eq!(map.get(&2), Some(&"two"));
        assert!(map.contains_key(&1));
        assert!(!map.contains_key(&3));

        assert!(map.remove(&1));
        assert!(!map.remove(&1));
        assert_eq!(map.len(), 1);
        map.check_invariants();
    }

    #[test]
    fn test_duplicate_insert_overwrites_in_place() {
        let mut map: AvlMap<i32, &str> = AvlMap::new();
        map.insert(7, "old");
        map.insert(7, "new");
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&7), Some(&"new"));
        map.check_invariants();
    }

    #[test]
    fn test_remove_missing_and_empty() {
        let mut map: AvlMap<i32, &str> = AvlMap::new();
        assert!(!map.remove(&5));
        map.insert(5, "five");
        assert!(!map.remove(&6));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_single_left_rotation_makes_middle_the_root() {
        let mut map: AvlMap<i32, &str> = AvlMap::new();
        map.insert(10, "ten");
        map.insert(20, "twenty");
        map.insert(30, "thirty");
        // 10-20-30 in ascending order forces one left rotation at 10.
        assert_eq!(map.root.as_ref().map(|n| n.key), Some(20));
        assert_eq!(map.height(), 2);
        map.check_invariants();
    }

    #[test]
    fn test_insert_scenario_10_20_30_40_50_25() {
        let mut map: AvlMap<i32, i32> = AvlMap::new();
        for k in [10, 20, 30, 40, 50, 25] {
            map.insert(k, k);
            map.check_invariants();
        }
        let mut keys = Vec::new();
        map.for_each(|k, _| keys.push(*k));
        assert_eq!(keys, vec![10, 20, 25, 30, 40, 50]);
        assert_eq!(map.height(), 3);
        assert!(map.is_balanced());
    }

    #[test]
    fn test_sequential_inserts_stay_logarithmic() {
        let mut map: AvlMap<i32, i32> = AvlMap::new();
        for k in 1..=15 {
            map.insert(k, k * 10);
        }
        // 15 keys pack into a perfect tree of height 4.
        assert_eq!(map.height(), 4);
        map.check_invariants();

        for k in [5, 8, 12] {
            assert!(map.remove(&k));
            map.check_invariants();
        }
        assert_eq!(map.len(), 12);
        assert!(map.is_balanced());
    }

    #[test]
    fn test_remove_two_child_node_pulls_successor() {
        let mut map: AvlMap<i32, &str> = AvlMap::new();
        for k in [20, 10, 30, 25, 40] {
            map.insert(k, "x");
        }
        assert!(map.remove(&20));
        assert_eq!(inorder_keys(&map), vec![10, 25, 30, 40]);
        map.check_invariants();
    }

    #[test]
    fn test_deletion_can_rotate_at_multiple_ancestors() {
        // A Fibonacci-shaped tree: removing the deepest key forces rotations
        // at more than one ancestor on the way up.
        let mut map: AvlMap<i32, i32> = AvlMap::new();
        for k in [8, 5, 11, 3, 7, 10, 12, 2, 4, 6, 9, 1] {
            map.insert(k, k);
        }
        map.check_invariants();
        assert!(map.remove(&12));
        map.check_invariants();
        assert!(map.is_balanced());
    }

    #[test]
    fn test_first_and_last() {
        let mut map: AvlMap<i32, &str> = AvlMap::new();
        assert_eq!(map.first_key_value(), None);
        for k in [4, 2, 9, 1, 7] {
            map.insert(k, "x");
        }
        assert_eq!(map.first_key_value(), Some((&1, &"x")));
        assert_eq!(map.last_key_value(), Some((&9, &"x")));
    }

    #[test]
    fn test_height_bound_random_load() {
        let mut map: AvlMap<u32, u32> = AvlMap::new();
        let n = 1000u32;
        // Multiplicative stepping visits 0..n in a scrambled order.
        for i in 0..n {
            let k = (i * 389) % 1009;
            map.insert(k, i);
        }
        let n = map.len() as f64;
        let bound = 1.44 * (n + 2.0).log2();
        assert!((map.height() as f64) <= bound, "height {} over AVL bound {}", map.height(), bound);
        map.check_invariants();
    }

    #[test]
    fn test_drain_everything() {
        let mut map: AvlMap<i32, i32> = AvlMap::new();
        for k in 0..64 {
            map.insert(k, k);
        }
        for k in 0..64 {
            assert!(map.remove(&k));
            map.check_invariants();
        }
        assert!(map.is_empty());
        assert_eq!(map.height(), 0);
    }
}

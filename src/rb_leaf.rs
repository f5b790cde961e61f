//! Leaf-keyed red-black tree.
//!
//! Values live only at leaves; internal nodes carry a routing key (largest
//! key of the left subtree, descent goes left iff `key <= routing`) and
//! always have exactly two children. Colors follow the usual rules counted
//! down to the leaves: the root is black, red nodes never stack, and every
//! root-to-leaf path crosses the same number of black nodes. Leaves
//! themselves may be either color.
//!
//! Insertion splits a leaf into an internal node that inherits the leaf's
//! color, over two red leaves. A black split point changes nothing else. A
//! red split point sits under a black parent whose other child must itself
//! be a red leaf (both of the parent's downward paths carry zero black
//! weight), so one deterministic recolor turns the state into the single
//! red-red violation the canonical climb resolves.
//!
//! Deletion splices the surviving sibling over the collapsed parent. A red
//! parent leaves no deficit; a black parent over a red sibling is settled by
//! blackening the sibling; a black parent over a black sibling starts the
//! full double-black fixup at the spliced position.

use std::cmp::Ordering;

use crate::arena::Arena;
use crate::OrderedMapEngine;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Color {
    Red,
    Black,
}

/// A leaf holds `Some(value)`; an internal node holds `None` and two children.
struct Node<K, V> {
    key: K,
    val: Option<V>,
    color: Color,
    parent: Option<usize>,
    left: Option<usize>,
    right: Option<usize>,
}

impl<K, V> Node<K, V> {
    fn leaf(key: K, val: V, color: Color) -> Self {
        Self {
            key,
            val: Some(val),
            color,
            parent: None,
            left: None,
            right: None,
        }
    }

    fn is_leaf(&self) -> bool {
        self.left.is_none()
    }
}

/// Ordered map backed by a leaf-keyed red-black tree.
///
/// Requires `K: Clone` because splitting a leaf copies its smaller key into
/// the routing position of the new internal node.
pub struct RedBlackLeafMap<K, V> {
    nodes: Arena<Node<K, V>>,
    root: Option<usize>,
    len: usize,
}

impl<K: Ord + Clone, V> RedBlackLeafMap<K, V> {
    /// Create an empty map.
    pub fn new() -> Self {
        Self {
            nodes: Arena::new(),
            root: None,
            len: 0,
        }
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
        let Some(root) = self.root else {
            let id = self.nodes.insert(Node::leaf(key, value, Color::Black));
            self.root = Some(id);
            self.len = 1;
            return;
        };
        let leaf = self.descend_to_leaf(root, &key);
        if key == self.nodes[leaf].key {
            self.nodes[leaf].val = Some(value);
            return;
        }
        self.split_leaf(leaf, key, value);
    }

    /// Look up the value stored under a key.
    pub fn get(&self, key: &K) -> Option<&V> {
        let leaf = self.descend_to_leaf(self.root?, key);
        let node = &self.nodes[leaf];
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
        let Some(root) = self.root else { return false };
        let leaf = self.descend_to_leaf(root, key);
        if *key != self.nodes[leaf].key {
            return false;
        }
        self.erase_leaf(leaf);
        self.len -= 1;
        true
    }

    /// Visit every entry in ascending key order.
    pub fn for_each<F: FnMut(&K, &V)>(&self, mut f: F) {
        self.visit(self.root, &mut f);
    }

    /// Height of the tree, recomputed from the structure.
    pub fn height(&self) -> usize {
        self.subtree_height(self.root)
    }

    /// `true` iff the red-black invariants hold everywhere, counted down to
    /// the leaves: no red node has a red child, every root-to-leaf path
    /// crosses the same number of black nodes, and the root is black.
    pub fn is_balanced(&self) -> bool {
        match self.root {
            None => true,
            Some(root) => {
                self.nodes[root].color == Color::Black && self.black_weight(root).is_some()
            }
        }
    }

    fn color(&self, id: Option<usize>) -> Color {
        id.map_or(Color::Black, |id| self.nodes[id].color)
    }

    /// Walk from `id` down to the leaf the key routes to.
    fn descend_to_leaf(&self, mut id: usize, key: &K) -> usize {
        while !self.nodes[id].is_leaf() {
            id = if *key <= self.nodes[id].key {
                self.nodes[id].left.expect("internal node requires two children")
            } else {
                self.nodes[id].right.expect("internal node requires two children")
            };
        }
        id
    }

    fn visit(&self, id: Option<usize>, f: &mut impl FnMut(&K, &V)) {
        if let Some(id) = id {
            let node = &self.nodes[id];
            if let Some(val) = node.val.as_ref() {
                f(&node.key, val);
            } else {
                self.visit(node.left, f);
                self.visit(node.right, f);
            }
        }
    }

    fn subtree_height(&self, id: Option<usize>) -> usize {
        id.map_or(0, |id| {
            1 + self
                .subtree_height(self.nodes[id].left)
                .max(self.subtree_height(self.nodes[id].right))
        })
    }

    /// Black node count from `id` down to its leaves (leaf included), or
    /// `None` on any red-red or unequal-path violation.
    fn black_weight(&self, id: usize) -> Option<usize> {
        let node = &self.nodes[id];
        let own = usize::from(node.color == Color::Black);
        if node.is_leaf() {
            return Some(own);
        }
        if node.color == Color::Red
            && (self.color(node.left) == Color::Red || self.color(node.right) == Color::Red)
        {
            return None;
        }
        let left = self.black_weight(node.left.expect("internal node requires two children"))?;
        let right = self.black_weight(node.right.expect("internal node requires two children"))?;
        (left == right).then_some(own + left)
    }

    /// Split a leaf into an internal node over the old and the new leaf. The
    /// internal inherits the old leaf's color and both leaves come out red;
    /// a red split point additionally recolors its parent's pair and climbs.
    fn split_leaf(&mut self, old: usize, key: K, value: V) {
        self.len += 1;
        let old_color = self.nodes[old].color;
        let parent = self.nodes[old].parent;
        let new_is_left = key < self.nodes[old].key;
        let fresh = self.nodes.insert(Node::leaf(key, value, Color::Red));
        self.nodes[old].color = Color::Red;

        let (left, right) = if new_is_left { (fresh, old) } else { (old, fresh) };
        let routing = self.nodes[left].key.clone();
        let internal = self.nodes.insert(Node {
            key: routing,
            val: None,
            color: old_color,
            parent,
            left: Some(left),
            right: Some(right),
        });
        self.nodes[left].parent = Some(internal);
        self.nodes[right].parent = Some(internal);
        match parent {
            None => self.root = Some(internal),
            Some(p) => {
                if self.nodes[p].left == Some(old) {
                    self.nodes[p].left = Some(internal);
                } else {
                    self.nodes[p].right = Some(internal);
                }
            }
        }

        if old_color == Color::Red {
            // The split point was red, so its parent is black and the other
            // child carries zero black weight below the parent, which only a
            // red leaf can: blacken the pair, redden the parent, and resolve
            // the possible red-red above it the canonical way.
            let p = parent.expect("red leaf requires a parent");
            let sibling = if self.nodes[p].left == Some(internal) {
                self.nodes[p].right.expect("internal node requires two children")
            } else {
                self.nodes[p].left.expect("internal node requires two children")
            };
            self.nodes[internal].color = Color::Black;
            self.nodes[sibling].color = Color::Black;
            self.nodes[p].color = Color::Red;
            self.insert_fixup(p);
        }
    }

    /// Remove a leaf, collapsing its parent by splicing the sibling over it,
    /// then settle the black deficit if one exists.
    fn erase_leaf(&mut self, leaf: usize) {
        let Some(p) = self.nodes[leaf].parent else {
            self.nodes.remove(leaf);
            self.root = None;
            return;
        };
        let sibling = if self.nodes[p].left == Some(leaf) {
            self.nodes[p].right.expect("internal node requires two children")
        } else {
            self.nodes[p].left.expect("internal node requires two children")
        };
        let p_color = self.nodes[p].color;
        self.transplant(p, sibling);
        self.nodes.remove(leaf);
        self.nodes.remove(p);

        // A red parent carried no black weight, so splicing it out leaves
        // the path counts intact.
        if p_color == Color::Black {
            if self.nodes[sibling].color == Color::Red {
                self.nodes[sibling].color = Color::Black;
            } else {
                let parent = self.nodes[sibling].parent;
                self.delete_fixup(sibling, parent);
            }
        }
        if let Some(root) = self.root {
            self.nodes[root].color = Color::Black;
        }
    }

    fn rotate_left(&mut self, x: usize) {
        let y = self.nodes[x].right.expect("left rotation requires a right child");
        let inner = self.nodes[y].left;
        self.nodes[x].right = inner;
        if let Some(inner) = inner {
            self.nodes[inner].parent = Some(x);
        }
        let parent = self.nodes[x].parent;
        self.nodes[y].parent = parent;
        match parent {
            None => self.root = Some(y),
            Some(p) => {
                if self.nodes[p].left == Some(x) {
                    self.nodes[p].left = Some(y);
                } else {
                    self.nodes[p].right = Some(y);
                }
            }
        }
        self.nodes[y].left = Some(x);
        self.nodes[x].parent = Some(y);
    }

    fn rotate_right(&mut self, x: usize) {
        let y = self.nodes[x].left.expect("right rotation requires a left child");
        let inner = self.nodes[y].right;
        self.nodes[x].left = inner;
        if let Some(inner) = inner {
            self.nodes[inner].parent = Some(x);
        }
        let parent = self.nodes[x].parent;
        self.nodes[y].parent = parent;
        match parent {
            None => self.root = Some(y),
            Some(p) => {
                if self.nodes[p].left == Some(x) {
                    self.nodes[p].left = Some(y);
                } else {
                    self.nodes[p].right = Some(y);
                }
            }
        }
        self.nodes[y].right = Some(x);
        self.nodes[x].parent = Some(y);
    }

    /// Replace the subtree rooted at `u` with the subtree rooted at `v` in
    /// `u`'s parent. Does not touch `u`'s own links.
    fn transplant(&mut self, u: usize, v: usize) {
        let parent = self.nodes[u].parent;
        match parent {
            None => self.root = Some(v),
            Some(p) => {
                if self.nodes[p].left == Some(u) {
                    self.nodes[p].left = Some(v);
                } else {
                    self.nodes[p].right = Some(v);
                }
            }
        }
        self.nodes[v].parent = parent;
    }

    /// Resolve a red-red violation starting at the red node `z`.
    fn insert_fixup(&mut self, mut z: usize) {
        while let Some(p) = self.nodes[z].parent {
            if self.nodes[p].color == Color::Black {
                break;
            }
            // A red parent is never the root, so the grandparent exists.
            let g = self.nodes[p].parent.expect("red node requires a parent");
            if self.nodes[g].left == Some(p) {
                let uncle = self.nodes[g].right.expect("internal node requires two children");
                if self.nodes[uncle].color == Color::Red {
                    self.nodes[p].color = Color::Black;
                    self.nodes[uncle].color = Color::Black;
                    self.nodes[g].color = Color::Red;
                    z = g;
                } else {
                    if self.nodes[p].right == Some(z) {
                        z = p;
                        self.rotate_left(z);
                    }
                    let p = self.nodes[z].parent.expect("inner rotation keeps a parent");
                    let g = self.nodes[p].parent.expect("red node requires a parent");
                    self.nodes[p].color = Color::Black;
                    self.nodes[g].color = Color::Red;
                    self.rotate_right(g);
                }
            } else {
                let uncle = self.nodes[g].left.expect("internal node requires two children");
                if self.nodes[uncle].color == Color::Red {
                    self.nodes[p].color = Color::Black;
                    self.nodes[uncle].color = Color::Black;
                    self.nodes[g].color = Color::Red;
                    z = g;
                } else {
                    if self.nodes[p].left == Some(z) {
                        z = p;
                        self.rotate_right(z);
                    }
                    let p = self.nodes[z].parent.expect("inner rotation keeps a parent");
                    let g = self.nodes[p].parent.expect("red node requires a parent");
                    self.nodes[p].color = Color::Black;
                    self.nodes[g].color = Color::Red;
                    self.rotate_left(g);
                }
            }
        }
        if let Some(root) = self.root {
            self.nodes[root].color = Color::Black;
        }
    }

    /// Resolve a black deficit at the node `x`. Unlike the node-keyed
    /// engine's fixup the deficient position always holds a real node here
    /// (the spliced sibling), while a sibling that happens to be a leaf has
    /// its absent children read as black.
    fn delete_fixup(&mut self, mut x: usize, mut parent: Option<usize>) {
        while Some(x) != self.root && self.nodes[x].color == Color::Black {
            let Some(p) = parent else { break };
            if self.nodes[p].left == Some(x) {
                let mut w = self.nodes[p].right.expect("internal node requires two children");
                if self.nodes[w].color == Color::Red {
                    self.nodes[w].color = Color::Black;
                    self.nodes[p].color = Color::Red;
                    self.rotate_left(p);
                    w = self.nodes[p].right.expect("internal node requires two children");
                }
                if self.color(self.nodes[w].left) == Color::Black
                    && self.color(self.nodes[w].right) == Color::Black
                {
                    self.nodes[w].color = Color::Red;
                    x = p;
                    parent = self.nodes[p].parent;
                } else {
                    if self.color(self.nodes[w].right) == Color::Black {
                        let near = self.nodes[w].left.expect("red color requires a node");
                        self.nodes[near].color = Color::Black;
                        self.nodes[w].color = Color::Red;
                        self.rotate_right(w);
                        w = self.nodes[p].right.expect("internal node requires two children");
                    }
                    self.nodes[w].color = self.nodes[p].color;
                    self.nodes[p].color = Color::Black;
                    let far = self.nodes[w].right.expect("red color requires a node");
                    self.nodes[far].color = Color::Black;
                    self.rotate_left(p);
                    x = self.root.expect("fixup runs on a non-empty tree");
                }
            } else {
                let mut w = self.nodes[p].left.expect("internal node requires two children");
                if self.nodes[w].color == Color::Red {
                    self.nodes[w].color = Color::Black;
                    self.nodes[p].color = Color::Red;
                    self.rotate_right(p);
                    w = self.nodes[p].left.expect("internal node requires two children");
                }
                if self.color(self.nodes[w].left) == Color::Black
                    && self.color(self.nodes[w].right) == Color::Black
                {
                    self.nodes[w].color = Color::Red;
                    x = p;
                    parent = self.nodes[p].parent;
                } else {
                    if self.color(self.nodes[w].left) == Color::Black {
                        let near = self.nodes[w].right.expect("red color requires a node");
                        self.nodes[near].color = Color::Black;
                        self.nodes[w].color = Color::Red;
                        self.rotate_left(w);
                        w = self.nodes[p].left.expect("internal node requires two children");
                    }
                    self.nodes[w].color = self.nodes[p].color;
                    self.nodes[p].color = Color::Black;
                    let far = self.nodes[w].left.expect("red color requires a node");
                    self.nodes[far].color = Color::Black;
                    self.rotate_right(p);
                    x = self.root.expect("fixup runs on a non-empty tree");
                }
            }
        }
        self.nodes[x].color = Color::Black;
    }

    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        // Returns (black weight, leaf count, min leaf key, max leaf key).
        fn check<'a, K: Ord, V>(
            map: &'a RedBlackLeafMap<K, V>,
            id: usize,
            parent: Option<usize>,
        ) -> (usize, usize, &'a K, &'a K) {
            let node = &map.nodes[id];
            assert_eq!(node.parent, parent, "parent link out of sync");
            let own = usize::from(node.color == Color::Black);
            if node.is_leaf() {
                assert!(node.val.is_some(), "leaf must hold a value");
                assert!(node.right.is_none(), "leaf must have no children");
                return (own, 1, &node.key, &node.key);
            }
            assert!(node.val.is_none(), "internal node must not hold a value");
            let left = node.left.expect("internal node requires two children");
            let right = node.right.expect("internal node requires two children");
            if node.color == Color::Red {
                assert_eq!(map.nodes[left].color, Color::Black, "red node with red child");
                assert_eq!(map.nodes[right].color, Color::Black, "red node with red child");
            }
            let (lb, lc, lmin, lmax) = check(map, left, Some(id));
            let (rb, rc, rmin, rmax) = check(map, right, Some(id));
            assert!(*lmax <= node.key, "routing key below its left subtree");
            assert!(node.key < *rmin, "routing key overlaps its right subtree");
            assert_eq!(lb, rb, "black weights must match");
            (own + lb, lc + rc, lmin, rmax)
        }
        match self.root {
            None => assert_eq!(self.len, 0, "empty tree must have len 0"),
            Some(root) => {
                assert_eq!(self.nodes[root].color, Color::Black, "root must be black");
                let (_, count, _, _) = check(self, root, None);
                assert_eq!(count, self.len, "len must match the number of leaves");
            }
        }
    }
}

impl<K: Ord + Clone, V> Default for RedBlackLeafMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + Clone, V> OrderedMapEngine<K, V> for RedBlackLeafMap<K, V> {
    fn insert(&mut self, key: K, value: V) {
        RedBlackLeafMap::insert(self, key, value);
    }

    fn get(&self, key: &K) -> Option<&V> {
        RedBlackLeafMap::get(self, key)
    }

    fn remove(&mut self, key: &K) -> bool {
        RedBlackLeafMap::remove(self, key)
    }

    fn len(&self) -> usize {
        RedBlackLeafMap::len(self)
    }

    fn height(&self) -> usize {
        RedBlackLeafMap::height(self)
    }

    fn is_balanced(&self) -> bool {
        RedBlackLeafMap::is_balanced(self)
    }

    fn for_each(&self, f: impl FnMut(&K, &V)) {
        RedBlackLeafMap::for_each(self, f);
    }
}

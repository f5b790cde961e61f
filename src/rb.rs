//! Node-keyed red-black tree.
//!
//! Nodes live in a slot arena and link to each other by id, so parent edges
//! are plain non-owning indices and an absent child is `None` rather than a
//! shared sentinel node. The balancing is the textbook scheme: red nodes
//! never stack, every root-to-absent path crosses the same number of black
//! nodes, and the root is black. Insertion fixes at most two rotations'
//! worth of violation climbing red parents; deletion tracks the spliced
//! position as an `(Option<id>, parent)` pair and resolves the black deficit
//! through the four sibling cases.

use std::cmp::Ordering;

use crate::arena::Arena;
use crate::OrderedMapEngine;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Color {
    Red,
    Black,
}

struct Node<K, V> {
    key: K,
    val: V,
    color: Color,
    parent: Option<usize>,
    left: Option<usize>,
    right: Option<usize>,
}

/// Ordered map backed by a node-keyed red-black tree.
pub struct RedBlackMap<K, V> {
    nodes: Arena<Node<K, V>>,
    root: Option<usize>,
}

impl<K: Ord, V> RedBlackMap<K, V> {
    /// Create an empty map.
    pub fn new() -> Self {
        Self {
            nodes: Arena::new(),
            root: None,
        }
    }

    /// Number of keys in the map.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// `true` iff the map holds no keys.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 0
    }

    /// Insert a key-value pair, overwriting the value if the key is present.
    pub fn insert(&mut self, key: K, value: V) {
        let mut parent = None;
        let mut cur = self.root;
        let mut went_left = false;
        while let Some(id) = cur {
            match key.cmp(&self.nodes[id].key) {
                Ordering::Equal => {
                    self.nodes[id].val = value;
                    return;
                }
                Ordering::Less => {
                    parent = Some(id);
                    cur = self.nodes[id].left;
                    went_left = true;
                }
                Ordering::Greater => {
                    parent = Some(id);
                    cur = self.nodes[id].right;
                    went_left = false;
                }
            }
        }
        let z = self.nodes.insert(Node {
            key,
            val: value,
            color: Color::Red,
            parent,
            left: None,
            right: None,
        });
        match parent {
            None => self.root = Some(z),
            Some(p) => {
                if went_left {
                    self.nodes[p].left = Some(z);
                } else {
                    self.nodes[p].right = Some(z);
                }
            }
        }
        self.insert_fixup(z);
    }

    /// Look up the value stored under a key.
    pub fn get(&self, key: &K) -> Option<&V> {
        let mut cur = self.root;
        while let Some(id) = cur {
            match key.cmp(&self.nodes[id].key) {
                Ordering::Less => cur = self.nodes[id].left,
                Ordering::Greater => cur = self.nodes[id].right,
                Ordering::Equal => return Some(&self.nodes[id].val),
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
        let mut cur = self.root;
        let z = loop {
            let Some(id) = cur else { return false };
            match key.cmp(&self.nodes[id].key) {
                Ordering::Less => cur = self.nodes[id].left,
                Ordering::Greater => cur = self.nodes[id].right,
                Ordering::Equal => break id,
            }
        };
        self.remove_node(z);
        true
    }

    /// Entry with the smallest key.
    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        let id = self.min_of(self.root?);
        let node = &self.nodes[id];
        Some((&node.key, &node.val))
    }

    /// Entry with the largest key.
    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        let mut id = self.root?;
        while let Some(right) = self.nodes[id].right {
            id = right;
        }
        let node = &self.nodes[id];
        Some((&node.key, &node.val))
    }

    /// Visit every entry in ascending key order.
    pub fn for_each<F: FnMut(&K, &V)>(&self, mut f: F) {
        self.visit(self.root, &mut f);
    }

    /// Height of the tree, recomputed from the structure.
    pub fn height(&self) -> usize {
        self.subtree_height(self.root)
    }

    /// `true` iff the red-black invariants hold everywhere: no red node has a
    /// red child, every root-to-absent path crosses the same number of black
    /// nodes, and the root is black.
    pub fn is_balanced(&self) -> bool {
        if self.color(self.root) == Color::Red {
            return false;
        }
        self.black_height(self.root).is_some()
    }

    fn color(&self, id: Option<usize>) -> Color {
        id.map_or(Color::Black, |id| self.nodes[id].color)
    }

    fn min_of(&self, mut id: usize) -> usize {
        while let Some(left) = self.nodes[id].left {
            id = left;
        }
        id
    }

    fn visit(&self, id: Option<usize>, f: &mut impl FnMut(&K, &V)) {
        if let Some(id) = id {
            self.visit(self.nodes[id].left, f);
            f(&self.nodes[id].key, &self.nodes[id].val);
            self.visit(self.nodes[id].right, f);
        }
    }

    fn subtree_height(&self, id: Option<usize>) -> usize {
        id.map_or(0, |id| {
            1 + self
                .subtree_height(self.nodes[id].left)
                .max(self.subtree_height(self.nodes[id].right))
        })
    }

    /// Black height of a subtree, or `None` on any invariant violation.
    fn black_height(&self, id: Option<usize>) -> Option<usize> {
        let Some(id) = id else { return Some(1) };
        let node = &self.nodes[id];
        if node.color == Color::Red
            && (self.color(node.left) == Color::Red || self.color(node.right) == Color::Red)
        {
            return None;
        }
        let left = self.black_height(node.left)?;
        let right = self.black_height(node.right)?;
        (left == right).then_some(left + usize::from(node.color == Color::Black))
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

    /// Restore the no-stacked-reds invariant after inserting the red node `z`.
    fn insert_fixup(&mut self, mut z: usize) {
        while let Some(p) = self.nodes[z].parent {
            if self.nodes[p].color == Color::Black {
                break;
            }
            // A red parent is never the root, so the grandparent exists.
            let g = self.nodes[p].parent.expect("red node requires a parent");
            if self.nodes[g].left == Some(p) {
                let uncle = self.nodes[g].right;
                if self.color(uncle) == Color::Red {
                    let u = uncle.expect("red color requires a node");
                    self.nodes[p].color = Color::Black;
                    self.nodes[u].color = Color::Black;
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
                let uncle = self.nodes[g].left;
                if self.color(uncle) == Color::Red {
                    let u = uncle.expect("red color requires a node");
                    self.nodes[p].color = Color::Black;
                    self.nodes[u].color = Color::Black;
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

    /// Replace the subtree rooted at `u` with the subtree rooted at `v` in
    /// `u`'s parent. Does not touch `u`'s own links.
    fn transplant(&mut self, u: usize, v: Option<usize>) {
        let parent = self.nodes[u].parent;
        match parent {
            None => self.root = v,
            Some(p) => {
                if self.nodes[p].left == Some(u) {
                    self.nodes[p].left = v;
                } else {
                    self.nodes[p].right = v;
                }
            }
        }
        if let Some(v) = v {
            self.nodes[v].parent = parent;
        }
    }

    fn remove_node(&mut self, z: usize) {
        // The node that actually leaves its position: z itself, or its
        // in-order successor when z has two children. The successor node is
        // spliced over z wholesale, so no key or value ever moves.
        let (removed_color, x, x_parent) = match (self.nodes[z].left, self.nodes[z].right) {
            (None, child) | (child, None) => {
                let color = self.nodes[z].color;
                let parent = self.nodes[z].parent;
                self.transplant(z, child);
                (color, child, parent)
            }
            (Some(left), Some(right)) => {
                let y = self.min_of(right);
                let color = self.nodes[y].color;
                let x = self.nodes[y].right;
                let x_parent = if self.nodes[y].parent == Some(z) {
                    Some(y)
                } else {
                    let yp = self.nodes[y].parent;
                    self.transplant(y, x);
                    self.nodes[y].right = Some(right);
                    self.nodes[right].parent = Some(y);
                    yp
                };
                self.transplant(z, Some(y));
                self.nodes[y].left = Some(left);
                self.nodes[left].parent = Some(y);
                self.nodes[y].color = self.nodes[z].color;
                (color, x, x_parent)
            }
        };
        self.nodes.remove(z);
        if removed_color == Color::Black {
            self.delete_fixup(x, x_parent);
        }
    }

    /// Resolve the black deficit at position `x` (which may be an absent
    /// child, hence the explicit parent). The four cases per side: red
    /// sibling, sibling with two black children, red near nephew, red far
    /// nephew; the last one terminates.
    fn delete_fixup(&mut self, mut x: Option<usize>, mut parent: Option<usize>) {
        while x != self.root && self.color(x) == Color::Black {
            let Some(p) = parent else { break };
            if self.nodes[p].left == x {
                let mut w = self.nodes[p].right.expect("black deficit requires a sibling");
                if self.nodes[w].color == Color::Red {
                    self.nodes[w].color = Color::Black;
                    self.nodes[p].color = Color::Red;
                    self.rotate_left(p);
                    w = self.nodes[p].right.expect("black deficit requires a sibling");
                }
                if self.color(self.nodes[w].left) == Color::Black
                    && self.color(self.nodes[w].right) == Color::Black
                {
                    self.nodes[w].color = Color::Red;
                    x = Some(p);
                    parent = self.nodes[p].parent;
                } else {
                    if self.color(self.nodes[w].right) == Color::Black {
                        let near = self.nodes[w].left.expect("red color requires a node");
                        self.nodes[near].color = Color::Black;
                        self.nodes[w].color = Color::Red;
                        self.rotate_right(w);
                        w = self.nodes[p].right.expect("black deficit requires a sibling");
                    }
                    self.nodes[w].color = self.nodes[p].color;
                    self.nodes[p].color = Color::Black;
                    let far = self.nodes[w].right.expect("red color requires a node");
                    self.nodes[far].color = Color::Black;
                    self.rotate_left(p);
                    x = self.root;
                }
            } else {
                let mut w = self.nodes[p].left.expect("black deficit requires a sibling");
                if self.nodes[w].color == Color::Red {
                    self.nodes[w].color = Color::Black;
                    self.nodes[p].color = Color::Red;
                    self.rotate_right(p);
                    w = self.nodes[p].left.expect("black deficit requires a sibling");
                }
                if self.color(self.nodes[w].left) == Color::Black
                    && self.color(self.nodes[w].right) == Color::Black
                {
                    self.nodes[w].color = Color::Red;
                    x = Some(p);
                    parent = self.nodes[p].parent;
                } else {
                    if self.color(self.nodes[w].left) == Color::Black {
                        let near = self.nodes[w].right.expect("red color requires a node");
                        self.nodes[near].color = Color::Black;
                        self.nodes[w].color = Color::Red;
                        self.rotate_left(w);
                        w = self.nodes[p].left.expect("black deficit requires a sibling");
                    }
                    self.nodes[w].color = self.nodes[p].color;
                    self.nodes[p].color = Color::Black;
                    let far = self.nodes[w].left.expect("red color requires a node");
                    self.nodes[far].color = Color::Black;
                    self.rotate_right(p);
                    x = self.root;
                }
            }
        }
        if let Some(x) = x {
            self.nodes[x].color = Color::Black;
        }
    }

    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        fn check<K: Ord, V>(
            map: &RedBlackMap<K, V>,
            id: Option<usize>,
            parent: Option<usize>,
            lo: Option<&K>,
            hi: Option<&K>,
        ) -> (usize, usize) {
            let Some(id) = id else { return (1, 0) };
            let node = &map.nodes[id];
            assert_eq!(node.parent, parent, "parent link out of sync");
            if let Some(lo) = lo {
                assert!(node.key > *lo, "keys must be strictly increasing in-order");
            }
            if let Some(hi) = hi {
                assert!(node.key < *hi, "keys must be strictly increasing in-order");
            }
            if node.color == Color::Red {
                assert_eq!(map.color(node.left), Color::Black, "red node with red child");
                assert_eq!(map.color(node.right), Color::Black, "red node with red child");
            }
            let (lb, lc) = check(map, node.left, Some(id), lo, Some(&node.key));
            let (rb, rc) = check(map, node.right, Some(id), Some(&node.key), hi);
            assert_eq!(lb, rb, "black heights must match");
            (lb + usize::from(node.color == Color::Black), 1 + lc + rc)
        }
        assert_eq!(self.color(self.root), Color::Black, "root must be black");
        let (_, count) = check(self, self.root, None, None, None);
        assert_eq!(count, self.len(), "len must match the number of keys");
    }
}

impl<K: Ord, V> Default for RedBlackMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord, V> OrderedMapEngine<K, V> for RedBlackMap<K, V> {
    fn insert(&mut self, key: K, value: V) {
        RedBlackMap::insert(self, key, value);
    }

    fn get(&self, key: &K) -> Option<&V> {
        RedBlackMap::get(self, key)
    }

    fn remove(&mut self, key: &K) -> bool {
        RedBlackMap::remove(self, key)
    }

    fn len(&self) -> usize {
        RedBlackMap::len(self)
    }

    fn height(&self) -> usize {
        RedBlackMap::height(self)
    }

    fn is_balanced(&self) -> bool {
        RedBlackMap::is_balanced(self)
    }

    fn for_each(&self, f: impl FnMut(&K, &V)) {
        RedBlackMap::for_each(self, f);
    }
}

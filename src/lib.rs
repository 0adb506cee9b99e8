use generational_arena::{Arena, Index};
use log::{debug, trace};
use std::cmp::Ordering;
use std::fmt;
use std::iter::FromIterator;

mod compare;
mod error;
mod iter;
mod stats;

pub use compare::{Comparator, Natural};
pub use error::TreeError;
pub use iter::Iter;
pub use stats::Stats;

#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum Color {
    RED,
    BLACK,
}

#[derive(Debug)]
pub(crate) struct Node<K> {
    left: Option<Index>,
    right: Option<Index>,

    key: K,

    color: Color,
    // Logically deleted; the node keeps its place in the structure
    tombstone: bool,
}

impl<K> Node<K> {
    fn new(key: K) -> Self {
        Node {
            // Tree structure
            left: None,
            right: None,

            // Data
            key,

            color: Color::RED,
            tombstone: false,
        }
    }
}

/// The tree structure.
/// Stores the nodes in a generational arena and the index of the root of the tree.
///
/// Nodes are never taken out of the arena: removal only marks a node as a
/// tombstone, so the tree grows monotonically until it is cleared or dropped.
pub struct Tree<K, C = Natural> {
    nodes: Arena<Node<K>>,
    root: Option<Index>,
    comparator: C,
    live: usize,
}

impl<K: Ord> Tree<K> {
    /// Create a new empty tree ordered by the keys' `Ord` implementation
    pub fn new() -> Self {
        Tree::with_comparator(Natural)
    }
}

impl<K, C: Default> Default for Tree<K, C> {
    fn default() -> Self {
        Tree::with_comparator(C::default())
    }
}

impl<K, C> Tree<K, C> {
    /// Create a new empty tree that orders its keys with `comparator`.
    ///
    /// # Arguments
    ///
    /// * `comparator` - Three-way ordering over keys, either a `Comparator`
    ///   implementation or a closure `Fn(&K, &K) -> Ordering`
    ///
    pub fn with_comparator(comparator: C) -> Self {
        Tree {
            nodes: Arena::new(),
            root: None,
            comparator,
            live: 0,
        }
    }

    /// Returns a view of the root node, or `None` if nothing has ever been inserted.
    ///
    /// The root of a tree whose keys have all been removed is still present,
    /// as a tombstone.
    pub fn root(&self) -> Option<NodeRef<'_, K>> {
        self.root.map(|index| NodeRef::new(&self.nodes, index))
    }

    /// Number of keys that have been inserted and not removed
    pub fn len(&self) -> usize {
        self.live
    }

    /// Number of nodes in the structure, tombstones included
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// True when the tree holds no live keys
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Releases every node, tombstones included, leaving an empty tree.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
        self.live = 0;
    }

    /// Lazily walks the live keys in ascending order.
    ///
    /// Each call starts a fresh walk from the root.
    pub fn iter(&self) -> Iter<'_, K> {
        Iter::new(&self.nodes, self.root)
    }

    // Getters and setters
    fn get_left(&self, node: Index) -> Option<Index> {
        self.nodes[node].left
    }

    fn set_left(&mut self, node: Index, left: Option<Index>) {
        self.nodes[node].left = left;
    }

    fn get_right(&self, node: Index) -> Option<Index> {
        self.nodes[node].right
    }

    fn set_right(&mut self, node: Index, right: Option<Index>) {
        self.nodes[node].right = right;
    }

    fn get_color(&self, node: Option<Index>) -> Color {
        match node {
            Some(node) => self.nodes[node].color,
            None => Color::BLACK,
        }
    }

    fn set_color(&mut self, node: Index, color: Color) {
        self.nodes[node].color = color;
    }

    // Returns the node back if it exists and is red
    fn red(&self, node: Option<Index>) -> Option<Index> {
        node.filter(|_| self.get_color(node) == Color::RED)
    }
}

impl<K, C: Comparator<K>> Tree<K, C> {
    /// Inserts `key`, returning false if it is already present.
    ///
    /// A key that has been removed still occupies its slot, so inserting it
    /// again also returns false. A rejected insert leaves the tree untouched.
    pub fn insert(&mut self, key: K) -> bool {
        self.try_insert(key).is_ok()
    }

    /// Inserts `key`, reporting `TreeError::DuplicateKey` if it is already present.
    pub fn try_insert(&mut self, key: K) -> Result<(), TreeError> {
        self.insert_with_stats(key, &mut Stats::new())
    }

    /// Inserts `key` and rebalances the tree, adding the work done to `stats`.
    ///
    /// # Arguments
    ///
    /// * `key` - The key to insert
    /// * `stats` - Counters to accumulate rotations, visited nodes and colour flips into
    ///
    pub fn insert_with_stats(&mut self, key: K, stats: &mut Stats) -> Result<(), TreeError> {
        let root = self.put(self.root, key, true, stats).map_err(|err| {
            debug!("rejected insert: {}", err);
            err
        })?;
        // The flip exemption at the top of the walk does not cover a root
        // that arrived there by rotation
        self.set_color(root, Color::BLACK);
        self.root = Some(root);
        self.live += 1;
        Ok(())
    }

    // Descends to the empty slot for `key`, then repairs each subtree on the way
    // back up. Returns the index now rooting the subtree that `node` rooted.
    // Nothing is written until the new node has been created, so a duplicate
    // unwinds without side effects.
    fn put(
        &mut self,
        node: Option<Index>,
        key: K,
        at_root: bool,
        stats: &mut Stats,
    ) -> Result<Index, TreeError> {
        let node = match node {
            Some(node) => node,
            None => return Ok(self.nodes.insert(Node::new(key))),
        };

        stats.visits += 1;
        match self.comparator.compare(&key, &self.nodes[node].key) {
            Ordering::Less => {
                let left = self.put(self.get_left(node), key, false, stats)?;
                self.set_left(node, Some(left));
            }
            Ordering::Greater => {
                let right = self.put(self.get_right(node), key, false, stats)?;
                self.set_right(node, Some(right));
            }
            Ordering::Equal => return Err(TreeError::DuplicateKey),
        }

        Ok(self.repair(node, at_root, stats))
    }

    // Restores the red-black rules for the subtree rooted at `node` after an
    // insert below it. The four red-red checks run in order, each against the
    // result of the previous one, followed by the colour flip.
    fn repair(&mut self, mut node: Index, at_root: bool, stats: &mut Stats) -> Index {
        // Left-Left
        if let Some(left) = self.red(self.get_left(node)) {
            if self.red(self.get_left(left)).is_some() {
                trace!("left-left conflict, rotating right");
                self.set_color(node, Color::RED);
                self.set_color(left, Color::BLACK);
                node = self.right_rotate(node, left, stats);
            }
        }

        // Right-Right
        if let Some(right) = self.red(self.get_right(node)) {
            if self.red(self.get_right(right)).is_some() {
                trace!("right-right conflict, rotating left");
                self.set_color(node, Color::RED);
                self.set_color(right, Color::BLACK);
                node = self.left_rotate(node, right, stats);
            }
        }

        // Left-Right
        if let Some(left) = self.red(self.get_left(node)) {
            if let Some(inner) = self.red(self.get_right(left)) {
                trace!("left-right conflict, rotating left then right");
                self.set_color(node, Color::RED);
                self.set_color(inner, Color::BLACK);
                let left = self.left_rotate(left, inner, stats);
                self.set_left(node, Some(left));
                node = self.right_rotate(node, left, stats);
            }
        }

        // Right-Left
        if let Some(right) = self.red(self.get_right(node)) {
            if let Some(inner) = self.red(self.get_left(right)) {
                trace!("right-left conflict, rotating right then left");
                self.set_color(node, Color::RED);
                self.set_color(inner, Color::BLACK);
                let right = self.right_rotate(right, inner, stats);
                self.set_right(node, Some(right));
                node = self.left_rotate(node, right, stats);
            }
        }

        self.color_flip(node, at_root, stats);
        node
    }

    // A black node with two red children pushes its black down to them. The
    // node at the top of the walk keeps its black.
    fn color_flip(&mut self, node: Index, at_root: bool, stats: &mut Stats) {
        if self.get_color(Some(node)) != Color::BLACK {
            return;
        }
        if let (Some(left), Some(right)) = (
            self.red(self.get_left(node)),
            self.red(self.get_right(node)),
        ) {
            trace!("colour flip (at root: {})", at_root);
            self.set_color(left, Color::BLACK);
            self.set_color(right, Color::BLACK);
            if !at_root {
                self.set_color(node, Color::RED);
            }
            stats.flips += 1;
        }
    }

    // Rotates the nodes to the left
    //    p              q
    //   / \            / \
    //  a   q   -->    p   c
    //     / \        / \
    //    b   c      a   b
    // `pivot` must be the right child of `rotation_root`. Returns the pivot,
    // which the caller attaches in place of the rotation root.
    fn left_rotate(&mut self, rotation_root: Index, pivot: Index, stats: &mut Stats) -> Index {
        debug_assert_eq!(self.get_right(rotation_root), Some(pivot));
        // The left child of the pivot becomes the right child of the rotation root
        let pivot_left = self.get_left(pivot);
        self.set_right(rotation_root, pivot_left);
        // Set the left child of the pivot to be the rotation root
        self.set_left(pivot, Some(rotation_root));
        stats.rotations += 1;
        pivot
    }

    // Rotates the nodes to the right
    //     q             p
    //    / \           / \
    //   p   c  -->    a   q
    //  / \               / \
    // a   b             b   c
    fn right_rotate(&mut self, rotation_root: Index, pivot: Index, stats: &mut Stats) -> Index {
        debug_assert_eq!(self.get_left(rotation_root), Some(pivot));
        let pivot_right = self.get_right(pivot);
        self.set_left(rotation_root, pivot_right);
        self.set_right(pivot, Some(rotation_root));
        stats.rotations += 1;
        pivot
    }

    /// Looks up `key`, returning its node unless it is absent or removed.
    pub fn search(&self, key: &K) -> Option<NodeRef<'_, K>> {
        self.search_with_stats(key, &mut Stats::new())
    }

    /// As `search`, counting every node compared against into `stats.visits`.
    pub fn search_with_stats(&self, key: &K, stats: &mut Stats) -> Option<NodeRef<'_, K>> {
        self.find(key, stats)
            .map(|index| NodeRef::new(&self.nodes, index))
    }

    /// True if `key` has been inserted and not removed
    pub fn contains(&self, key: &K) -> bool {
        self.search(key).is_some()
    }

    /// Marks `key` as removed, returning false if it is absent or already removed.
    ///
    /// The node stays in place and no rebalancing takes place.
    pub fn remove(&mut self, key: &K) -> bool {
        self.try_remove(key).is_ok()
    }

    /// Marks `key` as removed, reporting `TreeError::KeyNotFound` if it is
    /// absent or already removed.
    pub fn try_remove(&mut self, key: &K) -> Result<(), TreeError> {
        match self.find(key, &mut Stats::new()) {
            Some(node) => {
                self.nodes[node].tombstone = true;
                self.live -= 1;
                Ok(())
            }
            None => {
                debug!("rejected remove: {}", TreeError::KeyNotFound);
                Err(TreeError::KeyNotFound)
            }
        }
    }

    // Iterative descent to the live node holding `key`
    fn find(&self, key: &K, stats: &mut Stats) -> Option<Index> {
        let mut current = self.root;
        while let Some(index) = current {
            stats.visits += 1;
            let node = &self.nodes[index];
            current = match self.comparator.compare(key, &node.key) {
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
                Ordering::Equal if node.tombstone => return None,
                Ordering::Equal => return Some(index),
            };
        }
        None
    }
}

impl<K: fmt::Debug, C> fmt::Debug for Tree<K, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<'a, K, C> IntoIterator for &'a Tree<K, C> {
    type Item = &'a K;
    type IntoIter = Iter<'a, K>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, C: Comparator<K>> Extend<K> for Tree<K, C> {
    /// Inserts every key, skipping any already present.
    fn extend<I: IntoIterator<Item = K>>(&mut self, iter: I) {
        for key in iter {
            self.insert(key);
        }
    }
}

impl<K: Ord> FromIterator<K> for Tree<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut tree = Tree::new();
        tree.extend(iter);
        tree
    }
}

/// Read-only view of a single node, borrowed from its tree.
pub struct NodeRef<'a, K> {
    nodes: &'a Arena<Node<K>>,
    index: Index,
}

impl<'a, K> NodeRef<'a, K> {
    fn new(nodes: &'a Arena<Node<K>>, index: Index) -> Self {
        NodeRef { nodes, index }
    }

    fn node(&self) -> &'a Node<K> {
        &self.nodes[self.index]
    }

    fn child(&self, child: Option<Index>) -> Option<NodeRef<'a, K>> {
        child.map(|index| NodeRef::new(self.nodes, index))
    }

    pub fn key(&self) -> &'a K {
        &self.node().key
    }

    pub fn color(&self) -> Color {
        self.node().color
    }

    pub fn is_red(&self) -> bool {
        self.color() == Color::RED
    }

    pub fn is_black(&self) -> bool {
        self.color() == Color::BLACK
    }

    /// True if the key held here has been removed
    pub fn is_tombstone(&self) -> bool {
        self.node().tombstone
    }

    pub fn left(&self) -> Option<NodeRef<'a, K>> {
        self.child(self.node().left)
    }

    pub fn right(&self) -> Option<NodeRef<'a, K>> {
        self.child(self.node().right)
    }
}

impl<'a, K> Clone for NodeRef<'a, K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, K> Copy for NodeRef<'a, K> {}

impl<'a, K: fmt::Debug> fmt::Debug for NodeRef<'a, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("key", self.key())
            .field("color", &self.color())
            .field("tombstone", &self.is_tombstone())
            .finish()
    }
}

use generational_arena::{Arena, Index};
use std::iter::FusedIterator;

use crate::Node;

/// Ascending in-order iterator over the live keys of a tree.
///
/// Holds the chain of pending left spines on an explicit stack, so the walk is
/// lazy and never touches node state. Tombstoned nodes are stepped through but
/// not yielded.
pub struct Iter<'a, K> {
    nodes: &'a Arena<Node<K>>,
    stack: Vec<Index>,
}

impl<'a, K> Iter<'a, K> {
    pub(crate) fn new(nodes: &'a Arena<Node<K>>, root: Option<Index>) -> Self {
        let mut iter = Iter {
            nodes,
            stack: Vec::new(),
        };
        iter.push_left_spine(root);
        iter
    }

    // Stacks `node` and every left descendant below it
    fn push_left_spine(&mut self, mut node: Option<Index>) {
        while let Some(index) = node {
            self.stack.push(index);
            node = self.nodes[index].left;
        }
    }
}

impl<'a, K> Iterator for Iter<'a, K> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        let nodes = self.nodes;
        loop {
            let node = &nodes[self.stack.pop()?];
            self.push_left_spine(node.right);
            if !node.tombstone {
                return Some(&node.key);
            }
        }
    }
}

impl<'a, K> FusedIterator for Iter<'a, K> {}

impl<'a, K> Clone for Iter<'a, K> {
    fn clone(&self) -> Self {
        Iter {
            nodes: self.nodes,
            stack: self.stack.clone(),
        }
    }
}

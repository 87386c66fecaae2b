//! In-order leaf traversal.
//!
//! Grounded on `original_source`'s `mjs_next_node`: given a handle to the
//! previously-visited leaf (or none, to start), climb ancestors until one is
//! reached by its `child[0]` edge, then descend that ancestor's `child[1]`
//! subtree as far left as it goes. No node carries a "next" pointer; the
//! parent back-links already reachable from every node are enough.

use super::{Edge, LeafNode, NodePtr, NodeRef};

fn leftmost(mut edge: Edge) -> NodePtr<LeafNode> {
    loop {
        match edge.classify() {
            NodeRef::Leaf(leaf) => return leaf,
            // SAFETY: obtained from classifying a live edge.
            NodeRef::Inner(inner) => edge = unsafe { inner.as_ref() }.child[0],
        }
    }
}

/// The leaf that follows `current` in trie order, or the first leaf if
/// `current` is `None`.
pub(crate) fn next(current: Option<NodePtr<LeafNode>>, root: Option<Edge>) -> Option<NodePtr<LeafNode>> {
    let Some(current) = current else {
        return Some(leftmost(root?));
    };

    let mut child_edge = current.to_edge();
    loop {
        // SAFETY: `child_edge` is live; every leaf or inner node not at the
        // tree's root has a parent.
        let parent_edge = unsafe { child_edge.parent() }?;
        // SAFETY: a parent edge always points at an inner node.
        let parent_ptr = unsafe { parent_edge.as_inner_unchecked() };
        // SAFETY: obtained from classifying a live edge.
        let parent = unsafe { parent_ptr.as_ref() };
        if parent.child[0] == child_edge {
            return Some(leftmost(parent.child[1]));
        }
        child_edge = parent_edge;
    }
}

/// An iterator over every leaf reachable from a given root, in trie order.
///
/// Holds no reference to the owning [`crate::object::Object`] — it is
/// built from a bare `Option<Edge>` so the object surface can wrap it with
/// whatever lifetime/borrow story it needs.
pub struct PropertyIter {
    root: Option<Edge>,
    current: Option<NodePtr<LeafNode>>,
    done: bool,
}

impl PropertyIter {
    pub(crate) fn new(root: Option<Edge>) -> Self {
        PropertyIter { root, current: None, done: false }
    }
}

impl Iterator for PropertyIter {
    type Item = NodePtr<LeafNode>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let found = next(self.current, self.root);
        self.current = found;
        if found.is_none() {
            self.done = true;
        }
        found
    }
}

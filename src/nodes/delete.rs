//! Crit-bit deletion: promote a leaf's sibling into its parent's place.
//!
//! Grounded on `original_source`'s `mjs_del`: removing a leaf never touches
//! any node other than its parent and grandparent — the sibling subtree is
//! relinked wholesale, not walked.

use super::{descend::lookup_own, Edge, InnerNode, LeafNode, NodePtr, NodeRef};

/// What a successful [`delete`] tore down, so the caller can free the
/// strings it owned.
pub(crate) struct Deleted {
    pub name: crate::value::Value,
    pub value: crate::value::Value,
}

/// Remove `key` from the tree rooted at `root`, if present.
///
/// Returns the new root and the removed leaf's name/value, or `None` if
/// `key` wasn't a property. Frees the removed leaf node and, if applicable,
/// the inner node that held it — but not the name/value strings inside it;
/// the caller (the object surface, which owns the [`crate::strings::StringStore`])
/// is responsible for those.
pub(crate) fn delete(root: Option<Edge>, key: &[u8]) -> (Option<Edge>, Option<Deleted>) {
    let Some(root_edge) = root else {
        return (None, None);
    };
    let Some(leaf) = lookup_own(root_edge, key) else {
        return (Some(root_edge), None);
    };
    let leaf_edge = leaf.to_edge();

    // SAFETY: `leaf` is live (just found by `lookup_own`).
    let parent_edge = unsafe { leaf.as_ref() }.parent;

    let Some(parent_edge) = parent_edge else {
        // The leaf was the whole tree.
        // SAFETY: `leaf` is live, uniquely owned here, and about to be the
        // only reference dropped.
        let removed = unsafe { leaf.deallocate() };
        return (None, Some(Deleted { name: removed.name, value: removed.value }));
    };

    // SAFETY: a leaf's parent edge, when present, always points at a live
    // inner node (§3 invariant: only inner nodes appear as parents).
    let parent_ptr = unsafe { parent_edge.as_inner_unchecked() };
    // SAFETY: obtained from classifying a live edge.
    let parent = unsafe { parent_ptr.as_ref() };
    let leaf_index = if parent.child[0] == leaf_edge { 0 } else { 1 };
    let sibling = parent.child[1 - leaf_index];

    let grandparent_edge = parent.parent;
    // SAFETY: the sibling edge is live regardless of its own kind.
    unsafe { sibling.set_parent(grandparent_edge) };

    let new_root = match grandparent_edge {
        None => Some(sibling),
        Some(grandparent_edge) => {
            // SAFETY: a non-root inner node's parent is always itself an
            // inner node.
            let grandparent_ptr = unsafe { grandparent_edge.as_inner_unchecked() };
            // SAFETY: obtained from classifying a live edge.
            let grandparent = unsafe { grandparent_ptr.as_ref() };
            let parent_index = if grandparent.child[0] == parent_edge { 0 } else { 1 };
            // SAFETY: `grandparent_ptr` is live and exclusively borrowed here.
            unsafe { grandparent_ptr.as_mut() }.child[parent_index] = sibling;
            Some(root_edge)
        },
    };

    #[cfg(feature = "log")]
    log::trace!("removed a property, promoting its sibling into the parent's place");

    // SAFETY: `parent_ptr` is live, no longer reachable from the tree after
    // the relink above, and not referenced again.
    let _: InnerNode = unsafe { parent_ptr.deallocate() };
    // SAFETY: `leaf` is live, no longer reachable from the tree, and not
    // referenced again.
    let removed: LeafNode = unsafe { leaf.deallocate() };

    (new_root, Some(Deleted { name: removed.name, value: removed.value }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{nodes::insert::{insert, Inserted}, strings::StringStore, value::Value};

    #[test]
    fn delete_only_key_empties_tree() {
        let store = StringStore::new();
        let (root, _) = insert(None, b"a", Value::mk_number(1.0), &store).unwrap();
        let (root, deleted) = delete(root, b"a");
        assert!(root.is_none());
        assert!(deleted.is_some());
    }

    #[test]
    fn delete_one_of_two_promotes_sibling() {
        let store = StringStore::new();
        let (root, _) = insert(None, b"a", Value::mk_number(1.0), &store).unwrap();
        let (root, outcome) = insert(root, b"b", Value::mk_number(2.0), &store).unwrap();
        let b_leaf = match outcome {
            Inserted::Fresh { leaf } => leaf,
            _ => unreachable!(),
        };

        let (root, deleted) = delete(root, b"a");
        assert!(deleted.is_some());
        let root_edge = root.expect("one key remains");
        assert!(root_edge.is_leaf(), "sibling should now be the root");
        // SAFETY: test-only, the sole remaining reference.
        let remaining = unsafe { root_edge.as_leaf_unchecked() };
        assert_eq!(remaining, b_leaf);

        unsafe { remaining.deallocate() };
    }

    #[test]
    fn delete_missing_key_is_a_no_op() {
        let store = StringStore::new();
        let (root, _) = insert(None, b"a", Value::mk_number(1.0), &store).unwrap();
        let (root2, deleted) = delete(root, b"z");
        assert_eq!(root, root2);
        assert!(deleted.is_none());

        // SAFETY: test-only cleanup.
        let leaf = unsafe { root.unwrap().as_leaf_unchecked() };
        unsafe { leaf.deallocate() };
    }
}

//! Crit-bit insertion: find-or-create a leaf for a key, splitting an edge
//! into a fresh inner node when the key isn't already present.
//!
//! Grounded on `original_source`'s `mjs_set_internal`: the name is only
//! written into the new leaf *after* the tree has been spliced in, because
//! allocating the name string can trigger a GC/relocation in the original —
//! this crate doesn't relocate strings, but the ordering is kept so the
//! shape of the two implementations stays comparable (see `DESIGN.md`).

use super::{
    descend::{descend, first_diverging_bit, lookup_own},
    Edge, InnerNode, LeafNode, NodePtr, NodeRef, Position,
};
use crate::{error::ObjectError, strings::StringStore, value::Value};

/// What happened to the tree as a result of [`insert`].
pub(crate) enum Inserted {
    /// The key was already present; its value was overwritten in place and
    /// the tree's shape (and therefore `root`) did not change.
    Overwrote { leaf: NodePtr<LeafNode>, old_value: Value },
    /// The key was new; one leaf and one inner node were allocated.
    Fresh { leaf: NodePtr<LeafNode> },
}

/// Insert or overwrite `key` in the tree rooted at `root`.
///
/// Returns the new root (only different from `root` when the tree was
/// previously empty — every other insertion mutates an existing inner
/// node's child in place) and what happened.
pub(crate) fn insert(
    root: Option<Edge>,
    key: &[u8],
    value: Value,
    store: &StringStore,
) -> Result<(Option<Edge>, Inserted), ObjectError> {
    let Some(root_edge) = root else {
        let name = store.mk_string(key).map_err(|_| ObjectError::OutOfMemory)?;
        let leaf = NodePtr::allocate(LeafNode { parent: None, name, value });
        return Ok((Some(leaf.to_edge()), Inserted::Fresh { leaf }));
    };

    let best = descend(root_edge, key);
    // SAFETY: `descend` returns a pointer obtained from a live edge.
    let best_name = unsafe { best.as_ref() }.name;
    if store.strcmp(best_name, key) == std::cmp::Ordering::Equal {
        // SAFETY: `best` is live and not aliased elsewhere during this call.
        let slot = unsafe { best.as_mut() };
        let old_value = slot.value;
        slot.value = value;
        return Ok((Some(root_edge), Inserted::Overwrote { leaf: best, old_value }));
    }

    let (crit_byte, crit_bit) = first_diverging_bit(key, best_name);
    let new_pos = Position::new(crit_byte, crit_bit);
    let new_dir = new_pos.direction(key.get(crit_byte as usize).copied().unwrap_or(0));

    // Re-walk from the root to find the edge the new inner node should
    // replace: the first edge along the path whose own discriminating
    // position is not strictly "above" `new_pos` in trie order.
    let mut parent: Option<Edge> = None;
    let mut cur = root_edge;
    loop {
        match cur.classify() {
            NodeRef::Leaf(_) => break,
            NodeRef::Inner(inner_ptr) => {
                // SAFETY: obtained from classifying a live edge.
                let inner = unsafe { inner_ptr.as_ref() };
                if inner.position >= new_pos {
                    break;
                }
                parent = Some(cur);
                let c = key.get(inner.position.byte as usize).copied().unwrap_or(0);
                cur = inner.child[inner.position.direction(c)];
            },
        }
    }

    let name = store.mk_string(key).map_err(|_| ObjectError::OutOfMemory)?;
    let new_leaf = NodePtr::allocate(LeafNode { parent: None, name, value });
    let new_leaf_edge = new_leaf.to_edge();

    let mut child = [cur, cur];
    child[new_dir] = new_leaf_edge;
    child[1 - new_dir] = cur;
    let new_inner = NodePtr::allocate(InnerNode { parent: None, child, position: new_pos });
    let new_inner_edge = new_inner.to_edge();

    #[cfg(feature = "log")]
    log::trace!(
        "split at byte {} bit {} to insert a new property ({} bytes)",
        crit_byte,
        crit_bit,
        key.len()
    );

    // SAFETY: `new_leaf` was just allocated by this call and is not yet
    // reachable from anywhere else.
    unsafe { new_leaf.as_mut() }.parent = Some(new_inner_edge);
    // SAFETY: `cur` is a live edge reached by descending from `root_edge`.
    unsafe { cur.set_parent(Some(new_inner_edge)) };

    let new_root = match parent {
        None => {
            // SAFETY: `new_inner` was just allocated and is not yet
            // reachable from anywhere else.
            unsafe { new_inner.as_mut() }.parent = None;
            Some(new_inner_edge)
        },
        Some(parent_edge) => {
            // SAFETY: `parent_edge` is a live inner edge from the walk above.
            let parent_ptr = unsafe { parent_edge.as_inner_unchecked() };
            // SAFETY: obtained from classifying a live edge.
            let parent_inner = unsafe { parent_ptr.as_ref() };
            let d = parent_inner
                .position
                .direction(key.get(parent_inner.position.byte as usize).copied().unwrap_or(0));
            // SAFETY: `parent_ptr` is live and exclusively borrowed here.
            unsafe { parent_ptr.as_mut() }.child[d] = new_inner_edge;
            // SAFETY: `new_inner` was just allocated.
            unsafe { new_inner.as_mut() }.parent = Some(parent_edge);
            Some(root_edge)
        },
    };

    Ok((new_root, Inserted::Fresh { leaf: new_leaf }))
}

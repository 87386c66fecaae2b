//! The per-object crit-bit trie: node representation and arena.
//!
//! Mirrors the teacher's `NodePtr<N>`/`OpaqueNodePtr` split (a typed handle
//! for when the concrete node kind is already known, an erased handle for
//! when it isn't) but narrowed to the two node kinds `spec.md` §3 allows —
//! leaf and inner — with the kind recorded as a single bit on the *edge*
//! pointing at a node, not inside the node itself (§3 invariant 3,
//! `original_source`'s `IS_INNER_NODE`/`ENCODE_INNER_NODE` macros).

mod descend;
mod delete;
mod insert;
mod iter;

pub(crate) use descend::{descend, lookup_own};
pub(crate) use delete::delete;
pub(crate) use insert::{insert, Inserted};
pub(crate) use iter::{next, PropertyIter};

use std::ptr::NonNull;

use crate::{tagged_pointer::TaggedPointer, value::Value};

/// An inner node's discriminating bit: byte offset into the key plus an
/// 8-bit mask with exactly one zero bit at the critical position.
///
/// Ordering per `spec.md` §3: `a < b` iff `a.byte < b.byte`, or
/// `a.byte == b.byte && a.mask > b.mask` (a higher mask value is a *less*
/// significant critical bit, hence higher in the trie).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub byte: u32,
    pub mask: u8,
}

impl Position {
    /// `mask = !(1 << crit_bit)`, `byte` is the differing byte's index.
    pub fn new(byte: u32, crit_bit: u32) -> Self {
        Position {
            byte,
            mask: !(1u8 << crit_bit),
        }
    }

    /// Direction (`0` or `1`) that `c` takes at this position: `0` if the
    /// critical bit of `c` is clear, `1` if it's set. Branch-free, matching
    /// `original_source`'s `(1 + (pos.mask | c)) >> 8`.
    pub fn direction(self, c: u8) -> usize {
        ((1u32 + (self.mask as u32 | c as u32)) >> 8) as usize
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.byte
            .cmp(&other.byte)
            .then_with(|| other.mask.cmp(&self.mask))
    }
}

/// A placeholder type with the alignment every node needs (so the low bit
/// of any pointer to it is free for the inner/leaf flag).
#[repr(align(2))]
struct OpaqueNode;

/// A tagged pointer to either a [`LeafNode`] or an [`InnerNode`], with the
/// kind stored in the low bit — the `IS_INNER_NODE`/`IS_LEAF_NODE` flag from
/// `original_source`, reified as a type instead of a raw `uintptr_t`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Edge(TaggedPointer<OpaqueNode, 1>);

impl std::fmt::Debug for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.classify() {
            NodeRef::Leaf(p) => f.debug_tuple("Edge::Leaf").field(&p.0).finish(),
            NodeRef::Inner(p) => f.debug_tuple("Edge::Inner").field(&p.0).finish(),
        }
    }
}

/// The result of inspecting an [`Edge`]'s tag bit and recovering a typed
/// pointer — the two-variant analogue of the teacher's `ConcreteNodePtr`.
pub enum NodeRef {
    Leaf(NodePtr<LeafNode>),
    Inner(NodePtr<InnerNode>),
}

impl Edge {
    fn from_leaf(ptr: NodePtr<LeafNode>) -> Self {
        let mut tagged = TaggedPointer::new(ptr.0.cast());
        tagged.set_data(0);
        Edge(tagged)
    }

    fn from_inner(ptr: NodePtr<InnerNode>) -> Self {
        let mut tagged = TaggedPointer::new(ptr.0.cast());
        tagged.set_data(1);
        Edge(tagged)
    }

    pub fn is_inner(self) -> bool {
        self.0.to_data() == 1
    }

    pub fn is_leaf(self) -> bool {
        !self.is_inner()
    }

    /// Recover a typed pointer from the tag bit.
    pub fn classify(self) -> NodeRef {
        if self.is_inner() {
            NodeRef::Inner(NodePtr(self.0.cast::<InnerNode>().to_ptr().into_non_null()))
        } else {
            NodeRef::Leaf(NodePtr(self.0.cast::<LeafNode>().to_ptr().into_non_null()))
        }
    }

    /// # Safety
    /// `self` must currently be an inner edge ([`Edge::is_inner`]).
    pub unsafe fn as_inner_unchecked(self) -> NodePtr<InnerNode> {
        match self.classify() {
            NodeRef::Inner(p) => p,
            NodeRef::Leaf(_) => unreachable!("as_inner_unchecked on a leaf edge"),
        }
    }

    /// # Safety
    /// `self` must currently be a leaf edge ([`Edge::is_leaf`]).
    pub unsafe fn as_leaf_unchecked(self) -> NodePtr<LeafNode> {
        match self.classify() {
            NodeRef::Leaf(p) => p,
            NodeRef::Inner(_) => unreachable!("as_leaf_unchecked on an inner edge"),
        }
    }

    /// Read the common `parent` back-link, regardless of node kind.
    ///
    /// # Safety
    /// The pointed-to node must be live (not yet freed).
    pub unsafe fn parent(self) -> Option<Edge> {
        match self.classify() {
            // SAFETY: forwarded from the caller's contract.
            NodeRef::Leaf(p) => unsafe { p.as_ref() }.parent,
            // SAFETY: forwarded from the caller's contract.
            NodeRef::Inner(p) => unsafe { p.as_ref() }.parent,
        }
    }

    /// Overwrite the common `parent` back-link, regardless of node kind.
    ///
    /// # Safety
    /// The pointed-to node must be live, and must not be concurrently
    /// accessed through any other reference (there is none, single-threaded
    /// model per `spec.md` §5).
    pub unsafe fn set_parent(self, new_parent: Option<Edge>) {
        match self.classify() {
            // SAFETY: forwarded from the caller's contract.
            NodeRef::Leaf(mut p) => unsafe { p.as_mut() }.parent = new_parent,
            // SAFETY: forwarded from the caller's contract.
            NodeRef::Inner(mut p) => unsafe { p.as_mut() }.parent = new_parent,
        }
    }
}

trait RawPtrExt<T> {
    fn into_non_null(self) -> NonNull<T>;
}

impl<T> RawPtrExt<T> for *mut T {
    fn into_non_null(self) -> NonNull<T> {
        // SAFETY: every `*mut T` handed around in this module originates
        // from a `NonNull` cast (`Edge::from_leaf`/`from_inner`), so it is
        // never actually null.
        unsafe { NonNull::new_unchecked(self) }
    }
}

/// A leaf: one property's name and value.
///
/// # Safety
/// This struct must only be reached through a [`Edge`] whose
/// [`Edge::is_leaf`] is `true` — see `spec.md` §9's "inner/leaf
/// discrimination lives on the edge, not the node".
pub struct LeafNode {
    pub parent: Option<Edge>,
    pub name: Value,
    pub value: Value,
}

/// An inner node: a single discriminating [`Position`] and its two
/// children.
///
/// # Safety
/// This struct must only be reached through an [`Edge`] whose
/// [`Edge::is_inner`] is `true`.
pub struct InnerNode {
    pub parent: Option<Edge>,
    pub child: [Edge; 2],
    pub position: Position,
}

/// A pointer to a concrete node kind, allocated individually on the heap —
/// the same allocation discipline as the teacher's
/// `NodePtr::allocate_node_ptr`/`deallocate_node_ptr`. There is no shared
/// arena or compaction: each node is one `Box`, freed exactly once.
pub struct NodePtr<N>(NonNull<N>);

impl<N> Clone for NodePtr<N> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<N> Copy for NodePtr<N> {}

impl<N> PartialEq for NodePtr<N> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}
impl<N> Eq for NodePtr<N> {}

impl<N> std::fmt::Debug for NodePtr<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("NodePtr").field(&self.0).finish()
    }
}

impl<N> NodePtr<N> {
    /// Allocate `node` on the heap.
    pub fn allocate(node: N) -> Self {
        // SAFETY: `Box::into_raw` always returns a non-null, aligned,
        // dereferenceable pointer.
        NodePtr(unsafe { NonNull::new_unchecked(Box::into_raw(Box::new(node))) })
    }

    /// Free a node allocated by [`NodePtr::allocate`].
    ///
    /// # Safety
    /// Must be called exactly once per node, and only after every [`Edge`]
    /// referencing it has been overwritten.
    pub unsafe fn deallocate(self) -> N {
        // SAFETY: forwarded from the caller's contract.
        *unsafe { Box::from_raw(self.0.as_ptr()) }
    }

    /// # Safety
    /// The node must be live and not mutably aliased for the returned
    /// lifetime.
    pub unsafe fn as_ref<'a>(self) -> &'a N {
        // SAFETY: forwarded from the caller's contract.
        unsafe { self.0.as_ref() }
    }

    /// # Safety
    /// The node must be live and not aliased at all for the returned
    /// lifetime.
    pub unsafe fn as_mut<'a>(mut self) -> &'a mut N {
        // SAFETY: forwarded from the caller's contract.
        unsafe { self.0.as_mut() }
    }

    pub fn to_ptr(self) -> *mut N {
        self.0.as_ptr()
    }
}

impl NodePtr<LeafNode> {
    pub fn to_edge(self) -> Edge {
        Edge::from_leaf(self)
    }
}

impl NodePtr<InnerNode> {
    pub fn to_edge(self) -> Edge {
        Edge::from_inner(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_ordering() {
        let a = Position::new(0, 0);
        let b = Position::new(0, 1);
        // same byte, crit_bit 0 means mask = 0xFE (higher), crit_bit 1 means
        // mask = 0xFD (lower) -- higher mask sorts first (higher in trie).
        assert!(a < b || b < a);
        assert_ne!(a, b);

        let c = Position::new(1, 0);
        assert!(a < c, "earlier byte sorts first");
    }

    #[test]
    fn direction_matches_critical_bit() {
        // crit_bit 0, mask = 0xFE
        let pos = Position::new(0, 0);
        assert_eq!(pos.direction(0b0000_0000), 0);
        assert_eq!(pos.direction(0b0000_0001), 1);
    }

    #[test]
    fn edge_round_trips_kind() {
        let leaf = NodePtr::allocate(LeafNode {
            parent: None,
            name: Value::mk_short_string(b"x"),
            value: Value::mk_number(1.0),
        });
        let edge = leaf.to_edge();
        assert!(edge.is_leaf());
        assert!(!edge.is_inner());

        let inner = NodePtr::allocate(InnerNode {
            parent: None,
            child: [edge, edge],
            position: Position::new(0, 0),
        });
        let inner_edge = inner.to_edge();
        assert!(inner_edge.is_inner());

        // SAFETY: freshly allocated, single reference each, test-only.
        unsafe {
            leaf.deallocate();
            inner.deallocate();
        }
    }
}

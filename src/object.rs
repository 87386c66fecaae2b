//! The object surface: the public API a host embedding builds property
//! storage on top of.
//!
//! Grounded on `original_source`'s public `mjs_*` object functions
//! (`mjs_get`, `mjs_get_v`, `mjs_set`, `mjs_set_v`, `mjs_del`, `mjs_next`,
//! `mjs_op_create_object`) — one method here per function there, modulo the
//! bytecode-interpreter-only ones `spec.md`'s Non-goals exclude.

use std::ptr::NonNull;

use crate::{
    error::ObjectError,
    nodes::{self, Edge, Inserted, LeafNode, NodePtr, PropertyIter},
    strings::StringStore,
    value::{Tag, Value},
};

/// The key under which a prototype link is stored, matching
/// `original_source`'s `MJS_PROTO_PROP_NAME`.
pub const PROTO_PROP_NAME: &[u8] = b"__p";

/// Ceiling on prototype-chain hops a single [`Object::get`] will walk.
///
/// `original_source`'s `mjs_get_v_proto` recurses with no bound at all; a
/// prototype cycle there is a host bug that hangs or overflows the native
/// stack. This crate refuses to either: past this many hops, lookup simply
/// reports the property as absent. See `DESIGN.md`'s Open Question 2.
pub const MAX_PROTO_DEPTH: u32 = 64;

/// An object's own properties, stored as a crit-bit trie keyed on property
/// name, plus the trie's element count.
///
/// Has no notion of a prototype as a distinct field — like the source
/// interpreter, the prototype is just the ordinary own property named
/// [`PROTO_PROP_NAME`]. [`Object::get`] knows to look there when an own
/// lookup misses.
pub struct Object {
    root: Option<Edge>,
    prop_count: usize,
}

impl Default for Object {
    fn default() -> Self {
        Self::new()
    }
}

impl Object {
    /// An object with no properties.
    pub fn new() -> Self {
        Object { root: None, prop_count: 0 }
    }

    /// Convenience constructor matching `original_source`'s
    /// `mjs_op_create_object` composed with attaching a prototype: an empty
    /// object whose [`PROTO_PROP_NAME`] own property is set to `proto`.
    pub fn create(proto: Value) -> Result<Self, ObjectError> {
        let mut obj = Self::new();
        obj.set(PROTO_PROP_NAME, proto)?;
        Ok(obj)
    }

    /// Number of own properties.
    pub fn len(&self) -> usize {
        self.prop_count
    }

    /// `true` if this object has no own properties.
    pub fn is_empty(&self) -> bool {
        self.prop_count == 0
    }

    /// The trie's root edge, for callers that need to walk the raw
    /// structure (e.g. structural-invariant checks in tests).
    pub(crate) fn root_edge(&self) -> Option<Edge> {
        self.root
    }

    /// Look up `key` among this object's own properties only — no
    /// prototype walk. Grounded on `mjs_get_own`.
    pub fn get_own(&self, key: &[u8]) -> Option<Value> {
        let root = self.root?;
        let leaf = nodes::lookup_own(root, key)?;
        // SAFETY: `lookup_own` only returns pointers to live leaves.
        Some(unsafe { leaf.as_ref() }.value)
    }

    /// [`Object::get_own`], but the key is itself a [`Value`] and must
    /// first be coerced to a string the way the source interpreter coerces
    /// any property accessor (`mjs_get_own_v`).
    pub fn get_own_v(&self, key: Value) -> Result<Option<Value>, ObjectError> {
        let rendered = key.to_string_bytes()?;
        Ok(self.get_own(rendered.as_bytes()))
    }

    /// Look up `key`, following the prototype chain (the `__p` own
    /// property) if an own lookup misses.
    ///
    /// The walk is bounded by this object's own property count plus one —
    /// a cheap stand-in for the full chain's size, since computing that
    /// exactly would require walking the chain before walking it — capped
    /// at [`MAX_PROTO_DEPTH`] so a chain whose every link has few
    /// properties (e.g. a cycle of singletons) still terminates. Grounded
    /// on `mjs_get`/`mjs_get_v_proto`.
    pub fn get(&self, key: &[u8]) -> Option<Value> {
        let limit = (self.prop_count as u32).saturating_add(1).min(MAX_PROTO_DEPTH);
        self.get_bounded(key, limit)
    }

    fn get_bounded(&self, key: &[u8], hops_left: u32) -> Option<Value> {
        if let Some(v) = self.get_own(key) {
            return Some(v);
        }
        if hops_left == 0 {
            #[cfg(feature = "log")]
            log::debug!("prototype chain walk exceeded its hop bound, treating the property as absent");
            return None;
        }
        let proto = self.get_own(PROTO_PROP_NAME)?;
        if !proto.is_object() {
            return None;
        }
        // SAFETY: every object-tagged `Value` this crate ever stores under
        // `PROTO_PROP_NAME` was built by `set`/`set_v` from an
        // `Object`-pointing `NonNull` (see `Object::set`'s proto-setting
        // callers); there is no other producer of such values in this crate.
        let proto_ptr = unsafe { proto.as_object_ptr::<Object>() }?;
        // SAFETY: the pointee is a live `Object` for as long as the host
        // keeps it alive, which `get`'s caller is responsible for across
        // this call, matching the unchecked recursive walk in
        // `original_source`.
        let proto_obj = unsafe { proto_ptr.as_ref() };
        proto_obj.get_bounded(key, hops_left - 1)
    }

    /// [`Object::get`] with a `Value` key. Grounded on `mjs_get_v`.
    pub fn get_v(&self, key: Value) -> Result<Option<Value>, ObjectError> {
        let rendered = key.to_string_bytes()?;
        Ok(self.get(rendered.as_bytes()))
    }

    /// Set an own property, creating it if absent. Returns `true` if an
    /// existing property's value was overwritten, `false` if a new one was
    /// created. Grounded on `mjs_set`/`mjs_set_internal`.
    pub fn set(&mut self, key: &[u8], value: Value) -> Result<bool, ObjectError> {
        let store = StringStore::new();
        let (new_root, outcome) = nodes::insert(self.root, key, value, &store)?;
        self.root = new_root;
        match outcome {
            Inserted::Fresh { .. } => {
                self.prop_count += 1;
                Ok(false)
            },
            Inserted::Overwrote { old_value, .. } => {
                free_if_heap_string(&store, old_value);
                Ok(true)
            },
        }
    }

    /// [`Object::set`] with a `Value` key. Grounded on `mjs_set_v`.
    pub fn set_v(&mut self, key: Value, value: Value) -> Result<bool, ObjectError> {
        let rendered = key.to_string_bytes()?;
        self.set(rendered.as_bytes(), value)
    }

    /// Remove an own property. Returns its former value, or `None` if it
    /// wasn't present. Grounded on `mjs_del`.
    pub fn del(&mut self, key: &[u8]) -> Option<Value> {
        let (new_root, deleted) = nodes::delete(self.root, key);
        self.root = new_root;
        let deleted = deleted?;
        self.prop_count -= 1;
        let store = StringStore::new();
        free_if_heap_string(&store, deleted.name);
        Some(deleted.value)
    }

    /// [`Object::del`] with a `Value` key.
    pub fn del_v(&mut self, key: Value) -> Result<Option<Value>, ObjectError> {
        let rendered = key.to_string_bytes()?;
        Ok(self.del(rendered.as_bytes()))
    }

    /// Iterate this object's own properties in trie order. Grounded on
    /// `mjs_next`'s iteration protocol, wrapped as a proper
    /// [`std::iter::Iterator`] instead of a "pass back the last handle"
    /// C API.
    pub fn iter(&self) -> Properties<'_> {
        Properties { inner: PropertyIter::new(self.root), _object: std::marker::PhantomData }
    }
}

/// Recover an `Object` pointer from a dynamically-tagged value, the way
/// `original_source`'s `mjs_set`/`mjs_get`/`mjs_del` check `mjs_is_object`
/// before delegating to their internal, already-typed counterparts.
///
/// # Safety
/// If `v.tag() == Tag::Object`, the pointer must have been produced by
/// [`Value::object_from_ptr`] from a `NonNull<Object>` whose pointee is
/// still alive — true of every object-tagged value this crate's own API
/// produces, which is the only producer in scope.
fn object_ptr(v: Value) -> Result<NonNull<Object>, ObjectError> {
    if v.tag() != Tag::Object {
        return Err(ObjectError::NotAnObject);
    }
    // SAFETY: tag checked above; see function doc.
    unsafe { v.as_object_ptr::<Object>() }.ok_or(ObjectError::NotAnObject)
}

/// [`Object::get_own`] for a dynamically-tagged target. Grounded on
/// `mjs_get_own`, which likewise takes an `mjs_val_t` rather than a typed
/// object handle.
pub fn get_own(obj: Value, key: &[u8]) -> Result<Option<Value>, ObjectError> {
    let ptr = object_ptr(obj)?;
    // SAFETY: `object_ptr` only returns pointers to live objects.
    Ok(unsafe { ptr.as_ref() }.get_own(key))
}

/// [`Object::get`] for a dynamically-tagged target. `spec.md` §4.D.6: `get`
/// on a non-object does not fail, it reports the property as absent.
pub fn get(obj: Value, key: &[u8]) -> Option<Value> {
    let ptr = object_ptr(obj).ok()?;
    // SAFETY: `object_ptr` only returns pointers to live objects.
    unsafe { ptr.as_ref() }.get(key)
}

/// [`Object::get_v`] for a dynamically-tagged target.
pub fn get_v(obj: Value, key: Value) -> Result<Option<Value>, ObjectError> {
    let ptr = object_ptr(obj)?;
    // SAFETY: `object_ptr` only returns pointers to live objects.
    unsafe { ptr.as_ref() }.get_v(key)
}

/// [`Object::set`] for a dynamically-tagged target. Fails with
/// [`ObjectError::NotAnObject`] if `obj` is not an object, matching
/// `spec.md` §4.D.6's "`set` fails with `TYPE_ERROR` if the target is not
/// an object".
pub fn set(obj: Value, key: &[u8], value: Value) -> Result<bool, ObjectError> {
    let mut ptr = object_ptr(obj)?;
    // SAFETY: `object_ptr` only returns pointers to live objects, and
    // nothing else aliases this object for the duration of the call.
    unsafe { ptr.as_mut() }.set(key, value)
}

/// [`Object::set_v`] for a dynamically-tagged target.
pub fn set_v(obj: Value, key: Value, value: Value) -> Result<bool, ObjectError> {
    let mut ptr = object_ptr(obj)?;
    // SAFETY: see `set`.
    unsafe { ptr.as_mut() }.set_v(key, value)
}

/// [`Object::del`] for a dynamically-tagged target.
pub fn del(obj: Value, key: &[u8]) -> Result<Option<Value>, ObjectError> {
    let mut ptr = object_ptr(obj)?;
    // SAFETY: see `set`.
    Ok(unsafe { ptr.as_mut() }.del(key))
}

/// [`Object::del_v`] for a dynamically-tagged target.
pub fn del_v(obj: Value, key: Value) -> Result<Option<Value>, ObjectError> {
    let mut ptr = object_ptr(obj)?;
    // SAFETY: see `set`.
    unsafe { ptr.as_mut() }.del_v(key)
}

fn free_if_heap_string(store: &StringStore, v: Value) {
    if v.tag() == crate::value::Tag::StringHeap {
        // SAFETY: a `StringHeap`-tagged value reachable from an `Object`
        // was always constructed by this crate's own `StringStore`, and is
        // dropped here exactly once: the tree no longer references it after
        // `insert`/`delete` spliced it out.
        unsafe { store.free_heap_string(v) };
    }
}

/// Borrowing iterator over an [`Object`]'s own `(name, value)` pairs, in
/// trie order.
pub struct Properties<'a> {
    inner: PropertyIter,
    _object: std::marker::PhantomData<&'a Object>,
}

impl<'a> Iterator for Properties<'a> {
    type Item = (Value, Value);

    fn next(&mut self) -> Option<Self::Item> {
        let leaf: NodePtr<LeafNode> = self.inner.next()?;
        // SAFETY: the borrow of `Object` behind `'a` keeps the whole tree
        // alive and unmodified for the duration of this iterator.
        let node = unsafe { leaf.as_ref() };
        Some((node.name, node.value))
    }
}

impl Drop for Object {
    fn drop(&mut self) {
        let store = StringStore::new();
        let Some(root) = self.root else { return };
        drop_subtree(root, &store);
    }
}

fn drop_subtree(edge: Edge, store: &StringStore) {
    match edge.classify() {
        nodes::NodeRef::Leaf(leaf) => {
            // SAFETY: `Object::drop` runs at most once and owns its whole
            // tree exclusively; no other reference to this leaf survives it.
            let node = unsafe { leaf.deallocate() };
            free_if_heap_string(store, node.name);
            free_if_heap_string(store, node.value);
        },
        nodes::NodeRef::Inner(inner) => {
            // SAFETY: obtained from classifying a live edge, read before the
            // node itself is freed below.
            let (left, right) = {
                let node = unsafe { inner.as_ref() };
                (node.child[0], node.child[1])
            };
            drop_subtree(left, store);
            drop_subtree(right, store);
            // SAFETY: both children have already been detached (this
            // function never writes back into the tree) and this is the
            // only deallocation of this node.
            unsafe { inner.deallocate() };
        },
    }
}

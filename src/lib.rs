#![deny(
    missing_docs,
    clippy::missing_safety_doc,
    unsafe_op_in_unsafe_fn,
    deprecated_in_future,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    rustdoc::invalid_codeblock_attributes
)]
#![allow(clippy::type_complexity)]

//! Object property storage for an embedded JavaScript-like interpreter.
//!
//! The core data structure is a crit-bit trie keyed on property name bytes,
//! one per [`Object`], with property names and values represented as
//! NaN-boxed [`Value`]s so that numbers, short strings, and object/array/
//! function pointers all fit in one 64-bit word. Properties are addressed
//! either through a typed [`Object`] handle (`get`/`set`/`del` and their
//! `_v` siblings) or, for callers only holding a dynamically-tagged
//! [`Value`], through the free functions of the same names, which check
//! the tag and report [`ObjectError::NotAnObject`] if it isn't one.
//!
//! # Example
//!
//! ```
//! use proptrie::{Object, Value};
//!
//! let mut obj = Object::new();
//! obj.set(b"x", Value::mk_number(1.0)).unwrap();
//! assert_eq!(obj.get(b"x"), Some(Value::mk_number(1.0)));
//! ```

mod error;
mod nodes;
mod object;
mod strings;
mod tagged_pointer;
mod value;

#[doc(hidden)]
pub mod tests_common;

pub use error::{CoercionError, ObjectError};
pub use object::{
    del, del_v, get, get_own, get_v, set, set_v, Object, Properties, MAX_PROTO_DEPTH, PROTO_PROP_NAME,
};
pub use strings::StringStore;
pub use value::{BadPointerError, Rendered, Tag, Value};

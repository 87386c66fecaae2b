//! Error taxonomy for the object property store.
//!
//! `get`/`next` never fail destructively; only `set`/`del`/`get_v` can,
//! and on failure no partial structural change is observable.

use thiserror::Error;

/// Failure produced while coercing a [`Value`](crate::Value) to a string, as
/// required by `to_string(key)` before it can be used as a property name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CoercionError {
    /// The tag has no defined string conversion (objects, arrays, functions,
    /// and foreign pointers do not stringify at this layer; that is the
    /// job of the out-of-scope expression evaluator).
    #[error("value with tag {0:?} cannot be coerced to a string at this layer")]
    NotStringable(crate::value::Tag),
}

/// Failure kinds surfaced by the object surface (`spec.md` §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ObjectError {
    /// The operation's target is not an object (TYPE_ERROR / REFERENCE_ERROR).
    #[error("target is not an object")]
    NotAnObject,
    /// Key-to-string conversion failed.
    #[error("key could not be coerced to a string: {0}")]
    Coercion(#[from] CoercionError),
    /// Node or string allocation failed; the structure is left in its
    /// pre-call state.
    #[error("allocation failed")]
    OutOfMemory,
}

//! Core data structures for the Tinder scripting toolchain.
//!
//! Two pieces:
//! - **Values** (`Value`, `NativeFn`, `ForeignValue`): the dynamically typed
//!   runtime values scripts operate on.
//! - **Crucible**: the hierarchical, access-controlled variable container
//!   shared by compile-time resolution and runtime execution.

mod colors;
mod crucible;
mod error;
mod serialize;
mod value;

#[cfg(test)]
mod crucible_tests;

pub use colors::Colors;
pub use crucible::{Access, Crucible};
pub use error::CrucibleError;
pub use serialize::{ClassRegistry, DeserializeFn, deserialize_value, serialize_value};
pub use value::{ForeignValue, NativeCall, NativeFn, Value, ValueMap};

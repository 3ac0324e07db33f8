//! Tinder: a minimalist declarative scripting language built on the
//! Firestarter PEG engine.
//!
//! Scripts compile into a linear instruction list of kindling operations
//! that runs against a hierarchical, access-controlled Crucible. The
//! runtime is cooperative: scripts suspend by yielding or importing, and
//! the host drives resumption.
//!
//! Typical host flow:
//! 1. Build a [`Tinderstarter`] (optionally seeding the resolver with pure
//!    library exports) and compile sources into [`Tinder`] scripts.
//! 2. Construct a Crucible chain and write the script's jump table into it.
//! 3. Call [`Tinder::run`] in a loop, fulfilling [`RunSignal::Imported`]
//!    through a [`LibraryRegistry`] and feeding input after
//!    [`RunSignal::Yielded`].

mod error;
mod kindling;
mod lang;
mod library;
mod resolver;
mod script;

#[cfg(test)]
mod library_tests;
#[cfg(test)]
mod resolver_tests;

pub use error::{CompileError, RuntimeError, ScriptError};
pub use kindling::{AccessKind, ArgKind, BinaryOp, Kindling, Outcome, Position, UnaryKind};
pub use lang::{DEFAULT_VERSION, GRAMMAR, Tinderstarter};
pub use library::{Library, LibraryError, LibraryRegistry, MathLib};
pub use resolver::Resolver;
pub use script::{RunSignal, Tinder};

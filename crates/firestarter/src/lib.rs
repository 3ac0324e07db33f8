//! Firestarter: a PEG engine and compiler frontend.
//!
//! Firestarter parses grammars-as-text into rule graphs, parses input
//! against those graphs into ASTs, and reduces ASTs into typed operation
//! trees via a registry of operations whose argument schemas drive binding.
//!
//! Typical workflow:
//! 1. Build a [`Grammar`] (directly, or from PEG text via [`make_grammar`]).
//! 2. Register operations against rule identities on a [`Firestarter`].
//! 3. Compile source strings into `(line, operation)` instruction lists.
//! 4. Hand the result to an interpreter or VM for execution.

mod ast;
mod bootstrap;
mod error;
mod grammar;
mod preprocessor;
mod reduce;
mod rules;

#[cfg(test)]
mod grammar_tests;
#[cfg(test)]
mod preprocessor_tests;

pub use ast::{Ast, Match, MatchError, MatchWalk};
pub use bootstrap::{make_grammar, peg_grammar};
pub use error::{FirestarterError, GrammarError, ParseError};
pub use grammar::{Grammar, GrammarFlags};
pub use preprocessor::Preprocessor;
pub use reduce::{ArgSpec, Bound, BuildFn, Firestarter, LeafFn, Operand, Reduced};
pub use rules::RuleId;

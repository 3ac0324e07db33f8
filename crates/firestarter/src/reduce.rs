//! The Firestarter reducer: AST to operation-tree reduction with
//! schema-driven argument binding.
//!
//! Operations register against rule identities in a table mapping each
//! identity to a builder plus a static argument schema
//! (`Required | Optional | Rest` entries over the operation type's own kind
//! descriptor). Primitive rule identities register leaf builders that
//! receive the matched text. A builder may return several nodes; the list
//! flattens into the parent's argument list, or into multiple instructions
//! at the top level.

use indexmap::IndexMap;

use crate::ast::{Ast, Match};
use crate::error::FirestarterError;
use crate::grammar::Grammar;

/// Implemented by operation types the reducer can produce.
pub trait Operand: Clone + std::fmt::Debug {
    /// Type descriptor used in argument schemas.
    type Kind: Copy + std::fmt::Debug + 'static;

    /// Whether this node satisfies the expected kind.
    fn satisfies(&self, kind: Self::Kind) -> bool;

    /// Short display used in binding diagnostics.
    fn describe(&self) -> String {
        format!("{self:?}")
    }
}

/// One entry of an operation's argument schema.
#[derive(Debug, Clone, Copy)]
pub enum ArgSpec<K> {
    /// Takes the next argument; type-checked.
    Required(K),
    /// Missing when fewer arguments than schema slots were supplied; filled
    /// from the registered default at this position, if any.
    Optional(K),
    /// Consumes all remaining arguments; must be the last entry.
    Rest(K),
}

/// An argument bound against one schema entry.
#[derive(Debug, Clone)]
pub enum Bound<T> {
    One(T),
    /// An optional slot with neither argument nor default.
    Missing,
    /// The tail collected by a `Rest` entry.
    Rest(Vec<T>),
}

/// The node(s) a builder produced. `Many` flattens into the parent.
#[derive(Debug, Clone)]
pub enum Reduced<T> {
    One(T),
    Many(Vec<T>),
}

/// Builder for a leaf (primitive-rule) identity: receives the matched text.
pub type LeafFn<T> = fn(&str) -> Result<T, String>;

/// Builder for a composite identity: receives bound arguments.
pub type BuildFn<T> = fn(Vec<Bound<T>>) -> Result<Reduced<T>, String>;

enum Builder<T: Operand> {
    Leaf(LeafFn<T>),
    Node {
        schema: Vec<ArgSpec<T::Kind>>,
        build: BuildFn<T>,
    },
}

struct Opcode<T: Operand> {
    builder: Builder<T>,
    defaults: Option<Vec<T>>,
}

/// Compiler frontend: reduces grammar-parsed ASTs into `(line, operation)`
/// instruction lists via the registered opcode table.
///
/// Type checking of bound arguments is enabled by default; [`strict`] turns
/// it off for permissive reduction.
///
/// [`strict`]: Firestarter::set_strict
pub struct Firestarter<T: Operand> {
    grammar: Grammar,
    opcodes: IndexMap<String, Opcode<T>>,
    strict: bool,
}

impl<T: Operand> Firestarter<T> {
    pub fn new(grammar: Grammar) -> Firestarter<T> {
        Firestarter {
            grammar,
            opcodes: IndexMap::new(),
            strict: true,
        }
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// Enable or disable argument type checking.
    pub fn set_strict(&mut self, strict: bool) -> &mut Self {
        self.strict = strict;
        self
    }

    /// Register a leaf operation for a primitive rule identity.
    pub fn register_leaf(&mut self, name: impl Into<String>, build: LeafFn<T>) -> &mut Self {
        self.opcodes.insert(
            name.into(),
            Opcode {
                builder: Builder::Leaf(build),
                defaults: None,
            },
        );
        self
    }

    /// Register a composite operation with its argument schema.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        schema: Vec<ArgSpec<T::Kind>>,
        build: BuildFn<T>,
    ) -> Result<&mut Self, FirestarterError> {
        let name = name.into();
        let rest_positions: Vec<usize> = schema
            .iter()
            .enumerate()
            .filter(|(_, spec)| matches!(spec, ArgSpec::Rest(_)))
            .map(|(i, _)| i)
            .collect();
        if rest_positions.iter().any(|&i| i + 1 != schema.len()) {
            return Err(FirestarterError::BadSchema(name));
        }
        self.opcodes.insert(
            name,
            Opcode {
                builder: Builder::Node { schema, build },
                defaults: None,
            },
        );
        Ok(self)
    }

    /// Store defaults aligned 1:1 with an operation's schema slots; missing
    /// optional arguments substitute the default at their position.
    pub fn register_defaults(
        &mut self,
        name: &str,
        defaults: Vec<T>,
    ) -> Result<&mut Self, FirestarterError> {
        match self.opcodes.get_mut(name) {
            Some(opcode) => {
                opcode.defaults = Some(defaults);
                Ok(self)
            }
            None => Err(FirestarterError::UnknownOperation(name.to_owned())),
        }
    }

    /// Parse and reduce a source string into `(source_line, operation)`
    /// instructions.
    pub fn compile(&self, source: &str) -> Result<Vec<(usize, T)>, FirestarterError> {
        let ast = self.grammar.parse(source)?;
        self.reduce(&ast)
    }

    /// Reduce an already-parsed AST.
    pub fn reduce(&self, ast: &Ast<'_>) -> Result<Vec<(usize, T)>, FirestarterError> {
        let mut out = Vec::new();
        for (node, line) in ast.matches.iter().zip(&ast.line_numbers) {
            match self.reduce_node(node, ast.source, *line)? {
                Reduced::One(op) => out.push((*line, op)),
                Reduced::Many(ops) => out.extend(ops.into_iter().map(|op| (*line, op))),
            }
        }
        Ok(out)
    }

    fn reduce_node(
        &self,
        node: &Match,
        source: &str,
        line: usize,
    ) -> Result<Reduced<T>, FirestarterError> {
        let identity = node.identity(&self.grammar).unwrap_or("_");
        let Some(opcode) = self.opcodes.get(identity) else {
            return Err(FirestarterError::NotRegistered {
                line,
                name: identity.to_owned(),
            });
        };

        match &opcode.builder {
            Builder::Leaf(build) => build(node.slice(source))
                .map(Reduced::One)
                .map_err(|message| FirestarterError::Bind { line, message }),
            Builder::Node { schema, build } => {
                let mut args = Vec::with_capacity(node.children.len());
                for child in &node.children {
                    match self.reduce_node(child, source, line)? {
                        Reduced::One(op) => args.push(op),
                        Reduced::Many(ops) => args.extend(ops),
                    }
                }
                let bound = self.bind(identity, schema, args, opcode.defaults.as_deref(), line)?;
                build(bound).map_err(|message| FirestarterError::Bind { line, message })
            }
        }
    }

    /// Match reduced children against a schema.
    ///
    /// When fewer arguments than schema slots were supplied, every optional
    /// slot is filled from its default (or left missing) rather than
    /// consuming an argument.
    fn bind(
        &self,
        name: &str,
        schema: &[ArgSpec<T::Kind>],
        args: Vec<T>,
        defaults: Option<&[T]>,
        line: usize,
    ) -> Result<Vec<Bound<T>>, FirestarterError> {
        let short = args.len() < schema.len();
        let mut supply = args.into_iter();
        let mut out = Vec::with_capacity(schema.len());

        for (index, spec) in schema.iter().enumerate() {
            match spec {
                ArgSpec::Optional(kind) if short => {
                    match defaults.and_then(|d| d.get(index)) {
                        Some(default) => {
                            self.check(default, *kind, name, line)?;
                            out.push(Bound::One(default.clone()));
                        }
                        None => out.push(Bound::Missing),
                    }
                }
                ArgSpec::Required(kind) | ArgSpec::Optional(kind) => {
                    let arg = supply.next().ok_or_else(|| FirestarterError::Bind {
                        line,
                        message: format!("missing required argument {index} for {name}"),
                    })?;
                    self.check(&arg, *kind, name, line)?;
                    out.push(Bound::One(arg));
                }
                ArgSpec::Rest(kind) => {
                    let rest: Vec<T> = supply.by_ref().collect();
                    for arg in &rest {
                        self.check(arg, *kind, name, line)?;
                    }
                    out.push(Bound::Rest(rest));
                }
            }
        }

        if supply.next().is_some() {
            return Err(FirestarterError::Bind {
                line,
                message: format!("too many arguments for {name}"),
            });
        }
        Ok(out)
    }

    fn check(
        &self,
        arg: &T,
        kind: T::Kind,
        name: &str,
        line: usize,
    ) -> Result<(), FirestarterError> {
        if !self.strict || arg.satisfies(kind) {
            Ok(())
        } else {
            Err(FirestarterError::Bind {
                line,
                message: format!(
                    "argument {} does not match expected type {:?} for {}",
                    arg.describe(),
                    kind,
                    name
                ),
            })
        }
    }
}

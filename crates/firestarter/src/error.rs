//! Errors raised while building grammars, parsing input, and reducing ASTs.

use std::fmt;

use annotate_snippets::{AnnotationKind, Group, Level, Renderer, Snippet};

/// Errors raised while constructing or resolving a grammar, or by a failed
/// parse (wrapped [`ParseError`]).
#[derive(Debug, Clone, thiserror::Error)]
pub enum GrammarError {
    /// A referenced rule name has no registration.
    #[error("rule '{0}' is missing from the grammar")]
    MissingRule(String),

    /// Reference resolution made no progress over a full pass.
    #[error("circular dependency detected in grammar rules, triggered by '{0}'")]
    CircularDependency(String),

    /// The grammar has no registered root rule.
    #[error("no rules registered in the grammar")]
    Empty,

    /// `parse` was called on a grammar with unresolved references.
    #[error("grammar must be resolved before parsing")]
    Unresolved,

    /// The first registered rule may not be a bare reference.
    #[error("first rule '{0}' cannot be a reference")]
    RootReference(String),

    /// Rule identities are unique within a grammar.
    #[error("rule '{0}' is already registered in the grammar")]
    DuplicateRule(String),

    /// A macro must name a registered rule, once.
    #[error("macro '{0}' references an undefined rule")]
    UnknownMacro(String),

    #[error("macro '{0}' already defined in grammar")]
    DuplicateMacro(String),

    /// A regex primitive failed to compile.
    #[error("invalid pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    /// The grammar definition text was empty or structurally invalid.
    #[error("invalid grammar definition: {0}")]
    InvalidDefinition(String),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// A diagnosed parse failure.
///
/// Built from the deepest [`MatchError`](crate::MatchError) in the
/// backtracking tree: greatest failure position, preferring branches that
/// had already matched something. `Display` produces the compact multi-line
/// form (offending line, caret, matched trail, expectation); [`render`]
/// produces the annotated snippet form.
///
/// [`render`]: ParseError::render
#[derive(Debug, Clone)]
pub struct ParseError {
    /// 1-based source line of the failure.
    pub line: usize,
    /// 1-based column of the failure.
    pub column: usize,
    /// Byte offset of the failure in the source.
    pub offset: usize,
    /// Text of the offending line.
    pub line_text: String,
    /// Identity of the enclosing rule, when one could be named.
    pub rule: Option<String>,
    /// Rule-identity trail of what matched before the failure.
    pub matched: Option<String>,
    /// Expected-token summary, or the rejected token for `unexpected`.
    pub expected: Option<String>,
    /// Set when the failure came from a not-predicate: the token is valid
    /// syntax but invalid here.
    pub unexpected: bool,
}

impl ParseError {
    /// One-line summary used as the snippet annotation label.
    pub fn summary(&self) -> String {
        match (&self.expected, self.unexpected) {
            (Some(token), true) => format!("found {token}, which is invalid here"),
            (Some(token), false) => format!("expected {token}"),
            (None, _) => "could not match here".to_owned(),
        }
    }

    /// Render as an annotated snippet over the full source.
    pub fn render(&self, source: &str, path: Option<&str>, colored: bool) -> String {
        let renderer = if colored {
            Renderer::styled()
        } else {
            Renderer::plain()
        };

        let label = self.summary();
        let start = self.offset.min(source.len());
        let end = (start + 1).min(source.len()).max(start);
        let span = start..end;

        let mut snippet = Snippet::source(source)
            .line_start(1)
            .annotation(AnnotationKind::Primary.span(span).label(&label));
        if let Some(p) = path {
            snippet = snippet.path(p);
        }

        let title = match &self.rule {
            Some(rule) => format!("parse failed in rule '{rule}'"),
            None => "parse failed".to_owned(),
        };
        let report: Vec<Group> = vec![Level::ERROR.primary_title(&title).element(snippet)];
        renderer.render(&report)
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.rule {
            Some(rule) => writeln!(
                f,
                "Error at line {}, column {} in rule '{}':",
                self.line, self.column, rule
            )?,
            None => writeln!(f, "Error at line {}, column {}:", self.line, self.column)?,
        }
        writeln!(f, "{}", self.line_text)?;
        write!(f, "{}^", "-".repeat(self.column.saturating_sub(1)))?;
        if let Some(matched) = &self.matched {
            write!(f, "\nMatched: {matched}")?;
        }
        if let Some(expected) = &self.expected {
            if self.unexpected {
                write!(f, "\nFound {expected}, which is invalid here.")?;
            } else {
                write!(f, "\nExpected: {expected}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}

/// Errors raised while reducing an AST into operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FirestarterError {
    /// An AST node's identity has no registered operation.
    #[error("error on line {line}: operation {name} not registered")]
    NotRegistered { line: usize, name: String },

    /// Argument binding or construction failed for an operation.
    #[error("error on line {line}: {message}")]
    Bind { line: usize, message: String },

    /// A schema placed a `Rest` entry anywhere but last.
    #[error("operation {0}: rest arguments must be the last schema entry")]
    BadSchema(String),

    /// Defaults were registered for an unknown operation.
    #[error("operation {0} not registered")]
    UnknownOperation(String),

    #[error(transparent)]
    Grammar(#[from] GrammarError),
}

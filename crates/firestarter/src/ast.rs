//! Parse results: match trees, match errors, and the AST wrapper.

use tinder_core::Colors;

use crate::grammar::Grammar;
use crate::rules::RuleId;

/// A successful application of a rule to a span of input.
///
/// Matches record byte offsets into the source; the source itself is not
/// stored. `last_error` captures the failure that terminated a repetition,
/// used by later error diagnosis.
#[derive(Debug, Clone)]
pub struct Match {
    pub rule: RuleId,
    pub start: usize,
    pub end: usize,
    pub children: Vec<Match>,
    pub last_error: Option<Box<MatchError>>,
    /// Identity override installed by the `merge` flattening directive.
    pub alias: Option<String>,
}

impl Match {
    pub(crate) fn new(rule: RuleId, start: usize, end: usize, children: Vec<Match>) -> Match {
        Match {
            rule,
            start,
            end,
            children,
            last_error: None,
            alias: None,
        }
    }

    pub(crate) fn with_error(
        rule: RuleId,
        start: usize,
        end: usize,
        children: Vec<Match>,
        last_error: Option<Box<MatchError>>,
    ) -> Match {
        Match {
            rule,
            start,
            end,
            children,
            last_error,
            alias: None,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The matched text from the input.
    pub fn slice<'s>(&self, source: &'s str) -> &'s str {
        if self.start < self.end {
            &source[self.start..self.end]
        } else {
            ""
        }
    }

    /// Effective identity: the merge alias if present, else the rule's name.
    pub fn identity<'a>(&'a self, grammar: &'a Grammar) -> Option<&'a str> {
        self.alias.as_deref().or_else(|| grammar.identity_of(self.rule))
    }

    /// Pre-order walk over this match and all descendants.
    pub fn walk(&self) -> MatchWalk<'_> {
        MatchWalk { stack: vec![self] }
    }
}

pub struct MatchWalk<'a> {
    stack: Vec<&'a Match>,
}

impl<'a> Iterator for MatchWalk<'a> {
    type Item = &'a Match;

    fn next(&mut self) -> Option<&'a Match> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// A failed application of a rule at an input position.
///
/// Errors form a tree mirroring the backtracking search. `matched` records
/// partial successes of the failing rule (sequence prefixes, or the match a
/// not-predicate rejected), which later diagnosis prefers when hunting for
/// the deepest failure.
#[derive(Debug, Clone)]
pub struct MatchError {
    pub pos: usize,
    pub expected: RuleId,
    pub children: Vec<MatchError>,
    pub matched: Vec<Match>,
}

impl MatchError {
    pub(crate) fn leaf(pos: usize, expected: RuleId) -> MatchError {
        MatchError {
            pos,
            expected,
            children: Vec::new(),
            matched: Vec::new(),
        }
    }

    /// The furthest position reached anywhere in this error tree.
    pub fn last_index(&self) -> usize {
        self.children
            .iter()
            .map(MatchError::last_index)
            .max()
            .unwrap_or(self.pos)
    }
}

/// The result of a top-level parse: one match per top-level consumption of
/// the root rule, with the 1-based source line of each.
#[derive(Debug)]
pub struct Ast<'s> {
    pub matches: Vec<Match>,
    pub line_numbers: Vec<usize>,
    pub source: &'s str,
}

impl<'s> Ast<'s> {
    /// The first top-level match, when the parse produced any.
    pub fn first(&self) -> Option<&Match> {
        self.matches.first()
    }

    /// Pre-order walk over every match in the AST.
    pub fn walk(&self) -> impl Iterator<Item = &Match> {
        self.matches.iter().flat_map(Match::walk)
    }

    /// Render the match tree with rule identities and primitive slices.
    pub fn pretty(&self, grammar: &Grammar, colors: Colors) -> String {
        fn render(
            out: &mut String,
            node: &Match,
            ast: &Ast<'_>,
            grammar: &Grammar,
            colors: Colors,
            depth: usize,
        ) {
            let identity = node.identity(grammar).unwrap_or("_");
            out.push_str(&"  ".repeat(depth));
            if grammar.is_primitive(node.rule) {
                out.push_str(&format!(
                    "{}{}{}: {}{:?}{}\n",
                    colors.blue,
                    identity,
                    colors.reset,
                    colors.green,
                    node.slice(ast.source),
                    colors.reset,
                ));
            } else {
                out.push_str(&format!("{}{}{}\n", colors.blue, identity, colors.reset));
            }
            for child in &node.children {
                render(out, child, ast, grammar, colors, depth + 1);
            }
        }

        let mut out = String::new();
        for node in &self.matches {
            render(&mut out, node, self, grammar, colors, 0);
        }
        out
    }
}

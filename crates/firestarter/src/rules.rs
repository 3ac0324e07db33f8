//! PEG rule primitives and the arena-based matching engine.
//!
//! Rules live in an arena keyed by `RuleId`; composites hold child ids, and
//! `Reference` carries a resolved target id after grammar resolution. This
//! keeps self-referential grammars representable without owning cycles.

use regex_automata::meta::Regex;
use regex_automata::{Anchored, Input};

use crate::ast::{Match, MatchError};
use crate::error::GrammarError;

/// Stable index of a rule inside a grammar's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuleId(pub(crate) u32);

/// A compiled regex primitive, keeping the pattern text for display.
#[derive(Debug, Clone)]
pub(crate) struct PatternRule {
    regex: Regex,
    pub(crate) source: String,
}

impl PatternRule {
    pub(crate) fn new(pattern: &str) -> Result<PatternRule, GrammarError> {
        let regex = Regex::new(pattern).map_err(|err| GrammarError::Pattern {
            pattern: pattern.to_owned(),
            message: err.to_string(),
        })?;
        Ok(PatternRule {
            regex,
            source: pattern.to_owned(),
        })
    }

    /// Anchored match at `pos`; returns the end offset on success.
    fn find_at(&self, input: &str, pos: usize) -> Option<usize> {
        self.regex
            .find(Input::new(input).range(pos..).anchored(Anchored::Yes))
            .map(|m| m.end())
    }
}

/// Whitespace class skipped between primitive matches.
#[derive(Debug, Clone)]
pub(crate) struct SkipPattern {
    regex: Regex,
}

impl SkipPattern {
    pub(crate) fn new(pattern: &str) -> SkipPattern {
        // The skip classes are fixed pattern constants; they always compile.
        let regex = Regex::new(pattern).expect("skip classes are valid patterns");
        SkipPattern { regex }
    }

    fn advance(&self, input: &str, pos: usize) -> usize {
        self.regex
            .find(Input::new(input).range(pos..).anchored(Anchored::Yes))
            .map(|m| m.end())
            .unwrap_or(pos)
    }

    /// Whether the rest of the input is entirely skippable.
    pub(crate) fn covers(&self, input: &str, pos: usize) -> bool {
        self.advance(input, pos) == input.len()
    }
}

#[derive(Debug, Clone)]
pub(crate) enum RuleKind {
    Literal(String),
    Pattern(PatternRule),
    Reference {
        name: String,
        target: Option<RuleId>,
    },
    Sequence(Vec<RuleId>),
    Choice(Vec<RuleId>),
    ZeroOrMore(RuleId),
    OneOrMore(RuleId),
    Optional(RuleId),
    AndPredicate(RuleId),
    NotPredicate(RuleId),
}

#[derive(Debug, Clone)]
pub(crate) struct Rule {
    pub(crate) kind: RuleKind,
    pub(crate) identity: Option<String>,
    /// Suspends whitespace-skipping for this rule and its descendants.
    pub(crate) strict: bool,
}

impl Rule {
    fn new(kind: RuleKind) -> Rule {
        Rule {
            kind,
            identity: None,
            strict: false,
        }
    }
}

/// Arena of rules plus the matching engine.
#[derive(Debug, Clone, Default)]
pub(crate) struct Arena {
    rules: Vec<Rule>,
}

impl Arena {
    pub(crate) fn push(&mut self, kind: RuleKind) -> RuleId {
        let id = RuleId(self.rules.len() as u32);
        self.rules.push(Rule::new(kind));
        id
    }

    pub(crate) fn get(&self, id: RuleId) -> &Rule {
        &self.rules[id.0 as usize]
    }

    pub(crate) fn get_mut(&mut self, id: RuleId) -> &mut Rule {
        &mut self.rules[id.0 as usize]
    }

    pub(crate) fn len(&self) -> usize {
        self.rules.len()
    }

    pub(crate) fn ids(&self) -> impl Iterator<Item = RuleId> {
        (0..self.rules.len() as u32).map(RuleId)
    }

    /// Apply `id` to the input at `pos`.
    ///
    /// Whitespace skipping happens at the primitive level: if the skip class
    /// matches at `pos`, the position advances past it before the primitive's
    /// own attempt. Strict rules suspend skipping for themselves and all
    /// descendants.
    pub(crate) fn consume(
        &self,
        id: RuleId,
        input: &str,
        pos: usize,
        skip: Option<&SkipPattern>,
    ) -> Result<Match, Box<MatchError>> {
        let rule = self.get(id);
        let skip = if rule.strict { None } else { skip };

        match &rule.kind {
            RuleKind::Literal(text) => {
                let at = skip.map_or(pos, |s| s.advance(input, pos));
                if at < input.len() && input[at..].starts_with(text.as_str()) {
                    Ok(Match::new(id, at, at + text.len(), Vec::new()))
                } else {
                    Err(Box::new(MatchError::leaf(at, id)))
                }
            }
            RuleKind::Pattern(pattern) => {
                let at = skip.map_or(pos, |s| s.advance(input, pos));
                match pattern.find_at(input, at) {
                    Some(end) => Ok(Match::new(id, at, end, Vec::new())),
                    None => Err(Box::new(MatchError::leaf(at, id))),
                }
            }
            RuleKind::Reference { name, target } => match target {
                Some(target) => self.consume(*target, input, pos, skip),
                None => unreachable!("unresolved rule reference '{name}' consumed"),
            },
            RuleKind::Sequence(children) => {
                let mut matches = Vec::with_capacity(children.len());
                let mut at = pos;
                for child in children {
                    match self.consume(*child, input, at, skip) {
                        Ok(m) => {
                            at = m.end;
                            matches.push(m);
                        }
                        Err(e) => {
                            return Err(Box::new(MatchError {
                                pos: at,
                                expected: id,
                                children: vec![*e],
                                matched: matches,
                            }));
                        }
                    }
                }
                Ok(Match::new(id, pos, at, matches))
            }
            RuleKind::Choice(children) => {
                let mut failures = Vec::new();
                for child in children {
                    match self.consume(*child, input, pos, skip) {
                        Ok(m) => {
                            return Ok(Match::new(id, m.start, m.end, vec![m]));
                        }
                        Err(e) => failures.push(*e),
                    }
                }
                Err(Box::new(MatchError {
                    pos,
                    expected: id,
                    children: failures,
                    matched: Vec::new(),
                }))
            }
            RuleKind::ZeroOrMore(child) => {
                let (matches, end, last_error) = self.repeat(*child, input, pos, skip);
                Ok(Match::with_error(id, pos, end, matches, last_error))
            }
            RuleKind::OneOrMore(child) => {
                let (matches, end, last_error) = self.repeat(*child, input, pos, skip);
                if matches.is_empty() {
                    let children = last_error.map(|e| vec![*e]).unwrap_or_default();
                    return Err(Box::new(MatchError {
                        pos,
                        expected: id,
                        children,
                        matched: Vec::new(),
                    }));
                }
                Ok(Match::with_error(id, pos, end, matches, last_error))
            }
            RuleKind::Optional(child) => match self.consume(*child, input, pos, skip) {
                Ok(m) => Ok(Match::new(id, m.start, m.end, vec![m])),
                Err(e) => Ok(Match::with_error(id, pos, pos, Vec::new(), Some(e))),
            },
            RuleKind::AndPredicate(child) => match self.consume(*child, input, pos, skip) {
                Ok(_) => Ok(Match::new(id, pos, pos, Vec::new())),
                Err(e) => Err(Box::new(MatchError {
                    pos,
                    expected: id,
                    children: vec![*e],
                    matched: Vec::new(),
                })),
            },
            RuleKind::NotPredicate(child) => match self.consume(*child, input, pos, skip) {
                Ok(m) => Err(Box::new(MatchError {
                    pos,
                    expected: id,
                    children: Vec::new(),
                    matched: vec![m],
                })),
                Err(e) => Ok(Match::with_error(id, pos, pos, Vec::new(), Some(e))),
            },
        }
    }

    /// Greedy repetition: consume until the child fails, the input ends, or
    /// a zero-width match would loop.
    fn repeat(
        &self,
        child: RuleId,
        input: &str,
        pos: usize,
        skip: Option<&SkipPattern>,
    ) -> (Vec<Match>, usize, Option<Box<MatchError>>) {
        let mut matches = Vec::new();
        let mut at = pos;
        let mut last_error = None;
        while at < input.len() {
            match self.consume(child, input, at, skip) {
                Ok(m) => {
                    let end = m.end;
                    matches.push(m);
                    if end == at {
                        break;
                    }
                    at = end;
                }
                Err(e) => {
                    last_error = Some(e);
                    break;
                }
            }
        }
        (matches, at, last_error)
    }
}

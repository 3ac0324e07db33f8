//! Grammar: a registry of named rules with resolution, parsing, and AST
//! post-processing.

use std::collections::HashSet;
use std::ops::BitOr;

use indexmap::IndexMap;

use crate::ast::{Ast, Match, MatchError};
use crate::error::{GrammarError, ParseError};
use crate::rules::{Arena, PatternRule, RuleId, RuleKind, SkipPattern};

/// Grammar behavior flags: which whitespace class is auto-skipped between
/// primitive matches, and whether AST flattening is applied after parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GrammarFlags(u8);

impl GrammarFlags {
    pub const NONE: GrammarFlags = GrammarFlags(0);
    /// Skip spaces and tabs.
    pub const SKIP_SPACES: GrammarFlags = GrammarFlags(0x01);
    /// Skip newlines.
    pub const SKIP_NEWLINES: GrammarFlags = GrammarFlags(0x02);
    /// Skip all whitespace including newlines.
    pub const SKIP_WHITESPACE: GrammarFlags = GrammarFlags(0x03);
    /// Apply discard/hoist/merge/conditional flattening to the AST.
    pub const FLATTEN: GrammarFlags = GrammarFlags(0x04);

    pub fn contains(self, other: GrammarFlags) -> bool {
        self.0 & other.0 == other.0
    }

    fn skip_class(self) -> Option<&'static str> {
        match self.0 & 0x03 {
            0 => None,
            1 => Some(r"[ \t]+"),
            2 => Some(r"\n|\r\n|\r"),
            _ => Some(r"\s+"),
        }
    }
}

impl BitOr for GrammarFlags {
    type Output = GrammarFlags;

    fn bitor(self, rhs: GrammarFlags) -> GrammarFlags {
        GrammarFlags(self.0 | rhs.0)
    }
}

/// A grammar definition: rule arena, name registry, skip behavior, and
/// post-parse directives.
///
/// Rules are built through the arena methods (`literal`, `pattern`,
/// `sequence`, ...), registered under names with [`register`], and fixed up
/// with [`resolve`] before parsing. The first registered rule is the root.
///
/// [`register`]: Grammar::register
/// [`resolve`]: Grammar::resolve
#[derive(Debug, Clone)]
pub struct Grammar {
    arena: Arena,
    root: Option<RuleId>,
    rules: IndexMap<String, RuleId>,
    flags: GrammarFlags,
    skip: Option<SkipPattern>,
    discard: HashSet<String>,
    hoist: HashSet<String>,
    merge: HashSet<String>,
    conditional: HashSet<String>,
    macros: IndexMap<String, String>,
    dirty: bool,
}

impl Grammar {
    pub fn new(flags: GrammarFlags) -> Grammar {
        Grammar {
            arena: Arena::default(),
            root: None,
            rules: IndexMap::new(),
            flags,
            skip: flags.skip_class().map(SkipPattern::new),
            discard: HashSet::new(),
            hoist: HashSet::new(),
            merge: HashSet::new(),
            conditional: HashSet::new(),
            macros: IndexMap::new(),
            dirty: false,
        }
    }

    pub fn flags(&self) -> GrammarFlags {
        self.flags
    }

    // ------------------------------------------------------------------
    // Rule construction
    // ------------------------------------------------------------------

    pub fn literal(&mut self, text: impl Into<String>) -> RuleId {
        self.arena.push(RuleKind::Literal(text.into()))
    }

    pub fn pattern(&mut self, pattern: &str) -> Result<RuleId, GrammarError> {
        let rule = PatternRule::new(pattern)?;
        Ok(self.arena.push(RuleKind::Pattern(rule)))
    }

    pub fn reference(&mut self, name: impl Into<String>) -> RuleId {
        self.dirty = true;
        self.arena.push(RuleKind::Reference {
            name: name.into(),
            target: None,
        })
    }

    pub fn sequence(&mut self, children: Vec<RuleId>) -> RuleId {
        self.arena.push(RuleKind::Sequence(children))
    }

    pub fn choice(&mut self, children: Vec<RuleId>) -> RuleId {
        self.arena.push(RuleKind::Choice(children))
    }

    pub fn zero_or_more(&mut self, child: RuleId) -> RuleId {
        self.arena.push(RuleKind::ZeroOrMore(child))
    }

    pub fn one_or_more(&mut self, child: RuleId) -> RuleId {
        self.arena.push(RuleKind::OneOrMore(child))
    }

    pub fn optional(&mut self, child: RuleId) -> RuleId {
        self.arena.push(RuleKind::Optional(child))
    }

    pub fn and_predicate(&mut self, child: RuleId) -> RuleId {
        self.arena.push(RuleKind::AndPredicate(child))
    }

    pub fn not_predicate(&mut self, child: RuleId) -> RuleId {
        self.arena.push(RuleKind::NotPredicate(child))
    }

    /// Mark a rule strict: whitespace skipping is suspended for it and all
    /// of its descendants during matching.
    pub fn strict(&mut self, id: RuleId) {
        self.arena.get_mut(id).strict = true;
    }

    // ------------------------------------------------------------------
    // Registration and directives
    // ------------------------------------------------------------------

    /// Record a rule under a name. The first registered rule becomes the
    /// grammar's root. Identities are unique within a grammar.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        id: RuleId,
    ) -> Result<&mut Self, GrammarError> {
        let name = name.into();
        if self.rules.contains_key(&name) || self.arena.get(id).identity.is_some() {
            return Err(GrammarError::DuplicateRule(name));
        }
        if self.root.is_none() {
            if matches!(self.arena.get(id).kind, RuleKind::Reference { .. }) {
                return Err(GrammarError::RootReference(name));
            }
            self.root = Some(id);
        }
        self.arena.get_mut(id).identity = Some(name.clone());
        self.rules.insert(name, id);
        self.dirty = true;
        Ok(self)
    }

    pub fn rule_id(&self, name: &str) -> Option<RuleId> {
        self.rules.get(name).copied()
    }

    pub fn identity_of(&self, id: RuleId) -> Option<&str> {
        self.arena.get(id).identity.as_deref()
    }

    /// Literal and regex rules produce leaf matches whose text slice is the
    /// reducer's argument.
    pub fn is_primitive(&self, id: RuleId) -> bool {
        matches!(
            self.arena.get(id).kind,
            RuleKind::Literal(_) | RuleKind::Pattern(_)
        )
    }

    /// Drop these nodes entirely from the AST.
    pub fn discard(&mut self, name: impl Into<String>) -> &mut Self {
        self.discard.insert(name.into());
        self
    }

    /// Replace these nodes with their children in place.
    pub fn hoist(&mut self, name: impl Into<String>) -> &mut Self {
        self.hoist.insert(name.into());
        self
    }

    /// Replace the node with its first child, retaining the node's identity.
    pub fn merge(&mut self, name: impl Into<String>) -> &mut Self {
        self.merge.insert(name.into());
        self
    }

    /// Replace the node with its single child when it has exactly one.
    pub fn conditional(&mut self, name: impl Into<String>) -> &mut Self {
        self.conditional.insert(name.into());
        self
    }

    /// Register the display text used in "Expected X" diagnostics for a rule.
    pub fn macro_text(
        &mut self,
        name: impl Into<String>,
        text: impl Into<String>,
    ) -> Result<&mut Self, GrammarError> {
        let name = name.into();
        if !self.rules.contains_key(&name) {
            return Err(GrammarError::UnknownMacro(name));
        }
        if self.macros.contains_key(&name) {
            return Err(GrammarError::DuplicateMacro(name));
        }
        self.macros.insert(name, text.into());
        Ok(self)
    }

    // ------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------

    /// Resolve every rule reference to its registered target.
    ///
    /// References whose target is itself a still-unresolved reference are
    /// deferred and retried; a full pass without progress while references
    /// remain is a circular dependency.
    pub fn resolve(&mut self) -> Result<&mut Self, GrammarError> {
        loop {
            let mut progress = false;
            let mut deferred: Option<String> = None;
            let ids: Vec<RuleId> = self.arena.ids().collect();
            for id in ids {
                let name = match &self.arena.get(id).kind {
                    RuleKind::Reference { name, target: None } => name.clone(),
                    _ => continue,
                };
                let Some(&target) = self.rules.get(&name) else {
                    return Err(GrammarError::MissingRule(name));
                };
                let target_unresolved = matches!(
                    self.arena.get(target).kind,
                    RuleKind::Reference { target: None, .. }
                );
                if target == id || target_unresolved {
                    deferred = Some(name);
                    continue;
                }
                if let RuleKind::Reference { target: slot, .. } = &mut self.arena.get_mut(id).kind {
                    *slot = Some(target);
                }
                progress = true;
            }
            match deferred {
                None => break,
                Some(name) if !progress => {
                    return Err(GrammarError::CircularDependency(name));
                }
                Some(_) => {}
            }
        }
        self.dirty = false;
        Ok(self)
    }

    pub fn is_resolved(&self) -> bool {
        !self.dirty
    }

    // ------------------------------------------------------------------
    // Parsing
    // ------------------------------------------------------------------

    /// Parse the input by repeatedly consuming the root rule, then apply
    /// flattening and compute per-match line numbers.
    pub fn parse<'s>(&self, input: &'s str) -> Result<Ast<'s>, GrammarError> {
        let root = self.root.ok_or(GrammarError::Empty)?;
        if self.dirty {
            return Err(GrammarError::Unresolved);
        }

        let skip = self.skip.as_ref();
        let mut matches: Vec<Match> = Vec::new();
        let mut pos = 0;
        while pos < input.len() {
            match self.arena.consume(root, input, pos, skip) {
                Ok(m) => {
                    if m.is_empty() {
                        // Trailing text the skip class fully covers is done.
                        if let Some(s) = skip
                            && s.covers(input, pos)
                        {
                            break;
                        }
                        // A zero-length top-level match would loop forever;
                        // surface the failure that stopped it from advancing.
                        let error = m
                            .last_error
                            .map(|e| *e)
                            .unwrap_or_else(|| MatchError::leaf(pos, root));
                        return Err(GrammarError::Parse(self.diagnose(input, &error)));
                    }
                    pos = m.end;
                    matches.push(m);
                }
                Err(error) => {
                    // Prefer the repetition-terminating error recorded on the
                    // previous match when it reached deeper into the input.
                    let previous = matches.last().and_then(|m| m.last_error.as_deref());
                    let chosen = match previous {
                        Some(p) if p.last_index() >= error.last_index() => p,
                        _ => &*error,
                    };
                    return Err(GrammarError::Parse(self.diagnose(input, chosen)));
                }
            }
        }

        if self.flags.contains(GrammarFlags::FLATTEN) {
            matches = matches
                .into_iter()
                .flat_map(|m| self.flatten(m))
                .collect();
        }

        let line_numbers = matches
            .iter()
            .map(|m| input[..m.start.min(input.len())].matches('\n').count() + 1)
            .collect();

        Ok(Ast {
            matches,
            line_numbers,
            source: input,
        })
    }

    /// Flatten one match per the post-parse directives: merge rewraps the
    /// first child under the parent's identity, unnamed and hoisted nodes
    /// are replaced by their children, discarded nodes vanish, and
    /// conditional nodes collapse when they have exactly one child.
    fn flatten(&self, mut node: Match) -> Vec<Match> {
        if let Some(name) = node.identity(self).map(str::to_owned)
            && self.merge.contains(&name)
            && !node.children.is_empty()
        {
            let mut first = node.children.remove(0);
            first.alias = Some(name);
            node = first;
        }

        let children = std::mem::take(&mut node.children);
        let mut flattened = Vec::with_capacity(children.len());
        for child in children {
            flattened.extend(self.flatten(child));
        }
        node.children = flattened;

        match node.identity(self).map(str::to_owned) {
            None => node.children,
            Some(name) if self.hoist.contains(&name) => node.children,
            Some(name) if self.discard.contains(&name) => Vec::new(),
            Some(name) if self.conditional.contains(&name) && node.children.len() == 1 => {
                node.children
            }
            Some(_) => vec![node],
        }
    }

    // ------------------------------------------------------------------
    // Diagnosis
    // ------------------------------------------------------------------

    /// Build a [`ParseError`] from a match-error tree: find the deepest
    /// failure, recover the matched-rule trail, and summarize what was
    /// expected at that position.
    fn diagnose(&self, input: &str, error: &MatchError) -> ParseError {
        let error = deepest_failure(error);
        let pos = error.last_index();
        let (line, column, line_text) = line_info(input, pos);

        let (path, deepest) = deepest_matched(error);

        let matched = deepest.matched.last().and_then(|m| {
            let mut parts: Vec<&str> = Vec::new();
            for node in m.walk() {
                if let Some(identity) = node.identity(self)
                    && !self.hoist.contains(identity)
                {
                    parts.push(identity);
                }
            }
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(" -> "))
            }
        });

        // Descend the failure chain: a sequence or repetition error wraps
        // the child failure that stopped it, and that child names the
        // tokens actually expected.
        let mut focus = deepest;
        while matches!(
            self.arena_kind(focus.expected),
            RuleKind::Sequence(_) | RuleKind::OneOrMore(_) | RuleKind::ZeroOrMore(_)
        ) {
            let Some(next) = focus.children.iter().max_by_key(|c| c.last_index()) else {
                break;
            };
            focus = next;
        }

        // Drill predicates and wrappers down to the rule whose tokens were
        // actually expected.
        let mut unexpected = false;
        let mut expected_id = focus.expected;
        loop {
            match &self.arena_kind(expected_id) {
                RuleKind::NotPredicate(inner) => {
                    unexpected = true;
                    expected_id = *inner;
                }
                RuleKind::AndPredicate(inner) => expected_id = *inner,
                RuleKind::Reference {
                    target: Some(inner),
                    ..
                } => expected_id = *inner,
                RuleKind::ZeroOrMore(inner)
                | RuleKind::OneOrMore(inner)
                | RuleKind::Optional(inner) => expected_id = *inner,
                _ => break,
            }
        }
        let expected = Some(self.expected_display(expected_id));

        // Walk back up the failure trace to name the enclosing rule.
        let rule = std::iter::once(deepest)
            .chain(path.iter().rev().copied())
            .find(|err| {
                !self.is_primitive(err.expected)
                    && !matches!(
                        self.arena_kind(err.expected),
                        RuleKind::AndPredicate(_) | RuleKind::NotPredicate(_)
                    )
                    && self.identity_of(err.expected).is_some()
            })
            .and_then(|err| self.identity_of(err.expected))
            .map(str::to_owned);

        ParseError {
            line,
            column,
            offset: pos.min(input.len()),
            line_text,
            rule,
            matched,
            expected,
            unexpected,
        }
    }

    fn arena_kind(&self, id: RuleId) -> &RuleKind {
        &self.arena().get(id).kind
    }

    pub(crate) fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Display text for an expectation: the registered macro when one
    /// exists, else the literal text, pattern source, or rule identity.
    fn expected_display(&self, id: RuleId) -> String {
        if let Some(identity) = self.identity_of(id)
            && let Some(text) = self.macros.get(identity)
        {
            return text.clone();
        }
        match self.arena_kind(id) {
            RuleKind::Literal(text) => format!("'{text}'"),
            RuleKind::Pattern(pattern) => match self.identity_of(id) {
                Some(identity) => format!("'{identity}'"),
                None => pattern.source.clone(),
            },
            RuleKind::Reference {
                target: Some(target),
                ..
            } => self.expected_display(*target),
            RuleKind::Choice(children) => {
                let parts: Vec<String> = children
                    .iter()
                    .map(|c| self.expected_display(*c))
                    .collect();
                match parts.as_slice() {
                    [] => "nothing".to_owned(),
                    [single] => single.clone(),
                    [init @ .., last] => format!("{} or {}", init.join(", "), last),
                }
            }
            _ => match self.identity_of(id) {
                Some(identity) => format!("'{identity}'"),
                None => "expression".to_owned(),
            },
        }
    }
}

/// 1-based line and column plus the text of the offending line.
fn line_info(input: &str, pos: usize) -> (usize, usize, String) {
    let clamped = pos.min(input.len());
    let line = input[..clamped].matches('\n').count() + 1;
    let line_start = input[..clamped].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let line_end = input[clamped..]
        .find('\n')
        .map(|i| clamped + i)
        .unwrap_or(input.len());
    let column = clamped - line_start + 1;
    (line, column, input[line_start..line_end].to_owned())
}

/// The most advanced failure reachable through an error tree, including
/// failures recorded on the partial matches of repetitions, optionals, and
/// not-predicates.
fn deepest_failure(error: &MatchError) -> &MatchError {
    let mut best = error;
    let mut stack = vec![error];
    while let Some(err) = stack.pop() {
        if err.last_index() > best.last_index() {
            best = err;
        }
        stack.extend(err.children.iter());
        for matched in &err.matched {
            for node in matched.walk() {
                if let Some(recorded) = &node.last_error {
                    stack.push(recorded);
                }
            }
        }
    }
    best
}

/// Find the deepest error carrying a matched prefix (greatest position),
/// plus the path of ancestors leading to it. Falls back to the root error.
fn deepest_matched(root: &MatchError) -> (Vec<&MatchError>, &MatchError) {
    fn search<'a>(
        err: &'a MatchError,
        trail: &mut Vec<&'a MatchError>,
        best: &mut Option<(Vec<&'a MatchError>, &'a MatchError)>,
    ) {
        if !err.matched.is_empty() {
            let better = best.as_ref().is_none_or(|(_, found)| err.pos > found.pos);
            if better {
                *best = Some((trail.clone(), err));
            }
        }
        trail.push(err);
        for child in &err.children {
            search(child, trail, best);
        }
        trail.pop();
    }

    let mut best = None;
    let mut trail = Vec::new();
    search(root, &mut trail, &mut best);
    best.unwrap_or((Vec::new(), root))
}

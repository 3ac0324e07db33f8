//! Grammar-from-text: a bootstrap PEG grammar that parses external PEG
//! definitions into [`Grammar`] objects.
//!
//! A grammar text is newline-separated rule definitions and comments:
//!
//! ```text
//! Name <- Expression            # trailing comment = macro text
//! Scaffold -> "(" Expression ")"
//! Junk -- ~"[^\n]*"
//! ```
//!
//! The priority marker encodes the rule's post-processing directive:
//! `<-` none, `--` discard, `->` hoist, `<>` merge, `~>` conditional.
//! `[Name]` in place of the name marks the rule strict. Expressions use `/`
//! for ordered choice, juxtaposition for sequence, `()` grouping, `* + ?`
//! quantifiers, `& !` predicates, quoted literals, and `~"..."` regexes.

use std::sync::LazyLock;

use crate::ast::Match;
use crate::error::GrammarError;
use crate::grammar::{Grammar, GrammarFlags};
use crate::rules::RuleId;

static PEG: LazyLock<Grammar> =
    LazyLock::new(|| build_peg().expect("bootstrap grammar is well-formed"));

/// The bootstrap grammar for PEG definition texts.
pub fn peg_grammar() -> &'static Grammar {
    &PEG
}

fn build_peg() -> Result<Grammar, GrammarError> {
    let mut g = Grammar::new(GrammarFlags::SKIP_SPACES | GrammarFlags::FLATTEN);

    let rule = g.reference("Rule");
    let newline = g.reference("Newline");
    let comment = g.reference("Comment");
    let item = g.choice(vec![rule, newline, comment]);
    let grammar = g.one_or_more(item);
    g.register("Grammar", grammar)?;

    let strict = g.reference("Strict");
    let identifier = g.reference("Identifier");
    let head = g.choice(vec![strict, identifier]);
    let priority = g.reference("Priority");
    let expression = g.reference("Expression");
    let trailing_comment = g.reference("Comment");
    let trailing = g.optional(trailing_comment);
    let rule_seq = g.sequence(vec![head, priority, expression, trailing]);
    g.register("Rule", rule_seq)?;

    let keep = g.literal("<-");
    let drop = g.literal("--");
    let lift = g.literal("->");
    let merge = g.literal("<>");
    let collapse = g.literal("~>");
    let priority_rule = g.choice(vec![keep, drop, lift, merge, collapse]);
    g.register("Priority", priority_rule)?;

    let hash = g.literal("#");
    let to_eol = g.pattern("[^\n]*")?;
    let comment_seq = g.sequence(vec![hash, to_eol]);
    g.register("Comment", comment_seq)?;

    let expression_alias = g.reference("Choice");
    g.register("Expression", expression_alias)?;

    let first_seq = g.reference("Sequence");
    let slash = g.literal("/");
    let alt_seq = g.reference("Sequence");
    let alt = g.sequence(vec![slash, alt_seq]);
    let alts = g.zero_or_more(alt);
    let choice_rule = g.sequence(vec![first_seq, alts]);
    g.register("Choice", choice_rule)?;

    let prefix = g.reference("Prefix");
    let suffix = g.reference("Suffix");
    let term = g.choice(vec![prefix, suffix]);
    let sequence_rule = g.zero_or_more(term);
    g.register("Sequence", sequence_rule)?;

    let primary = g.reference("Primary");
    let quantifier = g.reference("Quantifier");
    let quantifier_opt = g.optional(quantifier);
    let prefix_rule = g.sequence(vec![primary, quantifier_opt]);
    g.register("Prefix", prefix_rule)?;

    let predicate = g.reference("Predicate");
    let predicated = g.reference("Primary");
    let suffix_rule = g.sequence(vec![predicate, predicated]);
    g.register("Suffix", suffix_rule)?;

    let string = g.reference("String");
    let regex = g.reference("RegEx");
    let ident = g.reference("Identifier");
    let group = g.reference("Group");
    let primary_rule = g.choice(vec![string, regex, ident, group]);
    g.register("Primary", primary_rule)?;

    let open = g.literal("(");
    let grouped = g.reference("Expression");
    let close = g.literal(")");
    let group_rule = g.sequence(vec![open, grouped, close]);
    g.register("Group", group_rule)?;

    let and = g.literal("&");
    let not = g.literal("!");
    let predicate_rule = g.choice(vec![and, not]);
    g.register("Predicate", predicate_rule)?;

    let star = g.literal("*");
    let plus = g.literal("+");
    let opt = g.literal("?");
    let quantifier_rule = g.choice(vec![star, plus, opt]);
    g.register("Quantifier", quantifier_rule)?;

    let string_rule = g.pattern(r#""(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*'"#)?;
    g.register("String", string_rule)?;

    let regex_rule = g.pattern(r#"~"(?:[^"\\]|\\.)*"|~'(?:[^'\\]|\\.)*'"#)?;
    g.register("RegEx", regex_rule)?;

    let bracket_open = g.literal("[");
    let strict_name = g.reference("Identifier");
    let bracket_close = g.literal("]");
    let strict_rule = g.sequence(vec![bracket_open, strict_name, bracket_close]);
    g.register("Strict", strict_rule)?;

    let identifier_rule = g.pattern(r"[a-zA-Z_][a-zA-Z0-9_]*(?:\.[a-zA-Z_][a-zA-Z0-9_]*)*")?;
    g.register("Identifier", identifier_rule)?;

    let newline_rule = g.pattern(r"\n|\r\n|\r")?;
    g.register("Newline", newline_rule)?;

    g.discard("Newline");
    g.resolve()?;
    Ok(g)
}

/// Parse a PEG definition text into a resolved [`Grammar`] with the given
/// flags.
pub fn make_grammar(text: &str, flags: GrammarFlags) -> Result<Grammar, GrammarError> {
    if text.trim().is_empty() {
        return Err(GrammarError::InvalidDefinition(
            "empty grammar definition".to_owned(),
        ));
    }

    let peg = peg_grammar();
    let ast = peg.parse(text)?;
    let Some(root) = ast.first() else {
        return Err(GrammarError::InvalidDefinition(
            "no rules found in grammar definition".to_owned(),
        ));
    };

    let mut out = Grammar::new(flags);
    for node in &root.children {
        match node.identity(peg) {
            Some("Comment") => continue,
            Some("Rule") => visit_rule(node, text, peg, &mut out)?,
            other => {
                return Err(GrammarError::InvalidDefinition(format!(
                    "unexpected node '{}' in grammar definition",
                    other.unwrap_or("_")
                )));
            }
        }
    }
    out.resolve()?;
    Ok(out)
}

fn visit_rule(
    node: &Match,
    text: &str,
    peg: &Grammar,
    out: &mut Grammar,
) -> Result<(), GrammarError> {
    let mut children = node.children.iter();
    let head = children
        .next()
        .ok_or_else(|| GrammarError::InvalidDefinition("rule without a name".to_owned()))?;
    let (name, strict) = match head.identity(peg) {
        Some("Strict") => {
            let inner = head.children.first().ok_or_else(|| {
                GrammarError::InvalidDefinition("strict marker without a name".to_owned())
            })?;
            (inner.slice(text).to_owned(), true)
        }
        _ => (head.slice(text).to_owned(), false),
    };

    let priority = children
        .next()
        .map(|p| p.slice(text))
        .ok_or_else(|| GrammarError::InvalidDefinition(format!("rule '{name}' has no priority")))?
        .to_owned();

    let expression = children.next().ok_or_else(|| {
        GrammarError::InvalidDefinition(format!("rule '{name}' has no expression"))
    })?;
    let id = visit_expression(expression, text, peg, out)?;
    if strict {
        out.strict(id);
    }
    out.register(name.clone(), id)?;

    match priority.as_str() {
        "<-" => {}
        "--" => {
            out.discard(name.clone());
        }
        "->" => {
            out.hoist(name.clone());
        }
        "<>" => {
            out.merge(name.clone());
        }
        "~>" => {
            out.conditional(name.clone());
        }
        other => {
            return Err(GrammarError::InvalidDefinition(format!(
                "unknown priority '{other}' on rule '{name}'"
            )));
        }
    }

    if let Some(comment) = children.next() {
        let macro_text = comment
            .slice(text)
            .strip_prefix('#')
            .unwrap_or_default()
            .trim();
        if !macro_text.is_empty() {
            out.macro_text(name, macro_text)?;
        }
    }
    Ok(())
}

fn visit_expression(
    node: &Match,
    text: &str,
    peg: &Grammar,
    out: &mut Grammar,
) -> Result<RuleId, GrammarError> {
    let first_child = |node: &Match| -> Result<usize, GrammarError> {
        if node.children.is_empty() {
            Err(GrammarError::InvalidDefinition(
                "empty expression in grammar definition".to_owned(),
            ))
        } else {
            Ok(0)
        }
    };

    match node.identity(peg) {
        Some("Choice") => {
            let mut ids = Vec::with_capacity(node.children.len());
            for child in &node.children {
                ids.push(visit_expression(child, text, peg, out)?);
            }
            match ids.len() {
                1 => Ok(ids.remove(0)),
                _ => Ok(out.choice(ids)),
            }
        }
        Some("Sequence") => {
            let mut ids = Vec::with_capacity(node.children.len());
            for child in &node.children {
                ids.push(visit_expression(child, text, peg, out)?);
            }
            match ids.len() {
                1 => Ok(ids.remove(0)),
                _ => Ok(out.sequence(ids)),
            }
        }
        Some("Prefix") => {
            let index = first_child(node)?;
            let primary = visit_expression(&node.children[index], text, peg, out)?;
            match node.children.get(1) {
                Some(quantifier) => match quantifier.slice(text) {
                    "+" => Ok(out.one_or_more(primary)),
                    "*" => Ok(out.zero_or_more(primary)),
                    "?" => Ok(out.optional(primary)),
                    other => Err(GrammarError::InvalidDefinition(format!(
                        "unknown quantifier '{other}'"
                    ))),
                },
                None => Ok(primary),
            }
        }
        Some("Suffix") => {
            let predicate = node.children.first().map(|p| p.slice(text)).unwrap_or("");
            let target = node.children.get(1).ok_or_else(|| {
                GrammarError::InvalidDefinition("predicate without a target".to_owned())
            })?;
            let inner = visit_expression(target, text, peg, out)?;
            match predicate {
                "&" => Ok(out.and_predicate(inner)),
                "!" => Ok(out.not_predicate(inner)),
                other => Err(GrammarError::InvalidDefinition(format!(
                    "unknown predicate '{other}'"
                ))),
            }
        }
        Some("Primary") | Some("Group") => {
            let index = first_child(node)?;
            visit_expression(&node.children[index], text, peg, out)
        }
        Some("Identifier") => Ok(out.reference(node.slice(text))),
        Some("String") => {
            let raw = node.slice(text);
            let inner = &raw[1..raw.len().saturating_sub(1)];
            Ok(out.literal(unescape(inner)))
        }
        Some("RegEx") => {
            let raw = node.slice(text);
            let inner = &raw[2..raw.len().saturating_sub(1)];
            out.pattern(inner)
        }
        other => Err(GrammarError::InvalidDefinition(format!(
            "unexpected node '{}' in rule expression",
            other.unwrap_or("_")
        ))),
    }
}

/// Resolve backslash escapes in quoted literals. Unknown escapes keep the
/// backslash.
fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

use crate::error::GrammarError;
use crate::grammar::{Grammar, GrammarFlags};

#[test]
fn references_resolve_through_aliases() {
    let mut g = Grammar::new(GrammarFlags::NONE);
    let ok = g.literal("ok");
    let seq = g.sequence(vec![ok]);
    g.register("Start", seq).unwrap();
    // Two alias hops: Outer -> Inner -> Word.
    let word = g.literal("word");
    g.register("Word", word).unwrap();
    let inner = g.reference("Word");
    g.register("Inner", inner).unwrap();
    let outer = g.reference("Inner");
    g.register("Outer", outer).unwrap();
    g.resolve().unwrap();
    assert!(g.is_resolved());
}

#[test]
fn missing_reference_is_an_error() {
    let mut g = Grammar::new(GrammarFlags::NONE);
    let ghost = g.reference("Ghost");
    let seq = g.sequence(vec![ghost]);
    g.register("Start", seq).unwrap();
    assert!(matches!(
        g.resolve(),
        Err(GrammarError::MissingRule(name)) if name == "Ghost"
    ));
}

#[test]
fn alias_cycles_are_detected() {
    let mut g = Grammar::new(GrammarFlags::NONE);
    let root = g.literal("x");
    g.register("Start", root).unwrap();
    let a = g.reference("B");
    g.register("A", a).unwrap();
    let b = g.reference("A");
    g.register("B", b).unwrap();
    assert!(matches!(
        g.resolve(),
        Err(GrammarError::CircularDependency(_))
    ));
}

#[test]
fn self_recursion_through_composites_is_fine() {
    // Nest <- "(" Nest? ")"
    let mut g = Grammar::new(GrammarFlags::NONE);
    let open = g.literal("(");
    let inner = g.reference("Nest");
    let inner_opt = g.optional(inner);
    let close = g.literal(")");
    let nest = g.sequence(vec![open, inner_opt, close]);
    g.register("Nest", nest).unwrap();
    g.resolve().unwrap();

    assert!(g.parse("((()))").is_ok());
    assert!(g.parse("(()").is_err());
}

#[test]
fn parse_requires_resolution() {
    let mut g = Grammar::new(GrammarFlags::NONE);
    let ghost = g.reference("Later");
    let seq = g.sequence(vec![ghost]);
    g.register("Start", seq).unwrap();
    assert!(matches!(g.parse("x"), Err(GrammarError::Unresolved)));
}

#[test]
fn duplicate_identities_are_rejected() {
    let mut g = Grammar::new(GrammarFlags::NONE);
    let a = g.literal("a");
    g.register("Rule", a).unwrap();
    let b = g.literal("b");
    assert!(matches!(
        g.register("Rule", b),
        Err(GrammarError::DuplicateRule(_))
    ));
}

#[test]
fn root_may_not_be_a_reference() {
    let mut g = Grammar::new(GrammarFlags::NONE);
    let alias = g.reference("Elsewhere");
    assert!(matches!(
        g.register("Start", alias),
        Err(GrammarError::RootReference(_))
    ));
}

fn list_grammar() -> Grammar {
    // Start <- "[" Item* "]" with Item -> Num / Junk, Junk discarded.
    let mut g = Grammar::new(GrammarFlags::SKIP_SPACES | GrammarFlags::FLATTEN);
    let open = g.literal("[");
    let item = g.reference("Item");
    let items = g.zero_or_more(item);
    let close = g.literal("]");
    let start = g.sequence(vec![open, items, close]);
    g.register("Start", start).unwrap();

    let num = g.reference("Num");
    let junk = g.reference("Junk");
    let item_rule = g.choice(vec![num, junk]);
    g.register("Item", item_rule).unwrap();

    let num_rule = g.pattern("[0-9]+").unwrap();
    g.register("Num", num_rule).unwrap();

    let junk_rule = g.literal(",");
    g.register("Junk", junk_rule).unwrap();

    g.hoist("Item");
    g.discard("Junk");
    g.resolve().unwrap();
    g
}

#[test]
fn flatten_hoists_and_discards() {
    let g = list_grammar();
    let source = "[1, 2, 3]";
    let ast = g.parse(source).unwrap();
    assert_eq!(ast.matches.len(), 1);
    let start = &ast.matches[0];
    assert_eq!(start.identity(&g), Some("Start"));
    let slices: Vec<&str> = start.children.iter().map(|c| c.slice(source)).collect();
    assert_eq!(slices, vec!["1", "2", "3"]);
}

#[test]
fn flatten_conditional_collapses_single_children() {
    // Expr ~> Num, so a lone number replaces the wrapper node.
    let mut g = Grammar::new(GrammarFlags::FLATTEN);
    let num = g.reference("Num");
    let plus = g.literal("+");
    let rhs = g.reference("Num");
    let tail = g.sequence(vec![plus, rhs]);
    let tail_opt = g.optional(tail);
    let expr = g.sequence(vec![num, tail_opt]);
    g.register("Expr", expr).unwrap();
    let num_rule = g.pattern("[0-9]+").unwrap();
    g.register("Num", num_rule).unwrap();
    g.conditional("Expr");
    g.resolve().unwrap();

    let ast = g.parse("7").unwrap();
    assert_eq!(ast.matches[0].identity(&g), Some("Num"));

    let ast = g.parse("7+8").unwrap();
    assert_eq!(ast.matches[0].identity(&g), Some("Expr"));
    assert_eq!(ast.matches[0].children.len(), 2);
}

#[test]
fn flatten_merge_rewraps_first_child_with_parent_identity() {
    // Call <> Name, keeping the parent's identity on the name leaf.
    let mut g = Grammar::new(GrammarFlags::FLATTEN);
    let name = g.reference("Name");
    let bang = g.literal("!");
    let call = g.sequence(vec![name, bang]);
    g.register("Call", call).unwrap();
    let name_rule = g.pattern("[a-z]+").unwrap();
    g.register("Name", name_rule).unwrap();
    g.merge("Call");
    g.resolve().unwrap();

    let source = "go!";
    let ast = g.parse(source).unwrap();
    let node = &ast.matches[0];
    assert_eq!(node.identity(&g), Some("Call"));
    assert!(g.is_primitive(node.rule));
    assert_eq!(node.slice(source), "go");
}

#[test]
fn line_numbers_are_one_based_per_top_level_match() {
    let mut g = Grammar::new(GrammarFlags::SKIP_WHITESPACE);
    let word = g.pattern("[a-z]+").unwrap();
    g.register("Word", word).unwrap();
    g.resolve().unwrap();

    let ast = g.parse("one\ntwo\nthree").unwrap();
    assert_eq!(ast.line_numbers, vec![1, 2, 3]);
}

#[test]
fn diagnosis_reports_matched_trail_and_enclosing_rule() {
    // Assign <- Name "=" Num
    let mut g = Grammar::new(GrammarFlags::SKIP_SPACES);
    let name = g.reference("Name");
    let eq = g.literal("=");
    let num = g.reference("Num");
    let assign = g.sequence(vec![name, eq, num]);
    g.register("Assign", assign).unwrap();
    let name_rule = g.pattern("[a-z]+").unwrap();
    g.register("Name", name_rule).unwrap();
    let num_rule = g.pattern("[0-9]+").unwrap();
    g.register("Num", num_rule).unwrap();
    g.macro_text("Num", "a number").unwrap();
    g.resolve().unwrap();

    let err = g.parse("x = y").unwrap_err();
    match err {
        GrammarError::Parse(parse) => {
            assert_eq!(parse.line, 1);
            assert_eq!(parse.column, 5);
            assert_eq!(parse.rule.as_deref(), Some("Assign"));
            assert_eq!(parse.expected.as_deref(), Some("a number"));
            assert!(!parse.unexpected);
        }
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn not_predicate_failures_read_as_unexpected() {
    // Word <- !"end" ~"[a-z]+"
    let mut g = Grammar::new(GrammarFlags::NONE);
    let end = g.literal("end");
    let not_end = g.not_predicate(end);
    let letters = g.pattern("[a-z]+").unwrap();
    let word = g.sequence(vec![not_end, letters]);
    g.register("Word", word).unwrap();
    g.resolve().unwrap();

    let err = g.parse("end").unwrap_err();
    match err {
        GrammarError::Parse(parse) => {
            assert!(parse.unexpected);
            assert_eq!(parse.expected.as_deref(), Some("'end'"));
            assert!(parse.to_string().contains("invalid here"));
        }
        other => panic!("expected parse error, got {other:?}"),
    }
}

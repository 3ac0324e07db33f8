use indoc::indoc;

use crate::preprocessor::Preprocessor;

#[test]
fn word_macros_substitute_whole_words() {
    let mut pre = Preprocessor::new();
    pre.define("MAXHP", "100").unwrap();
    assert_eq!(pre.process("set hp to MAXHP"), "set hp to 100");
    // No substitution inside larger words.
    assert_eq!(pre.process("set MAXHPX to 1"), "set MAXHPX to 1");
}

#[test]
fn pattern_macros_capture_placeholders() {
    let mut pre = Preprocessor::new();
    pre.pattern("repeat $n times", "for i from 0 while i < $n step 1")
        .unwrap();
    assert_eq!(
        pre.process("repeat 3 times"),
        "for i from 0 while i < 3 step 1"
    );
}

#[test]
fn pattern_macros_require_a_full_line_match() {
    let mut pre = Preprocessor::new();
    pre.pattern("repeat $n times", "expanded $n").unwrap();
    assert_eq!(pre.process("repeat 3 times please"), "repeat 3 times please");
}

#[test]
fn macros_apply_per_line_in_order() {
    let mut pre = Preprocessor::new();
    pre.define("LIMIT", "5").unwrap();
    pre.pattern("clamp $v", "min($v, LIMIT)").unwrap();
    let source = indoc! {"
        clamp hp
        set x to LIMIT
    "};
    // The word macro runs before the pattern macro on each line, so the
    // pattern's template keeps its own LIMIT unexpanded.
    let out = pre.process(source);
    assert_eq!(out.lines().next(), Some("min(hp, LIMIT)"));
    assert!(out.contains("set x to 5"));
}

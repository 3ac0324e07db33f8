use indoc::indoc;

use tinder_core::{Access, Crucible, Value};

use crate::error::CompileError;
use crate::kindling::Kindling;
use crate::lang::Tinderstarter;
use crate::library::{Library, LibraryRegistry, MathLib};

fn starter() -> Tinderstarter {
    Tinderstarter::new().unwrap()
}

#[test]
fn pure_subtrees_fold_to_constants() {
    let script = starter().compile("set x to 1 + 2 * 3").unwrap();
    let (_, op) = &script.instructions()[0];
    let Kindling::Set { values, .. } = op else {
        panic!("expected a set instruction");
    };
    assert_eq!(values[0], Kindling::Constant(Value::Int(7)));
}

#[test]
fn declared_constants_fold_into_later_lines() {
    // const PI to 3.14; set area to PI * 2 folds the product.
    let source = indoc! {"
        const PI to 3.14
        set area to PI * 2
    "};
    let script = starter().compile(source).unwrap();
    let (_, op) = &script.instructions()[1];
    let Kindling::Set { values, .. } = op else {
        panic!("expected a set instruction");
    };
    assert_eq!(values[0], Kindling::Constant(Value::Float(6.28)));
}

#[test]
fn folding_leaves_runtime_identifiers_alone() {
    let script = starter().compile("set x to hp + 1").unwrap();
    let (_, op) = &script.instructions()[0];
    let Kindling::Set { values, .. } = op else {
        panic!("expected a set instruction");
    };
    assert!(matches!(values[0], Kindling::Binary { .. }));
}

#[test]
fn folding_leaves_failing_expressions_for_the_runtime() {
    // 1/0 is all-constant but cannot fold; the interrupt machinery needs
    // the division to fail at run time.
    let script = starter().compile("set x to 1 / 0").unwrap();
    let (_, op) = &script.instructions()[0];
    let Kindling::Set { values, .. } = op else {
        panic!("expected a set instruction");
    };
    assert!(matches!(values[0], Kindling::Binary { .. }));
}

#[test]
fn resolvable_library_calls_fold() {
    let mut libs = LibraryRegistry::new();
    libs.register(MathLib);
    let env = Crucible::new(Access::NONE).update(libs.resolvable_exports());

    let mut t = starter();
    t.resolve_env(env);
    let script = t.compile("set x to math.floor(3.7)").unwrap();
    let (_, op) = &script.instructions()[0];
    let Kindling::Set { values, .. } = op else {
        panic!("expected a set instruction");
    };
    assert_eq!(values[0], Kindling::Constant(Value::Int(3)));
}

#[test]
fn host_constants_do_not_leak_between_compiles() {
    let t = starter();
    t.compile("const K to 1").unwrap();
    // A second compile must not see K as a foldable constant.
    let script = t.compile("set x to K + 1").unwrap();
    let (_, op) = &script.instructions()[0];
    let Kindling::Set { values, .. } = op else {
        panic!("expected a set instruction");
    };
    assert!(matches!(values[0], Kindling::Binary { .. }));
}

#[test]
fn if_blocks_link_guard_and_exit() {
    let source = indoc! {"
        if ready
        set x to 1
        else
        set x to 2
        endif
        stop
    "};
    let script = starter().compile(source).unwrap();
    match &script.instructions()[0].1 {
        Kindling::If { or_else, .. } => assert_eq!(*or_else, 3),
        other => panic!("expected if, got {other:?}"),
    }
    match &script.instructions()[2].1 {
        Kindling::Else { end } => assert_eq!(*end, 5),
        other => panic!("expected else, got {other:?}"),
    }
}

#[test]
fn elif_chains_link_through_the_synthesized_guard() {
    let source = indoc! {"
        if a
        set x to 1
        else if b
        set x to 2
        endif
    "};
    let script = starter().compile(source).unwrap();
    // Instruction layout: If, Set, Else, Elif, Set, EndIf.
    match &script.instructions()[0].1 {
        Kindling::If { or_else, .. } => assert_eq!(*or_else, 3),
        other => panic!("expected if, got {other:?}"),
    }
    match &script.instructions()[2].1 {
        Kindling::Else { end } => assert_eq!(*end, 6),
        other => panic!("expected else, got {other:?}"),
    }
    match &script.instructions()[3].1 {
        Kindling::Elif { or_else, .. } => assert_eq!(*or_else, 6),
        other => panic!("expected elif, got {other:?}"),
    }
}

#[test]
fn loops_link_back_edge_and_exit() {
    let source = indoc! {"
        for each v in xs
        set sum to sum + v
        endfor
    "};
    let script = starter().compile(source).unwrap();
    match &script.instructions()[0].1 {
        Kindling::Foreach { exit, .. } => assert_eq!(*exit, 3),
        other => panic!("expected foreach, got {other:?}"),
    }
    match &script.instructions()[2].1 {
        Kindling::EndFor { back } => assert_eq!(*back, 0),
        other => panic!("expected endfor, got {other:?}"),
    }
}

#[test]
fn mismatched_markers_are_rejected() {
    assert!(matches!(
        starter().compile("endif"),
        Err(CompileError::UnmatchedBlock { marker: "endif", .. })
    ));
    assert!(matches!(
        starter().compile("else"),
        Err(CompileError::UnmatchedBlock { marker: "else", .. })
    ));
    assert!(matches!(
        starter().compile("if x"),
        Err(CompileError::UnmatchedBlock { marker: "if", .. })
    ));
    let crossed = indoc! {"
        if x
        endfor
    "};
    assert!(matches!(
        starter().compile(crossed),
        Err(CompileError::UnmatchedBlock { marker: "endfor", .. })
    ));
    let double_else = indoc! {"
        if x
        else
        else
        endif
    "};
    assert!(matches!(
        starter().compile(double_else),
        Err(CompileError::UnmatchedBlock { marker: "else", .. })
    ));
}

struct SideEffectLib;

impl Library for SideEffectLib {
    fn name(&self) -> &str {
        "world"
    }

    fn export(&self, _request: Option<&[String]>) -> tinder_core::ValueMap {
        let mut out = tinder_core::ValueMap::new();
        out.insert(
            "poke".to_owned(),
            Value::Callable(tinder_core::NativeFn::new("poke", |_, _| {
                Ok(Value::Int(1))
            })),
        );
        out
    }
}

#[test]
fn impure_library_calls_never_fold() {
    let mut libs = LibraryRegistry::new();
    libs.register(SideEffectLib);
    // Seed the whole export map, not just the resolvable subset, to prove
    // the resolvable flag is what gates folding.
    let mut seed = tinder_core::ValueMap::new();
    seed.insert(
        "world".to_owned(),
        Value::Map(libs.get("world").map(|l| l.export(None)).unwrap_or_default()),
    );
    let env = Crucible::new(Access::NONE).update(seed);

    let mut t = starter();
    t.resolve_env(env);
    let script = t.compile("set x to world.poke()").unwrap();
    let (_, op) = &script.instructions()[0];
    let Kindling::Set { values, .. } = op else {
        panic!("expected a set instruction");
    };
    assert!(matches!(values[0], Kindling::Function { .. }));
}

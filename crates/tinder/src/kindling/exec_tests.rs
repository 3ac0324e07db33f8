use tinder_core::{Access, Crucible, Value};

use crate::error::RuntimeError;
use crate::kindling::{AccessKind, BinaryOp, Kindling, Outcome, Position};

fn env() -> Crucible {
    Crucible::new(Access::NONE)
}

fn num(n: i64) -> Kindling {
    Kindling::Number(Value::Int(n))
}

fn binary(op: BinaryOp, left: Kindling, right: Kindling) -> Kindling {
    Kindling::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn access(op: AccessKind, left: Kindling, right: Kindling) -> Kindling {
    Kindling::Access {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

#[test]
fn arithmetic_demotes_whole_results() {
    let e = env();
    assert_eq!(
        binary(BinaryOp::Add, num(1), num(2)).eval(&e).unwrap(),
        Value::Int(3)
    );
    assert_eq!(
        binary(
            BinaryOp::Div,
            num(7),
            Kindling::Number(Value::Float(2.0))
        )
        .eval(&e)
        .unwrap(),
        Value::Float(3.5)
    );
    assert_eq!(
        binary(BinaryOp::Div, num(8), num(2)).eval(&e).unwrap(),
        Value::Int(4)
    );
}

#[test]
fn string_and_list_concatenation() {
    let e = env();
    let cat = binary(
        BinaryOp::Add,
        Kindling::String("fire".into()),
        Kindling::String("starter".into()),
    );
    assert_eq!(cat.eval(&e).unwrap(), Value::Str("firestarter".into()));

    let lists = binary(
        BinaryOp::Add,
        Kindling::Array(vec![num(1)]),
        Kindling::Array(vec![num(2)]),
    );
    assert_eq!(
        lists.eval(&e).unwrap(),
        Value::List(vec![Value::Int(1), Value::Int(2)])
    );
}

#[test]
fn division_by_zero_raises() {
    let e = env();
    assert!(matches!(
        binary(BinaryOp::Div, num(1), num(0)).eval(&e),
        Err(RuntimeError::DivideByZero)
    ));
}

#[test]
fn comparisons_work_across_numeric_types() {
    let e = env();
    let lt = binary(BinaryOp::Lt, num(1), Kindling::Number(Value::Float(1.5)));
    assert_eq!(lt.eval(&e).unwrap(), Value::Bool(true));
    let eq = binary(BinaryOp::Eq, num(2), Kindling::Number(Value::Float(2.0)));
    assert_eq!(eq.eval(&e).unwrap(), Value::Bool(true));
}

#[test]
fn comparing_mixed_types_raises() {
    let e = env();
    assert!(matches!(
        binary(BinaryOp::Lt, num(1), Kindling::String("x".into())).eval(&e),
        Err(RuntimeError::TypeMismatch { .. })
    ));
}

#[test]
fn or_returns_first_truthy_operand() {
    let e = env();
    let or = Kindling::Or(vec![
        Kindling::Constant(Value::Bool(false)),
        Kindling::String("fallback".into()),
        Kindling::String("ignored".into()),
    ]);
    assert_eq!(or.eval(&e).unwrap(), Value::Str("fallback".into()));

    let all_falsy = Kindling::Or(vec![Kindling::Constant(Value::Bool(false)), num(0)]);
    assert_eq!(all_falsy.eval(&e).unwrap(), Value::Null);
}

#[test]
fn and_short_circuits_to_bool() {
    let e = env();
    // The undefined identifier after the falsy operand is never evaluated.
    let and = Kindling::And(vec![num(0), Kindling::Identifier("missing".into())]);
    assert_eq!(and.eval(&e).unwrap(), Value::Bool(false));
    let both = Kindling::And(vec![num(1), Kindling::String("y".into())]);
    assert_eq!(both.eval(&e).unwrap(), Value::Bool(true));
}

#[test]
fn membership_returns_operand_or_null() {
    let e = env();
    let list = Kindling::Array(vec![num(1), num(2)]);
    assert_eq!(
        access(AccessKind::In, num(2), list.clone()).eval(&e).unwrap(),
        Value::Int(2)
    );
    assert_eq!(
        access(AccessKind::In, num(9), list).eval(&e).unwrap(),
        Value::Null
    );
}

#[test]
fn from_indexes_leniently_with_otherwise_key() {
    let e = env();
    let table = Kindling::Table(vec![
        ("hit".into(), Kindling::String("ouch".into())),
        ("_".into(), Kindling::String("nothing happens".into())),
    ]);
    assert_eq!(
        access(AccessKind::From, Kindling::String("hit".into()), table.clone())
            .eval(&e)
            .unwrap(),
        Value::Str("ouch".into())
    );
    assert_eq!(
        access(AccessKind::From, Kindling::String("miss".into()), table)
            .eval(&e)
            .unwrap(),
        Value::Str("nothing happens".into())
    );
    // Lists index by number, out of range is null.
    let list = Kindling::Array(vec![num(5)]);
    assert_eq!(
        access(AccessKind::From, num(3), list).eval(&e).unwrap(),
        Value::Null
    );
}

#[test]
fn at_raises_on_bad_indexes() {
    let e = env();
    let list = Kindling::Array(vec![num(5)]);
    assert_eq!(
        access(AccessKind::At, num(0), list.clone()).eval(&e).unwrap(),
        Value::Int(5)
    );
    assert!(matches!(
        access(AccessKind::At, num(3), list.clone()).eval(&e),
        Err(RuntimeError::BadIndex { .. })
    ));
    assert!(matches!(
        access(AccessKind::At, Kindling::String("x".into()), list).eval(&e),
        Err(RuntimeError::BadIndex { .. })
    ));
}

#[test]
fn set_evaluates_all_values_before_writing() {
    let e = env();
    e.set("a", Value::Int(1)).unwrap();
    e.set("b", Value::Int(2)).unwrap();
    // set a, b to b, a
    let swap = Kindling::Set {
        targets: vec!["a".into(), "b".into()],
        values: vec![
            Kindling::Identifier("b".into()),
            Kindling::Identifier("a".into()),
        ],
    };
    assert_eq!(swap.execute(&e).unwrap(), Outcome::Continue);
    assert_eq!(e.get("a").unwrap(), Value::Int(2));
    assert_eq!(e.get("b").unwrap(), Value::Int(1));
}

#[test]
fn swap_exchanges_aliased_paths() {
    let e = env();
    e.set("box.a", Value::Int(1)).unwrap();
    e.set("box.b", Value::Int(2)).unwrap();
    let swap = Kindling::Swap {
        left: "box.a".into(),
        right: "box.b".into(),
    };
    swap.execute(&e).unwrap();
    assert_eq!(e.get("box.a").unwrap(), Value::Int(2));
    assert_eq!(e.get("box.b").unwrap(), Value::Int(1));
}

#[test]
fn put_prepends_and_appends() {
    let e = env();
    e.set("xs", Value::List(vec![Value::Int(2)])).unwrap();
    Kindling::Put {
        value: Box::new(num(1)),
        position: Position::Before,
        target: "xs".into(),
    }
    .execute(&e)
    .unwrap();
    Kindling::Put {
        value: Box::new(num(3)),
        position: Position::After,
        target: "xs".into(),
    }
    .execute(&e)
    .unwrap();
    assert_eq!(
        e.get("xs").unwrap(),
        Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
    );
}

#[test]
fn write_appends_text_and_newline() {
    let e = env();
    e.set("out", Value::Str(String::new())).unwrap();
    let write = Kindling::Write {
        text: Box::new(num(7)),
        target: "out".into(),
    };
    write.execute(&e).unwrap();
    Kindling::Write {
        text: Box::new(Kindling::String("done".into())),
        target: "out".into(),
    }
    .execute(&e)
    .unwrap();
    assert_eq!(e.get("out").unwrap(), Value::Str("7\ndone\n".into()));
}

#[test]
fn input_assigns_prompt_then_yields() {
    let e = env();
    let input = Kindling::Input {
        prompt: Box::new(Kindling::String("name?".into())),
        target: "PROMPT".into(),
    };
    assert_eq!(input.execute(&e).unwrap(), Outcome::Yielded(None));
    assert_eq!(e.get("PROMPT").unwrap(), Value::Str("name?".into()));
}

#[test]
fn jump_records_jumped_and_moves_past_target() {
    let e = env();
    e.set("__LINE__", Value::Int(1)).unwrap();
    e.set("end", Value::Int(5)).unwrap();
    let jump = Kindling::Jump {
        target: Box::new(Kindling::Identifier("end".into())),
    };
    jump.execute(&e).unwrap();
    assert_eq!(e.get("__JUMPED__").unwrap(), Value::Int(1));
    assert_eq!(e.get("__LINE__").unwrap(), Value::Int(6));

    Kindling::Return.execute(&e).unwrap();
    assert_eq!(e.get("__LINE__").unwrap(), Value::Int(1));
}

#[test]
fn statement_guard_gates_execution() {
    let e = env();
    e.set("x", Value::Int(0)).unwrap();
    let guarded = Kindling::Statement {
        op: Box::new(Kindling::Set {
            targets: vec!["x".into()],
            values: vec![num(9)],
        }),
        cond: Box::new(Kindling::Constant(Value::Bool(false))),
    };
    guarded.execute(&e).unwrap();
    assert_eq!(e.get("x").unwrap(), Value::Int(0));
}

use indexmap::IndexMap;

use crate::crucible::{Access, Crucible};
use crate::error::CrucibleError;
use crate::value::{NativeFn, Value, ValueMap};

fn vars(pairs: &[(&str, Value)]) -> ValueMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[test]
fn set_then_get_round_trips() {
    let env = Crucible::new(Access::NONE);
    env.set("x", Value::Int(1)).unwrap();
    assert_eq!(env.get("x").unwrap(), Value::Int(1));
}

#[test]
fn dotted_paths_autocreate_maps() {
    let env = Crucible::new(Access::NONE);
    env.set("a.b.c", Value::Int(7)).unwrap();
    assert_eq!(env.get("a.b.c").unwrap(), Value::Int(7));
    assert!(matches!(env.get("a.b").unwrap(), Value::Map(_)));
}

#[test]
fn dotted_paths_index_lists() {
    let env = Crucible::new(Access::NONE);
    env.set("xs", Value::List(vec![Value::Int(1), Value::Int(2)]))
        .unwrap();
    assert_eq!(env.get("xs.1").unwrap(), Value::Int(2));
    env.set("xs.0", Value::Int(9)).unwrap();
    assert_eq!(env.get("xs.0").unwrap(), Value::Int(9));
    assert!(matches!(
        env.get("xs.5"),
        Err(CrucibleError::KeyNotFound { .. })
    ));
}

#[test]
fn missing_variable_reports_value_not_found() {
    let env = Crucible::new(Access::NONE);
    assert!(matches!(
        env.get("nope"),
        Err(CrucibleError::ValueNotFound(_))
    ));
}

#[test]
fn child_reads_through_parent() {
    let parent = Crucible::new(Access::NONE).update(vars(&[("shared", Value::Int(5))]));
    let child = Crucible::with_parent(Access::NONE, parent);
    assert_eq!(child.get("shared").unwrap(), Value::Int(5));
}

#[test]
fn read_from_base_prefers_parent() {
    let parent = Crucible::new(Access::NONE).update(vars(&[("k", Value::Int(1))]));
    let child =
        Crucible::with_parent(Access::READ_FROM_BASE, parent).update(vars(&[("k", Value::Int(2))]));
    assert_eq!(child.get("k").unwrap(), Value::Int(1));
}

#[test]
fn local_read_shadows_parent_by_default() {
    let parent = Crucible::new(Access::NONE).update(vars(&[("k", Value::Int(1))]));
    let child = Crucible::with_parent(Access::NONE, parent).update(vars(&[("k", Value::Int(2))]));
    assert_eq!(child.get("k").unwrap(), Value::Int(2));
}

#[test]
fn read_only_scope_rejects_writes() {
    // Crucible A with READ_ONLY, child B without: B.set succeeds locally,
    // A.set raises.
    let a = Crucible::new(Access::READ_ONLY);
    let b = Crucible::with_parent(Access::NONE, a.clone());
    b.set("k", Value::Int(1)).unwrap();
    assert_eq!(b.get("k").unwrap(), Value::Int(1));
    assert!(matches!(
        a.set("k", Value::Int(1)),
        Err(CrucibleError::ReadOnly(_))
    ));
}

#[test]
fn write_to_base_targets_parent_first() {
    let parent = Crucible::new(Access::NONE);
    let child = Crucible::with_parent(Access::WRITE_TO_BASE, parent.clone());
    child.set("k", Value::Int(3)).unwrap();
    assert_eq!(parent.get("k").unwrap(), Value::Int(3));
    assert!(!child.variables().contains_key("k"));
}

#[test]
fn write_to_base_falls_back_to_self_when_parent_rejects() {
    let parent = Crucible::new(Access::READ_ONLY);
    let child = Crucible::with_parent(Access::WRITE_TO_BASE, parent.clone());
    child.set("k", Value::Int(3)).unwrap();
    assert!(child.variables().contains_key("k"));
    assert!(parent.variables().is_empty());
}

#[test]
fn no_shadowing_pushes_write_to_ancestor() {
    let base = Crucible::new(Access::NONE).update(vars(&[("hp", Value::Int(10))]));
    let local = Crucible::with_parent(Access::NO_SHADOWING, base.clone());
    local.set("hp", Value::Int(3)).unwrap();
    assert_eq!(base.get("hp").unwrap(), Value::Int(3));
    assert!(!local.variables().contains_key("hp"));
}

#[test]
fn no_shadowing_rejects_when_base_write_fails() {
    let base = Crucible::new(Access::READ_ONLY).update(vars(&[("hp", Value::Int(10))]));
    let local = Crucible::with_parent(Access::NO_SHADOWING, base);
    assert!(matches!(
        local.set("hp", Value::Int(3)),
        Err(CrucibleError::Shadowing(_))
    ));
}

#[test]
fn no_shadowing_allows_fresh_names() {
    let base = Crucible::new(Access::NONE);
    let local = Crucible::with_parent(Access::NO_SHADOWING, base);
    local.set("fresh", Value::Int(1)).unwrap();
    assert_eq!(local.get("fresh").unwrap(), Value::Int(1));
}

#[test]
fn protected_scope_requires_existing_key_and_type() {
    let env =
        Crucible::new(Access::PROTECTED).update(vars(&[("hp", Value::Int(10))]));
    env.set("hp", Value::Int(5)).unwrap();
    assert_eq!(env.get("hp").unwrap(), Value::Int(5));
    assert!(matches!(
        env.set("hp", Value::Str("full".into())),
        Err(CrucibleError::Protected { .. })
    ));
    assert!(matches!(
        env.set("mp", Value::Int(1)),
        Err(CrucibleError::ProtectedScope(_))
    ));
}

#[test]
fn protected_missing_intermediate_defers_to_parent() {
    let parent = Crucible::new(Access::NONE);
    let child = Crucible::with_parent(Access::PROTECTED, parent.clone());
    child.set("stats.hp", Value::Int(10)).unwrap();
    assert_eq!(parent.get("stats.hp").unwrap(), Value::Int(10));
}

#[test]
fn constants_reject_mutation() {
    let env = Crucible::new(Access::NONE);
    env.set("PI", Value::Float(3.14)).unwrap();
    env.mark_constant("PI");
    assert!(matches!(
        env.set("PI", Value::Int(3)),
        Err(CrucibleError::Constant(_))
    ));
    assert!(env.is_constant("PI"));
}

#[test]
fn call_invokes_native_functions() {
    let double = NativeFn::new("double", |_, args| match args {
        [Value::Int(n)] => Ok(Value::Int(n * 2)),
        _ => Err(CrucibleError::CallFailed("double expects one int".into())),
    });
    let env = Crucible::new(Access::NONE).update(vars(&[("double", Value::Callable(double))]));
    assert_eq!(env.call("double", &[Value::Int(4)]).unwrap(), Value::Int(8));
}

#[test]
fn call_rejects_non_callables() {
    let env = Crucible::new(Access::NONE).update(vars(&[("n", Value::Int(1))]));
    assert!(matches!(
        env.call("n", &[]),
        Err(CrucibleError::NotCallable(_))
    ));
}

#[test]
fn update_with_marks_constants() {
    let mut source = IndexMap::new();
    source.insert("MAX".to_string(), Value::Int(99));
    let env = Crucible::new(Access::NONE).update_with(source, vec!["MAX".to_string()]);
    assert!(env.is_constant("MAX"));
    assert!(matches!(
        env.set("MAX", Value::Int(1)),
        Err(CrucibleError::Constant(_))
    ));
}

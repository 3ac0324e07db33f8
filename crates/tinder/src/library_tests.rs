use tinder_core::{Access, Crucible, Value, ValueMap};

use crate::lang::Tinderstarter;
use crate::library::{Library, LibraryError, LibraryRegistry, MathLib};

struct SecretsLib;

impl Library for SecretsLib {
    fn name(&self) -> &str {
        "secrets"
    }

    fn permissions(&self) -> &[String] {
        static NEEDS: std::sync::LazyLock<Vec<String>> =
            std::sync::LazyLock::new(|| vec!["admin".to_owned()]);
        &NEEDS
    }

    fn export(&self, _request: Option<&[String]>) -> ValueMap {
        let mut out = ValueMap::new();
        out.insert("token".to_owned(), Value::Str("hunter2".into()));
        out
    }
}

fn script() -> crate::Tinder {
    Tinderstarter::new().unwrap().compile("stop").unwrap()
}

#[test]
fn permissions_gate_imports() {
    let mut libs = LibraryRegistry::new();
    libs.register(SecretsLib);
    let env = Crucible::new(Access::NONE);

    let plain = script();
    assert!(matches!(
        libs.fulfill(&env, &plain, "secrets", None, None),
        Err(LibraryError::Forbidden(_))
    ));

    let mut trusted = script();
    trusted.set_permissions(vec!["admin".to_owned()]);
    libs.fulfill(&env, &trusted, "secrets", None, None).unwrap();
    assert_eq!(
        env.get("secrets.token").unwrap(),
        Value::Str("hunter2".into())
    );
}

#[test]
fn unknown_libraries_are_reported() {
    let libs = LibraryRegistry::new();
    let env = Crucible::new(Access::NONE);
    assert!(matches!(
        libs.fulfill(&env, &script(), "ghost", None, None),
        Err(LibraryError::NotFound(_))
    ));
}

#[test]
fn aliases_rename_the_binding() {
    let mut libs = LibraryRegistry::new();
    libs.register(MathLib);
    let env = Crucible::new(Access::NONE);
    libs.fulfill(&env, &script(), "math", Some("m"), None)
        .unwrap();
    assert!(env.contains("m.floor"));
    assert!(!env.contains("math"));
}

#[test]
fn requested_symbols_bind_at_top_level() {
    let mut libs = LibraryRegistry::new();
    libs.register(MathLib);
    let env = Crucible::new(Access::NONE);
    let request = vec!["floor".to_owned(), "ceil".to_owned()];
    libs.fulfill(&env, &script(), "math", None, Some(&request))
        .unwrap();
    assert!(env.contains("floor"));
    assert!(env.contains("ceil"));
    assert!(!env.contains("abs"));
}

#[test]
fn missing_symbols_are_reported() {
    let mut libs = LibraryRegistry::new();
    libs.register(MathLib);
    let env = Crucible::new(Access::NONE);
    let request = vec!["conjure".to_owned()];
    assert!(matches!(
        libs.fulfill(&env, &script(), "math", None, Some(&request)),
        Err(LibraryError::MissingSymbol { .. })
    ));
}

#[test]
fn library_methods_receive_the_environment() {
    struct EnvLib;

    impl Library for EnvLib {
        fn name(&self) -> &str {
            "env"
        }

        fn export(&self, _request: Option<&[String]>) -> ValueMap {
            let mut out = ValueMap::new();
            out.insert(
                "whoami".to_owned(),
                Value::Callable(tinder_core::NativeFn::new("whoami", |env, _| {
                    env.get("USER")
                })),
            );
            out
        }
    }

    let mut libs = LibraryRegistry::new();
    libs.register(EnvLib);
    let env = Crucible::new(Access::NONE);
    env.set("USER", Value::Str("ember".into())).unwrap();
    libs.fulfill(&env, &script(), "env", None, None).unwrap();
    assert_eq!(
        env.call("env.whoami", &[]).unwrap(),
        Value::Str("ember".into())
    );
}

#[test]
fn resolvable_exports_filter_to_pure_methods() {
    let mut libs = LibraryRegistry::new();
    libs.register(MathLib);
    let exports = libs.resolvable_exports();
    let Some(Value::Map(math)) = exports.get("math") else {
        panic!("expected math exports");
    };
    assert!(math.contains_key("floor"));
    for value in math.values() {
        assert!(matches!(value, Value::Callable(c) if c.is_resolvable()));
    }
}

#[test]
fn math_functions_compute() {
    let env = Crucible::new(Access::NONE);
    let math = MathLib.export(None);
    let Some(Value::Callable(floor)) = math.get("floor") else {
        panic!("missing floor");
    };
    assert_eq!(
        floor.invoke(&env, &[Value::Float(3.9)]).unwrap(),
        Value::Int(3)
    );
    let Some(Value::Callable(max)) = math.get("max") else {
        panic!("missing max");
    };
    assert_eq!(
        max.invoke(&env, &[Value::Int(1), Value::Int(5), Value::Int(3)])
            .unwrap(),
        Value::Int(5)
    );
    let Some(Value::Callable(len)) = math.get("len") else {
        panic!("missing len");
    };
    assert_eq!(
        len.invoke(&env, &[Value::Str("abc".into())]).unwrap(),
        Value::Int(3)
    );
}

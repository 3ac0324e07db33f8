//! Host-provided library protocol: export maps, permission gating, and
//! import fulfillment.

use indexmap::IndexMap;
use tinder_core::{Crucible, CrucibleError, NativeFn, Value, ValueMap};

use crate::script::Tinder;

/// A bundle of callables (and values) importable from a script.
///
/// Library methods receive the current Crucible as their first argument
/// followed by the user arguments. Methods tagged resolvable (pure) may be
/// executed by the resolver at compile time.
pub trait Library {
    fn name(&self) -> &str;

    /// Permission tags a script must hold to import this library.
    fn permissions(&self) -> &[String] {
        &[]
    }

    /// Name -> value export map; `request` filters which names to include.
    fn export(&self, request: Option<&[String]>) -> ValueMap;

    /// Whether a holder of the given permission tags may import this.
    fn permitted(&self, held: &[String]) -> bool {
        self.permissions().iter().all(|need| held.contains(need))
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum LibraryError {
    #[error("library '{0}' not found")]
    NotFound(String),

    #[error("library '{0}' cannot be imported in this context")]
    Forbidden(String),

    #[error("library '{library}' does not export '{symbol}'")]
    MissingSymbol { library: String, symbol: String },

    #[error("failed to bind library '{library}': {message}")]
    Bind { library: String, message: String },
}

/// The host's registry of importable libraries.
#[derive(Default)]
pub struct LibraryRegistry {
    libraries: IndexMap<String, Box<dyn Library>>,
}

impl LibraryRegistry {
    pub fn new() -> LibraryRegistry {
        LibraryRegistry::default()
    }

    pub fn register(&mut self, library: impl Library + 'static) -> &mut Self {
        self.libraries
            .insert(library.name().to_owned(), Box::new(library));
        self
    }

    pub fn get(&self, name: &str) -> Option<&dyn Library> {
        self.libraries.get(name).map(Box::as_ref)
    }

    /// Fulfill an import signal: check permissions, then bind either the
    /// requested symbols directly or the whole export map under the
    /// library's (or alias') name.
    pub fn fulfill(
        &self,
        env: &Crucible,
        script: &Tinder,
        library: &str,
        alias: Option<&str>,
        request: Option<&[String]>,
    ) -> Result<(), LibraryError> {
        let Some(lib) = self.get(library) else {
            return Err(LibraryError::NotFound(library.to_owned()));
        };
        if !lib.permitted(script.permissions()) {
            return Err(LibraryError::Forbidden(library.to_owned()));
        }

        let bind = |key: &str, value: Value| {
            env.set(key, value).map_err(|err| LibraryError::Bind {
                library: library.to_owned(),
                message: err.to_string(),
            })
        };

        match request {
            Some(symbols) => {
                let exported = lib.export(Some(symbols));
                for symbol in symbols {
                    match exported.get(symbol) {
                        Some(value) => bind(symbol, value.clone())?,
                        None => {
                            return Err(LibraryError::MissingSymbol {
                                library: library.to_owned(),
                                symbol: symbol.clone(),
                            });
                        }
                    }
                }
            }
            None => {
                let exported = lib.export(None);
                bind(alias.unwrap_or(library), Value::Map(exported))?;
            }
        }
        Ok(())
    }

    /// Merge every resolvable export into a map suitable for seeding the
    /// resolver's compile-time environment.
    pub fn resolvable_exports(&self) -> ValueMap {
        let mut out = ValueMap::new();
        for lib in self.libraries.values() {
            let mut pure = ValueMap::new();
            for (name, value) in lib.export(None) {
                if matches!(&value, Value::Callable(call) if call.is_resolvable()) {
                    pure.insert(name, value);
                }
            }
            if !pure.is_empty() {
                out.insert(lib.name().to_owned(), Value::Map(pure));
            }
        }
        out
    }
}

/// Built-in pure math/utility library used by tests and the CLI host.
pub struct MathLib;

fn number_arg(name: &'static str, args: &[Value]) -> Result<f64, CrucibleError> {
    match args {
        [value] => value
            .as_f64()
            .ok_or_else(|| CrucibleError::CallFailed(format!("{name} expects a number"))),
        _ => Err(CrucibleError::CallFailed(format!(
            "{name} expects one argument"
        ))),
    }
}

impl Library for MathLib {
    fn name(&self) -> &str {
        "math"
    }

    fn export(&self, request: Option<&[String]>) -> ValueMap {
        let mut out = ValueMap::new();
        let mut add = |name: &str, call: NativeFn| {
            if request.is_none_or(|names| names.iter().any(|n| n == name)) {
                out.insert(name.to_owned(), Value::Callable(call));
            }
        };

        add(
            "floor",
            NativeFn::resolvable("floor", |_, args| {
                Ok(Value::number(number_arg("floor", args)?.floor()))
            }),
        );
        add(
            "ceil",
            NativeFn::resolvable("ceil", |_, args| {
                Ok(Value::number(number_arg("ceil", args)?.ceil()))
            }),
        );
        add(
            "abs",
            NativeFn::resolvable("abs", |_, args| {
                Ok(Value::number(number_arg("abs", args)?.abs()))
            }),
        );
        add(
            "min",
            NativeFn::resolvable("min", |_, args| {
                let mut best: Option<f64> = None;
                for arg in args {
                    let n = arg
                        .as_f64()
                        .ok_or_else(|| CrucibleError::CallFailed("min expects numbers".into()))?;
                    best = Some(best.map_or(n, |b| b.min(n)));
                }
                best.map(Value::number)
                    .ok_or_else(|| CrucibleError::CallFailed("min expects arguments".into()))
            }),
        );
        add(
            "max",
            NativeFn::resolvable("max", |_, args| {
                let mut best: Option<f64> = None;
                for arg in args {
                    let n = arg
                        .as_f64()
                        .ok_or_else(|| CrucibleError::CallFailed("max expects numbers".into()))?;
                    best = Some(best.map_or(n, |b| b.max(n)));
                }
                best.map(Value::number)
                    .ok_or_else(|| CrucibleError::CallFailed("max expects arguments".into()))
            }),
        );
        add(
            "len",
            NativeFn::resolvable("len", |_, args| match args {
                [Value::Str(s)] => Ok(Value::Int(s.chars().count() as i64)),
                [Value::List(items)] => Ok(Value::Int(items.len() as i64)),
                [Value::Map(map)] => Ok(Value::Int(map.len() as i64)),
                _ => Err(CrucibleError::CallFailed(
                    "len expects a string, list, or table".into(),
                )),
            }),
        );
        add(
            "str",
            NativeFn::resolvable("str", |_, args| match args {
                [value] => Ok(Value::Str(value.to_string())),
                _ => Err(CrucibleError::CallFailed("str expects one argument".into())),
            }),
        );

        out
    }
}

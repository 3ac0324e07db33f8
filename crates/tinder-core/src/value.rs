//! Runtime values stored in a Crucible.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::crucible::Crucible;
use crate::error::CrucibleError;

/// Ordered map used for table values. Insertion order is preserved so that
/// serialization and iteration are deterministic.
pub type ValueMap = IndexMap<String, Value>;

/// Signature of a host-provided callable.
///
/// The current Crucible is always the first argument, followed by the
/// evaluated user arguments.
pub type NativeCall = dyn Fn(&Crucible, &[Value]) -> Result<Value, CrucibleError>;

/// A host function bound into a Crucible, usually via a library import.
#[derive(Clone)]
pub struct NativeFn {
    name: Rc<str>,
    resolvable: bool,
    call: Rc<NativeCall>,
}

impl NativeFn {
    pub fn new(
        name: impl Into<String>,
        call: impl Fn(&Crucible, &[Value]) -> Result<Value, CrucibleError> + 'static,
    ) -> Self {
        Self {
            name: name.into().into(),
            resolvable: false,
            call: Rc::new(call),
        }
    }

    /// A pure function: the resolver may execute it at compile time.
    pub fn resolvable(
        name: impl Into<String>,
        call: impl Fn(&Crucible, &[Value]) -> Result<Value, CrucibleError> + 'static,
    ) -> Self {
        Self {
            name: name.into().into(),
            resolvable: true,
            call: Rc::new(call),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_resolvable(&self) -> bool {
        self.resolvable
    }

    pub fn invoke(&self, env: &Crucible, args: &[Value]) -> Result<Value, CrucibleError> {
        (self.call)(env, args)
    }

    fn ptr_eq(&self, other: &NativeFn) -> bool {
        Rc::ptr_eq(&self.call, &other.call)
    }
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFn({})", self.name)
    }
}

/// Host values stored opaquely in a Crucible.
///
/// Foreign values participate in dotted-path traversal via [`get`](Self::get)
/// and in tagged serialization via [`tag`](Self::tag)/[`serialize`](Self::serialize).
/// Rehydration goes through the [`ClassRegistry`](crate::ClassRegistry).
pub trait ForeignValue: fmt::Debug {
    /// Type tag used in the serialized form and for registry lookup.
    fn tag(&self) -> &'static str;

    fn serialize(&self) -> Result<serde_json::Value, CrucibleError>;

    /// Attribute lookup for dotted-path traversal. Default: no attributes.
    fn get(&self, _key: &str) -> Option<Value> {
        None
    }

    /// Structural equality against another foreign value. Default: never
    /// equal (identity comparison is handled by the caller).
    fn eq_value(&self, _other: &dyn ForeignValue) -> bool {
        false
    }
}

/// A dynamically typed runtime value.
///
/// Numbers parse as floats and demote to `Int` when whole; see
/// [`Value::number`]. Cross-type numeric equality holds, so `Int(2)`
/// equals `Float(2.0)`.
#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(ValueMap),
    Callable(NativeFn),
    Foreign(Rc<dyn ForeignValue>),
}

impl Value {
    /// Build a numeric value, demoting to `Int` when the float is whole.
    pub fn number(raw: f64) -> Value {
        if raw.is_finite() && raw.fract() == 0.0 && raw.abs() < i64::MAX as f64 {
            Value::Int(raw as i64)
        } else {
            Value::Float(raw)
        }
    }

    pub fn str(text: impl Into<String>) -> Value {
        Value::Str(text.into())
    }

    /// Type name used in protection checks and error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Callable(_) => "callable",
            Value::Foreign(_) => "foreign",
        }
    }

    /// Truthiness: null, false, zero, and empty containers are falsy.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(n) => *n != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Map(map) => !map.is_empty(),
            Value::Callable(_) | Value::Foreign(_) => true,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Non-negative integer index, for list traversal.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Value::Int(n) if *n >= 0 => Some(*n as usize),
            Value::Float(n) if *n >= 0.0 && n.fract() == 0.0 => Some(*n as usize),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                *a as f64 == *b
            }
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => {
                a.len() == b.len() && a.iter().all(|(k, v)| b.get(k) == Some(v))
            }
            (Value::Callable(a), Value::Callable(b)) => a.ptr_eq(b),
            (Value::Foreign(a), Value::Foreign(b)) => {
                Rc::ptr_eq(a, b) || a.eq_value(b.as_ref())
            }
            _ => false,
        }
    }
}

impl serde::Serialize for Value {
    /// Plain JSON shape, for hosts dumping values. The tagged persistence
    /// form lives in [`serialize_value`](crate::serialize_value).
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::{SerializeMap, SerializeSeq};
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(n) => serializer.serialize_i64(*n),
            Value::Float(n) => serializer.serialize_f64(*n),
            Value::Str(s) => serializer.serialize_str(s),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (key, item) in map {
                    out.serialize_entry(key, item)?;
                }
                out.end()
            }
            Value::Callable(call) => serializer.serialize_str(&format!("<{}>", call.name())),
            Value::Foreign(obj) => serializer.serialize_str(&format!("<{}>", obj.tag())),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => f.write_str(s),
            other => write_nested(f, other),
        }
    }
}

/// Nested rendering quotes strings; everything else matches `Display`.
fn write_nested(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::Null => f.write_str("null"),
        Value::Bool(true) => f.write_str("true"),
        Value::Bool(false) => f.write_str("false"),
        Value::Int(n) => write!(f, "{n}"),
        Value::Float(n) => write!(f, "{n}"),
        Value::Str(s) => write!(f, "\"{s}\""),
        Value::List(items) => {
            f.write_str("[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write_nested(f, item)?;
            }
            f.write_str("]")
        }
        Value::Map(map) => {
            f.write_str("{")?;
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{key}: ")?;
                write_nested(f, item)?;
            }
            f.write_str("}")
        }
        Value::Callable(call) => write!(f, "<{}>", call.name()),
        Value::Foreign(obj) => write!(f, "<{}>", obj.tag()),
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Value {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Value {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Value {
        Value::number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Value {
        Value::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Value {
        Value::Str(s)
    }
}

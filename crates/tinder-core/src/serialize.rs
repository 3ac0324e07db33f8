//! Tagged serialization for Crucible values.
//!
//! Every value serializes to `{"tag": <type>, "value": <payload>}`. Primitive
//! tags rehydrate directly; any other tag is looked up in the class registry
//! the host supplies. Callables do not serialize.

use std::collections::HashMap;

use serde_json::json;

use crate::error::CrucibleError;
use crate::value::{Value, ValueMap};

/// Rehydration function for one serialized tag.
pub type DeserializeFn = fn(&serde_json::Value, &ClassRegistry) -> Result<Value, CrucibleError>;

/// Registry of tag -> rehydration functions for non-primitive values.
#[derive(Default)]
pub struct ClassRegistry {
    classes: HashMap<String, DeserializeFn>,
}

impl ClassRegistry {
    pub fn new() -> ClassRegistry {
        ClassRegistry::default()
    }

    pub fn register(&mut self, tag: impl Into<String>, class: DeserializeFn) -> &mut Self {
        self.classes.insert(tag.into(), class);
        self
    }

    pub fn get(&self, tag: &str) -> Option<DeserializeFn> {
        self.classes.get(tag).copied()
    }
}

/// Serialize a value into its tagged JSON form.
pub fn serialize_value(value: &Value) -> Result<serde_json::Value, CrucibleError> {
    match value {
        Value::Null => Ok(json!({ "tag": "null", "value": null })),
        Value::Bool(b) => Ok(json!({ "tag": "bool", "value": b })),
        Value::Int(n) => Ok(json!({ "tag": "int", "value": n })),
        Value::Float(n) => Ok(json!({ "tag": "float", "value": n })),
        Value::Str(s) => Ok(json!({ "tag": "str", "value": s })),
        Value::List(items) => {
            let elements = items
                .iter()
                .map(serialize_value)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(json!({ "tag": "list", "value": elements }))
        }
        Value::Map(map) => {
            let mut object = serde_json::Map::new();
            for (key, item) in map {
                object.insert(key.clone(), serialize_value(item)?);
            }
            Ok(json!({ "tag": "map", "value": object }))
        }
        Value::Callable(_) => Err(CrucibleError::Serialize("callable")),
        Value::Foreign(obj) => Ok(json!({ "tag": obj.tag(), "value": obj.serialize()? })),
    }
}

/// Rehydrate a value from its tagged JSON form.
pub fn deserialize_value(
    data: &serde_json::Value,
    classes: &ClassRegistry,
) -> Result<Value, CrucibleError> {
    let tag = data
        .get("tag")
        .and_then(|t| t.as_str())
        .ok_or_else(|| CrucibleError::Deserialization("missing 'tag' field".to_owned()))?;
    let payload = data
        .get("value")
        .ok_or_else(|| CrucibleError::Deserialization("missing 'value' field".to_owned()))?;

    let malformed = || CrucibleError::Deserialization(format!("malformed payload for tag '{tag}'"));

    match tag {
        "null" => Ok(Value::Null),
        "bool" => payload.as_bool().map(Value::Bool).ok_or_else(malformed),
        "int" => payload.as_i64().map(Value::Int).ok_or_else(malformed),
        "float" => payload.as_f64().map(Value::Float).ok_or_else(malformed),
        "str" => payload
            .as_str()
            .map(|s| Value::Str(s.to_owned()))
            .ok_or_else(malformed),
        "list" => {
            let elements = payload.as_array().ok_or_else(malformed)?;
            let items = elements
                .iter()
                .map(|e| deserialize_value(e, classes))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::List(items))
        }
        "map" => {
            let object = payload.as_object().ok_or_else(malformed)?;
            let mut map = ValueMap::new();
            for (key, item) in object {
                map.insert(key.clone(), deserialize_value(item, classes)?);
            }
            Ok(Value::Map(map))
        }
        other => match classes.get(other) {
            Some(class) => class(payload, classes),
            None => Err(CrucibleError::Deserialization(format!(
                "unknown tag '{other}'"
            ))),
        },
    }
}

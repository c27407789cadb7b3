//! Binding between user structs and record schemas.
//!
//! A model is a plain serde struct; the mapping layer works on its JSON
//! value form. `to_values`/`from_values` convert between the struct and an
//! ordered field map, and `apply_defaults` fills declared defaults for
//! fields the engine did not return.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::schema::RecordSchema;

/// A record type: a serde struct tied to its immutable [`RecordSchema`].
///
/// The schema is built once (typically in a `OnceLock`) and shared by all
/// instances of the type.
pub trait Model: Serialize + DeserializeOwned {
    fn schema() -> &'static RecordSchema;
}

/// Serialize a model into its field map.
pub fn to_values<M: Model>(record: &M) -> Result<Map<String, Value>> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map),
        other => Err(Error::Schema(format!(
            "model for '{}' must serialize to an object, got {}",
            M::schema().collection(),
            kind_of(&other)
        ))),
    }
}

/// Rebuild a model from a field map.
pub fn from_values<M: Model>(values: Map<String, Value>) -> Result<M> {
    Ok(serde_json::from_value(Value::Object(values))?)
}

/// Fill declared defaults for fields that are absent or null.
pub fn apply_defaults(values: &mut Map<String, Value>, schema: &RecordSchema) {
    for descriptor in schema.fields() {
        let Some(default) = &descriptor.default else { continue };
        let missing = match values.get(&descriptor.name) {
            None => true,
            Some(Value::Null) => true,
            Some(_) => false,
        };
        if missing {
            values.insert(descriptor.name.clone(), default.clone());
        }
    }
}

/// The primary-key value of a field map, if the schema declares one and the
/// map carries a non-null value for it.
pub fn primary_key_value(values: &Map<String, Value>, schema: &RecordSchema) -> Option<Value> {
    let pk = schema.primary_key()?;
    match values.get(&pk.name) {
        None | Some(Value::Null) => None,
        Some(value) => Some(value.clone()),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a bool",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

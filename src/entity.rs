//! Structured-entity base: field-whitelisted JSON serialization.

use core::hash::{BuildHasher, Hash};

use indexmap::IndexSet;
use serde::Serialize;

/// Failure to serialize an entity.
#[derive(Debug, thiserror::Error)]
pub enum EntityError {
    /// A field holds a value that has no JSON representation.
    #[error("entity is not representable as JSON")]
    Json(#[from] serde_json::Error),
    /// The entity did not serialize to a JSON object.
    #[error("entity serialized to a JSON {0} instead of an object")]
    NotAnObject(&'static str),
}

/// Names a serializable field of an [`Entity`].
pub trait EntityField: Copy + Eq + Hash {
    /// The key the field serializes under.
    fn key(self) -> &'static str;
}

/// A structured value whose fields can be serialized selectively.
pub trait Entity: Serialize {
    /// The field names of the entity.
    type Field: EntityField;

    /// Serializes the entity as a JSON object restricted to `fields`.
    ///
    /// The whole entity is serialized first, so a value anywhere in it that
    /// cannot be represented fails the call even if its field is not
    /// whitelisted. Keys keep the entity's declaration order.
    fn to_json<S: BuildHasher>(
        &self,
        fields: &IndexSet<Self::Field, S>,
    ) -> Result<String, EntityError> {
        let object = match serde_json::to_value(self)? {
            serde_json::Value::Object(object) => object,
            other => return Err(EntityError::NotAnObject(json_kind(&other))),
        };
        let filtered: serde_json::Map<String, serde_json::Value> = object
            .into_iter()
            .filter(|(key, _)| fields.iter().any(|field| field.key() == key.as_str()))
            .collect();
        Ok(serde_json::to_string(&filtered)?)
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

//! Typed attribute values for the document table.
//!
//! Rows are stored as maps of tagged attribute values rather than plain
//! JSON, matching the keyed-document wire shape requests carry
//! (`{"S": "..."}`, `{"BOOL": true}`, ...). Numbers are kept as strings
//! so nothing is lost crossing the boundary in either direction.

use crate::errors::ErrorKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// A row: attribute name to tagged value.
pub type AttributeMap = HashMap<String, AttributeValue>;

/// One tagged attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    /// A string.
    S(String),
    /// A number, carried as its decimal string form.
    N(String),
    /// A boolean.
    #[serde(rename = "BOOL")]
    Bool(bool),
    /// An explicit null.
    #[serde(rename = "NULL")]
    Null(bool),
    /// A list.
    L(Vec<AttributeValue>),
    /// A nested map.
    M(AttributeMap),
}

impl AttributeValue {
    /// Returns the string payload, if this is an `S` value.
    #[must_use]
    pub fn as_s(&self) -> Option<&str> {
        match self {
            Self::S(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the boolean payload, if this is a `BOOL` value.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Converts a tagged value into plain JSON.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::S(s) => Value::String(s.clone()),
            Self::N(n) => n
                .parse::<serde_json::Number>()
                .map_or_else(|_| Value::String(n.clone()), Value::Number),
            Self::Bool(b) => Value::Bool(*b),
            Self::Null(_) => Value::Null,
            Self::L(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::M(map) => map_to_json(map),
        }
    }

    /// Converts plain JSON into a tagged value.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null(true),
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => Self::N(n.to_string()),
            Value::String(s) => Self::S(s.clone()),
            Value::Array(items) => Self::L(items.iter().map(Self::from_json).collect()),
            Value::Object(obj) => Self::M(
                obj.iter()
                    .map(|(k, v)| (k.clone(), Self::from_json(v)))
                    .collect(),
            ),
        }
    }
}

/// Converts a row to a plain JSON object.
#[must_use]
pub fn map_to_json(map: &AttributeMap) -> Value {
    Value::Object(
        map.iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect(),
    )
}

/// Parses a row from its tagged JSON form.
///
/// # Errors
///
/// Returns `ErrorKind::Validation` if `value` is not a valid attribute map.
pub fn map_from_value(value: &Value) -> Result<AttributeMap, ErrorKind> {
    serde_json::from_value(value.clone())
        .map_err(|e| ErrorKind::validation(format!("malformed attribute map: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn tagged_wire_shape() {
        assert_eq!(
            serde_json::to_value(AttributeValue::S("hi".into())).unwrap(),
            json!({"S": "hi"})
        );
        assert_eq!(
            serde_json::to_value(AttributeValue::Bool(true)).unwrap(),
            json!({"BOOL": true})
        );
        assert_eq!(
            serde_json::to_value(AttributeValue::N("42".into())).unwrap(),
            json!({"N": "42"})
        );
    }

    #[test]
    fn json_round_trip() {
        let original = json!({
            "id": "abc",
            "isComplete": false,
            "count": 3,
            "tags": ["a", "b"],
            "nested": {"x": null}
        });

        let tagged = AttributeValue::from_json(&original);
        assert_eq!(tagged.to_json(), original);
    }

    #[test]
    fn map_from_value_rejects_garbage() {
        assert!(map_from_value(&json!({"id": {"X": 1}})).is_err());
        assert!(map_from_value(&json!("not a map")).is_err());
    }

    #[test]
    fn unparseable_number_survives_as_string() {
        let v = AttributeValue::N("not-a-number".into());
        assert_eq!(v.to_json(), json!("not-a-number"));
    }
}

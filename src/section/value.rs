//! Loosely typed payload values.
//!
//! Partial payloads arrive as structured data whose leaves are not yet bound
//! to a Rust type. `FieldValue` carries them until the merge step coerces each
//! one against the kind of the field it lands on.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// A payload leaf or subtree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    /// Only produced for integers above `i64::MAX`.
    Uint(u64),
    Float(f64),
    Str(String),
    List(Vec<FieldValue>),
    Map(BTreeMap<String, FieldValue>),
}

impl FieldValue {
    /// Short name of the variant, used in type mismatch errors.
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Bool(_) => "bool",
            FieldValue::Int(_) | FieldValue::Uint(_) => "int",
            FieldValue::Float(_) => "float",
            FieldValue::Str(_) => "string",
            FieldValue::List(_) => "list",
            FieldValue::Map(_) => "map",
        }
    }

    /// Convert into a JSON value without any coercion.
    ///
    /// Non-finite floats have no JSON form and become `null`.
    pub fn into_json(self) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(b) => Value::Bool(b),
            FieldValue::Int(i) => Value::Number(i.into()),
            FieldValue::Uint(u) => Value::Number(u.into()),
            FieldValue::Float(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
            FieldValue::Str(s) => Value::String(s),
            FieldValue::List(items) => Value::Array(items.into_iter().map(FieldValue::into_json).collect()),
            FieldValue::Map(map) => Value::Object(
                map.into_iter().map(|(k, v)| (k, v.into_json())).collect(),
            ),
        }
    }

    /// Build from a JSON value. Integers above `i64::MAX` become `Uint`.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Bool(b),
            Value::Number(n) => match (n.as_i64(), n.as_u64()) {
                (Some(i), _) => FieldValue::Int(i),
                (None, Some(u)) => FieldValue::Uint(u),
                _ => FieldValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => FieldValue::Str(s),
            Value::Array(items) => FieldValue::List(items.into_iter().map(FieldValue::from_json).collect()),
            Value::Object(map) => FieldValue::Map(
                map.into_iter().map(|(k, v)| (k, FieldValue::from_json(v))).collect(),
            ),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => f.write_str("null"),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::Uint(u) => write!(f, "{}", u),
            FieldValue::Float(x) => write!(f, "{}", x),
            FieldValue::Str(s) => f.write_str(s),
            other => write!(f, "{}", other.clone().into_json()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Str(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Str(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Int(i)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<f64> for FieldValue {
    fn from(x: f64) -> Self {
        FieldValue::Float(x)
    }
}

impl From<Vec<&str>> for FieldValue {
    fn from(items: Vec<&str>) -> Self {
        FieldValue::List(items.into_iter().map(FieldValue::from).collect())
    }
}

/// Name of a JSON value's kind, matching [`FieldValue::kind`] where they overlap.
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_untagged_deserialize() {
        let v: FieldValue = serde_json::from_value(json!({
            "a": 1, "b": 1.5, "c": "x", "d": [true, null], "e": {}
        }))
        .unwrap();

        let FieldValue::Map(map) = v else { panic!("expected map") };
        assert_eq!(map["a"], FieldValue::Int(1));
        assert_eq!(map["b"], FieldValue::Float(1.5));
        assert_eq!(map["c"], FieldValue::Str("x".into()));
        assert_eq!(map["d"], FieldValue::List(vec![FieldValue::Bool(true), FieldValue::Null]));
        assert_eq!(map["e"], FieldValue::Map(BTreeMap::new()));
    }

    #[test]
    fn test_json_conversion() {
        let original = json!({"list": ["a", "b"], "n": -3, "flag": false});
        let back = FieldValue::from_json(original.clone()).into_json();
        assert_eq!(back, original);

        assert_eq!(FieldValue::Float(f64::NAN).into_json(), Value::Null);
    }

    #[test]
    fn test_unsigned_above_i64() {
        let v: FieldValue = serde_json::from_str("18446744073709551615").unwrap();
        assert_eq!(v, FieldValue::Uint(u64::MAX));
        assert_eq!(FieldValue::from_json(json!(u64::MAX)), FieldValue::Uint(u64::MAX));
        assert_eq!(FieldValue::Uint(u64::MAX).into_json(), json!(u64::MAX));
        assert_eq!(FieldValue::from_json(json!(7)), FieldValue::Int(7));
    }
}

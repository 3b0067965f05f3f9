//! Overlay merge of partial payloads onto section values.
//!
//! # Coercion rules
//! ```text
//! target kind   accepted payload
//! bool          bool, "true"/"false"
//! number        int, float, numeric string
//! string        string, int, float, bool (rendered)
//! list          list, string (one-element list)
//! map           map (merged recursively)
//! null          anything (typed decode decides)
//! ```
//! A `null` payload always clears the field; decoding rejects it for
//! non-optional fields.

use std::collections::BTreeMap;

use serde_json::{Map, Number, Value};

use crate::error::{ConfigError, ConfigResult};
use crate::section::registry::SectionEntry;
use crate::section::schema::SharedValue;
use crate::section::value::{json_kind, FieldValue};

/// Field name → new value, for one section.
pub type SectionPatch = BTreeMap<String, FieldValue>;

/// Overlay `patch` onto `base` and decode the result as a new value of `entry`.
///
/// Fields absent from `patch` keep their value from `base`. Unknown top-level
/// fields are rejected before anything is decoded.
pub fn overlay_value(entry: &SectionEntry, base: &SharedValue, patch: &SectionPatch) -> ConfigResult<SharedValue> {
    let section = entry.name();
    for field in patch.keys() {
        if !entry.has_field(field) {
            return Err(ConfigError::UnknownField {
                section: section.to_string(),
                field: field.clone(),
            });
        }
    }

    let mut doc = match base.to_json()? {
        Value::Object(map) => map,
        other => {
            return Err(ConfigError::InvalidValue {
                section: section.to_string(),
                reason: format!("expected map, current value is {}", json_kind(&other)),
            })
        }
    };
    overlay_map(section, "", &mut doc, patch)?;
    entry.codec().decode(Value::Object(doc))
}

/// Turn a stored or loaded section document into a patch.
pub fn patch_from_json(section: &str, doc: Value) -> ConfigResult<SectionPatch> {
    match doc {
        Value::Object(map) => Ok(map
            .into_iter()
            .map(|(field, value)| (field, FieldValue::from_json(value)))
            .collect()),
        other => Err(ConfigError::InvalidValue {
            section: section.to_string(),
            reason: format!("expected map, got {}", json_kind(&other)),
        }),
    }
}

fn overlay_map(
    section: &str,
    prefix: &str,
    doc: &mut Map<String, Value>,
    patch: &BTreeMap<String, FieldValue>,
) -> ConfigResult<()> {
    for (key, value) in patch {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        let merged = match doc.remove(key) {
            Some(current) => coerce(section, &path, current, value.clone())?,
            None => value.clone().into_json(),
        };
        doc.insert(key.clone(), merged);
    }
    Ok(())
}

/// Convert `value` so it fits where `current` sits.
fn coerce(section: &str, field: &str, current: Value, value: FieldValue) -> ConfigResult<Value> {
    let mismatch = |expected: &'static str, found: &FieldValue| ConfigError::FieldType {
        section: section.to_string(),
        field: field.to_string(),
        expected,
        found: found.kind(),
    };

    if value == FieldValue::Null {
        return Ok(Value::Null);
    }

    match current {
        Value::Null => Ok(value.into_json()),
        Value::Bool(_) => match value {
            FieldValue::Bool(b) => Ok(Value::Bool(b)),
            FieldValue::Str(ref s) => match s.as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(mismatch("bool", &value)),
            },
            other => Err(mismatch("bool", &other)),
        },
        Value::Number(_) => match value {
            FieldValue::Int(i) => Ok(Value::Number(i.into())),
            FieldValue::Uint(u) => Ok(Value::Number(u.into())),
            FieldValue::Float(f) => Number::from_f64(f)
                .map(Value::Number)
                .ok_or_else(|| mismatch("number", &FieldValue::Float(f))),
            FieldValue::Str(ref s) => parse_number(s).ok_or_else(|| mismatch("number", &value)),
            other => Err(mismatch("number", &other)),
        },
        Value::String(_) => match value {
            FieldValue::Str(s) => Ok(Value::String(s)),
            FieldValue::Int(_) | FieldValue::Uint(_) | FieldValue::Float(_) | FieldValue::Bool(_) => {
                Ok(Value::String(value.to_string()))
            }
            other => Err(mismatch("string", &other)),
        },
        Value::Array(_) => match value {
            FieldValue::List(_) => Ok(value.into_json()),
            FieldValue::Str(s) => Ok(Value::Array(vec![Value::String(s)])),
            other => Err(mismatch("list", &other)),
        },
        Value::Object(mut map) => match value {
            FieldValue::Map(patch) => {
                overlay_map(section, field, &mut map, &patch)?;
                Ok(Value::Object(map))
            }
            other => Err(mismatch("map", &other)),
        },
    }
}

fn parse_number(s: &str) -> Option<Value> {
    let s = s.trim();
    if let Ok(i) = s.parse::<i64>() {
        return Some(Value::Number(i.into()));
    }
    if let Ok(u) = s.parse::<u64>() {
        return Some(Value::Number(u.into()));
    }
    s.parse::<f64>().ok().and_then(Number::from_f64).map(Value::Number)
}

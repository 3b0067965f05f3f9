//! Section values ↔ stored text.

use serde_json::{Map, Value};

use crate::error::{ConfigError, ConfigResult};
use crate::section::{overlay_value, patch_from_json, SectionEntry, SharedValue};
use crate::store::Snapshot;

/// Compact JSON text for one section value.
pub fn encode_section(value: &SharedValue) -> ConfigResult<String> {
    serde_json::to_string(&value.to_json()?).map_err(|e| ConfigError::InvalidValue {
        section: value.section_name().to_string(),
        reason: e.to_string(),
    })
}

/// Decode a stored blob. Fields missing from the blob take their defaults.
pub fn decode_section(entry: &SectionEntry, blob: &str) -> ConfigResult<SharedValue> {
    let doc: Value = serde_json::from_str(blob)
        .map_err(|e| ConfigError::Backend(format!("stored section <{}> is not JSON: {}", entry.name(), e)))?;
    let patch = patch_from_json(entry.name(), doc)?;
    overlay_value(entry, &entry.default_value(), &patch)
}

/// Canonical compact text for a set of sections.
///
/// Keys are sorted at every level, so identical values always produce
/// identical text regardless of how the snapshot was gathered.
pub fn to_canonical_text(values: &Snapshot) -> ConfigResult<String> {
    let mut doc = Map::new();
    for (name, value) in values {
        doc.insert(name.clone(), value.to_json()?);
    }
    serde_json::to_string(&Value::Object(doc)).map_err(|e| ConfigError::Backend(e.to_string()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::section::builtin::{default_registry, GeneralSection, ListenSection};

    #[test]
    fn test_decode_fills_missing_fields() {
        let registry = default_registry();
        let entry = registry.get("general").unwrap();
        let value = decode_section(entry, r#"{"node_id":"n1"}"#).unwrap();
        let expected = GeneralSection {
            node_id: "n1".into(),
            ..Default::default()
        };
        assert!(value.eq_value(&expected));
    }

    #[test]
    fn test_encode_decode_preserves_value() {
        let registry = default_registry();
        let entry = registry.get("listen").unwrap();
        let value: SharedValue = Arc::new(ListenSection {
            http: "0.0.0.0:8080".into(),
            ..Default::default()
        });
        let decoded = decode_section(entry, &encode_section(&value).unwrap()).unwrap();
        assert!(decoded.eq_value(value.as_ref()));
    }

    #[test]
    fn test_canonical_text_is_sorted_and_stable() {
        let registry = default_registry();
        let mut values = Snapshot::new();
        values.insert("listen".into(), registry.get("listen").unwrap().default_value());
        values.insert("general".into(), registry.get("general").unwrap().default_value());

        let text = to_canonical_text(&values).unwrap();
        assert_eq!(text, to_canonical_text(&values).unwrap());
        assert!(text.find("\"general\"").unwrap() < text.find("\"listen\"").unwrap());
        assert!(text.find("\"connect_attempts\"").unwrap() < text.find("\"node_id\"").unwrap());
        assert!(!text.contains('\n'));
    }

    #[test]
    fn test_decode_rejects_non_json() {
        let registry = default_registry();
        let err = decode_section(registry.get("general").unwrap(), "{oops").unwrap_err();
        assert!(matches!(err, ConfigError::Backend(_)));
    }
}

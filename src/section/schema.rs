//! The plug-in seam between the store and section owners.
//!
//! A subsystem describes its configuration as a plain serde struct and
//! implements [`Section`] for it. The store never sees the concrete type: the
//! registry erases it behind [`SectionCodec`] and stores values as
//! [`SharedValue`].

use std::any::Any;
use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{ConfigError, ConfigResult};

/// A named, independently addressable unit of configuration.
pub trait Section:
    Serialize + DeserializeOwned + Default + Clone + Debug + PartialEq + Send + Sync + 'static
{
    /// Stable key the section is addressed by.
    const NAME: &'static str;

    /// Semantic checks that serde cannot express.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Type-erased section value held by the store.
pub trait SectionValue: Debug + Send + Sync {
    fn section_name(&self) -> &'static str;

    /// Structured form of the value. Every field is present.
    fn to_json(&self) -> ConfigResult<Value>;

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;

    fn eq_value(&self, other: &dyn SectionValue) -> bool;
}

impl<S: Section> SectionValue for S {
    fn section_name(&self) -> &'static str {
        S::NAME
    }

    fn to_json(&self) -> ConfigResult<Value> {
        serde_json::to_value(self).map_err(|e| ConfigError::InvalidValue {
            section: S::NAME.to_string(),
            reason: e.to_string(),
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }

    fn eq_value(&self, other: &dyn SectionValue) -> bool {
        other.as_any().downcast_ref::<S>().is_some_and(|o| o == self)
    }
}

/// Shared, immutable section value.
pub type SharedValue = Arc<dyn SectionValue>;

/// Recover the concrete type of a shared value.
pub fn downcast<S: Section>(value: SharedValue) -> Option<Arc<S>> {
    value.into_any().downcast::<S>().ok()
}

/// Decodes and validates values for one registered section.
pub trait SectionCodec: Send + Sync {
    fn name(&self) -> &'static str;

    fn default_value(&self) -> SharedValue;

    /// Strictly decode a full structured document, then run semantic checks.
    fn decode(&self, doc: Value) -> ConfigResult<SharedValue>;
}

/// Codec for a concrete [`Section`] type.
pub struct TypedCodec<S>(PhantomData<fn() -> S>);

impl<S> TypedCodec<S> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<S> Default for TypedCodec<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Section> SectionCodec for TypedCodec<S> {
    fn name(&self) -> &'static str {
        S::NAME
    }

    fn default_value(&self) -> SharedValue {
        Arc::new(S::default())
    }

    fn decode(&self, doc: Value) -> ConfigResult<SharedValue> {
        let value: S = serde_json::from_value(doc).map_err(|e| ConfigError::InvalidValue {
            section: S::NAME.to_string(),
            reason: e.to_string(),
        })?;
        value.validate().map_err(|reason| ConfigError::InvalidValue {
            section: S::NAME.to_string(),
            reason,
        })?;
        Ok(Arc::new(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(default, deny_unknown_fields)]
    struct Probe {
        port: u16,
    }

    impl Default for Probe {
        fn default() -> Self {
            Self { port: 80 }
        }
    }

    impl Section for Probe {
        const NAME: &'static str = "probe";

        fn validate(&self) -> Result<(), String> {
            if self.port == 0 {
                return Err("port must be > 0".into());
            }
            Ok(())
        }
    }

    #[test]
    fn test_decode_and_downcast() {
        let codec = TypedCodec::<Probe>::new();
        let value = codec.decode(json!({"port": 8080})).unwrap();
        assert_eq!(value.section_name(), "probe");

        let probe = downcast::<Probe>(value).unwrap();
        assert_eq!(probe.port, 8080);
    }

    #[test]
    fn test_decode_rejects_invalid() {
        let codec = TypedCodec::<Probe>::new();
        let err = codec.decode(json!({"port": 0})).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let err = codec.decode(json!({"port": "eighty"})).unwrap_err();
        assert!(err.to_string().contains("probe"));
    }

    #[test]
    fn test_eq_value() {
        let codec = TypedCodec::<Probe>::new();
        let a = codec.default_value();
        let b = codec.decode(json!({"port": 80})).unwrap();
        let c = codec.decode(json!({"port": 81})).unwrap();
        assert!(a.eq_value(b.as_ref()));
        assert!(!a.eq_value(c.as_ref()));
    }
}

//! Startup-time table of known sections.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::error::{ConfigError, ConfigResult};
use crate::section::schema::{Section, SectionCodec, SharedValue, TypedCodec};
use crate::store::Snapshot;

/// Wildcard meaning "every registered section".
pub const ALL_SECTIONS: &str = "*all";

/// A registered section: its codec and the field names its values carry.
pub struct SectionEntry {
    codec: Box<dyn SectionCodec>,
    fields: BTreeSet<String>,
}

impl SectionEntry {
    pub fn name(&self) -> &'static str {
        self.codec.name()
    }

    pub fn codec(&self) -> &dyn SectionCodec {
        self.codec.as_ref()
    }

    pub fn default_value(&self) -> SharedValue {
        self.codec.default_value()
    }

    /// Whether `field` is a top-level field of this section.
    pub fn has_field(&self, field: &str) -> bool {
        self.fields.contains(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(String::as_str)
    }
}

impl std::fmt::Debug for SectionEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SectionEntry")
            .field("name", &self.name())
            .field("fields", &self.fields)
            .finish()
    }
}

/// Rule over a complete prospective configuration, one value per section.
pub type SanityCheck = Box<dyn Fn(&Snapshot) -> Result<(), String> + Send + Sync>;

/// Immutable once built; shared by every component through `Arc`.
pub struct SectionRegistry {
    entries: BTreeMap<&'static str, SectionEntry>,
    checks: Vec<SanityCheck>,
}

impl std::fmt::Debug for SectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SectionRegistry")
            .field("entries", &self.entries)
            .field("checks", &self.checks.len())
            .finish()
    }
}

impl SectionRegistry {
    pub fn builder() -> SectionRegistryBuilder {
        SectionRegistryBuilder::default()
    }

    pub fn get(&self, name: &str) -> ConfigResult<&SectionEntry> {
        self.entries
            .get(name)
            .ok_or_else(|| ConfigError::SectionNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run every cross-section rule against `config`. The first failure wins.
    pub fn check_sanity(&self, config: &Snapshot) -> ConfigResult<()> {
        for check in &self.checks {
            check(config).map_err(ConfigError::Inconsistent)?;
        }
        Ok(())
    }

    /// Expand a request's section list.
    ///
    /// Empty input or the `*all` wildcard yields every registered section.
    /// Otherwise each name must be registered; the result is sorted and
    /// deduplicated.
    pub fn resolve_names<S: AsRef<str>>(&self, names: &[S]) -> ConfigResult<Vec<&'static str>> {
        if is_all(names) {
            return Ok(self.names().collect());
        }
        let mut resolved = BTreeSet::new();
        for name in names {
            let entry = self.get(name.as_ref())?;
            resolved.insert(entry.name());
        }
        Ok(resolved.into_iter().collect())
    }
}

/// True when a section list means "everything".
pub fn is_all<S: AsRef<str>>(names: &[S]) -> bool {
    names.is_empty() || names.iter().any(|n| n.as_ref() == ALL_SECTIONS)
}

#[derive(Default)]
pub struct SectionRegistryBuilder {
    entries: BTreeMap<&'static str, SectionEntry>,
    checks: Vec<SanityCheck>,
}

impl SectionRegistryBuilder {
    /// Register a section type. A later registration under the same name wins.
    pub fn register<S: Section>(self) -> Self {
        self.register_codec(Box::new(TypedCodec::<S>::new()))
    }

    pub fn register_codec(mut self, codec: Box<dyn SectionCodec>) -> Self {
        let fields = match codec.default_value().to_json() {
            Ok(serde_json::Value::Object(map)) => map.keys().cloned().collect(),
            _ => {
                tracing::warn!(section = codec.name(), "Section does not serialize to a map; no fields accepted");
                BTreeSet::new()
            }
        };
        self.entries.insert(codec.name(), SectionEntry { codec, fields });
        self
    }

    /// Add a rule checked before any update or reload becomes visible.
    pub fn sanity_check<F>(mut self, check: F) -> Self
    where
        F: Fn(&Snapshot) -> Result<(), String> + Send + Sync + 'static,
    {
        self.checks.push(Box::new(check));
        self
    }

    pub fn build(self) -> Arc<SectionRegistry> {
        Arc::new(SectionRegistry {
            entries: self.entries,
            checks: self.checks,
        })
    }
}

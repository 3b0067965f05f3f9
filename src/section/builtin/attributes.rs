//! Attribute service settings.

use serde::{Deserialize, Serialize};

use crate::dynopts::DynamicOpts;
use crate::section::Section;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AttributesSection {
    pub enabled: bool,
    pub stats_conns: Vec<String>,
    pub resources_conns: Vec<String>,
    pub accounts_conns: Vec<String>,

    /// Use indexes when selecting profiles.
    pub indexed_selects: bool,

    /// `None` indexes every string field.
    pub string_indexed_fields: Option<Vec<String>>,
    pub prefix_indexed_fields: Vec<String>,
    pub suffix_indexed_fields: Vec<String>,
    pub exists_indexed_fields: Vec<String>,
    pub nested_fields: bool,

    pub opts: AttributesOpts,
}

/// Per-event overrides, resolved by the attribute service.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AttributesOpts {
    pub profile_ids: DynamicOpts<Vec<String>>,
    pub process_runs: DynamicOpts<i64>,
    pub profile_runs: DynamicOpts<i64>,
    pub profile_ignore_filters: DynamicOpts<bool>,
}

impl Default for AttributesOpts {
    fn default() -> Self {
        Self {
            profile_ids: DynamicOpts::default(),
            process_runs: DynamicOpts::always(1),
            profile_runs: DynamicOpts::always(0),
            profile_ignore_filters: DynamicOpts::always(false),
        }
    }
}

impl Default for AttributesSection {
    fn default() -> Self {
        Self {
            enabled: false,
            stats_conns: Vec::new(),
            resources_conns: Vec::new(),
            accounts_conns: Vec::new(),
            indexed_selects: true,
            string_indexed_fields: None,
            prefix_indexed_fields: Vec::new(),
            suffix_indexed_fields: Vec::new(),
            exists_indexed_fields: Vec::new(),
            nested_fields: false,
            opts: AttributesOpts::default(),
        }
    }
}

impl Section for AttributesSection {
    const NAME: &'static str = "attributes";

    fn validate(&self) -> Result<(), String> {
        if let Some(bad) = self.opts.process_runs.entries().iter().find(|o| o.value < 1) {
            return Err(format!("opts.process_runs value {} must be >= 1", bad.value));
        }
        if let Some(bad) = self.opts.profile_runs.entries().iter().find(|o| o.value < 0) {
            return Err(format!("opts.profile_runs value {} must be >= 0", bad.value));
        }
        Ok(())
    }
}

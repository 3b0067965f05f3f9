use serde::{Deserialize, Serialize};

use crate::dynopts::DynamicOpts;
use crate::section::Section;

/// Resource limiter settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResourcesSection {
    pub enabled: bool,

    /// Seconds between usage dumps; 0 stores on every change, -1 never.
    pub store_interval_secs: i64,
    pub thresholds_conns: Vec<String>,
    pub indexed_selects: bool,
    pub opts: ResourcesOpts,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResourcesOpts {
    pub usage_id: DynamicOpts<String>,
    pub usage_ttl_secs: DynamicOpts<u64>,
    pub units: DynamicOpts<f64>,
}

impl Default for ResourcesOpts {
    fn default() -> Self {
        Self {
            usage_id: DynamicOpts::default(),
            usage_ttl_secs: DynamicOpts::always(72 * 3600),
            units: DynamicOpts::always(1.0),
        }
    }
}

impl Default for ResourcesSection {
    fn default() -> Self {
        Self {
            enabled: false,
            store_interval_secs: 0,
            thresholds_conns: Vec::new(),
            indexed_selects: true,
            opts: ResourcesOpts::default(),
        }
    }
}

impl Section for ResourcesSection {
    const NAME: &'static str = "resources";

    fn validate(&self) -> Result<(), String> {
        if self.store_interval_secs < -1 {
            return Err("store_interval_secs must be >= -1".into());
        }
        if self.opts.units.entries().iter().any(|o| !o.value.is_finite() || o.value < 0.0) {
            return Err("opts.units values must be finite and >= 0".into());
        }
        Ok(())
    }
}

//! Reference sections registered by the daemon.
//!
//! Field semantics belong to the subsystems that read them; the store only
//! relies on the [`Section`](crate::section::Section) contract.

pub mod attributes;
pub mod general;
pub mod listen;
pub mod resources;

use std::sync::Arc;

pub use attributes::{AttributesOpts, AttributesSection};
pub use general::GeneralSection;
pub use listen::ListenSection;
pub use resources::{ResourcesOpts, ResourcesSection};

use crate::section::registry::SectionRegistry;
use crate::section::{downcast, Section};
use crate::store::Snapshot;

/// Registry with every reference section.
pub fn default_registry() -> Arc<SectionRegistry> {
    SectionRegistry::builder()
        .register::<GeneralSection>()
        .register::<ListenSection>()
        .register::<AttributesSection>()
        .register::<ResourcesSection>()
        .sanity_check(resources_reachable)
        .build()
}

/// Components pointing at `resources` need it enabled.
fn resources_reachable(config: &Snapshot) -> Result<(), String> {
    let Some(resources) = config.get(ResourcesSection::NAME).cloned().and_then(downcast::<ResourcesSection>) else {
        return Ok(());
    };
    if resources.enabled {
        return Ok(());
    }
    if let Some(attributes) = config.get(AttributesSection::NAME).cloned().and_then(downcast::<AttributesSection>) {
        if !attributes.resources_conns.is_empty() {
            return Err(format!(
                "<{}> not enabled but requested by <{}> component",
                ResourcesSection::NAME,
                AttributesSection::NAME
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::section::SharedValue;
    use std::sync::Arc;

    fn config(resources_enabled: bool, conns: &[&str]) -> Snapshot {
        Snapshot::from([
            (
                "resources".to_string(),
                Arc::new(ResourcesSection {
                    enabled: resources_enabled,
                    ..Default::default()
                }) as SharedValue,
            ),
            (
                "attributes".to_string(),
                Arc::new(AttributesSection {
                    resources_conns: conns.iter().map(|c| c.to_string()).collect(),
                    ..Default::default()
                }) as SharedValue,
            ),
        ])
    }

    #[test]
    fn test_resources_reachable() {
        assert!(resources_reachable(&config(false, &[])).is_ok());
        assert!(resources_reachable(&config(true, &["*internal"])).is_ok());

        let err = resources_reachable(&config(false, &["*internal"])).unwrap_err();
        assert_eq!(err, "<resources> not enabled but requested by <attributes> component");
    }

    #[test]
    fn test_defaults_are_consistent() {
        let registry = default_registry();
        let defaults: Snapshot = registry
            .names()
            .map(|name| (name.to_string(), registry.get(name).unwrap().default_value()))
            .collect();
        assert!(registry.check_sanity(&defaults).is_ok());
    }
}

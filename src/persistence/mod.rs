//! Durable copies of sections, detached from the live store.
//!
//! # Responsibilities
//! - Write selected sections to a backing store on explicit request
//! - Read sections back for bootstrap and read fallback
//! - Produce canonical text for export
//!
//! # Design Decisions
//! - Never written implicitly by a commit
//! - The connection can be attached or detached while serving
//! - Every value is encoded before the first write is issued

pub mod backend;
pub mod codec;

use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::error::{ConfigError, ConfigResult};
use crate::observability::metrics;
use crate::section::SectionRegistry;
use crate::store::Snapshot;

pub use backend::{ConfigDb, JsonFileConfigDb, MemoryConfigDb};

struct Connection {
    db: Arc<dyn ConfigDb>,
    kind: &'static str,
}

pub struct PersistenceBridge {
    registry: Arc<SectionRegistry>,
    connection: ArcSwapOption<Connection>,
}

impl PersistenceBridge {
    /// A bridge with no backing store; `store` and `load` fail until one is attached.
    pub fn new(registry: Arc<SectionRegistry>) -> Self {
        Self {
            registry,
            connection: ArcSwapOption::empty(),
        }
    }

    pub fn with_db(registry: Arc<SectionRegistry>, db: Arc<dyn ConfigDb>, kind: &'static str) -> Self {
        let bridge = Self::new(registry);
        bridge.attach(db, kind);
        bridge
    }

    pub fn attach(&self, db: Arc<dyn ConfigDb>, kind: &'static str) {
        self.connection.store(Some(Arc::new(Connection { db, kind })));
        tracing::info!(backend = kind, "Backing store attached");
    }

    pub fn detach(&self) {
        if self.connection.swap(None).is_some() {
            tracing::info!("Backing store detached");
        }
    }

    pub fn is_configured(&self) -> bool {
        self.connection.load().is_some()
    }

    pub fn backend_kind(&self) -> Option<&'static str> {
        self.connection.load_full().map(|c| c.kind)
    }

    fn connection(&self) -> ConfigResult<Arc<Connection>> {
        self.connection.load_full().ok_or(ConfigError::NoBackingStore)
    }

    /// Write `names` (empty or `*all` = every section) from `values`.
    pub async fn store<S: AsRef<str>>(&self, tenant: &str, names: &[S], values: &Snapshot) -> ConfigResult<()> {
        let result = self.store_inner(tenant, names, values).await;
        metrics::record_store_write(metrics::outcome(&result));
        result
    }

    async fn store_inner<S: AsRef<str>>(&self, tenant: &str, names: &[S], values: &Snapshot) -> ConfigResult<()> {
        let connection = self.connection()?;
        let names = self.registry.resolve_names(names)?;

        let mut blobs = Vec::with_capacity(names.len());
        for name in names {
            let value = values
                .get(name)
                .ok_or_else(|| ConfigError::SectionNotFound(name.to_string()))?;
            blobs.push((name, codec::encode_section(value)?));
        }

        for (name, blob) in blobs {
            connection.db.set_section(tenant, name, blob).await?;
        }
        tracing::info!(tenant = %tenant, backend = connection.kind, "Sections stored");
        Ok(())
    }

    /// Read `names` back. Sections with nothing stored are left out.
    pub async fn load<S: AsRef<str>>(&self, tenant: &str, names: &[S]) -> ConfigResult<Snapshot> {
        let connection = self.connection()?;
        let names = self.registry.resolve_names(names)?;

        let mut values = Snapshot::new();
        for name in names {
            let entry = self.registry.get(name)?;
            if let Some(blob) = connection.db.get_section(tenant, name).await? {
                values.insert(name.to_string(), codec::decode_section(entry, &blob)?);
            }
        }
        tracing::debug!(tenant = %tenant, sections = values.len(), "Sections loaded from backing store");
        Ok(values)
    }

    pub fn serialize_as_text(&self, values: &Snapshot) -> ConfigResult<String> {
        codec::to_canonical_text(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::section::builtin::{default_registry, GeneralSection};

    fn snapshot(node_id: &str) -> Snapshot {
        let registry = default_registry();
        let mut values: Snapshot = registry
            .names()
            .map(|n| (n.to_string(), registry.get(n).unwrap().default_value()))
            .collect();
        values.insert(
            "general".into(),
            Arc::new(GeneralSection {
                node_id: node_id.into(),
                ..Default::default()
            }),
        );
        values
    }

    #[tokio::test]
    async fn test_no_backing_store() {
        let bridge = PersistenceBridge::new(default_registry());
        let err = bridge.store::<&str>("a.org", &[], &snapshot("n1")).await.unwrap_err();
        assert_eq!(err.to_string(), "no DB connection for config");
        assert_eq!(
            bridge.load::<&str>("a.org", &[]).await.unwrap_err(),
            ConfigError::NoBackingStore
        );
    }

    #[tokio::test]
    async fn test_store_then_load() {
        let db = Arc::new(MemoryConfigDb::new());
        let bridge = PersistenceBridge::with_db(default_registry(), db.clone(), "memory");
        bridge.store("a.org", &["general"], &snapshot("n1")).await.unwrap();
        assert_eq!(db.len(), 1);

        let loaded = bridge.load::<&str>("a.org", &[]).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded["general"].eq_value(snapshot("n1")["general"].as_ref()));
        assert!(bridge.load::<&str>("b.org", &[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_section_writes_nothing() {
        let db = Arc::new(MemoryConfigDb::new());
        let bridge = PersistenceBridge::with_db(default_registry(), db.clone(), "memory");
        let err = bridge
            .store("a.org", &["general", "nope"], &snapshot("n1"))
            .await
            .unwrap_err();
        assert_eq!(err, ConfigError::SectionNotFound("nope".into()));
        assert!(db.is_empty());
    }

    #[tokio::test]
    async fn test_attach_detach() {
        let bridge = PersistenceBridge::new(default_registry());
        assert!(!bridge.is_configured());
        bridge.attach(Arc::new(MemoryConfigDb::new()), "memory");
        assert_eq!(bridge.backend_kind(), Some("memory"));
        bridge.store::<&str>("a.org", &[], &snapshot("n1")).await.unwrap();
        bridge.detach();
        assert!(!bridge.is_configured());
    }
}

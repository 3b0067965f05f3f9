//! Live, tenant-partitioned section storage.
//!
//! # Responsibilities
//! - Hold one slot per (tenant, section)
//! - Serve consistent multi-section snapshots
//! - Apply multi-section writes all-or-nothing
//! - Tell subscribers which sections a write touched
//!
//! # Design Decisions
//! - One `RwLock` per section slot, never a global lock
//! - Locks are always taken in sorted section order (no deadlock)
//! - Slots hold `Arc`s; the critical section is a pointer assignment
//! - A new tenant is inserted with its first write already in its slots
//! - Notifications go out after every write guard is released

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::sync::broadcast;

use crate::error::{ConfigError, ConfigResult};
use crate::section::registry::SectionRegistry;
use crate::section::schema::{downcast, Section, SharedValue};

/// Section name → value, sorted by name.
pub type Snapshot = BTreeMap<String, SharedValue>;

const CHANGE_CAPACITY: usize = 64;

/// A committed write to one section of one tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionChange {
    pub tenant: String,
    pub section: &'static str,
}

/// Every registered section of one tenant.
#[derive(Debug)]
struct TenantSections {
    slots: BTreeMap<&'static str, RwLock<SharedValue>>,
}

impl TenantSections {
    fn with_defaults(registry: &SectionRegistry) -> Self {
        let slots = registry
            .names()
            .filter_map(|name| registry.get(name).ok())
            .map(|entry| (entry.name(), RwLock::new(entry.default_value())))
            .collect();
        Self { slots }
    }

    fn slot(&self, name: &str) -> ConfigResult<&RwLock<SharedValue>> {
        self.slots
            .get(name)
            .ok_or_else(|| ConfigError::SectionNotFound(name.to_string()))
    }
}

/// The process's source of truth for live configuration.
#[derive(Debug)]
pub struct SectionStore {
    registry: Arc<SectionRegistry>,
    tenants: DashMap<String, Arc<TenantSections>>,
    changes: BTreeMap<&'static str, broadcast::Sender<SectionChange>>,
}

impl SectionStore {
    pub fn new(registry: Arc<SectionRegistry>) -> Self {
        let changes = registry
            .names()
            .map(|name| (name, broadcast::channel(CHANGE_CAPACITY).0))
            .collect();
        Self {
            registry,
            tenants: DashMap::new(),
            changes,
        }
    }

    /// Receive a [`SectionChange`] for every committed write to `section`,
    /// across all tenants. Dry runs and rejected writes send nothing.
    pub fn subscribe(&self, section: &str) -> ConfigResult<broadcast::Receiver<SectionChange>> {
        self.changes
            .get(section)
            .map(broadcast::Sender::subscribe)
            .ok_or_else(|| ConfigError::SectionNotFound(section.to_string()))
    }

    fn notify(&self, tenant: &str, changed: &Snapshot) {
        for name in changed.keys() {
            if let Some((&section, tx)) = self.changes.get_key_value(name.as_str()) {
                // no receivers is fine
                let _ = tx.send(SectionChange {
                    tenant: tenant.to_string(),
                    section,
                });
            }
        }
    }

    pub fn registry(&self) -> &Arc<SectionRegistry> {
        &self.registry
    }

    /// Registered section names, sorted.
    pub fn sections(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.registry.names().collect();
        names.sort_unstable();
        names
    }

    /// Whether any section has ever been written for `tenant`.
    pub fn is_populated(&self, tenant: &str) -> bool {
        self.tenants.contains_key(tenant)
    }

    pub fn tenants(&self) -> Vec<String> {
        let mut tenants: Vec<String> = self.tenants.iter().map(|t| t.key().clone()).collect();
        tenants.sort();
        tenants
    }

    fn tenant(&self, tenant: &str) -> Option<Arc<TenantSections>> {
        // clone out so the shard guard is released before any slot lock
        self.tenants.get(tenant).map(|t| Arc::clone(t.value()))
    }

    /// Insert `tenant` with `values` already in its slots, so readers never
    /// see defaults nobody committed. Returns the replaced defaults, or `None`
    /// if the tenant already exists.
    fn create_tenant(&self, tenant: &str, values: &Snapshot) -> Option<Snapshot> {
        match self.tenants.entry(tenant.to_string()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(vacant) => {
                let mut created = TenantSections::with_defaults(&self.registry);
                let mut previous = Snapshot::new();
                for (name, value) in values {
                    if let Some(slot) = created.slots.get_mut(name.as_str()) {
                        previous.insert(name.clone(), std::mem::replace(slot.get_mut(), Arc::clone(value)));
                    }
                }
                vacant.insert(Arc::new(created));
                Some(previous)
            }
        }
    }

    fn replace(sections: &TenantSections, values: Snapshot) -> ConfigResult<Snapshot> {
        let mut guards = Vec::with_capacity(values.len());
        for name in values.keys() {
            guards.push(sections.slot(name)?.write());
        }
        Ok(guards
            .iter_mut()
            .zip(values)
            .map(|(guard, (name, value))| (name, std::mem::replace(&mut **guard, value)))
            .collect())
    }

    /// Consistent copy of the named sections (empty or `*all` = every section).
    ///
    /// Read guards on every requested slot are held together, so a concurrent
    /// multi-section `apply` is observed either entirely or not at all.
    pub fn get<S: AsRef<str>>(&self, tenant: &str, names: &[S]) -> ConfigResult<Snapshot> {
        let names = self.registry.resolve_names(names)?;
        let sections = self
            .tenant(tenant)
            .ok_or_else(|| ConfigError::TenantNotFound(tenant.to_string()))?;

        let mut guards = Vec::with_capacity(names.len());
        for name in &names {
            guards.push((*name, sections.slot(name)?.read()));
        }
        Ok(guards
            .iter()
            .map(|(name, guard)| (name.to_string(), Arc::clone(&**guard)))
            .collect())
    }

    /// Current value of one section.
    pub fn get_one(&self, tenant: &str, name: &str) -> ConfigResult<SharedValue> {
        self.registry.get(name)?;
        let sections = self
            .tenant(tenant)
            .ok_or_else(|| ConfigError::TenantNotFound(tenant.to_string()))?;
        let value = Arc::clone(&*sections.slot(name)?.read());
        Ok(value)
    }

    /// Typed view of one section, for consuming subsystems.
    pub fn get_typed<S: Section>(&self, tenant: &str) -> ConfigResult<Arc<S>> {
        let value = self.get_one(tenant, S::NAME)?;
        downcast::<S>(value).ok_or_else(|| ConfigError::InvalidValue {
            section: S::NAME.to_string(),
            reason: "stored value has an unexpected type".to_string(),
        })
    }

    /// Like [`get`](Self::get) but falls back to defaults for an unpopulated tenant.
    pub fn get_or_default<S: AsRef<str>>(&self, tenant: &str, names: &[S]) -> ConfigResult<Snapshot> {
        match self.get(tenant, names) {
            Err(ConfigError::TenantNotFound(_)) => {
                let names = self.registry.resolve_names(names)?;
                names
                    .into_iter()
                    .map(|name| Ok((name.to_string(), self.registry.get(name)?.default_value())))
                    .collect()
            }
            other => other,
        }
    }

    /// The tenant's full configuration as it would read after `values` landed.
    pub fn prospective(&self, tenant: &str, values: &Snapshot) -> ConfigResult<Snapshot> {
        let mut view = self.get_or_default::<&str>(tenant, &[])?;
        view.extend(values.iter().map(|(name, value)| (name.clone(), Arc::clone(value))));
        Ok(view)
    }

    /// Replace every section in `values` atomically. Returns previous values.
    ///
    /// All names are checked before any lock is taken; an unknown name leaves
    /// the store untouched. Values must already be validated.
    pub fn apply(&self, tenant: &str, values: Snapshot) -> ConfigResult<Snapshot> {
        for (name, value) in &values {
            self.registry.get(name)?;
            if value.section_name() != name.as_str() {
                return Err(ConfigError::InvalidValue {
                    section: name.clone(),
                    reason: format!("value belongs to section <{}>", value.section_name()),
                });
            }
        }
        if values.is_empty() {
            return Ok(Snapshot::new());
        }

        let existing = match self.tenant(tenant) {
            Some(sections) => Some(sections),
            None => match self.create_tenant(tenant, &values) {
                Some(previous) => {
                    self.notify(tenant, &previous);
                    tracing::debug!(tenant = %tenant, "Tenant created");
                    return Ok(previous);
                }
                // lost the race to another writer
                None => self.tenant(tenant),
            },
        };
        let sections = existing.ok_or_else(|| ConfigError::TenantNotFound(tenant.to_string()))?;
        let previous = Self::replace(&sections, values)?;
        self.notify(tenant, &previous);

        tracing::debug!(tenant = %tenant, "Sections applied");
        Ok(previous)
    }

    /// Replace a single section.
    pub fn swap(&self, tenant: &str, name: &str, value: SharedValue) -> ConfigResult<SharedValue> {
        let mut previous = self.apply(tenant, Snapshot::from([(name.to_string(), value)]))?;
        previous
            .remove(name)
            .ok_or_else(|| ConfigError::SectionNotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::section::builtin::{default_registry, GeneralSection, ListenSection};

    fn general(node_id: &str) -> SharedValue {
        Arc::new(GeneralSection {
            node_id: node_id.to_string(),
            ..Default::default()
        })
    }

    #[test]
    fn test_sections_sorted() {
        let store = SectionStore::new(default_registry());
        assert_eq!(store.sections(), vec!["attributes", "general", "listen", "resources"]);
    }

    #[test]
    fn test_unpopulated_tenant() {
        let store = SectionStore::new(default_registry());
        assert!(!store.is_populated("acme.org"));
        assert_eq!(
            store.get::<&str>("acme.org", &[]).unwrap_err(),
            ConfigError::TenantNotFound("acme.org".into())
        );

        let defaults = store.get_or_default("acme.org", &["general"]).unwrap();
        assert!(defaults["general"].eq_value(&GeneralSection::default()));
    }

    #[test]
    fn test_apply_populates_tenant() {
        let store = SectionStore::new(default_registry());
        let previous = store
            .apply("acme.org", Snapshot::from([("general".to_string(), general("n1"))]))
            .unwrap();
        assert!(previous["general"].eq_value(&GeneralSection::default()));

        assert!(store.is_populated("acme.org"));
        let all = store.get::<&str>("acme.org", &[]).unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(store.get_typed::<GeneralSection>("acme.org").unwrap().node_id, "n1");
        assert_eq!(store.get_typed::<ListenSection>("acme.org").unwrap().http, "127.0.0.1:2080");
    }

    #[test]
    fn test_apply_rejects_before_mutate() {
        let store = SectionStore::new(default_registry());
        store.swap("acme.org", "general", general("n1")).unwrap();

        let values = Snapshot::from([
            ("general".to_string(), general("n2")),
            ("nope".to_string(), general("n3")),
        ]);
        assert_eq!(
            store.apply("acme.org", values).unwrap_err(),
            ConfigError::SectionNotFound("nope".into())
        );
        assert_eq!(store.get_typed::<GeneralSection>("acme.org").unwrap().node_id, "n1");
    }

    #[test]
    fn test_apply_rejects_mismatched_value() {
        let store = SectionStore::new(default_registry());
        let err = store.swap("acme.org", "listen", general("n1")).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
        assert!(!store.is_populated("acme.org"));
    }

    #[test]
    fn test_subscribers_see_each_commit() {
        let store = SectionStore::new(default_registry());
        let mut general_rx = store.subscribe("general").unwrap();
        let mut listen_rx = store.subscribe("listen").unwrap();
        let mut attributes_rx = store.subscribe("attributes").unwrap();
        assert!(store.subscribe("nope").is_err());

        store
            .apply(
                "acme.org",
                Snapshot::from([
                    ("general".to_string(), general("n1")),
                    ("listen".to_string(), Arc::new(ListenSection::default()) as SharedValue),
                ]),
            )
            .unwrap();

        let expected = |section| SectionChange {
            tenant: "acme.org".into(),
            section,
        };
        assert_eq!(general_rx.try_recv().unwrap(), expected("general"));
        assert_eq!(listen_rx.try_recv().unwrap(), expected("listen"));
        assert!(attributes_rx.try_recv().is_err());

        store.swap("acme.org", "general", general("n2")).unwrap();
        assert_eq!(general_rx.try_recv().unwrap(), expected("general"));
        assert!(listen_rx.try_recv().is_err());
    }

    #[test]
    fn test_new_tenant_never_shows_uncommitted_defaults() {
        let store = Arc::new(SectionStore::new(default_registry()));
        let writer = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for i in 0..200 {
                    store.swap(&format!("t{}.org", i), "general", general("committed")).unwrap();
                }
            })
        };
        let reader = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for _ in 0..20 {
                    for i in 0..200 {
                        match store.get_typed::<GeneralSection>(&format!("t{}.org", i)) {
                            Ok(general) => assert_eq!(general.node_id, "committed"),
                            Err(e) => assert!(matches!(e, ConfigError::TenantNotFound(_))),
                        }
                    }
                }
            })
        };
        writer.join().unwrap();
        reader.join().unwrap();
    }

    #[test]
    fn test_tenants_are_isolated() {
        let store = SectionStore::new(default_registry());
        store.swap("a.org", "general", general("a")).unwrap();
        store.swap("b.org", "general", general("b")).unwrap();

        assert_eq!(store.get_typed::<GeneralSection>("a.org").unwrap().node_id, "a");
        assert_eq!(store.get_typed::<GeneralSection>("b.org").unwrap().node_id, "b");
        assert_eq!(store.tenants(), vec!["a.org".to_string(), "b.org".to_string()]);
    }

    #[test]
    fn test_concurrent_disjoint_writes() {
        let store = Arc::new(SectionStore::new(default_registry()));
        store.swap("acme.org", "general", general("start")).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for j in 0..100 {
                        if i % 2 == 0 {
                            store.swap("acme.org", "general", general(&format!("{}-{}", i, j))).unwrap();
                        } else {
                            let listen = ListenSection {
                                http: format!("127.0.0.1:{}", 3000 + j),
                                ..Default::default()
                            };
                            store.swap("acme.org", "listen", Arc::new(listen)).unwrap();
                        }
                        let snap = store.get("acme.org", &["general", "listen"]).unwrap();
                        assert_eq!(snap.len(), 2);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let general = store.get_typed::<GeneralSection>("acme.org").unwrap();
        assert!(general.node_id.ends_with("-99"));
        let listen = store.get_typed::<ListenSection>("acme.org").unwrap();
        assert_eq!(listen.http, "127.0.0.1:3099");
    }
}

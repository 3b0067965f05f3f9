//! The configuration service: one owner for store, planner, reload and persistence.
//!
//! Created once at startup and shared as `Arc<ConfigService>` with the RPC
//! dispatcher, the watcher and the signal handlers.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::{ConfigError, ConfigResult};
use crate::observability::metrics;
use crate::persistence::PersistenceBridge;
use crate::planner::{PartialPayload, UpdatePlanner, UpdateRequest};
use crate::reload::{ReloadCoordinator, ReloadRequest};
use crate::section::{is_all, SectionRegistry};
use crate::store::{SectionStore, Snapshot};

#[derive(Debug, Clone)]
pub struct ServiceSettings {
    /// Tenant used when a request leaves it empty.
    pub default_tenant: String,
    /// Timeout for fetching reload sources over HTTP.
    pub http_timeout: Duration,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            default_tenant: "example.org".to_string(),
            http_timeout: Duration::from_secs(10),
        }
    }
}

pub struct ConfigService {
    store: Arc<SectionStore>,
    planner: UpdatePlanner,
    reloader: Arc<ReloadCoordinator>,
    persistence: Arc<PersistenceBridge>,
    default_tenant: String,
}

impl ConfigService {
    pub fn new(registry: Arc<SectionRegistry>, settings: ServiceSettings) -> Self {
        let store = Arc::new(SectionStore::new(Arc::clone(&registry)));
        let persistence = Arc::new(PersistenceBridge::new(registry));
        let reloader = Arc::new(ReloadCoordinator::new(
            Arc::clone(&store),
            Arc::clone(&persistence),
            settings.http_timeout,
        ));
        Self {
            planner: UpdatePlanner::new(Arc::clone(&store)),
            store,
            reloader,
            persistence,
            default_tenant: settings.default_tenant,
        }
    }

    pub fn store(&self) -> &Arc<SectionStore> {
        &self.store
    }

    pub fn persistence(&self) -> &Arc<PersistenceBridge> {
        &self.persistence
    }

    pub fn reloader(&self) -> &Arc<ReloadCoordinator> {
        &self.reloader
    }

    pub fn registry(&self) -> &Arc<SectionRegistry> {
        self.store.registry()
    }

    pub fn default_tenant(&self) -> &str {
        &self.default_tenant
    }

    /// Empty tenant means the default tenant.
    pub fn resolve_tenant<'a>(&'a self, tenant: &'a str) -> &'a str {
        if tenant.is_empty() {
            &self.default_tenant
        } else {
            tenant
        }
    }

    /// Write every section's default value for `tenant` unless it already has live state.
    pub fn populate_defaults(&self, tenant: &str) -> ConfigResult<()> {
        let tenant = self.resolve_tenant(tenant);
        if self.store.is_populated(tenant) {
            return Ok(());
        }
        let defaults = self.store.get_or_default::<&str>(tenant, &[])?;
        self.store.apply(tenant, defaults)?;
        Ok(())
    }

    /// Current values of `sections` (empty or `*all` = every section).
    ///
    /// A tenant with no live state falls back to the backing store when every
    /// section is requested and a backing store is attached.
    pub async fn get_config(&self, tenant: &str, sections: &[String]) -> ConfigResult<Snapshot> {
        let tenant = self.resolve_tenant(tenant);
        if !self.store.is_populated(tenant)
            && (sections.is_empty() || is_all(sections))
            && self.persistence.is_configured()
        {
            let values = self.persistence.load(tenant, sections).await?;
            metrics::record_read("backing_store");
            return Ok(values);
        }
        let values = self.store.get(tenant, sections)?;
        metrics::record_read("live");
        Ok(values)
    }

    /// Like [`get_config`](Self::get_config), with each section as JSON.
    pub async fn get_config_values(&self, tenant: &str, sections: &[String]) -> ConfigResult<BTreeMap<String, Value>> {
        self.get_config(tenant, sections)
            .await?
            .into_iter()
            .map(|(name, value)| Ok((name, value.to_json()?)))
            .collect()
    }

    /// Canonical compact text of `sections`.
    pub async fn get_config_as_json(&self, tenant: &str, sections: &[String]) -> ConfigResult<String> {
        let values = self.get_config(tenant, sections).await?;
        self.persistence.serialize_as_text(&values)
    }

    pub fn set_config(
        &self,
        tenant: &str,
        payload: PartialPayload,
        dry_run: bool,
        cancel: &CancellationToken,
    ) -> ConfigResult<()> {
        let request = UpdateRequest::new(self.resolve_tenant(tenant), payload).dry_run(dry_run);
        self.planner.execute(request, cancel)
    }

    pub fn set_config_from_json(
        &self,
        tenant: &str,
        raw: &str,
        dry_run: bool,
        cancel: &CancellationToken,
    ) -> ConfigResult<()> {
        let payload = match UpdatePlanner::parse_raw(raw) {
            Ok(payload) => payload,
            Err(e) => {
                metrics::record_update(e.kind().as_str(), dry_run);
                return Err(e);
            }
        };
        self.set_config(tenant, payload, dry_run, cancel)
    }

    pub async fn reload_config(
        &self,
        tenant: &str,
        section: &str,
        path: &str,
        dry_run: bool,
        cancel: &CancellationToken,
    ) -> ConfigResult<()> {
        let request = ReloadRequest {
            tenant: self.resolve_tenant(tenant).to_string(),
            section: section.to_string(),
            path: path.to_string(),
            dry_run,
        };
        self.reloader.reload(request, cancel).await
    }

    /// Copy live `sections` (empty or `*all` = every section) to the backing store.
    pub async fn store_config_in_db(&self, tenant: &str, sections: &[String]) -> ConfigResult<()> {
        if !self.persistence.is_configured() {
            metrics::record_store_write(ConfigError::NoBackingStore.kind().as_str());
            return Err(ConfigError::NoBackingStore);
        }
        let tenant = self.resolve_tenant(tenant);
        let values = self.store.get(tenant, sections)?;
        self.persistence.store(tenant, sections, &values).await
    }
}

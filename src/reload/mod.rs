//! Hot reload of sections from an external source.
//!
//! # Data Flow
//! ```text
//! ReloadRequest
//!     → source.rs (file / directory / URL, or the backing store when no path)
//!     → default value overlaid with the source fields, decoded, validated
//!     → dry run: stop
//!     → SectionStore::apply (one multi-slot swap)
//! ```
//!
//! # Design Decisions
//! - All I/O finishes before any slot lock is taken
//! - The source is authoritative: fields it omits fall back to defaults
//! - Failures are reported to the caller and never retried

pub mod source;
pub mod state;
pub mod watcher;

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::error::{ConfigError, ConfigResult};
use crate::observability::metrics;
use crate::persistence::PersistenceBridge;
use crate::section::{is_all, overlay_value, patch_from_json};
use crate::store::{SectionStore, Snapshot};

pub use state::ReloadState;
pub use watcher::ConfigWatcher;

#[derive(Debug, Clone, Default)]
pub struct ReloadRequest {
    pub tenant: String,
    /// Section to reload; empty or `*all` reloads every section the source defines.
    pub section: String,
    pub path: String,
    pub dry_run: bool,
}

pub struct ReloadCoordinator {
    store: Arc<SectionStore>,
    persistence: Arc<PersistenceBridge>,
    http_timeout: Duration,
    state: Mutex<ReloadState>,
}

impl ReloadCoordinator {
    pub fn new(store: Arc<SectionStore>, persistence: Arc<PersistenceBridge>, http_timeout: Duration) -> Self {
        Self {
            store,
            persistence,
            http_timeout,
            state: Mutex::new(ReloadState::Idle),
        }
    }

    /// Last recorded transition.
    pub fn state(&self) -> ReloadState {
        self.state.lock().clone()
    }

    fn transition(&self, next: ReloadState) {
        tracing::debug!(state = next.name(), "Reload state changed");
        *self.state.lock() = next;
    }

    pub async fn reload(&self, request: ReloadRequest, cancel: &CancellationToken) -> ConfigResult<()> {
        let result = self.run(&request, cancel).await;
        match &result {
            Ok(()) => tracing::info!(
                tenant = %request.tenant,
                section = %request.section,
                path = %request.path,
                dry_run = request.dry_run,
                "Config reloaded"
            ),
            Err(e) => {
                self.transition(ReloadState::Failed { reason: e.to_string() });
                tracing::warn!(
                    tenant = %request.tenant,
                    section = %request.section,
                    path = %request.path,
                    error = %e,
                    "Config reload failed"
                );
            }
        }
        metrics::record_reload(metrics::outcome(&result));
        result
    }

    async fn run(&self, request: &ReloadRequest, cancel: &CancellationToken) -> ConfigResult<()> {
        self.transition(ReloadState::Validating {
            path: request.path.clone(),
        });

        let names = self.target_sections(&request.section)?;
        let values = if request.path.is_empty() && self.persistence.is_configured() {
            tokio::select! {
                loaded = self.persistence.load(&request.tenant, &names) => self.from_backing_store(request, loaded?)?,
                _ = cancel.cancelled() => return Err(ConfigError::Cancelled),
            }
        } else {
            let doc = tokio::select! {
                doc = source::fetch(&request.path, self.http_timeout) => doc?,
                _ = cancel.cancelled() => return Err(ConfigError::Cancelled),
            };
            self.build_values(request, &names, doc)?
        };

        self.store
            .registry()
            .check_sanity(&self.store.prospective(&request.tenant, &values)?)?;
        if cancel.is_cancelled() {
            return Err(ConfigError::Cancelled);
        }

        let sections: Vec<String> = values.keys().cloned().collect();
        self.transition(ReloadState::Loaded {
            sections: sections.clone(),
        });
        if request.dry_run {
            return Ok(());
        }

        self.store.apply(&request.tenant, values)?;
        self.transition(ReloadState::Swapped { sections });
        Ok(())
    }

    fn target_sections(&self, section: &str) -> ConfigResult<Vec<&'static str>> {
        if section.is_empty() || is_all(&[section]) {
            return Ok(self.store.registry().names().collect());
        }
        Ok(vec![self.store.registry().get(section)?.name()])
    }

    fn missing(request: &ReloadRequest) -> ConfigError {
        ConfigError::MissingDefinition {
            section: request.section.clone(),
            path: request.path.clone(),
        }
    }

    fn from_backing_store(&self, request: &ReloadRequest, values: Snapshot) -> ConfigResult<Snapshot> {
        if values.is_empty() {
            return Err(Self::missing(request));
        }
        Ok(values)
    }

    fn build_values(
        &self,
        request: &ReloadRequest,
        names: &[&'static str],
        mut doc: Map<String, Value>,
    ) -> ConfigResult<Snapshot> {
        let registry = self.store.registry();
        let mut values = Snapshot::new();
        for &name in names {
            let Some(section_doc) = doc.remove(name) else {
                continue;
            };
            let entry = registry.get(name)?;
            let patch = patch_from_json(name, section_doc)?;
            values.insert(name.to_string(), overlay_value(entry, &entry.default_value(), &patch)?);
        }
        if values.is_empty() {
            return Err(Self::missing(request));
        }
        Ok(values)
    }
}

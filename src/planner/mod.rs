//! Partial update planning and commit.
//!
//! # Data Flow
//! ```text
//! raw text ─→ relaxed::normalize ─→ serde_json ─┐
//!                                               ▼
//! UpdateRequest ─→ plan (read snapshot, overlay, decode, validate, sanity) ─→ Plan
//!                                                                     │
//!                        dry run: dropped ◀───────────────────────────┤
//!                        otherwise: SectionStore::apply ◀─────────────┘
//! ```
//!
//! # Design Decisions
//! - Planning never takes a write lock; a dry run is just a plan that is dropped
//! - Cancellation is honoured between sections, never inside commit

pub mod relaxed;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::error::{ConfigError, ConfigResult};
use crate::observability::metrics;
use crate::section::{overlay_value, SectionPatch};
use crate::store::{SectionStore, Snapshot};

/// Section name → field patch.
pub type PartialPayload = BTreeMap<String, SectionPatch>;

#[derive(Debug, Clone, Default)]
pub struct UpdateRequest {
    pub tenant: String,
    pub payload: PartialPayload,
    pub dry_run: bool,
}

impl UpdateRequest {
    pub fn new(tenant: impl Into<String>, payload: PartialPayload) -> Self {
        Self {
            tenant: tenant.into(),
            payload,
            dry_run: false,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Fully validated prospective values, not yet visible to readers.
#[derive(Debug)]
pub struct Plan {
    tenant: String,
    values: Snapshot,
    dry_run: bool,
}

impl Plan {
    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    pub fn values(&self) -> &Snapshot {
        &self.values
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn sections(&self) -> Vec<&str> {
        self.values.keys().map(String::as_str).collect()
    }
}

pub struct UpdatePlanner {
    store: Arc<SectionStore>,
}

impl UpdatePlanner {
    pub fn new(store: Arc<SectionStore>) -> Self {
        Self { store }
    }

    /// Compute new values for every section in the request. Mutates nothing.
    pub fn plan(&self, request: UpdateRequest, cancel: &CancellationToken) -> ConfigResult<Plan> {
        let UpdateRequest {
            tenant,
            payload,
            dry_run,
        } = request;

        if payload.is_empty() {
            return Ok(Plan {
                tenant,
                values: Snapshot::new(),
                dry_run,
            });
        }

        let registry = self.store.registry();
        for name in payload.keys() {
            registry.get(name)?;
        }

        let names: Vec<&str> = payload.keys().map(String::as_str).collect();
        let current = self.store.get_or_default(&tenant, &names)?;

        let mut values = Snapshot::new();
        for (name, patch) in &payload {
            if cancel.is_cancelled() {
                return Err(ConfigError::Cancelled);
            }
            let entry = registry.get(name)?;
            let base = current
                .get(name)
                .ok_or_else(|| ConfigError::SectionNotFound(name.clone()))?;
            values.insert(name.clone(), overlay_value(entry, base, patch)?);
        }
        registry.check_sanity(&self.store.prospective(&tenant, &values)?)?;

        if cancel.is_cancelled() {
            return Err(ConfigError::Cancelled);
        }

        Ok(Plan {
            tenant,
            values,
            dry_run,
        })
    }

    /// Make a plan visible. A dry-run plan is dropped and the store is left as is.
    ///
    /// Returns the values that were replaced.
    pub fn commit(&self, plan: Plan) -> ConfigResult<Snapshot> {
        if plan.dry_run || plan.values.is_empty() {
            return Ok(Snapshot::new());
        }
        let started = Instant::now();
        let previous = self.store.apply(&plan.tenant, plan.values)?;
        metrics::record_commit_duration(started.elapsed());
        Ok(previous)
    }

    /// Plan and commit in one step.
    pub fn execute(&self, request: UpdateRequest, cancel: &CancellationToken) -> ConfigResult<()> {
        let tenant = request.tenant.clone();
        let dry_run = request.dry_run;
        let result = self.plan(request, cancel).and_then(|plan| {
            let sections = plan.sections().join(",");
            self.commit(plan)?;
            tracing::info!(tenant = %tenant, sections = %sections, dry_run, "Config update applied");
            Ok(())
        });

        if let Err(e) = &result {
            tracing::warn!(tenant = %tenant, dry_run, error = %e, "Config update rejected");
        }
        metrics::record_update(metrics::outcome(&result), dry_run);
        result
    }

    /// Parse a relaxed JSON document into a partial payload.
    pub fn parse_raw(raw: &str) -> ConfigResult<PartialPayload> {
        let normalized = relaxed::normalize(raw)?;
        if normalized.trim().is_empty() {
            return Ok(PartialPayload::new());
        }
        serde_json::from_str(&normalized).map_err(|e| ConfigError::MalformedPayload(e.to_string()))
    }
}

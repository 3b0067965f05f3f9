//! Runtime context dynamic options are resolved against.

use std::collections::{BTreeMap, HashSet};

use crate::section::value::FieldValue;

/// What a consuming subsystem knows about the event it is processing.
#[derive(Debug, Clone, Default)]
pub struct OptContext {
    tenant: String,
    active_filters: HashSet<String>,
    api_opts: BTreeMap<String, FieldValue>,
}

impl OptContext {
    pub fn new(tenant: impl Into<String>) -> Self {
        Self {
            tenant: tenant.into(),
            ..Default::default()
        }
    }

    /// Filters the caller has already evaluated as passing.
    pub fn with_filters<I, S>(mut self, filters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.active_filters.extend(filters.into_iter().map(Into::into));
        self
    }

    /// Per-request options that take precedence over configured lists.
    pub fn with_api_opts(mut self, opts: BTreeMap<String, FieldValue>) -> Self {
        self.api_opts = opts;
        self
    }

    pub fn with_api_opt(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.api_opts.insert(name.into(), value.into());
        self
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    pub fn is_filter_active(&self, id: &str) -> bool {
        self.active_filters.contains(id)
    }

    pub fn api_opt(&self, name: &str) -> Option<&FieldValue> {
        self.api_opts.get(name)
    }
}

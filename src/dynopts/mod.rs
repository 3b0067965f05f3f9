//! Context-dependent option lists.
//!
//! # Data Flow
//! ```text
//! section value (owned by the store)
//!     → DynamicOpts<T> field, replaced wholesale on update/reload
//!
//! consuming subsystem, per event:
//!     → builds OptContext (tenant, active filters, request options)
//!     → DynamicOpts::resolve walks entries in order
//!     → first entry whose tenant scope and filters match wins
//!     → no match: caller falls back to its built-in default
//! ```
//!
//! # Design Decisions
//! - Entries are never edited in place; a new list replaces the old one
//! - Absent criteria always match, so a trailing catch-all acts as default
//! - Filters are evaluated by the caller; the list only checks membership

pub mod context;
pub mod matcher;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub use context::OptContext;
pub use matcher::{AndMatcher, FilterSetMatcher, OptMatcher, TenantMatcher, ANY_TENANT};

use crate::error::{ConfigError, ConfigResult};

/// One filter-gated override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DynamicOpt<T> {
    #[serde(rename = "Tenant", default)]
    pub tenant: String,

    #[serde(rename = "FilterIDs", default)]
    pub filter_ids: Vec<String>,

    #[serde(rename = "Value")]
    pub value: T,
}

impl<T> DynamicOpt<T> {
    /// Entry that matches every context.
    pub fn catch_all(value: T) -> Self {
        Self {
            tenant: String::new(),
            filter_ids: Vec::new(),
            value,
        }
    }

    pub fn new(tenant: impl Into<String>, filter_ids: Vec<String>, value: T) -> Self {
        Self {
            tenant: tenant.into(),
            filter_ids,
            value,
        }
    }

    pub fn criteria(&self) -> AndMatcher<'_> {
        AndMatcher::new(vec![
            Box::new(TenantMatcher::new(&self.tenant)),
            Box::new(FilterSetMatcher::new(&self.filter_ids)),
        ])
    }

    pub fn matches(&self, ctx: &OptContext) -> bool {
        self.criteria().matches(ctx)
    }
}

/// Ordered list of overrides; order is significant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DynamicOpts<T>(Vec<DynamicOpt<T>>);

impl<T> Default for DynamicOpts<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T> From<Vec<DynamicOpt<T>>> for DynamicOpts<T> {
    fn from(entries: Vec<DynamicOpt<T>>) -> Self {
        Self(entries)
    }
}

impl<T> DynamicOpts<T> {
    pub fn new(entries: Vec<DynamicOpt<T>>) -> Self {
        Self(entries)
    }

    /// Single catch-all entry.
    pub fn always(value: T) -> Self {
        Self(vec![DynamicOpt::catch_all(value)])
    }

    pub fn entries(&self) -> &[DynamicOpt<T>] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First entry matching `ctx`, or `None` when nothing overrides.
    pub fn resolve(&self, ctx: &OptContext) -> Option<&T> {
        self.0.iter().find(|opt| opt.matches(ctx)).map(|opt| &opt.value)
    }

    pub fn resolve_or(&self, ctx: &OptContext, default: T) -> T
    where
        T: Clone,
    {
        self.resolve(ctx).cloned().unwrap_or(default)
    }

    /// Like [`resolve`](Self::resolve), but request options named in
    /// `option_names` are checked first, in order.
    pub fn resolve_with_override(&self, ctx: &OptContext, option_names: &[&str]) -> ConfigResult<Option<T>>
    where
        T: Clone + DeserializeOwned,
    {
        for name in option_names {
            if let Some(raw) = ctx.api_opt(name) {
                let value = serde_json::from_value(raw.clone().into_json())
                    .map_err(|e| ConfigError::MalformedPayload(format!("option <{}>: {}", name, e)))?;
                return Ok(Some(value));
            }
        }
        Ok(self.resolve(ctx).cloned())
    }
}

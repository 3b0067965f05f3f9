//! Semantic checks on the bootstrap config.
//!
//! Returns every problem found, not just the first.

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::{BackingStoreKind, ServiceConfig};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.rpc.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "rpc.bind_address",
            format!("'{}' is not a socket address", config.rpc.bind_address),
        ));
    }
    if config.rpc.request_timeout_secs == 0 {
        errors.push(ValidationError::new("rpc.request_timeout_secs", "must be > 0"));
    }

    if config.sections.default_tenant.trim().is_empty() {
        errors.push(ValidationError::new("sections.default_tenant", "must not be empty"));
    }

    let store = &config.backing_store;
    if store.kind == BackingStoreKind::JsonFile && store.path.as_deref().map_or(true, str::is_empty) {
        errors.push(ValidationError::new("backing_store.path", "required when kind = \"json_file\""));
    }
    if store.kind == BackingStoreKind::None && store.load_on_start {
        errors.push(ValidationError::new(
            "backing_store.load_on_start",
            "requires a backing store kind other than \"none\"",
        ));
    }

    if config.reload.http_timeout_secs == 0 {
        errors.push(ValidationError::new("reload.http_timeout_secs", "must be > 0"));
    }

    let obs = &config.observability;
    if !matches!(obs.log_format.as_str(), "pretty" | "json") {
        errors.push(ValidationError::new(
            "observability.log_format",
            format!("'{}' is not one of pretty, json", obs.log_format),
        ));
    }
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", obs.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

//! Service bootstrap settings.
//!
//! These configure the daemon itself (listener, backing store, logging).
//! The live sections it serves are a separate concern.

use serde::{Deserialize, Serialize};

/// Root of the daemon's TOML file.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    pub rpc: RpcConfig,
    pub sections: SectionsConfig,
    pub backing_store: BackingStoreConfig,
    pub reload: ReloadConfig,
    pub observability: ObservabilityConfig,
}

/// JSON-RPC listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RpcConfig {
    /// Bind address (e.g., "127.0.0.1:2080").
    pub bind_address: String,

    /// Bearer token required on `/jsonrpc`; unset disables auth.
    pub api_key: Option<String>,

    pub request_timeout_secs: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:2080".to_string(),
            api_key: None,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SectionsConfig {
    /// File, directory or URL loaded into the default tenant at startup.
    pub config_path: Option<String>,

    /// Tenant used when a request leaves it empty.
    pub default_tenant: String,
}

impl Default for SectionsConfig {
    fn default() -> Self {
        Self {
            config_path: None,
            default_tenant: "example.org".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackingStoreKind {
    #[default]
    None,
    Memory,
    JsonFile,
}

impl BackingStoreKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackingStoreKind::None => "none",
            BackingStoreKind::Memory => "memory",
            BackingStoreKind::JsonFile => "json_file",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BackingStoreConfig {
    pub kind: BackingStoreKind,

    /// File used by `json_file`.
    pub path: Option<String>,

    /// Overlay stored sections on top of `config_path` at startup.
    pub load_on_start: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReloadConfig {
    /// Reload every section from this path whenever it changes.
    pub watch_path: Option<String>,

    pub http_timeout_secs: u64,
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self {
            watch_path: None,
            http_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// "pretty" or "json".
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

//! Wire types for the JSON-RPC surface.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::error::{ConfigError, ErrorKind};
use crate::planner::PartialPayload;
use crate::section::FieldValue;

/// Per-request options, passed through to option resolution.
pub type ApiOpts = BTreeMap<String, FieldValue>;

/// Reply of every mutating method.
pub const OK: &str = "OK";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SectionsParams {
    #[serde(rename = "Tenant")]
    pub tenant: String,
    #[serde(rename = "Sections")]
    pub sections: Vec<String>,
    #[serde(rename = "APIOpts")]
    pub api_opts: ApiOpts,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SetConfigParams {
    #[serde(rename = "Tenant")]
    pub tenant: String,
    #[serde(rename = "Config")]
    pub config: PartialPayload,
    #[serde(rename = "DryRun")]
    pub dry_run: bool,
    #[serde(rename = "APIOpts")]
    pub api_opts: ApiOpts,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SetConfigFromJsonParams {
    #[serde(rename = "Tenant")]
    pub tenant: String,
    /// Relaxed JSON text.
    #[serde(rename = "Config")]
    pub config: String,
    #[serde(rename = "DryRun")]
    pub dry_run: bool,
    #[serde(rename = "APIOpts")]
    pub api_opts: ApiOpts,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ReloadParams {
    #[serde(rename = "Tenant")]
    pub tenant: String,
    #[serde(rename = "Section")]
    pub section: String,
    #[serde(rename = "Path")]
    pub path: String,
    #[serde(rename = "DryRun")]
    pub dry_run: bool,
    #[serde(rename = "APIOpts")]
    pub api_opts: ApiOpts,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ErrorBody {
    pub operation: String,
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RpcResponse {
    pub id: Value,
    pub result: Option<Value>,
    pub error: Option<ErrorBody>,
}

impl RpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, error: &ApiError) -> Self {
        Self {
            id,
            result: None,
            error: Some(ErrorBody {
                operation: error.operation.clone(),
                kind: error.kind().as_str().to_string(),
                message: error.to_string(),
            }),
        }
    }
}

/// Why a call failed, before the operation name is attached.
#[derive(Debug, Error)]
pub enum RpcFault {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("unknown method <{0}>")]
    UnknownMethod(String),

    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl RpcFault {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RpcFault::Config(e) => e.kind(),
            RpcFault::UnknownMethod(_) => ErrorKind::NotFound,
            RpcFault::InvalidParams(_) | RpcFault::InvalidRequest(_) => ErrorKind::Validation,
        }
    }
}

/// A failure tagged with the operation that produced it.
///
/// Displays exactly as the underlying error.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct ApiError {
    pub operation: String,
    pub source: RpcFault,
}

impl ApiError {
    pub fn new(operation: impl Into<String>, source: impl Into<RpcFault>) -> Self {
        Self {
            operation: operation.into(),
            source: source.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}

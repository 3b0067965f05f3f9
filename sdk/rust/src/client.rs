use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Structured error returned by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub operation: String,
    /// validation, precondition, not_found, backend or cancelled.
    pub kind: String,
    pub message: String,
}

#[derive(Debug)]
pub enum ClientError {
    Http(reqwest::Error),
    Status { status: u16, body: String },
    Rpc(RpcError),
    Decode(serde_json::Error),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Http(e) => write!(f, "HTTP error: {}", e),
            ClientError::Status { status, body } => write!(f, "service returned status {}: {}", status, body),
            ClientError::Rpc(e) => write!(f, "{}", e.message),
            ClientError::Decode(e) => write!(f, "decode error: {}", e),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::Http(e)
    }
}

#[derive(Deserialize)]
struct Envelope {
    result: Option<Value>,
    error: Option<RpcError>,
}

/// Typed client for the `ConfigSv1` methods.
pub struct ConfigClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    next_id: AtomicU64,
}

impl ConfigClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: None,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn with_api_key(mut self, key: &str) -> Self {
        self.api_key = Some(key.to_string());
        self
    }

    /// Raw call. Returns the `result` member or the service's error object.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, ClientError> {
        let body = json!({
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
            "method": method,
            "params": params,
        });

        let mut req = self.client.post(format!("{}/jsonrpc", self.base_url)).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let resp = req.send().await?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let envelope: Envelope = serde_json::from_str(&text).map_err(ClientError::Decode)?;
        match (envelope.error, envelope.result) {
            (Some(err), _) => Err(ClientError::Rpc(err)),
            (None, result) => Ok(result.unwrap_or(Value::Null)),
        }
    }

    async fn call_typed<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, ClientError> {
        let value = self.call(method, params).await?;
        serde_json::from_value(value).map_err(ClientError::Decode)
    }

    async fn call_ok(&self, method: &str, params: Value) -> Result<(), ClientError> {
        self.call(method, params).await.map(|_| ())
    }

    pub async fn get_config(&self, tenant: &str, sections: &[&str]) -> Result<BTreeMap<String, Value>, ClientError> {
        self.call_typed("ConfigSv1.GetConfig", json!({"Tenant": tenant, "Sections": sections}))
            .await
    }

    pub async fn get_config_as_json(&self, tenant: &str, sections: &[&str]) -> Result<String, ClientError> {
        self.call_typed("ConfigSv1.GetConfigAsJSON", json!({"Tenant": tenant, "Sections": sections}))
            .await
    }

    /// `config` is `{section: {field: value}}`.
    pub async fn set_config(&self, tenant: &str, config: Value, dry_run: bool) -> Result<(), ClientError> {
        self.call_ok(
            "ConfigSv1.SetConfig",
            json!({"Tenant": tenant, "Config": config, "DryRun": dry_run}),
        )
        .await
    }

    pub async fn set_config_from_json(&self, tenant: &str, raw: &str, dry_run: bool) -> Result<(), ClientError> {
        self.call_ok(
            "ConfigSv1.SetConfigFromJSON",
            json!({"Tenant": tenant, "Config": raw, "DryRun": dry_run}),
        )
        .await
    }

    pub async fn reload_config(&self, tenant: &str, section: &str, path: &str, dry_run: bool) -> Result<(), ClientError> {
        self.call_ok(
            "ConfigSv1.ReloadConfig",
            json!({"Tenant": tenant, "Section": section, "Path": path, "DryRun": dry_run}),
        )
        .await
    }

    pub async fn store_config_in_db(&self, tenant: &str, sections: &[&str]) -> Result<(), ClientError> {
        self.call_ok("ConfigSv1.StoreCfgInDB", json!({"Tenant": tenant, "Sections": sections}))
            .await
    }

    pub async fn health(&self) -> Result<Value, ClientError> {
        let resp = self.client.get(format!("{}/health", self.base_url)).send().await?;
        Ok(resp.json().await?)
    }
}

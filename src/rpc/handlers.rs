//! One function per RPC method. Params arrive decoded; the dispatcher
//! encodes the result.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Json;
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::ConfigResult;
use crate::rpc::types::{ApiOpts, ReloadParams, SectionsParams, SetConfigFromJsonParams, SetConfigParams, OK};
use crate::service::ConfigService;

fn log_api_opts(method: &str, opts: &ApiOpts) {
    if !opts.is_empty() {
        tracing::debug!(method, opts = ?opts.keys().collect::<Vec<_>>(), "Request carries API options");
    }
}

pub async fn get_config(service: Arc<ConfigService>, params: SectionsParams) -> ConfigResult<BTreeMap<String, Value>> {
    log_api_opts("GetConfig", &params.api_opts);
    service.get_config_values(&params.tenant, &params.sections).await
}

pub async fn get_config_as_json(service: Arc<ConfigService>, params: SectionsParams) -> ConfigResult<String> {
    log_api_opts("GetConfigAsJSON", &params.api_opts);
    service.get_config_as_json(&params.tenant, &params.sections).await
}

pub async fn set_config(
    service: Arc<ConfigService>,
    params: SetConfigParams,
    cancel: CancellationToken,
) -> ConfigResult<&'static str> {
    log_api_opts("SetConfig", &params.api_opts);
    service.set_config(&params.tenant, params.config, params.dry_run, &cancel)?;
    Ok(OK)
}

pub async fn set_config_from_json(
    service: Arc<ConfigService>,
    params: SetConfigFromJsonParams,
    cancel: CancellationToken,
) -> ConfigResult<&'static str> {
    log_api_opts("SetConfigFromJSON", &params.api_opts);
    service.set_config_from_json(&params.tenant, &params.config, params.dry_run, &cancel)?;
    Ok(OK)
}

pub async fn reload_config(
    service: Arc<ConfigService>,
    params: ReloadParams,
    cancel: CancellationToken,
) -> ConfigResult<&'static str> {
    log_api_opts("ReloadConfig", &params.api_opts);
    service
        .reload_config(&params.tenant, &params.section, &params.path, params.dry_run, &cancel)
        .await?;
    Ok(OK)
}

pub async fn store_config_in_db(service: Arc<ConfigService>, params: SectionsParams) -> ConfigResult<&'static str> {
    log_api_opts("StoreCfgInDB", &params.api_opts);
    service.store_config_in_db(&params.tenant, &params.sections).await?;
    Ok(OK)
}

#[derive(Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

//! Method name → handler table.
//!
//! Built once at startup; dispatch is a map lookup, not reflection.

use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::{ConfigError, ConfigResult};
use crate::rpc::handlers;
use crate::rpc::types::{ApiError, RpcFault, RpcRequest, RpcResponse};
use crate::service::ConfigService;

pub const GET_CONFIG: &str = "ConfigSv1.GetConfig";
pub const GET_CONFIG_AS_JSON: &str = "ConfigSv1.GetConfigAsJSON";
pub const SET_CONFIG: &str = "ConfigSv1.SetConfig";
pub const SET_CONFIG_FROM_JSON: &str = "ConfigSv1.SetConfigFromJSON";
pub const RELOAD_CONFIG: &str = "ConfigSv1.ReloadConfig";
pub const STORE_CFG_IN_DB: &str = "ConfigSv1.StoreCfgInDB";

#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, params: Value, cancel: CancellationToken) -> Result<Value, RpcFault>;
}

/// Decodes `P`, runs `F`, encodes `R`.
pub struct TypedHandler<P, R, F> {
    f: F,
    _marker: PhantomData<fn(P) -> R>,
}

impl<P, R, F, Fut> TypedHandler<P, R, F>
where
    F: Fn(P, CancellationToken) -> Fut,
    Fut: Future<Output = ConfigResult<R>>,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<P, R, F, Fut> Handler for TypedHandler<P, R, F>
where
    P: DeserializeOwned + Send + 'static,
    R: Serialize + Send + 'static,
    F: Fn(P, CancellationToken) -> Fut + Send + Sync,
    Fut: Future<Output = ConfigResult<R>> + Send,
{
    async fn call(&self, params: Value, cancel: CancellationToken) -> Result<Value, RpcFault> {
        let params = match params {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };
        let params: P = serde_json::from_value(params).map_err(|e| RpcFault::InvalidParams(e.to_string()))?;
        let result = (self.f)(params, cancel).await?;
        serde_json::to_value(result).map_err(|e| RpcFault::Config(ConfigError::Backend(e.to_string())))
    }
}

pub struct Dispatcher {
    handlers: HashMap<&'static str, Arc<dyn Handler>>,
}

impl Dispatcher {
    pub fn new(service: Arc<ConfigService>) -> Self {
        let mut dispatcher = Self {
            handlers: HashMap::new(),
        };

        let svc = Arc::clone(&service);
        dispatcher.register(
            GET_CONFIG,
            TypedHandler::new(move |p, _| handlers::get_config(Arc::clone(&svc), p)),
        );
        let svc = Arc::clone(&service);
        dispatcher.register(
            GET_CONFIG_AS_JSON,
            TypedHandler::new(move |p, _| handlers::get_config_as_json(Arc::clone(&svc), p)),
        );
        let svc = Arc::clone(&service);
        dispatcher.register(
            SET_CONFIG,
            TypedHandler::new(move |p, cancel| handlers::set_config(Arc::clone(&svc), p, cancel)),
        );
        let svc = Arc::clone(&service);
        dispatcher.register(
            SET_CONFIG_FROM_JSON,
            TypedHandler::new(move |p, cancel| handlers::set_config_from_json(Arc::clone(&svc), p, cancel)),
        );
        let svc = Arc::clone(&service);
        dispatcher.register(
            RELOAD_CONFIG,
            TypedHandler::new(move |p, cancel| handlers::reload_config(Arc::clone(&svc), p, cancel)),
        );
        let svc = service;
        dispatcher.register(
            STORE_CFG_IN_DB,
            TypedHandler::new(move |p, _| handlers::store_config_in_db(Arc::clone(&svc), p)),
        );

        dispatcher
    }

    pub fn register<H: Handler + 'static>(&mut self, method: &'static str, handler: H) {
        self.handlers.insert(method, Arc::new(handler));
    }

    /// Registered method names, sorted.
    pub fn methods(&self) -> Vec<&'static str> {
        let mut methods: Vec<_> = self.handlers.keys().copied().collect();
        methods.sort_unstable();
        methods
    }

    /// Run one request to completion.
    ///
    /// The handler runs on its own task. If the caller goes away, the task is
    /// cancelled; a commit that already started still finishes.
    pub async fn dispatch(&self, request: RpcRequest) -> RpcResponse {
        let RpcRequest { id, method, params } = request;

        let Some(handler) = self.handlers.get(method.as_str()).cloned() else {
            tracing::warn!(method = %method, "Unknown RPC method");
            let err = ApiError::new(method.clone(), RpcFault::UnknownMethod(method));
            return RpcResponse::failure(id, &err);
        };

        let cancel = CancellationToken::new();
        let _cancel_on_drop = cancel.clone().drop_guard();
        let task = tokio::spawn(async move { handler.call(params, cancel).await });

        let result = match task.await {
            Ok(result) => result,
            Err(e) => Err(RpcFault::Config(ConfigError::Backend(format!("handler task failed: {}", e)))),
        };

        match result {
            Ok(value) => RpcResponse::success(id, value),
            Err(fault) => {
                let err = ApiError::new(method, fault);
                tracing::debug!(operation = %err.operation, kind = %err.kind(), error = %err, "RPC call failed");
                RpcResponse::failure(id, &err)
            }
        }
    }
}

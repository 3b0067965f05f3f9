//! HTTP server carrying the JSON-RPC endpoint.
//!
//! # Responsibilities
//! - Build the axum Router (`POST /jsonrpc`, `GET /health`)
//! - Wire up middleware (tracing, timeout, request ID, auth)
//! - Serve until the shutdown signal fires

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::RpcConfig;
use crate::rpc::auth::require_api_key;
use crate::rpc::dispatcher::Dispatcher;
use crate::rpc::handlers;
use crate::rpc::types::{ApiError, RpcFault, RpcRequest, RpcResponse};
use crate::service::ConfigService;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub api_key: Option<String>,
}

pub struct RpcServer {
    router: Router,
}

impl RpcServer {
    pub fn new(service: Arc<ConfigService>, config: &RpcConfig) -> Self {
        let state = AppState {
            dispatcher: Arc::new(Dispatcher::new(service)),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
        };
        Self {
            router: Self::build_router(config, state),
        }
    }

    #[allow(deprecated)]
    fn build_router(config: &RpcConfig, state: AppState) -> Router {
        let rpc = Router::new()
            .route("/jsonrpc", post(jsonrpc_handler))
            .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key));

        Router::new()
            .merge(rpc)
            .route("/health", get(handlers::health))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs))),
            )
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "RPC server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("RPC server draining");
            })
            .await?;

        tracing::info!("RPC server stopped");
        Ok(())
    }
}

async fn jsonrpc_handler(State(state): State<AppState>, body: Bytes) -> Json<RpcResponse> {
    let request: RpcRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            let err = ApiError::new("", RpcFault::InvalidRequest(e.to_string()));
            return Json(RpcResponse::failure(Value::Null, &err));
        }
    };
    tracing::debug!(method = %request.method, "RPC call");
    Json(state.dispatcher.dispatch(request).await)
}

//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the section registry and the ConfigService
//! - Attach the backing store and load initial sections
//! - Start background tasks (metrics, watcher, signals)
//! - Bind the listener and serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Sections are populated before the listener is bound

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::{BackingStoreKind, ServiceConfig};
use crate::error::ConfigError;
use crate::lifecycle::{signals, Shutdown};
use crate::observability::metrics;
use crate::persistence::{JsonFileConfigDb, MemoryConfigDb};
use crate::reload::watcher::{self, ConfigWatcher};
use crate::rpc::RpcServer;
use crate::section::builtin::default_registry;
use crate::section::ALL_SECTIONS;
use crate::service::{ConfigService, ServiceSettings};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },

    #[error("failed to open backing store: {0}")]
    BackingStore(ConfigError),

    #[error("failed to load initial sections: {0}")]
    Sections(ConfigError),

    #[error("failed to start config watcher: {0}")]
    Watch(#[from] notify::Error),

    #[error("server error: {0}")]
    Serve(std::io::Error),
}

/// Build a ready-to-serve ConfigService from the bootstrap config.
pub async fn build_service(config: &ServiceConfig) -> Result<Arc<ConfigService>, StartupError> {
    let settings = ServiceSettings {
        default_tenant: config.sections.default_tenant.clone(),
        http_timeout: Duration::from_secs(config.reload.http_timeout_secs),
    };
    let service = Arc::new(ConfigService::new(default_registry(), settings));
    let tenant = service.default_tenant().to_string();

    let store_cfg = &config.backing_store;
    match store_cfg.kind {
        BackingStoreKind::None => {}
        BackingStoreKind::Memory => service
            .persistence()
            .attach(Arc::new(MemoryConfigDb::new()), store_cfg.kind.as_str()),
        BackingStoreKind::JsonFile => {
            let path = store_cfg.path.as_deref().unwrap_or_default();
            let db = JsonFileConfigDb::open(path).map_err(StartupError::BackingStore)?;
            service.persistence().attach(Arc::new(db), store_cfg.kind.as_str());
        }
    }

    service.populate_defaults(&tenant).map_err(StartupError::Sections)?;

    if let Some(path) = config.sections.config_path.as_deref() {
        service
            .reload_config(&tenant, ALL_SECTIONS, path, false, &CancellationToken::new())
            .await
            .map_err(StartupError::Sections)?;
    }

    if store_cfg.load_on_start {
        let stored = service
            .persistence()
            .load::<&str>(&tenant, &[])
            .await
            .map_err(StartupError::Sections)?;
        if !stored.is_empty() {
            let count = stored.len();
            service.store().apply(&tenant, stored).map_err(StartupError::Sections)?;
            tracing::info!(tenant = %tenant, sections = count, "Sections loaded from backing store");
        }
    }

    tracing::info!(
        tenant = %tenant,
        sections = service.registry().len(),
        backing_store = store_cfg.kind.as_str(),
        "Config service ready"
    );
    Ok(service)
}

/// Run the daemon until a shutdown signal arrives.
pub async fn run(config: ServiceConfig) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let service = build_service(&config).await?;
    let shutdown = Arc::new(Shutdown::new());

    let _watcher = match config.reload.watch_path.as_deref() {
        Some(path) => {
            let (config_watcher, changes) = ConfigWatcher::new(Path::new(path));
            let handle = config_watcher.run()?;
            tokio::spawn(watcher::reload_on_change(
                Arc::clone(service.reloader()),
                service.default_tenant().to_string(),
                path.to_string(),
                changes,
                shutdown.subscribe(),
            ));
            Some(handle)
        }
        None => None,
    };

    let signals = signals::spawn_signal_handlers(
        Arc::clone(&shutdown),
        Arc::clone(&service),
        config.sections.config_path.clone(),
    );

    let listener = TcpListener::bind(&config.rpc.bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            address: config.rpc.bind_address.clone(),
            source,
        })?;

    let server = RpcServer::new(Arc::clone(&service), &config.rpc);
    let result = server.run(listener, shutdown.subscribe()).await;

    shutdown.trigger();
    let _ = signals.await;
    result.map_err(StartupError::Serve)
}

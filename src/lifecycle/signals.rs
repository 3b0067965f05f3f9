//! OS signal handling.
//!
//! - SIGINT / SIGTERM: graceful shutdown
//! - SIGHUP: reload every section from the startup source

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::lifecycle::Shutdown;
use crate::section::ALL_SECTIONS;
use crate::service::ConfigService;

/// Resolve on Ctrl+C or SIGTERM.
pub async fn wait_for_terminate() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Spawn the task that turns OS signals into shutdown and reloads.
pub fn spawn_signal_handlers(
    shutdown: Arc<Shutdown>,
    service: Arc<ConfigService>,
    reload_path: Option<String>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut stop = shutdown.subscribe();
        #[cfg(unix)]
        let mut hangup = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::hangup()).ok();

        loop {
            #[cfg(unix)]
            let hup = async {
                match hangup.as_mut() {
                    Some(sig) => {
                        sig.recv().await;
                    }
                    None => std::future::pending::<()>().await,
                }
            };
            #[cfg(not(unix))]
            let hup = std::future::pending::<()>();

            tokio::select! {
                _ = wait_for_terminate() => {
                    tracing::info!("Shutdown signal received");
                    shutdown.trigger();
                    break;
                }
                _ = stop.recv() => break,
                _ = hup => reload_from(&service, reload_path.as_deref()).await,
            }
        }
    })
}

async fn reload_from(service: &ConfigService, path: Option<&str>) {
    let Some(path) = path else {
        tracing::warn!("SIGHUP received but no sections.config_path is configured");
        return;
    };
    tracing::info!(path = %path, "SIGHUP received, reloading sections");
    let tenant = service.default_tenant().to_string();
    if let Err(e) = service
        .reload_config(&tenant, ALL_SECTIONS, path, false, &CancellationToken::new())
        .await
    {
        tracing::error!(error = %e, "Reload on SIGHUP failed. Keeping current configuration.");
    }
}

//! File watcher that turns source changes into reloads.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use crate::reload::{ReloadCoordinator, ReloadRequest};
use crate::section::ALL_SECTIONS;

/// Quiet period before a burst of change events triggers one reload.
const SETTLE: Duration = Duration::from_millis(250);

/// Watches a reload source and signals when it changes.
pub struct ConfigWatcher {
    path: PathBuf,
    change_tx: mpsc::UnboundedSender<()>,
}

impl ConfigWatcher {
    /// Returns the watcher and a receiver that yields one item per change event.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<()>) {
        let (change_tx, change_rx) = mpsc::unbounded_channel();
        (
            Self {
                path: path.to_path_buf(),
                change_tx,
            },
            change_rx,
        )
    }

    /// Start watching. The returned handle must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.change_tx.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        let _ = tx.send(());
                    }
                }
                Err(e) => tracing::error!(error = ?e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        let mode = if self.path.is_dir() {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher.watch(&self.path, mode)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

/// Reload every section from `path` for `tenant` whenever a change arrives.
///
/// Failures are logged and the current configuration stays live.
pub async fn reload_on_change(
    coordinator: Arc<ReloadCoordinator>,
    tenant: String,
    path: String,
    mut changes: mpsc::UnboundedReceiver<()>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            change = changes.recv() => {
                if change.is_none() {
                    break;
                }
                tokio::time::sleep(SETTLE).await;
                while changes.try_recv().is_ok() {}

                tracing::info!(path = %path, "Config source change detected, reloading");
                let request = ReloadRequest {
                    tenant: tenant.clone(),
                    section: ALL_SECTIONS.to_string(),
                    path: path.clone(),
                    dry_run: false,
                };
                if let Err(e) = coordinator.reload(request, &CancellationToken::new()).await {
                    tracing::error!(error = %e, "Failed to reload config. Keeping current configuration.");
                }
            }
            _ = shutdown.recv() => break,
        }
    }
    tracing::debug!("Config watcher loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::PersistenceBridge;
    use crate::section::builtin::{default_registry, GeneralSection};
    use crate::store::SectionStore;

    #[tokio::test]
    async fn test_change_triggers_reload() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("cfg.json");
        std::fs::write(&file, r#"{"general": {"node_id": "watched"}}"#).unwrap();

        let registry = default_registry();
        let store = Arc::new(SectionStore::new(registry.clone()));
        let coordinator = Arc::new(ReloadCoordinator::new(
            store.clone(),
            Arc::new(PersistenceBridge::new(registry)),
            Duration::from_secs(1),
        ));

        let (tx, rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let task = tokio::spawn(reload_on_change(
            coordinator,
            "acme.org".into(),
            file.to_str().unwrap().to_string(),
            rx,
            shutdown_rx,
        ));

        tx.send(()).unwrap();
        tx.send(()).unwrap();
        for _ in 0..50 {
            if store.is_populated("acme.org") {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert_eq!(store.get_typed::<GeneralSection>("acme.org").unwrap().node_id, "watched");

        shutdown_tx.send(()).unwrap();
        task.await.unwrap();
    }
}

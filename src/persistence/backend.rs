//! Backing store connections.
//!
//! Blobs are opaque JSON text keyed by `(tenant, section)`. The bridge owns
//! encoding; a backend only moves bytes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::{ConfigError, ConfigResult};

#[async_trait]
pub trait ConfigDb: Send + Sync {
    /// Stored blob for one section, if any.
    async fn get_section(&self, tenant: &str, section: &str) -> ConfigResult<Option<String>>;

    /// Store (or overwrite) the blob for one section.
    async fn set_section(&self, tenant: &str, section: &str, blob: String) -> ConfigResult<()>;
}

type Key = (String, String);

fn key(tenant: &str, section: &str) -> Key {
    (tenant.to_string(), section.to_string())
}

/// Process-local backing store. Contents do not outlive the process.
#[derive(Debug, Default)]
pub struct MemoryConfigDb {
    inner: DashMap<Key, String>,
}

impl MemoryConfigDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[async_trait]
impl ConfigDb for MemoryConfigDb {
    async fn get_section(&self, tenant: &str, section: &str) -> ConfigResult<Option<String>> {
        Ok(self.inner.get(&key(tenant, section)).map(|b| b.value().clone()))
    }

    async fn set_section(&self, tenant: &str, section: &str, blob: String) -> ConfigResult<()> {
        self.inner.insert(key(tenant, section), blob);
        Ok(())
    }
}

/// Tenant → section → blob, as laid out on disk.
type FileLayout = BTreeMap<String, BTreeMap<String, String>>;

/// Backing store mirrored to a single JSON file.
///
/// The whole map is rewritten on every `set_section` through a temp file and
/// a rename, so a crash never leaves a truncated file behind.
#[derive(Debug)]
pub struct JsonFileConfigDb {
    inner: DashMap<Key, String>,
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonFileConfigDb {
    /// Open the store at `path`, loading its contents if the file exists.
    pub fn open(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        let inner = DashMap::new();

        if path.exists() {
            let data = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::Backend(format!("read {}: {}", path.display(), e)))?;
            if !data.trim().is_empty() {
                let layout: FileLayout = serde_json::from_str(&data)
                    .map_err(|e| ConfigError::Backend(format!("parse {}: {}", path.display(), e)))?;
                for (tenant, sections) in layout {
                    for (section, blob) in sections {
                        inner.insert((tenant.clone(), section), blob);
                    }
                }
            }
            tracing::info!(path = %path.display(), entries = inner.len(), "Loaded config store file");
        }

        Ok(Self {
            inner,
            path,
            write_lock: tokio::sync::Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn layout(&self) -> FileLayout {
        let mut layout = FileLayout::new();
        for entry in self.inner.iter() {
            let (tenant, section) = entry.key();
            layout
                .entry(tenant.clone())
                .or_default()
                .insert(section.clone(), entry.value().clone());
        }
        layout
    }

    async fn save(&self) -> ConfigResult<()> {
        let data = serde_json::to_vec_pretty(&self.layout()).map_err(|e| ConfigError::Backend(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, &data)
            .await
            .map_err(|e| ConfigError::Backend(format!("write {}: {}", tmp.display(), e)))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| ConfigError::Backend(format!("rename to {}: {}", self.path.display(), e)))?;
        Ok(())
    }
}

#[async_trait]
impl ConfigDb for JsonFileConfigDb {
    async fn get_section(&self, tenant: &str, section: &str) -> ConfigResult<Option<String>> {
        Ok(self.inner.get(&key(tenant, section)).map(|b| b.value().clone()))
    }

    async fn set_section(&self, tenant: &str, section: &str, blob: String) -> ConfigResult<()> {
        let _guard = self.write_lock.lock().await;
        self.inner.insert(key(tenant, section), blob);
        self.save().await?;
        tracing::debug!(tenant = %tenant, section = %section, path = %self.path.display(), "Saved section");
        Ok(())
    }
}

//! Embedded backend driver built on [`feoxdb`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashSet;
use feoxdb::{FeoxError, FeoxStore};
use kvbridge_backend::{Backend, BackendError, BackendResult, Raw};
use kvbridge_core::{glob_match, Key};

use crate::error::FeOxDbError;

/// An embedded, file-backed backend using FeOxDB as the storage engine.
///
/// Use this when data must survive restarts or doesn't fit in memory. For
/// pure speed without persistence, prefer [`kvbridge_memory::MemoryBackend`].
///
/// FeOxDB has no native key enumeration, so this driver keeps a small side
/// index of live keys (a `DashSet<Key>`) to serve `find_keys` — every
/// successful `set`/`remove` updates it alongside the store itself.
///
/// Cloning is cheap: clones share the same underlying store and index.
#[derive(Clone)]
pub struct FeOxDbBackend {
    store: Arc<FeoxStore>,
    keys: Arc<DashSet<Key>>,
    label: String,
}

impl FeOxDbBackend {
    /// Opens (or creates) a database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FeOxDbError> {
        let mut path: PathBuf = path.as_ref().to_path_buf();
        if path.is_dir() {
            path.push("kvbridge.db");
        }
        let store = FeoxStore::builder()
            .device_path(path.to_string_lossy().to_string())
            .build()?;
        Ok(Self {
            store: Arc::new(store),
            keys: Arc::new(DashSet::new()),
            label: "feoxdb".to_string(),
        })
    }

    /// An in-memory store for tests. Data is lost when dropped.
    pub fn in_memory() -> Result<Self, FeOxDbError> {
        let store = FeoxStore::builder().build()?;
        Ok(Self {
            store: Arc::new(store),
            keys: Arc::new(DashSet::new()),
            label: "feoxdb".to_string(),
        })
    }

    /// Sets a custom label identifying this backend in logs and metrics.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Forces pending writes to disk. No-op in memory-only mode.
    pub fn flush(&self) {
        self.store.flush();
    }
}

#[async_trait]
impl Backend for FeOxDbBackend {
    async fn get(&self, key: &Key) -> BackendResult<Option<Raw>> {
        let store = self.store.clone();
        let key_bytes = key.as_str().as_bytes().to_vec();
        tokio::task::spawn_blocking(move || match store.get(&key_bytes) {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(FeoxError::KeyNotFound) => Ok(None),
            Err(e) => Err(BackendError::from(FeOxDbError::from(e))),
        })
        .await
        .map_err(BackendError::io)?
    }

    async fn set(&self, key: &Key, value: Raw) -> BackendResult<()> {
        let store = self.store.clone();
        let key_bytes = key.as_str().as_bytes().to_vec();
        tokio::task::spawn_blocking(move || {
            store
                .insert(&key_bytes, &value)
                .map_err(|e| BackendError::from(FeOxDbError::from(e)))
        })
        .await
        .map_err(BackendError::io)??;
        self.keys.insert(key.clone());
        Ok(())
    }

    async fn remove(&self, key: &Key) -> BackendResult<()> {
        let store = self.store.clone();
        let key_bytes = key.as_str().as_bytes().to_vec();
        tokio::task::spawn_blocking(move || match store.delete(&key_bytes) {
            Ok(()) | Err(FeoxError::KeyNotFound) => Ok(()),
            Err(e) => Err(BackendError::from(FeOxDbError::from(e))),
        })
        .await
        .map_err(BackendError::io)??;
        self.keys.remove(key);
        Ok(())
    }

    async fn find_keys(&self, pattern: &str, not_pattern: Option<&str>) -> BackendResult<Vec<Key>> {
        Ok(self
            .keys
            .iter()
            .filter(|key| {
                glob_match(pattern, key.as_str())
                    && not_pattern.map_or(true, |np| !glob_match(np, key.as_str()))
            })
            .map(|key| key.clone())
            .collect())
    }

    fn label(&self) -> &str {
        &self.label
    }
}

//! The public façade (spec §4.3, §6): the single type applications hold on
//! to, wrapping a [`Backend`] in the cache-and-buffer layer and the
//! per-key serializer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use kvbridge_backend::Backend;
use kvbridge_core::Key;
pub use kvbridge_core::Value;

use crate::cbl::CacheAndBufferLayer;
use crate::error::{FacadeError, FacadeResult};
use crate::pks::PerKeySerializer;
use crate::subvalue;
use crate::write_handle::WriteHandle;
use crate::CblConfig;

/// A uniform key/value persistence façade over `B`, augmented by an
/// in-process cache-and-buffer layer and a per-key serializer (spec §2).
///
/// `Kvbridge` is cheap to clone (it's a thin handle over `Arc`-shared
/// state) and safe to share across tasks. Every `get`/`set`/`remove`
/// submitted for the same key observes the others in submission order
/// (spec §4.2); operations on distinct keys never block each other.
pub struct Kvbridge<B: Backend + 'static> {
    cbl: Arc<CacheAndBufferLayer<B>>,
    pks: Arc<PerKeySerializer>,
    shut_down: Arc<AtomicBool>,
}

impl<B: Backend + 'static> Clone for Kvbridge<B> {
    fn clone(&self) -> Self {
        Self {
            cbl: self.cbl.clone(),
            pks: self.pks.clone(),
            shut_down: self.shut_down.clone(),
        }
    }
}

impl<B: Backend + 'static> Kvbridge<B> {
    /// Builds a façade over `backend` with the given CBL tunables. Call
    /// [`init`](Self::init) before issuing any operation.
    pub fn new(backend: B, config: CblConfig) -> Self {
        Self {
            cbl: CacheAndBufferLayer::new(backend, config),
            pks: Arc::new(PerKeySerializer::new()),
            shut_down: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Forwards to the backend's `init` and starts the periodic flusher.
    pub async fn init(&self) -> FacadeResult<()> {
        self.cbl.init().await.map_err(FacadeError::Backend)
    }

    /// Reads the value stored under `key`, or `None` if absent.
    ///
    /// Serves from the cache or write buffer when possible; otherwise
    /// fetches from the backend, coalescing concurrent reads for the same
    /// key into a single backend call.
    pub async fn get(&self, key: impl Into<Key>) -> FacadeResult<Option<Value>> {
        let key = key.into();
        self.ensure_open()?;
        let _guard = self.pks.acquire(&key).await;
        let outcome = self.cbl.dispatch_get(&key).await;
        drop(_guard);
        self.cbl
            .resolve_get(outcome)
            .await
            .map_err(FacadeError::BackendShared)
    }

    /// Stores `value` under `key`. The write is visible to subsequent
    /// reads on `key` as soon as this call returns; the returned
    /// [`WriteHandle`] resolves once the backend has durably applied it.
    pub async fn set(&self, key: impl Into<Key>, value: Value) -> FacadeResult<WriteHandle> {
        let key = key.into();
        self.ensure_open()?;
        key.validate_len(self.cbl.max_key_len())
            .map_err(FacadeError::KeyTooLong)?;
        let _guard = self.pks.acquire(&key).await;
        let rx = self.cbl.set(key, value).await;
        Ok(WriteHandle::new(rx))
    }

    /// Removes `key`, if present. Like `set`, returns a handle for the
    /// eventual backend completion.
    pub async fn remove(&self, key: impl Into<Key>) -> FacadeResult<WriteHandle> {
        let key = key.into();
        self.ensure_open()?;
        let _guard = self.pks.acquire(&key).await;
        let rx = self.cbl.remove(key).await;
        Ok(WriteHandle::new(rx))
    }

    /// Lists keys matching `pattern` (and, if given, not matching
    /// `not_pattern`), reflecting the buffer-overlaid backend snapshot at
    /// the time of the call (spec §5: not ordered with respect to
    /// concurrent writes).
    pub async fn find_keys(
        &self,
        pattern: &str,
        not_pattern: Option<&str>,
    ) -> FacadeResult<Vec<Key>> {
        self.ensure_open()?;
        self.cbl
            .find_keys(pattern, not_pattern)
            .await
            .map_err(FacadeError::Backend)
    }

    /// Reads the value at `path` within the structured value stored under
    /// `key` (spec §4.4). Returns `None` if the key is absent or any
    /// intermediate component along `path` is missing.
    pub async fn get_sub(&self, key: impl Into<Key>, path: &[String]) -> FacadeResult<Option<Value>> {
        let key = key.into();
        self.ensure_open()?;
        let _guard = self.pks.acquire(&key).await;
        let outcome = self.cbl.dispatch_get(&key).await;
        let root = self
            .cbl
            .resolve_get(outcome)
            .await
            .map_err(FacadeError::BackendShared)?;
        Ok(root.and_then(|value| subvalue::get_path(&value, path)))
    }

    /// Writes `value` at `path` within the structured value stored under
    /// `key`, creating intermediate objects as needed, then buffers the
    /// whole updated value as a single `set` (spec §4.4). The entire
    /// read-modify-write runs under `key`'s per-key-serializer slot, so it
    /// is atomic with respect to any other operation on `key`.
    pub async fn set_sub(
        &self,
        key: impl Into<Key>,
        path: &[String],
        value: Value,
    ) -> FacadeResult<WriteHandle> {
        let key = key.into();
        self.ensure_open()?;
        key.validate_len(self.cbl.max_key_len())
            .map_err(FacadeError::KeyTooLong)?;
        let _guard = self.pks.acquire(&key).await;

        let outcome = self.cbl.dispatch_get(&key).await;
        let current = self
            .cbl
            .resolve_get(outcome)
            .await
            .map_err(FacadeError::BackendShared)?;
        let mut root = current.unwrap_or(Value::Null);
        subvalue::set_path(&mut root, path, value)?;

        let rx = self.cbl.set(key, root).await;
        Ok(WriteHandle::new(rx))
    }

    /// Flushes the write buffer to completion, then stops the flusher.
    /// After this returns (successfully or not), the façade no longer
    /// accepts operations.
    pub async fn do_shutdown(&self) -> FacadeResult<()> {
        self.shut_down.store(true, Ordering::Release);
        self.cbl.do_shutdown().await.map_err(FacadeError::BackendShared)
    }

    /// Stops the flusher without flushing, then closes the backend. After
    /// this returns, the façade no longer accepts operations.
    pub async fn close(&self) -> FacadeResult<()> {
        self.shut_down.store(true, Ordering::Release);
        self.cbl.close().await.map_err(FacadeError::Backend)
    }

    fn ensure_open(&self) -> FacadeResult<()> {
        if self.shut_down.load(Ordering::Acquire) {
            Err(FacadeError::Shutdown)
        } else {
            Ok(())
        }
    }
}

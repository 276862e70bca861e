//! The storage driver contract every backend implements.

use std::sync::Arc;

use async_trait::async_trait;
use kvbridge_core::Key;

use crate::error::BackendResult;

/// Raw bytes as stored by a backend, after encoding through a
/// [`Format`](crate::format::Format).
pub type Raw = bytes::Bytes;

/// A single operation inside a bulk write, as submitted by the flusher when
/// it drains the write buffer.
#[derive(Debug, Clone)]
pub enum BulkOp {
    /// Store `value` under `key`.
    Set { key: Key, value: Raw },
    /// Remove `key`, if present.
    Remove { key: Key },
}

/// A storage driver: a relational table, a document collection, an embedded
/// KV file, or an in-memory map, behind one uniform async contract.
///
/// Implementations must be `Send + Sync` and safe to share behind an `Arc`
/// across every task the facade spawns.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Prepares the backend for use (opening connections, creating schema).
    /// Called once, before the facade accepts any operation.
    async fn init(&self) -> BackendResult<()> {
        Ok(())
    }

    /// Reads the raw, encoded value stored under `key`, if any.
    async fn get(&self, key: &Key) -> BackendResult<Option<Raw>>;

    /// Stores `value` under `key`, overwriting any existing value.
    async fn set(&self, key: &Key, value: Raw) -> BackendResult<()>;

    /// Removes `key`, if present. Removing a missing key is not an error.
    async fn remove(&self, key: &Key) -> BackendResult<()>;

    /// Lists keys matching `pattern` (`*` = any run of characters) and, if
    /// `not_pattern` is given, not matching it either. Implementations that
    /// can push the NOT-filter down to the underlying store (a `WHERE ...
    /// AND NOT key LIKE ...` clause, say) should do so; a backend with no
    /// such query surface can filter an in-memory key list itself with
    /// [`kvbridge_core::glob_match`].
    async fn find_keys(&self, pattern: &str, not_pattern: Option<&str>) -> BackendResult<Vec<Key>>;

    /// Applies a batch of writes/removals. Backends that support pipelining
    /// or a single round-trip transaction should use it here; the default
    /// implementation just applies each op in order.
    async fn do_bulk(&self, ops: Vec<BulkOp>) -> BackendResult<()> {
        for op in ops {
            match op {
                BulkOp::Set { key, value } => self.set(&key, value).await?,
                BulkOp::Remove { key } => self.remove(&key).await?,
            }
        }
        Ok(())
    }

    /// Releases any resources held by the backend (connections, file
    /// handles). Called once, during facade shutdown, after the last flush.
    async fn close(&self) -> BackendResult<()> {
        Ok(())
    }

    /// The backend's maximum key length in bytes, if it imposes one
    /// tighter than [`kvbridge_core::DEFAULT_MAX_KEY_LEN`].
    fn max_key_len(&self) -> Option<usize> {
        None
    }

    /// A short name identifying this backend in logs and metrics.
    fn label(&self) -> &str {
        "backend"
    }
}

#[async_trait]
impl Backend for Arc<dyn Backend> {
    async fn init(&self) -> BackendResult<()> {
        (**self).init().await
    }

    async fn get(&self, key: &Key) -> BackendResult<Option<Raw>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &Key, value: Raw) -> BackendResult<()> {
        (**self).set(key, value).await
    }

    async fn remove(&self, key: &Key) -> BackendResult<()> {
        (**self).remove(key).await
    }

    async fn find_keys(&self, pattern: &str, not_pattern: Option<&str>) -> BackendResult<Vec<Key>> {
        (**self).find_keys(pattern, not_pattern).await
    }

    async fn do_bulk(&self, ops: Vec<BulkOp>) -> BackendResult<()> {
        (**self).do_bulk(ops).await
    }

    async fn close(&self) -> BackendResult<()> {
        (**self).close().await
    }

    fn max_key_len(&self) -> Option<usize> {
        (**self).max_key_len()
    }

    fn label(&self) -> &str {
        (**self).label()
    }
}

#[async_trait]
impl Backend for Box<dyn Backend> {
    async fn init(&self) -> BackendResult<()> {
        (**self).init().await
    }

    async fn get(&self, key: &Key) -> BackendResult<Option<Raw>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &Key, value: Raw) -> BackendResult<()> {
        (**self).set(key, value).await
    }

    async fn remove(&self, key: &Key) -> BackendResult<()> {
        (**self).remove(key).await
    }

    async fn find_keys(&self, pattern: &str, not_pattern: Option<&str>) -> BackendResult<Vec<Key>> {
        (**self).find_keys(pattern, not_pattern).await
    }

    async fn do_bulk(&self, ops: Vec<BulkOp>) -> BackendResult<()> {
        (**self).do_bulk(ops).await
    }

    async fn close(&self) -> BackendResult<()> {
        (**self).close().await
    }

    fn max_key_len(&self) -> Option<usize> {
        (**self).max_key_len()
    }

    fn label(&self) -> &str {
        (**self).label()
    }
}

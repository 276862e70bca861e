//! Redis backend implementation.
//!
//! Stands in for both the relational and document backend categories: from
//! the facade's point of view the contract is identical, only the driver
//! differs, which is the entire point of keeping `Backend` dyn-compatible.

use async_trait::async_trait;
use kvbridge_backend::{Backend, BackendError, BackendResult, BulkOp, Raw};
use kvbridge_core::{glob_match, Key};
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use tokio::sync::OnceCell;
use tracing::trace;

use crate::error::Error;

/// Distributed cache/storage backend powered by Redis.
///
/// Uses a multiplexed connection ([`ConnectionManager`]) so many concurrent
/// operations share a single underlying connection. The connection is
/// established lazily, on first use.
#[derive(Clone)]
pub struct RedisBackend {
    client: Client,
    connection: std::sync::Arc<OnceCell<ConnectionManager>>,
    label: String,
}

impl RedisBackend {
    /// Connects to the given Redis server URL, e.g. `redis://127.0.0.1/`.
    pub fn new(connection_info: impl Into<String>) -> Result<Self, Error> {
        Ok(Self {
            client: Client::open(connection_info.into())?,
            connection: std::sync::Arc::new(OnceCell::new()),
            label: "redis".to_string(),
        })
    }

    /// Sets a custom label identifying this backend in logs and metrics.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    async fn connection(&self) -> Result<ConnectionManager, Error> {
        let manager = self
            .connection
            .get_or_try_init(|| {
                trace!("initializing redis connection manager");
                self.client.get_connection_manager()
            })
            .await?;
        Ok(manager.clone())
    }
}

#[async_trait]
impl Backend for RedisBackend {
    async fn get(&self, key: &Key) -> BackendResult<Option<Raw>> {
        let mut con = self.connection().await.map_err(BackendError::from)?;
        let data: Option<Vec<u8>> = con
            .get(key.as_str())
            .await
            .map_err(Error::from)
            .map_err(BackendError::from)?;
        Ok(data.map(Raw::from))
    }

    async fn set(&self, key: &Key, value: Raw) -> BackendResult<()> {
        let mut con = self.connection().await.map_err(BackendError::from)?;
        let _: () = con
            .set(key.as_str(), value.as_ref())
            .await
            .map_err(Error::from)
            .map_err(BackendError::from)?;
        Ok(())
    }

    async fn remove(&self, key: &Key) -> BackendResult<()> {
        let mut con = self.connection().await.map_err(BackendError::from)?;
        let _: () = con
            .del(key.as_str())
            .await
            .map_err(Error::from)
            .map_err(BackendError::from)?;
        Ok(())
    }

    async fn find_keys(&self, pattern: &str, not_pattern: Option<&str>) -> BackendResult<Vec<Key>> {
        let mut con = self.connection().await.map_err(BackendError::from)?;
        let keys: Vec<String> = con
            .keys(pattern)
            .await
            .map_err(Error::from)
            .map_err(BackendError::from)?;
        // KEYS has no negated-glob form, so the NOT-filter is applied here,
        // client-side, rather than pushed down to the server.
        Ok(keys
            .into_iter()
            .filter(|k| not_pattern.map_or(true, |np| !glob_match(np, k)))
            .map(Key::from)
            .collect())
    }

    async fn do_bulk(&self, ops: Vec<BulkOp>) -> BackendResult<()> {
        let mut con = self.connection().await.map_err(BackendError::from)?;
        let mut pipe = redis::pipe();
        for op in &ops {
            match op {
                BulkOp::Set { key, value } => {
                    pipe.set(key.as_str(), value.as_ref()).ignore();
                }
                BulkOp::Remove { key } => {
                    pipe.del(key.as_str()).ignore();
                }
            }
        }
        pipe.query_async::<()>(&mut con)
            .await
            .map_err(Error::from)
            .map_err(BackendError::from)?;
        Ok(())
    }

    fn label(&self) -> &str {
        &self.label
    }
}

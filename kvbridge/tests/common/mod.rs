//! A backend double for integration tests, grounded on the teacher's
//! `hitbox-test::MockBackend` (counters + a `DashMap`-backed store, instead
//! of a real network/disk round trip).

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use kvbridge::{glob_match, Backend, BackendError, BackendResult, BulkOp, Key, Raw};

#[derive(Debug, Default)]
pub struct BackendCounters {
    pub get: AtomicUsize,
    pub find_keys: AtomicUsize,
    pub do_bulk: AtomicUsize,
    pub do_bulk_ops: AtomicUsize,
}

#[derive(Debug, thiserror::Error)]
#[error("mock backend was told to fail this bulk write")]
pub struct MockBulkFailure;

/// A `Backend` over a plain `DashMap`, with call counters and an optional
/// one-shot failure injected into the next `do_bulk` call.
#[derive(Clone, Debug)]
pub struct MockBackend {
    store: Arc<DashMap<Key, Raw>>,
    pub counters: Arc<BackendCounters>,
    fail_next_bulk: Arc<AtomicBool>,
    max_key_len: Option<usize>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            store: Arc::new(DashMap::new()),
            counters: Arc::new(BackendCounters::default()),
            fail_next_bulk: Arc::new(AtomicBool::new(false)),
            max_key_len: None,
        }
    }

    pub fn with_max_key_len(max_key_len: usize) -> Self {
        Self {
            max_key_len: Some(max_key_len),
            ..Self::new()
        }
    }

    pub fn get_count(&self) -> usize {
        self.counters.get.load(Ordering::SeqCst)
    }

    pub fn find_keys_count(&self) -> usize {
        self.counters.find_keys.load(Ordering::SeqCst)
    }

    pub fn do_bulk_count(&self) -> usize {
        self.counters.do_bulk.load(Ordering::SeqCst)
    }

    pub fn do_bulk_ops_count(&self) -> usize {
        self.counters.do_bulk_ops.load(Ordering::SeqCst)
    }

    pub fn fail_next_bulk(&self) {
        self.fail_next_bulk.store(true, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn contains(&self, key: &Key) -> bool {
        self.store.contains_key(key)
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn get(&self, key: &Key) -> BackendResult<Option<Raw>> {
        self.counters.get.fetch_add(1, Ordering::SeqCst);
        Ok(self.store.get(key).map(|entry| entry.value().clone()))
    }

    async fn set(&self, key: &Key, value: Raw) -> BackendResult<()> {
        self.store.insert(key.clone(), value);
        Ok(())
    }

    async fn remove(&self, key: &Key) -> BackendResult<()> {
        self.store.remove(key);
        Ok(())
    }

    async fn find_keys(&self, pattern: &str, not_pattern: Option<&str>) -> BackendResult<Vec<Key>> {
        self.counters.find_keys.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .store
            .iter()
            .map(|entry| entry.key().clone())
            .filter(|key| {
                glob_match(pattern, key.as_str())
                    && not_pattern.map_or(true, |np| !glob_match(np, key.as_str()))
            })
            .collect())
    }

    async fn do_bulk(&self, ops: Vec<BulkOp>) -> BackendResult<()> {
        self.counters.do_bulk.fetch_add(1, Ordering::SeqCst);
        self.counters.do_bulk_ops.fetch_add(ops.len(), Ordering::SeqCst);
        if self.fail_next_bulk.swap(false, Ordering::SeqCst) {
            return Err(BackendError::io(MockBulkFailure));
        }
        for op in ops {
            match op {
                BulkOp::Set { key, value } => {
                    self.store.insert(key, value);
                }
                BulkOp::Remove { key } => {
                    self.store.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn max_key_len(&self) -> Option<usize> {
        self.max_key_len
    }

    fn label(&self) -> &str {
        "mock"
    }
}

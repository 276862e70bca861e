//! Deduplicates concurrent backend reads for the same key.
//!
//! Grounded directly on the teacher's `BroadcastConcurrencyManager`
//! (`hitbox/src/concurrency.rs`): a keyed table of broadcast senders, first
//! caller creates the entry and does the work, later callers subscribe
//! instead of repeating it. Where the teacher needs a semaphore to cap how
//! many requests proceed concurrently, a read has no such limit — at most
//! one backend `get` is ever in flight per key, because the per-key
//! serializer already ensures only one caller can be the one to find the
//! entry missing.

use std::sync::Arc;

use dashmap::DashMap;
use kvbridge_backend::BackendError;
use kvbridge_core::{Key, Value};
use tokio::sync::broadcast;

/// The outcome a backend `get` eventually produces, shared with every
/// waiter that joined the same in-flight read. Wrapped in `Arc` both for
/// cheap broadcast fan-out and because [`BackendError`] itself doesn't
/// implement `Clone`.
pub(crate) type ReadResult = Result<Option<Value>, Arc<BackendError>>;

const BROADCAST_CAPACITY: usize = 32;

#[derive(Default)]
pub(crate) struct PendingReadSet {
    inflight: DashMap<Key, broadcast::Sender<Arc<ReadResult>>>,
}

impl PendingReadSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Subscribes to an already in-flight read for `key`, if one exists.
    pub(crate) fn join(&self, key: &Key) -> Option<broadcast::Receiver<Arc<ReadResult>>> {
        self.inflight.get(key).map(|sender| sender.subscribe())
    }

    /// Registers a new in-flight read for `key`, returning the receiver the
    /// caller that's about to do the actual backend fetch should also use
    /// (so the first caller and every later joiner share one code path).
    pub(crate) fn register(&self, key: Key) -> broadcast::Receiver<Arc<ReadResult>> {
        let (sender, receiver) = broadcast::channel(BROADCAST_CAPACITY);
        self.inflight.insert(key, sender);
        receiver
    }

    /// Delivers the final result to every waiter and removes the entry.
    pub(crate) fn resolve(&self, key: &Key, result: ReadResult) {
        if let Some((_, sender)) = self.inflight.remove(key) {
            let _ = sender.send(Arc::new(result));
        }
    }
}

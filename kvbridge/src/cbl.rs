//! The cache-and-buffer layer (spec §4.1): an LRU value cache, a dirty-write
//! buffer, a pending-read deduper, and a periodic flusher, sitting in front
//! of a single [`Backend`].
//!
//! State mutations are serialized behind one `tokio::sync::Mutex` (spec §5:
//! "a single logical executor, or a mutex covering cache+buffer+pending-read
//! structures") — [`CblState`] bundles the cache and write buffer together
//! so every operation that touches either sees a consistent snapshot of
//! both. The pending-read table lives outside that mutex as its own
//! `DashMap`-backed [`PendingReadSet`]; no race results, because the
//! per-key serializer ([`crate::pks`]) already guarantees at most one
//! dispatch per key is ever in flight at a time.

use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use kvbridge_backend::{Backend, BackendError, BackendResult, BulkOp, Format};
use kvbridge_core::{glob_match, Key, Value};
use tokio::sync::{broadcast, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info_span, warn};

use crate::buffer::{OpKind, PendingOp, WriteBuffer};
use crate::cache::{Cache, CacheEntry, Stored};
use crate::config::CblConfig;
use crate::pending_read::{PendingReadSet, ReadResult};

#[cfg(feature = "metrics")]
use crate::metrics::{
    BUFFER_DEPTH_GAUGE, CACHE_EVICTION_COUNTER, CACHE_HIT_COUNTER, CACHE_MISS_COUNTER,
    FLUSH_DURATION_HISTOGRAM, FLUSH_FAILURE_COUNTER, READ_COALESCED_COUNTER,
};

/// Result type for operations whose failure must fan out to more than one
/// waiter (a coalesced read, or several writes coalesced onto one buffered
/// op) — shared via `Arc` since [`BackendError`] isn't `Clone`.
pub(crate) type CblResult<T> = Result<T, Arc<BackendError>>;

/// What [`CacheAndBufferLayer::dispatch_get`] found out synchronously.
pub(crate) enum ReadOutcome {
    /// Resolved immediately from the cache or write buffer.
    Hit(Option<Value>),
    /// No cached/buffered state; either this call — or an earlier one for
    /// the same key — is fetching from the backend. Await the receiver.
    Pending(broadcast::Receiver<Arc<ReadResult>>),
}

struct CblState {
    cache: Cache,
    buffer: WriteBuffer,
}

pub(crate) struct CacheAndBufferLayer<B> {
    backend: B,
    format: Arc<dyn Format>,
    config: CblConfig,
    state: Mutex<CblState>,
    pending_reads: PendingReadSet,
    flusher: std::sync::Mutex<Option<JoinHandle<()>>>,
    /// A handle to its own `Arc`, so methods that need to spawn a `'static`
    /// background task can obtain one without requiring callers to pass an
    /// `Arc<Self>` around. Set up via `Arc::new_cyclic` at construction.
    self_weak: Weak<Self>,
}

impl<B: Backend + 'static> CacheAndBufferLayer<B> {
    pub(crate) fn new(backend: B, config: CblConfig) -> Arc<Self> {
        let format = config.format();
        let cache = Cache::new(config.cache_cap, config.cache_min_gap);
        Arc::new_cyclic(|self_weak| Self {
            backend,
            format,
            config,
            state: Mutex::new(CblState {
                cache,
                buffer: WriteBuffer::new(),
            }),
            pending_reads: PendingReadSet::new(),
            flusher: std::sync::Mutex::new(None),
            self_weak: self_weak.clone(),
        })
    }

    fn arc_self(&self) -> Arc<Self> {
        self.self_weak
            .upgrade()
            .expect("CacheAndBufferLayer always outlives its own Weak handle")
    }

    pub(crate) async fn init(&self) -> BackendResult<()> {
        self.backend.init().await?;
        self.start_flusher();
        Ok(())
    }

    pub(crate) fn max_key_len(&self) -> usize {
        self.backend
            .max_key_len()
            .unwrap_or(kvbridge_core::DEFAULT_MAX_KEY_LEN)
    }

    /// Synchronously determines how to serve a `get`: from the cache, from
    /// the write buffer, by joining an in-flight read, or by registering a
    /// new one (whose actual backend fetch is spawned in the background).
    /// Holds the key's per-key-serializer slot only for this function's
    /// duration — the eventual backend await happens after the caller
    /// releases it, via [`Self::resolve_get`].
    pub(crate) async fn dispatch_get(&self, key: &Key) -> ReadOutcome {
        {
            let mut state = self.state.lock().await;
            if let Some(hit) = state.cache.get(key) {
                #[cfg(feature = "metrics")]
                metrics::counter!(*CACHE_HIT_COUNTER).increment(1);
                return ReadOutcome::Hit(hit);
            }
            if let Some(op) = state.buffer.get(key) {
                let outcome = match &op.kind {
                    OpKind::Set(value) => {
                        let value = value.deep_clone();
                        state
                            .cache
                            .insert(key.clone(), CacheEntry::dirty(Stored::Value(value.clone())));
                        Some(value)
                    }
                    OpKind::Remove => None,
                };
                #[cfg(feature = "metrics")]
                metrics::counter!(*CACHE_HIT_COUNTER).increment(1);
                return ReadOutcome::Hit(outcome);
            }
        }

        if let Some(rx) = self.pending_reads.join(key) {
            #[cfg(feature = "metrics")]
            metrics::counter!(*READ_COALESCED_COUNTER).increment(1);
            return ReadOutcome::Pending(rx);
        }

        #[cfg(feature = "metrics")]
        metrics::counter!(*CACHE_MISS_COUNTER).increment(1);
        let rx = self.pending_reads.register(key.clone());
        let this = self.arc_self();
        let fetch_key = key.clone();
        tokio::spawn(async move { this.fetch_and_resolve(fetch_key).await });
        ReadOutcome::Pending(rx)
    }

    /// Resolves a [`ReadOutcome`] into the final value, awaiting the
    /// backend if necessary.
    pub(crate) async fn resolve_get(&self, outcome: ReadOutcome) -> ReadResult {
        match outcome {
            ReadOutcome::Hit(value) => Ok(value),
            ReadOutcome::Pending(mut rx) => match rx.recv().await {
                Ok(result) => (*result).clone(),
                Err(broadcast::error::RecvError::Closed) => {
                    Err(Arc::new(BackendError::io(PendingReadClosed)))
                }
                Err(broadcast::error::RecvError::Lagged(_)) => {
                    Err(Arc::new(BackendError::io(PendingReadLagged)))
                }
            },
        }
    }

    async fn fetch_and_resolve(self: Arc<Self>, key: Key) {
        let result = self.backend_get_raw(&key).await;
        match &result {
            Ok(value) => {
                let stored = match value {
                    Some(v) => Stored::Value(v.deep_clone()),
                    None => Stored::Tombstone,
                };
                let mut state = self.state.lock().await;
                state.cache.insert(key.clone(), CacheEntry::clean(stored));
                let evicted = state.cache.evict_if_needed();
                drop(state);
                self.record_eviction(evicted);
            }
            Err(err) => {
                debug!(%key, error = %err, "backend read failed");
            }
        }
        self.pending_reads.resolve(&key, result.map_err(Arc::new));
    }

    async fn backend_get_raw(&self, key: &Key) -> BackendResult<Option<Value>> {
        match self.backend.get(key).await? {
            Some(raw) => {
                let value = self
                    .format
                    .decode(&raw)
                    .map_err(BackendError::serialization)?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Buffers a `set`, marking the cache entry dirty and MRU. Returns a
    /// receiver for the eventual flush outcome; the sender is queued in the
    /// write buffer (or appended to an existing queued op's completion
    /// list, if a write for this key was already buffered).
    pub(crate) async fn set(
        &self,
        key: Key,
        value: Value,
    ) -> oneshot::Receiver<CblResult<()>> {
        let (tx, rx) = oneshot::channel();
        {
            let mut state = self.state.lock().await;
            state
                .cache
                .insert(key.clone(), CacheEntry::dirty(Stored::Value(value.clone())));
            state.buffer.push_set(key, value, tx);
            self.record_eviction(state.cache.evict_if_needed());
            self.report_buffer_depth(&state);
        }
        if self.config.is_write_through() {
            self.trigger_immediate_flush();
        }
        rx
    }

    /// Buffers a `remove`, replacing the cache entry with a tombstone.
    pub(crate) async fn remove(&self, key: Key) -> oneshot::Receiver<CblResult<()>> {
        let (tx, rx) = oneshot::channel();
        {
            let mut state = self.state.lock().await;
            state
                .cache
                .insert(key.clone(), CacheEntry::dirty(Stored::Tombstone));
            state.buffer.push_remove(key, tx);
            self.record_eviction(state.cache.evict_if_needed());
            self.report_buffer_depth(&state);
        }
        if self.config.is_write_through() {
            self.trigger_immediate_flush();
        }
        rx
    }

    #[cfg(feature = "metrics")]
    fn report_buffer_depth(&self, state: &CblState) {
        metrics::gauge!(*BUFFER_DEPTH_GAUGE).set(state.buffer_len() as f64);
    }

    #[cfg(not(feature = "metrics"))]
    fn report_buffer_depth(&self, _state: &CblState) {}

    #[cfg(feature = "metrics")]
    fn record_eviction(&self, count: usize) {
        if count > 0 {
            metrics::counter!(*CACHE_EVICTION_COUNTER).increment(count as u64);
        }
    }

    #[cfg(not(feature = "metrics"))]
    fn record_eviction(&self, _count: usize) {}

    pub(crate) async fn find_keys(
        &self,
        pattern: &str,
        not_pattern: Option<&str>,
    ) -> BackendResult<Vec<Key>> {
        let backend_keys = self.backend.find_keys(pattern, not_pattern).await?;
        let mut result: std::collections::BTreeSet<Key> = backend_keys.into_iter().collect();

        let state = self.state.lock().await;
        for (key, op) in state.buffer.iter() {
            let matches = glob_match(pattern, key.as_str())
                && not_pattern.map_or(true, |np| !glob_match(np, key.as_str()));
            if !matches {
                continue;
            }
            match &op.kind {
                OpKind::Set(_) => {
                    result.insert(key.clone());
                }
                OpKind::Remove => {
                    result.remove(key);
                }
            }
        }
        Ok(result.into_iter().collect())
    }

    fn trigger_immediate_flush(&self) {
        let this = self.arc_self();
        tokio::spawn(async move {
            let _ = this.flush_once().await;
        });
    }

    fn start_flusher(&self) {
        if self.config.is_write_through() {
            return;
        }
        let this = self.arc_self();
        let interval_duration = self.config.write_interval;
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(interval_duration);
            interval.tick().await; // first tick fires immediately; the buffer is empty, so it's a no-op
            loop {
                interval.tick().await;
                let _ = this.clone().flush_once().await;
            }
        });
        *self.flusher.lock().unwrap() = Some(handle);
    }

    fn stop_flusher(&self) {
        if let Some(handle) = self.flusher.lock().unwrap().take() {
            handle.abort();
        }
    }

    /// Drains the write buffer and applies it via the backend's `doBulk` in
    /// one call (spec §4.1 "Flusher protocol"). Returns without doing
    /// anything if the buffer is currently empty. On failure, every
    /// affected key's ops are restored to the buffer (newer writes that
    /// arrived mid-flush win) and every completion queued on the failed
    /// attempt is notified with the error.
    pub(crate) async fn flush_once(self: Arc<Self>) -> CblResult<()> {
        let detached = {
            let mut state = self.state.lock().await;
            if state.buffer.is_empty() {
                return Ok(());
            }
            let detached = state.buffer.detach();
            for key in detached.keys() {
                if let Some(entry) = state.cache.get_mut(key) {
                    entry.in_flight_write = true;
                }
            }
            detached
        };

        let span = info_span!("kvbridge_flush", ops = detached.len());
        let _entered = span.enter();

        #[cfg(feature = "metrics")]
        let started_at = std::time::Instant::now();

        let mut ops = Vec::with_capacity(detached.len());
        let mut encode_error = None;
        for (key, op) in detached.iter() {
            match &op.kind {
                OpKind::Set(value) => match self.format.encode(value) {
                    Ok(raw) => ops.push(BulkOp::Set {
                        key: key.clone(),
                        value: raw,
                    }),
                    Err(err) => {
                        encode_error = Some(BackendError::serialization(err));
                        break;
                    }
                },
                OpKind::Remove => ops.push(BulkOp::Remove { key: key.clone() }),
            }
        }

        let result = match encode_error {
            Some(err) => Err(err),
            None => self.backend.do_bulk(ops).await,
        };

        match result {
            Ok(()) => {
                {
                    let mut state = self.state.lock().await;
                    for key in detached.keys() {
                        // A newer write for this key may have landed in the
                        // buffer while this flush was in flight (step 2's
                        // detach only takes what existed at that moment) —
                        // that newer value is still unflushed, so the entry
                        // must stay dirty. Otherwise the just-flushed value
                        // is now known to match the backend and the entry
                        // is clean again, eligible for ordinary eviction.
                        let superseded = state.buffer.contains_key(key);
                        if let Some(entry) = state.cache.get_mut(key) {
                            entry.in_flight_write = false;
                            if !superseded {
                                entry.dirty = false;
                            }
                        }
                    }
                    let evicted = state.cache.evict_if_needed();
                    self.report_buffer_depth(&state);
                    drop(state);
                    self.record_eviction(evicted);
                }
                for (_, op) in detached {
                    for completion in op.completions {
                        let _ = completion.send(Ok(()));
                    }
                }
                #[cfg(feature = "metrics")]
                metrics::histogram!(*FLUSH_DURATION_HISTOGRAM)
                    .record(started_at.elapsed().as_secs_f64());
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "flush failed; ops returned to the write buffer");
                let shared = Arc::new(err);
                {
                    let mut state = self.state.lock().await;
                    for key in detached.keys() {
                        if let Some(entry) = state.cache.get_mut(key) {
                            entry.in_flight_write = false;
                        }
                    }
                    let restore: IndexMap<Key, PendingOp> = detached
                        .iter()
                        .map(|(key, op)| {
                            (
                                key.clone(),
                                PendingOp {
                                    kind: op.kind.clone(),
                                    completions: Vec::new(),
                                },
                            )
                        })
                        .collect();
                    state.buffer.restore(restore);
                    self.report_buffer_depth(&state);
                }
                for (_, op) in detached {
                    for completion in op.completions {
                        let _ = completion.send(Err(shared.clone()));
                    }
                }
                #[cfg(feature = "metrics")]
                metrics::counter!(*FLUSH_FAILURE_COUNTER).increment(1);
                Err(shared)
            }
        }
    }

    /// Flushes synchronously to completion, then stops the flusher.
    pub(crate) async fn do_shutdown(&self) -> CblResult<()> {
        let result = self.arc_self().flush_once().await;
        self.stop_flusher();
        result
    }

    /// Stops the flusher without flushing, then closes the backend.
    pub(crate) async fn close(&self) -> BackendResult<()> {
        self.stop_flusher();
        self.backend.close().await
    }
}

#[cfg(feature = "metrics")]
impl CblState {
    fn buffer_len(&self) -> usize {
        self.buffer.iter().count()
    }
}

#[derive(Debug, thiserror::Error)]
#[error("pending read broadcast closed before delivering a result")]
struct PendingReadClosed;

#[derive(Debug, thiserror::Error)]
#[error("pending read broadcast lagged and missed its result")]
struct PendingReadLagged;

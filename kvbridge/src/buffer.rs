//! The dirty-write buffer the periodic flusher drains.

use std::sync::Arc;

use indexmap::IndexMap;
use kvbridge_backend::BackendError;
use kvbridge_core::{Key, Value};
use tokio::sync::oneshot;

/// A write-completed callback: fires once, with the outcome of the flush
/// that eventually carries this op to the backend.
pub(crate) type WriteCompletion = oneshot::Sender<Result<(), Arc<BackendError>>>;

/// What kind of op is buffered for a key.
#[derive(Debug, Clone)]
pub(crate) enum OpKind {
    Set(Value),
    Remove,
}

/// A buffered op and every caller still waiting to hear it was flushed.
/// Spec §3: "at most one pending op per Key"; when a later write replaces
/// an earlier unflushed one, both calls' completions are kept so a single
/// eventual flush resolves all of them.
pub(crate) struct PendingOp {
    pub(crate) kind: OpKind,
    pub(crate) completions: Vec<WriteCompletion>,
}

#[derive(Default)]
pub(crate) struct WriteBuffer {
    ops: IndexMap<Key, PendingOp>,
}

impl WriteBuffer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub(crate) fn get(&self, key: &Key) -> Option<&PendingOp> {
        self.ops.get(key)
    }

    pub(crate) fn contains_key(&self, key: &Key) -> bool {
        self.ops.contains_key(key)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&Key, &PendingOp)> {
        self.ops.iter()
    }

    pub(crate) fn push_set(&mut self, key: Key, value: Value, completion: WriteCompletion) {
        match self.ops.get_mut(&key) {
            Some(op) => {
                op.kind = OpKind::Set(value);
                op.completions.push(completion);
            }
            None => {
                self.ops.insert(
                    key,
                    PendingOp {
                        kind: OpKind::Set(value),
                        completions: vec![completion],
                    },
                );
            }
        }
    }

    pub(crate) fn push_remove(&mut self, key: Key, completion: WriteCompletion) {
        match self.ops.get_mut(&key) {
            Some(op) => {
                op.kind = OpKind::Remove;
                op.completions.push(completion);
            }
            None => {
                self.ops.insert(
                    key,
                    PendingOp {
                        kind: OpKind::Remove,
                        completions: vec![completion],
                    },
                );
            }
        }
    }

    /// Atomically detaches the whole buffer, leaving an empty one in its
    /// place, for the flusher to drain (spec §4.1 flusher step 2).
    pub(crate) fn detach(&mut self) -> IndexMap<Key, PendingOp> {
        std::mem::take(&mut self.ops)
    }

    /// Restores ops from a failed flush, newer writes (already present in
    /// this buffer because they arrived mid-flush) winning per key (spec
    /// §4.1 flusher step 5). The restored ops' old completions were already
    /// invoked with the failure and are not carried forward — a later
    /// successful flush of the re-buffered value has no one left waiting on
    /// this particular attempt.
    pub(crate) fn restore(&mut self, failed: IndexMap<Key, PendingOp>) {
        for (key, op) in failed {
            self.ops.entry(key).or_insert_with(|| PendingOp {
                kind: op.kind,
                completions: Vec::new(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completion() -> (WriteCompletion, oneshot::Receiver<Result<(), Arc<BackendError>>>) {
        oneshot::channel()
    }

    #[test]
    fn replacing_a_pending_set_keeps_prior_completions() {
        let mut buffer = WriteBuffer::new();
        let (tx1, _rx1) = completion();
        let (tx2, _rx2) = completion();
        buffer.push_set(Key::new("x"), Value::Number(1.0), tx1);
        buffer.push_set(Key::new("x"), Value::Number(2.0), tx2);

        let op = buffer.get(&Key::new("x")).unwrap();
        assert!(matches!(&op.kind, OpKind::Set(v) if *v == Value::Number(2.0)));
        assert_eq!(op.completions.len(), 2);
        assert_eq!(buffer.iter().count(), 1, "still one pending op per key");
    }

    #[test]
    fn detach_empties_the_buffer() {
        let mut buffer = WriteBuffer::new();
        let (tx, _rx) = completion();
        buffer.push_set(Key::new("x"), Value::Number(1.0), tx);
        let detached = buffer.detach();
        assert_eq!(detached.len(), 1);
        assert!(buffer.is_empty());
    }

    #[test]
    fn restore_does_not_override_newer_writes() {
        let mut buffer = WriteBuffer::new();
        let (tx_new, _rx_new) = completion();
        buffer.push_set(Key::new("x"), Value::Number(99.0), tx_new);

        let mut failed = IndexMap::new();
        let (tx_old, _rx_old) = completion();
        failed.insert(
            Key::new("x"),
            PendingOp {
                kind: OpKind::Set(Value::Number(1.0)),
                completions: vec![tx_old],
            },
        );
        buffer.restore(failed);

        let op = buffer.get(&Key::new("x")).unwrap();
        assert!(matches!(&op.kind, OpKind::Set(v) if *v == Value::Number(99.0)));
    }
}

//! The two completion channels a buffered write produces (spec §9:
//! "Callback duality → two completion channels").

use std::sync::Arc;

use kvbridge_backend::BackendError;
use tokio::sync::oneshot;

use crate::error::{FacadeError, FacadeResult};

/// Returned by [`crate::Kvbridge::set`], [`crate::Kvbridge::remove`], and
/// [`crate::Kvbridge::set_sub`].
///
/// Carries the write's two distinct completion signals: *buffer-accepted*
/// (the write is already visible to subsequent reads on the same key, but
/// hasn't reached the backend yet) and *write-completed* (the backend has
/// durably applied it, or failed definitively). By the time a `WriteHandle`
/// exists, buffer-acceptance has already happened — the facade updates the
/// cache and buffer synchronously before handing one back — so a caller
/// that only cares about throughput can simply drop the handle.
#[derive(Debug)]
pub struct WriteHandle {
    write_completed: oneshot::Receiver<Result<(), Arc<BackendError>>>,
}

impl WriteHandle {
    pub(crate) fn new(write_completed: oneshot::Receiver<Result<(), Arc<BackendError>>>) -> Self {
        Self { write_completed }
    }

    /// Always succeeds: acceptance into the write buffer already happened
    /// by construction. Kept as a method for symmetry with
    /// [`write_completed`](Self::write_completed) and so call sites read the
    /// same way the spec's two-callback model does.
    pub fn buffer_accepted(&self) -> FacadeResult<()> {
        Ok(())
    }

    /// Waits until the backend has durably applied this write (or failed
    /// definitively). Resolves when the periodic flusher — or, in
    /// write-through mode, the immediate flush the write itself triggered —
    /// runs a `doBulk` covering this key.
    pub async fn write_completed(self) -> FacadeResult<()> {
        match self.write_completed.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(FacadeError::BackendShared(err)),
            // The sender was dropped without sending, which only happens if
            // the layer was closed before this op's flush ran.
            Err(_) => Err(FacadeError::Shutdown),
        }
    }
}

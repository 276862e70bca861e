//! Errors surfaced by the facade.

use std::sync::Arc;

use kvbridge_core::KeyTooLong;
use thiserror::Error;

pub use kvbridge_backend::BackendError;

/// An error returned by a facade operation.
#[derive(Debug, Error)]
pub enum FacadeError {
    /// The key is longer than the backend (or the default cap) allows.
    #[error(transparent)]
    KeyTooLong(#[from] KeyTooLong),

    /// The facade has been shut down and no longer accepts operations.
    #[error("facade has been shut down")]
    Shutdown,

    /// A `getSub`/`setSub` path traversed through a value that wasn't an
    /// object at some segment of the path.
    #[error("type mismatch at path '{path}': expected an object")]
    TypeMismatch {
        /// The dotted path being traversed.
        path: String,
    },

    /// The backend reported an error, encountered directly by the call that
    /// surfaces it (e.g. `findKeys`, `init`, `close`).
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The backend reported an error that was fanned out to every waiter of
    /// a coalesced read or a coalesced write buffer entry. Shared behind an
    /// `Arc` because more than one caller may be holding the same instance.
    #[error(transparent)]
    BackendShared(#[from] Arc<BackendError>),
}

/// Convenience alias for results returned by facade operations.
pub type FacadeResult<T> = Result<T, FacadeError>;

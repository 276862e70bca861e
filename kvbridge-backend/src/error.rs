//! Errors returned by backend drivers.

use thiserror::Error;

/// An error surfaced by a [`Backend`](crate::Backend) implementation.
#[derive(Debug, Error)]
pub enum BackendError {
    /// A connection or I/O failure talking to the underlying store.
    #[error("backend io error: {0}")]
    Io(Box<dyn std::error::Error + Send + Sync>),

    /// The backend did not respond within its configured deadline.
    #[error("backend operation timed out")]
    Timeout,

    /// Encoding or decoding a value for the wire/storage format failed.
    #[error("backend serialization error: {0}")]
    Serialization(Box<dyn std::error::Error + Send + Sync>),
}

impl BackendError {
    /// Wraps an arbitrary error as [`BackendError::Io`].
    pub fn io(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        BackendError::Io(Box::new(err))
    }

    /// Wraps an arbitrary error as [`BackendError::Serialization`].
    pub fn serialization(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        BackendError::Serialization(Box::new(err))
    }
}

/// Convenience alias for results returned by backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

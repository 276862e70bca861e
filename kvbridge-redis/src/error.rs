//! Redis-specific error conversions.

use kvbridge_backend::BackendError;
use thiserror::Error;

/// Errors specific to the Redis driver, before they're folded into the
/// generic [`BackendError`] the facade sees.
#[derive(Debug, Error)]
pub enum Error {
    /// The Redis client or connection manager reported an error.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

impl From<Error> for BackendError {
    fn from(err: Error) -> Self {
        match err {
            Error::Redis(e) => BackendError::io(e),
        }
    }
}

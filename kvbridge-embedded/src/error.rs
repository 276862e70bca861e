//! FeOxDB-specific error conversions.

use kvbridge_backend::BackendError;
use thiserror::Error;

/// Errors specific to the embedded driver, before folding into the generic
/// [`BackendError`] the facade sees.
#[derive(Debug, Error)]
pub enum FeOxDbError {
    /// The underlying FeOxDB store reported an error.
    #[error("feoxdb error: {0}")]
    Store(#[from] feoxdb::FeoxError),
}

impl From<FeOxDbError> for BackendError {
    fn from(err: FeOxDbError) -> Self {
        match err {
            FeOxDbError::Store(e) => BackendError::io(e),
        }
    }
}

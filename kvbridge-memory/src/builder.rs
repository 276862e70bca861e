//! Builder for configuring [`MemoryBackend`].

use kvbridge_core::Key;
use moka::future::{Cache, CacheBuilder};

use crate::backend::MemoryBackend;

/// Builder for creating and configuring a [`MemoryBackend`].
///
/// ```
/// use kvbridge_memory::MemoryBackend;
///
/// let backend = MemoryBackend::builder(10_000).build();
/// ```
pub struct MemoryBackendBuilder {
    builder: CacheBuilder<Key, bytes::Bytes, Cache<Key, bytes::Bytes>>,
    label: String,
}

impl MemoryBackendBuilder {
    /// Creates a new builder with the given maximum entry count. Once the
    /// cache exceeds `max_capacity` entries, Moka evicts least-recently-used
    /// ones from its own store.
    pub fn new(max_capacity: u64) -> Self {
        Self {
            builder: CacheBuilder::new(max_capacity),
            label: "memory".to_string(),
        }
    }

    /// Sets a custom label identifying this backend in logs and metrics.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Builds the backend.
    pub fn build(self) -> MemoryBackend {
        MemoryBackend {
            cache: self.builder.build(),
            label: self.label,
        }
    }
}

//! In-memory backend driver built on [`moka::future::Cache`].

use async_trait::async_trait;
use kvbridge_backend::{Backend, BackendResult, Raw};
use kvbridge_core::{glob_match, Key};
use moka::future::Cache;

use crate::builder::MemoryBackendBuilder;

/// An in-memory backend storing pre-encoded, format-agnostic bytes.
///
/// This is the backend's own store, independent of the facade's hand-rolled
/// LRU cache-and-buffer layer — the two caches serve different purposes and
/// are never the same structure. Encoding a value into [`Raw`] bytes is the
/// caller's job (the facade's configured [`Format`](kvbridge_backend::Format)
/// does that once, at the backend boundary); this backend only stores and
/// retrieves whatever bytes it's given.
///
/// Cloning is cheap: clones share the same underlying Moka cache.
#[derive(Clone)]
pub struct MemoryBackend {
    pub(crate) cache: Cache<Key, Raw>,
    pub(crate) label: String,
}

impl MemoryBackend {
    /// Starts building a backend with the given maximum entry count.
    pub fn builder(max_capacity: u64) -> MemoryBackendBuilder {
        MemoryBackendBuilder::new(max_capacity)
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn get(&self, key: &Key) -> BackendResult<Option<Raw>> {
        Ok(self.cache.get(key).await)
    }

    async fn set(&self, key: &Key, value: Raw) -> BackendResult<()> {
        self.cache.insert(key.clone(), value).await;
        Ok(())
    }

    async fn remove(&self, key: &Key) -> BackendResult<()> {
        tracing::trace!(backend = %self.label, %key, "remove");
        self.cache.invalidate(key).await;
        Ok(())
    }

    async fn find_keys(&self, pattern: &str, not_pattern: Option<&str>) -> BackendResult<Vec<Key>> {
        tracing::trace!(backend = %self.label, %pattern, ?not_pattern, "find_keys");
        self.cache.run_pending_tasks().await;
        Ok(self
            .cache
            .iter()
            .filter_map(|(key, _)| {
                let matches = glob_match(pattern, key.as_str())
                    && not_pattern.map_or(true, |np| !glob_match(np, key.as_str()));
                matches.then(|| (*key).clone())
            })
            .collect())
    }

    fn label(&self) -> &str {
        &self.label
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvbridge_backend::{BincodeFormat, Format};
    use kvbridge_core::Value;

    fn value(n: f64) -> Raw {
        BincodeFormat.encode(&Value::Number(n)).unwrap()
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let backend = MemoryBackend::builder(100).build();
        let key = Key::new("a");
        backend.set(&key, value(1.0)).await.unwrap();
        let got = backend.get(&key).await.unwrap().unwrap();
        assert_eq!(BincodeFormat.decode(&got).unwrap(), Value::Number(1.0));
    }

    #[tokio::test]
    async fn remove_clears_entry() {
        let backend = MemoryBackend::builder(100).build();
        let key = Key::new("a");
        backend.set(&key, value(1.0)).await.unwrap();
        backend.remove(&key).await.unwrap();
        assert!(backend.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_keys_matches_glob() {
        let backend = MemoryBackend::builder(100).build();
        backend.set(&Key::new("user:1"), value(1.0)).await.unwrap();
        backend.set(&Key::new("user:2"), value(2.0)).await.unwrap();
        backend
            .set(&Key::new("account:1"), value(3.0))
            .await
            .unwrap();

        let mut found: Vec<_> = backend
            .find_keys("user:*", None)
            .await
            .unwrap()
            .into_iter()
            .map(|k| k.as_str().to_string())
            .collect();
        found.sort();
        assert_eq!(found, vec!["user:1".to_string(), "user:2".to_string()]);
    }

    #[tokio::test]
    async fn find_keys_applies_not_pattern() {
        let backend = MemoryBackend::builder(100).build();
        backend.set(&Key::new("user:1"), value(1.0)).await.unwrap();
        backend.set(&Key::new("user:2"), value(2.0)).await.unwrap();

        let found = backend.find_keys("user:*", Some("user:2")).await.unwrap();
        assert_eq!(found, vec![Key::new("user:1")]);
    }
}

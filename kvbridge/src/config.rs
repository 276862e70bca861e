//! Tunables for the cache-and-buffer layer.
//!
//! Mirrors the teacher's `MemoryBackendBuilder` (plain builder, no
//! typestate) rather than `hitbox::ConfigBuilder`'s generic typestate
//! machinery — there's nothing here for the typestate pattern to earn its
//! keep on, since every field is a plain scalar.

use std::sync::Arc;
use std::time::Duration;

use kvbridge_backend::{BincodeFormat, Format, JsonFormat};

/// Default maximum number of clean cache entries.
pub const DEFAULT_CACHE_CAP: usize = 1000;

/// Default interval between periodic flushes.
pub const DEFAULT_WRITE_INTERVAL: Duration = Duration::from_millis(100);

/// Tunables recognized by the cache-and-buffer layer (spec §4.1).
#[derive(Debug, Clone)]
pub struct CblConfig {
    pub(crate) cache_cap: usize,
    pub(crate) write_interval: Duration,
    pub(crate) json: bool,
    pub(crate) cache_min_gap: usize,
}

impl Default for CblConfig {
    fn default() -> Self {
        let cache_cap = DEFAULT_CACHE_CAP;
        Self {
            cache_cap,
            write_interval: DEFAULT_WRITE_INTERVAL,
            json: false,
            cache_min_gap: default_min_gap(cache_cap),
        }
    }
}

fn default_min_gap(cache_cap: usize) -> usize {
    (cache_cap / 10).max(1)
}

impl CblConfig {
    /// Starts building a config with the spec's defaults.
    pub fn builder() -> CblConfigBuilder {
        CblConfigBuilder::new()
    }

    /// `true` if the periodic flusher is disabled in favor of flushing every
    /// write through immediately (`writeInterval == 0`).
    pub fn is_write_through(&self) -> bool {
        self.write_interval.is_zero()
    }

    pub(crate) fn format(&self) -> Arc<dyn Format> {
        if self.json {
            Arc::new(JsonFormat)
        } else {
            Arc::new(BincodeFormat)
        }
    }
}

/// Builder for [`CblConfig`].
#[derive(Debug, Clone)]
pub struct CblConfigBuilder {
    config: CblConfig,
    min_gap_explicit: bool,
}

impl CblConfigBuilder {
    /// Creates a new builder seeded with the spec's defaults.
    pub fn new() -> Self {
        Self {
            config: CblConfig::default(),
            min_gap_explicit: false,
        }
    }

    /// Maximum number of *clean* cache entries kept in memory (default 1000).
    /// Dirty and in-flight-write entries never count against this cap.
    pub fn cache(mut self, cap: usize) -> Self {
        self.config.cache_cap = cap;
        if !self.min_gap_explicit {
            self.config.cache_min_gap = default_min_gap(cap);
        }
        self
    }

    /// Interval between periodic flushes (default 100ms). `Duration::ZERO`
    /// switches to write-through: every `set`/`remove` triggers its own
    /// immediate flush instead of waiting for the next tick.
    pub fn write_interval(mut self, interval: Duration) -> Self {
        self.config.write_interval = interval;
        self
    }

    /// Whether values are JSON-encoded crossing the backend boundary
    /// (default `false`, which uses the more compact bincode format). The
    /// in-memory cache always holds the structured [`Value`](kvbridge_core::Value)
    /// form regardless of this setting.
    pub fn json(mut self, json: bool) -> Self {
        self.config.json = json;
        self
    }

    /// Minimum number of clean entries evicted per eviction pass once the
    /// cap is exceeded (default: 10% of `cache`, at least 1).
    pub fn cache_min_gap(mut self, gap: usize) -> Self {
        self.config.cache_min_gap = gap;
        self.min_gap_explicit = true;
        self
    }

    /// Builds the config.
    pub fn build(self) -> CblConfig {
        self.config
    }
}

impl Default for CblConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = CblConfig::default();
        assert_eq!(config.cache_cap, 1000);
        assert_eq!(config.write_interval, Duration::from_millis(100));
        assert!(!config.json);
        assert_eq!(config.cache_min_gap, 100);
        assert!(!config.is_write_through());
    }

    #[test]
    fn write_interval_zero_is_write_through() {
        let config = CblConfig::builder().write_interval(Duration::ZERO).build();
        assert!(config.is_write_through());
    }

    #[test]
    fn cache_min_gap_tracks_cache_unless_set_explicitly() {
        let config = CblConfig::builder().cache(50).build();
        assert_eq!(config.cache_min_gap, 5);

        let config = CblConfig::builder().cache_min_gap(2).cache(50).build();
        assert_eq!(config.cache_min_gap, 2);
    }
}

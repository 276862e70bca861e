//! Metrics declarations, gated behind the `metrics` feature.
//!
//! Named and structured the way the teacher declares its offload-manager
//! gauges/counters in `hitbox/src/metrics.rs`: a `lazy_static!` block whose
//! initializers register each metric's description once, returning the
//! metric name as a `&'static str` for call sites to key off of.

#![cfg(feature = "metrics")]

use lazy_static::lazy_static;

lazy_static! {
    /// Cache hits on `get` (cache, write-buffer, or pending-read join).
    pub(crate) static ref CACHE_HIT_COUNTER: &'static str = {
        metrics::describe_counter!("kvbridge_cache_hit_total", "Total number of cache hits on get.");
        "kvbridge_cache_hit_total"
    };
    /// Cache misses on `get` that required a backend read.
    pub(crate) static ref CACHE_MISS_COUNTER: &'static str = {
        metrics::describe_counter!(
            "kvbridge_cache_miss_total",
            "Total number of cache misses on get that hit the backend."
        );
        "kvbridge_cache_miss_total"
    };
    /// Reads joined onto an already in-flight backend fetch for the same key.
    pub(crate) static ref READ_COALESCED_COUNTER: &'static str = {
        metrics::describe_counter!(
            "kvbridge_read_coalesced_total",
            "Total number of reads that joined an in-flight backend read instead of issuing a new one."
        );
        "kvbridge_read_coalesced_total"
    };
    /// Cache entries evicted from the LRU tail.
    pub(crate) static ref CACHE_EVICTION_COUNTER: &'static str = {
        metrics::describe_counter!(
            "kvbridge_cache_eviction_total",
            "Total number of clean cache entries evicted."
        );
        "kvbridge_cache_eviction_total"
    };
    /// Current depth of the dirty-write buffer.
    pub(crate) static ref BUFFER_DEPTH_GAUGE: &'static str = {
        metrics::describe_gauge!(
            "kvbridge_write_buffer_depth",
            "Number of keys currently buffered awaiting flush."
        );
        "kvbridge_write_buffer_depth"
    };
    /// Flush batch duration.
    pub(crate) static ref FLUSH_DURATION_HISTOGRAM: &'static str = {
        metrics::describe_histogram!(
            "kvbridge_flush_duration_seconds",
            metrics::Unit::Seconds,
            "Time spent in a single doBulk flush call."
        );
        "kvbridge_flush_duration_seconds"
    };
    /// Flushes that failed and returned their ops to the buffer.
    pub(crate) static ref FLUSH_FAILURE_COUNTER: &'static str = {
        metrics::describe_counter!(
            "kvbridge_flush_failure_total",
            "Total number of doBulk flush calls that failed."
        );
        "kvbridge_flush_failure_total"
    };
}

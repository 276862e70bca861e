//! The CBL's own value cache: a hand-rolled LRU over [`IndexMap`].
//!
//! Moka (used by `kvbridge-memory` for the *backend's* storage) can't honor
//! "never evict a dirty or in-flight-write entry" — that's a correctness
//! invariant here, not a tuning knob — so this cache is written by hand, the
//! same way the teacher tracks capacity in `hitbox-moka`, generalized to the
//! skip-ineligible-victims eviction rule spec §4.1 requires.

use indexmap::IndexMap;
use kvbridge_core::{Key, Value};

/// What a [`CacheEntry`] holds: either a known value, or a tombstone
/// recording that the key is known to be absent (glossary: distinguishes
/// "known absent" from "unknown").
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Stored {
    Value(Value),
    Tombstone,
}

impl Stored {
    fn as_get_result(&self) -> Option<Value> {
        match self {
            Stored::Value(v) => Some(v.deep_clone()),
            Stored::Tombstone => None,
        }
    }
}

/// One entry in the CBL's cache (spec §3's `CacheEntry`).
///
/// LRU position and last-touch tick aren't separate fields: both are
/// implied by the entry's position in the backing [`IndexMap`], which the
/// [`Cache`] keeps in least-to-most-recently-used order.
#[derive(Debug, Clone)]
pub(crate) struct CacheEntry {
    pub(crate) stored: Stored,
    pub(crate) dirty: bool,
    pub(crate) in_flight_write: bool,
}

impl CacheEntry {
    pub(crate) fn clean(stored: Stored) -> Self {
        Self {
            stored,
            dirty: false,
            in_flight_write: false,
        }
    }

    pub(crate) fn dirty(stored: Stored) -> Self {
        Self {
            stored,
            dirty: true,
            in_flight_write: false,
        }
    }

    fn is_evictable(&self) -> bool {
        !self.dirty && !self.in_flight_write
    }
}

/// The CBL's value cache. Not `Send`-shared on its own — it lives behind
/// the CBL's single state mutex (spec §5's "single logical executor").
#[derive(Debug)]
pub(crate) struct Cache {
    entries: IndexMap<Key, CacheEntry>,
    cap: usize,
    min_gap: usize,
}

impl Cache {
    pub(crate) fn new(cap: usize, min_gap: usize) -> Self {
        Self {
            entries: IndexMap::new(),
            cap,
            min_gap,
        }
    }

    /// Reads an entry, touching it to most-recently-used on a hit.
    pub(crate) fn get(&mut self, key: &Key) -> Option<Option<Value>> {
        let idx = self.entries.get_index_of(key)?;
        self.touch(idx);
        self.entries.get(key).map(|entry| entry.stored.as_get_result())
    }

    /// Inserts or replaces an entry, marking it most-recently-used.
    pub(crate) fn insert(&mut self, key: Key, entry: CacheEntry) {
        self.entries.insert(key.clone(), entry);
        if let Some(idx) = self.entries.get_index_of(&key) {
            self.touch(idx);
        }
    }

    pub(crate) fn get_mut(&mut self, key: &Key) -> Option<&mut CacheEntry> {
        self.entries.get_mut(key)
    }

    pub(crate) fn remove(&mut self, key: &Key) {
        self.entries.shift_remove(key);
    }

    fn touch(&mut self, idx: usize) {
        let last = self.entries.len() - 1;
        self.entries.move_index(idx, last);
    }

    fn clean_count(&self) -> usize {
        self.entries.values().filter(|e| e.is_evictable()).count()
    }

    /// Evicts from the LRU tail, skipping dirty/in-flight entries, until the
    /// clean population is back at or under `cap - min_gap` (or no eligible
    /// victim remains). Evicting to `cap - min_gap` rather than just `cap`
    /// is what `cacheMinGap` buys: a pass clears headroom instead of
    /// re-triggering on the very next insert. Returns the number of entries
    /// evicted.
    pub(crate) fn evict_if_needed(&mut self) -> usize {
        if self.clean_count() <= self.cap {
            return 0;
        }
        let target = self.cap.saturating_sub(self.min_gap);
        let mut evicted = 0;
        loop {
            if self.clean_count() <= target {
                break;
            }
            let victim = self
                .entries
                .iter()
                .position(|(_, entry)| entry.is_evictable());
            match victim {
                Some(idx) => {
                    self.entries.shift_remove_index(idx);
                    evicted += 1;
                }
                None => break,
            }
        }
        evicted
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, key: &Key) -> bool {
        self.entries.contains_key(key)
    }
}

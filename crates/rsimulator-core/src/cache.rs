use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use tracing::{debug, trace};

/// Default number of memoized lookups.
pub const DEFAULT_MAX_ENTRIES: usize = 1000;

/// Metrics for cache performance
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub size: usize,
}

impl CacheMetrics {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct CacheEntry<V> {
    cell: Arc<OnceCell<V>>,
    last_accessed: u64,
}

struct CacheState<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    /// Logical clock for LRU ordering
    tick: u64,
    metrics: CacheMetrics,
}

/// Bounded LRU memoization with at most one computation in flight per key.
///
/// Concurrent callers for the same key wait for the first computation and
/// share its value. Failed computations are not stored; the next caller
/// recomputes.
pub struct LookupCache<K, V> {
    max_entries: usize,
    state: Mutex<CacheState<K, V>>,
}

impl<K, V> LookupCache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    pub fn new(max_entries: usize) -> Self {
        debug!("Creating lookup cache: max_entries={}", max_entries);
        Self {
            max_entries: max_entries.max(1),
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                tick: 0,
                metrics: CacheMetrics::default(),
            }),
        }
    }

    /// Return the cached value for `key`, computing it with `compute` on a
    /// miss.
    pub fn get_or_try_insert_with<E, F>(&self, key: &K, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        let cell = self.cell(key);
        let result = cell.get_or_try_init(compute).cloned();
        if result.is_err() {
            self.discard_failed(key, &cell);
        }
        result
    }

    fn cell(&self, key: &K) -> Arc<OnceCell<V>> {
        let mut state = self.state.lock();
        state.tick += 1;
        let tick = state.tick;

        if let Some(entry) = state.entries.get_mut(key) {
            entry.last_accessed = tick;
            let cell = Arc::clone(&entry.cell);
            state.metrics.hits += 1;
            trace!("Lookup cache hit");
            return cell;
        }

        if state.entries.len() >= self.max_entries {
            Self::evict_lru(&mut state);
        }
        let cell = Arc::new(OnceCell::new());
        state.entries.insert(
            key.clone(),
            CacheEntry {
                cell: Arc::clone(&cell),
                last_accessed: tick,
            },
        );
        state.metrics.misses += 1;
        state.metrics.size = state.entries.len();
        trace!("Lookup cache miss");
        cell
    }

    fn discard_failed(&self, key: &K, cell: &Arc<OnceCell<V>>) {
        let mut state = self.state.lock();
        let failed = state
            .entries
            .get(key)
            .is_some_and(|entry| Arc::ptr_eq(&entry.cell, cell) && entry.cell.get().is_none());
        if failed {
            state.entries.remove(key);
            state.metrics.size = state.entries.len();
        }
    }

    /// Evict the least recently used computed entry. Entries still being
    /// computed are never evicted, so the cache may briefly exceed its bound.
    fn evict_lru(state: &mut CacheState<K, V>) {
        let oldest = state
            .entries
            .iter()
            .filter(|(_, entry)| entry.cell.get().is_some())
            .min_by_key(|(_, entry)| entry.last_accessed)
            .map(|(key, _)| key.clone());
        if let Some(key) = oldest {
            state.entries.remove(&key);
            state.metrics.evictions += 1;
            trace!("Evicted least recently used lookup");
        }
    }

    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.metrics.size = 0;
        debug!("Lookup cache cleared");
    }

    pub fn metrics(&self) -> CacheMetrics {
        self.state.lock().metrics.clone()
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ── Resolution cache ──
//
// Bounded LRU map from flag key to the last STATIC resolution. Entries
// never expire on their own; the event stream deletes or purges them.
// A single mutex guards the map: every operation is O(1) and never held
// across an await, so the resolver and the event loop can share it freely.

use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};

use lru::LruCache;

use crate::model::{FlagValue, ResolutionDetails};

/// What the cache stores: a resolution of any flag type.
pub type CachedResolution = ResolutionDetails<FlagValue>;

/// Thread-safe, bounded, least-recently-used resolution cache.
pub struct ResolutionCache {
    entries: Mutex<LruCache<String, CachedResolution>>,
}

impl ResolutionCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// `None` when `capacity` is zero, i.e. caching is disabled.
    pub fn with_capacity(capacity: usize) -> Option<Self> {
        NonZeroUsize::new(capacity).map(Self::new)
    }

    /// A poisoned lock only means another thread panicked mid-operation on
    /// a plain map; the map itself is still consistent.
    fn lock(&self) -> MutexGuard<'_, LruCache<String, CachedResolution>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up `key`, marking it most recently used.
    pub fn try_get(&self, key: &str) -> Option<CachedResolution> {
        self.lock().get(key).cloned()
    }

    /// Insert or overwrite. Evicts the least recently used entry when full.
    pub fn add(&self, key: impl Into<String>, resolution: CachedResolution) {
        self.lock().put(key.into(), resolution);
    }

    /// Remove `key`. Returns `true` if it was present.
    pub fn delete(&self, key: &str) -> bool {
        self.lock().pop(key).is_some()
    }

    /// Remove everything.
    pub fn purge(&self) {
        self.lock().clear();
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.lock().cap().get()
    }
}

impl std::fmt::Debug for ResolutionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.lock();
        f.debug_struct("ResolutionCache")
            .field("len", &entries.len())
            .field("capacity", &entries.cap())
            .finish_non_exhaustive()
    }
}

// ── Tests ────────────────────────────────────────────────────────────

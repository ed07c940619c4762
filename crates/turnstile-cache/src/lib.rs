//! Cache-aside layer for read results.
//!
//! The read path checks this cache first and populates it on miss; entries
//! expire solely by elapsed time. Keys are derived deterministically from
//! query shape (resource type, canonical filter, page), so two callers
//! issuing the same read hit the same entry.
//!
//! Deliberately no single-flight coalescing: concurrent misses for one key
//! may each recompute the result. Entries are immutable once set until they
//! expire or are overwritten, so the last writer simply wins with an
//! identical value.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Run an expiry sweep every N inserts.
const CLEANUP_INTERVAL: u64 = 100;

/// Force a sweep when exceeding capacity by this factor.
const HARD_CAPACITY_MULTIPLIER: f64 = 1.5;

/// Cache configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Time after which an entry is never returned again.
    pub ttl: Duration,
    /// Soft bound on the number of entries.
    pub capacity: usize,
    /// Disabled caches miss on every get and drop every insert.
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(60),
            capacity: 1024,
            enabled: true,
        }
    }
}

/// A cache key derived deterministically from query shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Resource type being read.
    pub resource_type: String,
    /// Canonical text form of the validated filter set.
    pub filter_key: String,
    /// 1-based page number.
    pub page_number: u32,
    /// Effective (clamped) page size.
    pub page_size: u32,
}

impl CacheKey {
    #[must_use]
    pub fn new(
        resource_type: impl Into<String>,
        filter_key: impl Into<String>,
        page_number: u32,
        page_size: u32,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            filter_key: filter_key.into(),
            page_number,
            page_size,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Arc<Value>,
    expires_at: Instant,
}

/// Counter snapshot for monitoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
}

impl CacheStats {
    /// Hit rate in `[0, 1]`; zero when the cache has seen no reads.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let reads = self.hits + self.misses;
        if reads == 0 {
            0.0
        } else {
            self.hits as f64 / reads as f64
        }
    }
}

/// Concurrent TTL-bounded read cache.
#[derive(Debug)]
pub struct ReadCache {
    entries: DashMap<CacheKey, CacheEntry>,
    config: CacheConfig,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    inserts: AtomicU64,
}

impl ReadCache {
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            inserts: AtomicU64::new(0),
        }
    }

    /// Returns the cached value, or `None` on miss.
    ///
    /// An entry past its expiry is removed and reported as a miss; a stale
    /// value is never returned.
    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<Arc<Value>> {
        if !self.config.enabled {
            return None;
        }

        let hit = self.entries.get(key).and_then(|entry| {
            if entry.expires_at > Instant::now() {
                Some(Arc::clone(&entry.value))
            } else {
                None
            }
        });

        match hit {
            Some(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(value)
            }
            None => {
                // Drop the expired entry eagerly rather than waiting for a sweep.
                if self.entries.remove_if(key, |_, e| e.expires_at <= Instant::now()).is_some() {
                    self.evictions.fetch_add(1, Ordering::Relaxed);
                }
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Stores a value under the configured TTL, overwriting any previous
    /// entry for the key.
    pub fn insert(&self, key: CacheKey, value: Value) {
        if !self.config.enabled {
            return;
        }

        self.entries.insert(
            key,
            CacheEntry {
                value: Arc::new(value),
                expires_at: Instant::now() + self.config.ttl,
            },
        );

        let inserts = self.inserts.fetch_add(1, Ordering::Relaxed) + 1;
        let hard_cap = (self.config.capacity as f64 * HARD_CAPACITY_MULTIPLIER) as usize;
        if inserts % CLEANUP_INTERVAL == 0 || self.entries.len() > hard_cap {
            self.cleanup();
        }
    }

    /// Removes expired entries, then trims soonest-to-expire entries if the
    /// cache is still over capacity.
    fn cleanup(&self) {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        let mut evicted = before - self.entries.len();

        if self.entries.len() > self.config.capacity {
            let mut by_expiry: Vec<(CacheKey, Instant)> = self
                .entries
                .iter()
                .map(|e| (e.key().clone(), e.value().expires_at))
                .collect();
            by_expiry.sort_by_key(|(_, expires_at)| *expires_at);

            let excess = self.entries.len() - self.config.capacity;
            for (key, _) in by_expiry.into_iter().take(excess) {
                if self.entries.remove(&key).is_some() {
                    evicted += 1;
                }
            }
        }

        if evicted > 0 {
            self.evictions.fetch_add(evicted as u64, Ordering::Relaxed);
            tracing::debug!(evicted, remaining = self.entries.len(), "cache cleanup");
        }
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

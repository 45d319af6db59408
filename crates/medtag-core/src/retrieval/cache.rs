//! TTL + LRU memoization of ranked retrieval results.
//!
//! An explicit, injectable cache so its policy (key shape, TTL) is testable
//! apart from the pipeline. Keys hash the exact input text together with the
//! retrieval parameters, so a config change never serves stale shapes.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;

/// Cache hit/miss counters, mostly for logging and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Time-aware LRU cache keyed by hashed input + parameters.
pub struct ResultCache<T> {
    cache: Mutex<LruCache<String, (T, Instant)>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<T: Clone> ResultCache<T> {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("capacity clamped to >= 1");
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Cache key for a retrieval invocation.
    pub fn make_key(
        text: &str,
        window_size: usize,
        stride: usize,
        top_k: usize,
        top_n: usize,
    ) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(text.as_bytes());
        hasher.update(&(window_size as u64).to_le_bytes());
        hasher.update(&(stride as u64).to_le_bytes());
        hasher.update(&(top_k as u64).to_le_bytes());
        hasher.update(&(top_n as u64).to_le_bytes());
        hasher.finalize().to_hex().to_string()
    }

    pub fn get(&self, key: &str) -> Option<T> {
        let mut cache = self.cache.lock();
        if let Some((value, stored_at)) = cache.get(key) {
            if stored_at.elapsed() < self.ttl {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(value.clone());
            }
            cache.pop(key);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    pub fn set(&self, key: &str, value: T) {
        self.cache.lock().put(key.to_string(), (value, Instant::now()));
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

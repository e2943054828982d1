//! Sightline Cache - Keyed TTL Cache with Request Coalescing
//!
//! Maps a [`MetricKey`] to a value with a per-entry time-to-live. Reads
//! past the TTL refetch; concurrent misses for the same key coalesce into
//! one fetch; capacity overflow evicts the oldest entry first.
//!
//! # Stale-fallback policy
//!
//! One policy everywhere: when a fetch fails and an expired (but not
//! invalidated) entry survives, the expired value is served and counted as
//! a stale fallback. Without a surviving entry the error propagates.
//! Failed fetches are never stored, and a fetch that began before a newer
//! write or invalidation of its key discards its store on completion.

mod coalesce;
mod metrics;

pub use metrics::CacheMetrics;

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sightline_core::{CacheError, GatewayError, MetricKey};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use coalesce::InflightGuards;

struct CacheEntry<V> {
    value: Arc<V>,
    stored_at: Instant,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn is_fresh(&self) -> bool {
        self.stored_at.elapsed() < self.ttl
    }
}

/// Entry map plus a per-key write generation. Every write (store, set,
/// invalidate, clear) bumps the key's generation; a fetch that began
/// under an older generation must not store its result, otherwise a slow
/// fetch would overwrite whatever replaced or removed the entry while it
/// was in flight.
struct Slots<V> {
    entries: HashMap<String, CacheEntry<V>>,
    generations: HashMap<String, u64>,
}

impl<V> Slots<V> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            generations: HashMap::new(),
        }
    }

    fn bump(&mut self, key: &str) {
        *self.generations.entry(key.to_string()).or_insert(0) += 1;
    }
}

/// Keyed cache with TTL expiry, oldest-first eviction, and per-key
/// request coalescing.
///
/// Owned by one dashboard instance; construct explicitly and share via
/// `Arc`. Time arithmetic uses `tokio::time::Instant` so paused-clock
/// tests are deterministic.
pub struct KeyedCache<V> {
    capacity: usize,
    slots: Mutex<Slots<V>>,
    inflight: InflightGuards,
    hits: AtomicU64,
    misses: AtomicU64,
    stale_fallbacks: AtomicU64,
    evictions: AtomicU64,
}

impl<V: Send + Sync> KeyedCache<V> {
    /// Create a cache bounded to `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            slots: Mutex::new(Slots::new()),
            inflight: InflightGuards::default(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            stale_fallbacks: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Return the cached value for `key`, or fetch, store, and return it.
    ///
    /// An unexpired entry is a hit and resolves without invoking the
    /// fetcher. On a miss, concurrent callers for the same key coalesce:
    /// exactly one fetcher runs, the rest observe its stored result.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        key: &MetricKey,
        ttl: Duration,
        fetcher: F,
    ) -> Result<Arc<V>, CacheError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, GatewayError>>,
    {
        if let Some(value) = self.lookup_fresh(key).await {
            self.hits.fetch_add(1, Ordering::SeqCst);
            return Ok(value);
        }

        let _guard = self.inflight.acquire(key.as_str()).await;

        // A coalesced winner may have stored the value while we waited.
        if let Some(value) = self.lookup_fresh(key).await {
            self.hits.fetch_add(1, Ordering::SeqCst);
            return Ok(value);
        }

        self.misses.fetch_add(1, Ordering::SeqCst);
        let observed = self.generation(key).await;
        match fetcher().await {
            Ok(value) => {
                let value = Arc::new(value);
                if !self.store_if_current(key, Arc::clone(&value), ttl, observed).await {
                    debug!(key = %key, "entry changed during fetch, discarding store");
                }
                self.inflight.prune().await;
                Ok(value)
            }
            Err(error) => {
                self.inflight.prune().await;
                if let Some(stale) = self.lookup_any(key).await {
                    self.stale_fallbacks.fetch_add(1, Ordering::SeqCst);
                    warn!(key = %key, %error, "fetch failed, serving expired entry");
                    return Ok(stale);
                }
                Err(CacheError::FetchFailed {
                    key: key.to_string(),
                    source: error,
                })
            }
        }
    }

    /// Unconditionally store a value, evicting the oldest entry first when
    /// at capacity.
    pub async fn set(&self, key: &MetricKey, value: V, ttl: Duration) -> Arc<V> {
        let value = Arc::new(value);
        self.store(key, Arc::clone(&value), ttl).await;
        value
    }

    /// Remove one entry. Returns whether an entry was present. Always
    /// advances the key's generation so an in-flight fetch for it cannot
    /// store a pre-invalidation result.
    pub async fn invalidate(&self, key: &MetricKey) -> bool {
        let mut slots = self.slots.lock().await;
        slots.bump(key.as_str());
        slots.entries.remove(key.as_str()).is_some()
    }

    /// Remove every entry whose category prefix matches. Returns the
    /// number removed.
    pub async fn invalidate_prefix(&self, prefix: &str) -> usize {
        let mut slots = self.slots.lock().await;
        let matching: Vec<String> = slots
            .generations
            .keys()
            .filter(|key| key.split(':').next().unwrap_or(key.as_str()) == prefix)
            .cloned()
            .collect();
        for key in &matching {
            slots.bump(key);
        }
        let before = slots.entries.len();
        slots
            .entries
            .retain(|key, _| key.split(':').next().unwrap_or(key) != prefix);
        before - slots.entries.len()
    }

    /// Remove all entries. Returns the number removed.
    pub async fn clear(&self) -> usize {
        let mut slots = self.slots.lock().await;
        let known: Vec<String> = slots.generations.keys().cloned().collect();
        for key in &known {
            slots.bump(key);
        }
        let removed = slots.entries.len();
        slots.entries.clear();
        removed
    }

    /// Current usage counters.
    pub async fn metrics(&self) -> CacheMetrics {
        CacheMetrics {
            hits: self.hits.load(Ordering::SeqCst),
            misses: self.misses.load(Ordering::SeqCst),
            stale_fallbacks: self.stale_fallbacks.load(Ordering::SeqCst),
            evictions: self.evictions.load(Ordering::SeqCst),
            size: self.slots.lock().await.entries.len() as u64,
        }
    }

    async fn lookup_fresh(&self, key: &MetricKey) -> Option<Arc<V>> {
        let slots = self.slots.lock().await;
        slots
            .entries
            .get(key.as_str())
            .filter(|e| e.is_fresh())
            .map(|e| Arc::clone(&e.value))
    }

    /// Any surviving entry, fresh or expired. Stale-fallback path only.
    async fn lookup_any(&self, key: &MetricKey) -> Option<Arc<V>> {
        let slots = self.slots.lock().await;
        slots.entries.get(key.as_str()).map(|e| Arc::clone(&e.value))
    }

    /// The key's current write generation. Registers the key so later
    /// bulk invalidations advance it even before anything is stored.
    async fn generation(&self, key: &MetricKey) -> u64 {
        let mut slots = self.slots.lock().await;
        *slots.generations.entry(key.to_string()).or_insert(0)
    }

    async fn store(&self, key: &MetricKey, value: Arc<V>, ttl: Duration) {
        let mut slots = self.slots.lock().await;
        self.insert_locked(&mut slots, key, value, ttl);
    }

    /// Store only if the key's generation still matches `observed`. A
    /// mismatch means the entry was written, invalidated, or cleared
    /// while the fetch ran; storing then would roll the cache back.
    async fn store_if_current(
        &self,
        key: &MetricKey,
        value: Arc<V>,
        ttl: Duration,
        observed: u64,
    ) -> bool {
        let mut slots = self.slots.lock().await;
        let current = slots.generations.get(key.as_str()).copied().unwrap_or(0);
        if current != observed {
            return false;
        }
        self.insert_locked(&mut slots, key, value, ttl);
        true
    }

    fn insert_locked(&self, slots: &mut Slots<V>, key: &MetricKey, value: Arc<V>, ttl: Duration) {
        if !slots.entries.contains_key(key.as_str()) && slots.entries.len() >= self.capacity {
            if let Some(victim) = slots
                .entries
                .iter()
                .min_by_key(|(_, e)| e.stored_at)
                .map(|(k, _)| k.clone())
            {
                debug!(key = %victim, "evicting oldest cache entry");
                slots.entries.remove(&victim);
                slots.bump(&victim);
                self.evictions.fetch_add(1, Ordering::SeqCst);
            }
        }
        slots.bump(key.as_str());
        slots.entries.insert(
            key.as_str().to_string(),
            CacheEntry {
                value,
                stored_at: Instant::now(),
                ttl,
            },
        );
    }
}

// ============================================================================
// TESTS
// ============================================================================

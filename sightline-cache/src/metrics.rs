//! Cache usage counters

/// Statistics about cache usage. Pure read, no side effects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheMetrics {
    /// Reads served from an unexpired entry.
    pub hits: u64,
    /// Reads that invoked the fetcher.
    pub misses: u64,
    /// Failed fetches served from an expired entry instead.
    pub stale_fallbacks: u64,
    /// Entries removed to stay within capacity.
    pub evictions: u64,
    /// Entries currently stored.
    pub size: u64,
}

impl CacheMetrics {
    /// Hit rate in [0.0, 1.0]; zero when nothing has been read yet.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

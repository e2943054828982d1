//! Configuration types

use crate::error::{ConfigError, SightlineResult};
use crate::events::Priority;
use std::time::Duration;

/// Master configuration for one mounted dashboard.
///
/// Constructed explicitly at the composition root and passed in; there is
/// no module-level singleton.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    /// Maximum number of cache entries before oldest-first eviction.
    pub cache_capacity: usize,
    /// TTL for Normal-priority loads.
    pub default_ttl: Duration,
    /// Effective TTL for High-priority loads that still go through the cache.
    pub high_priority_ttl: Duration,
    /// TTL for Low-priority loads.
    pub low_priority_ttl: Duration,
    /// Interval between periodic backend health checks.
    pub health_interval: Duration,
    /// Probe latency above which the backend is reported Degraded.
    pub degraded_latency_ms: i64,
    /// Minimum spacing between change-driven refreshes, per priority.
    pub debounce_high: Duration,
    pub debounce_normal: Duration,
    pub debounce_low: Duration,
    /// Bound on the recent load-time sample buffer.
    pub max_load_samples: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 100,
            default_ttl: Duration::from_secs(60),
            high_priority_ttl: Duration::from_secs(5),
            low_priority_ttl: Duration::from_secs(300),
            health_interval: Duration::from_secs(30),
            degraded_latency_ms: 1_000,
            debounce_high: Duration::from_millis(500),
            debounce_normal: Duration::from_secs(2),
            debounce_low: Duration::from_secs(5),
            max_load_samples: 50,
        }
    }
}

impl DashboardConfig {
    /// Effective TTL for a load at the given priority.
    pub fn ttl_for(&self, priority: Priority) -> Duration {
        match priority {
            Priority::High => self.high_priority_ttl,
            Priority::Normal => self.default_ttl,
            Priority::Low => self.low_priority_ttl,
        }
    }

    /// Debounce window for change-driven refreshes at the given priority.
    pub fn debounce_for(&self, priority: Priority) -> Duration {
        match priority {
            Priority::High => self.debounce_high,
            Priority::Normal => self.debounce_normal,
            Priority::Low => self.debounce_low,
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> SightlineResult<()> {
        if self.cache_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "cache_capacity".to_string(),
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            }
            .into());
        }
        for (field, ttl) in [
            ("default_ttl", self.default_ttl),
            ("high_priority_ttl", self.high_priority_ttl),
            ("low_priority_ttl", self.low_priority_ttl),
            ("health_interval", self.health_interval),
        ] {
            if ttl.is_zero() {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: "0".to_string(),
                    reason: "must be positive".to_string(),
                }
                .into());
            }
        }
        if self.max_load_samples == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_load_samples".to_string(),
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

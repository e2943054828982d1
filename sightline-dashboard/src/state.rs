//! Dashboard view state
//!
//! One value of [`DashboardState`] is the entire data surface a rendered
//! dashboard reads from. The loader owns the canonical copy behind a lock;
//! consumers take cheap snapshots. All mutation goes through the loader's
//! guarded write path, never through this module.

use std::collections::HashMap;

use sightline_core::{
    ConsolidatedMetrics, HealthSnapshot, MetricKey, RegionalMetric, TimeRange, Timestamp,
    TrendSeries,
};

/// Everything a mounted dashboard displays, in one place.
#[derive(Debug, Clone)]
pub struct DashboardState {
    /// The consolidated aggregate: counts, time analytics, AI accuracy,
    /// user metrics, revenue.
    pub consolidated: Option<ConsolidatedMetrics>,
    /// Per-day trend series, one entry per loaded time range.
    pub trends: HashMap<TimeRange, TrendSeries>,
    /// Regional breakdown rows.
    pub regional: Option<Vec<RegionalMetric>>,
    /// Per-key in-flight flag. True exactly for the span of an
    /// outstanding load.
    pub loading: HashMap<MetricKey, bool>,
    /// Per-key error message from the most recent failed load. Absent
    /// once a later load succeeds.
    pub errors: HashMap<MetricKey, String>,
    /// Per-key timestamp of the last successful load.
    pub last_updated: HashMap<MetricKey, Timestamp>,
    /// True until the first metric load completes.
    pub is_initial_load: bool,
    /// Latest backend health reading, replaced wholesale each check.
    pub health: Option<HealthSnapshot>,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self {
            consolidated: None,
            trends: HashMap::new(),
            regional: None,
            loading: HashMap::new(),
            errors: HashMap::new(),
            last_updated: HashMap::new(),
            is_initial_load: true,
            health: None,
        }
    }
}

impl DashboardState {
    /// Whether a load for this key is outstanding.
    pub fn is_loading(&self, key: &MetricKey) -> bool {
        self.loading.get(key).copied().unwrap_or(false)
    }

    /// Whether any load is outstanding.
    pub fn any_loading(&self) -> bool {
        self.loading.values().any(|loading| *loading)
    }

    /// Error message recorded for this key, if any.
    pub fn error_for(&self, key: &MetricKey) -> Option<&str> {
        self.errors.get(key).map(String::as_str)
    }

    /// Keys whose most recent load failed.
    pub fn failed_keys(&self) -> Vec<MetricKey> {
        self.errors.keys().cloned().collect()
    }
}

/// Load-performance reading assembled on demand.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadPerformance {
    /// Mean wall-clock duration of recent successful loads, in ms.
    pub avg_load_ms: f64,
    /// Cache hit rate in [0.0, 1.0].
    pub cache_hit_rate: f64,
    /// Recent successful load durations, oldest first, bounded by
    /// `max_load_samples`.
    pub recent_load_ms: Vec<f64>,
}

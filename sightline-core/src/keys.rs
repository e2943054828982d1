//! Metric key identifiers
//!
//! A [`MetricKey`] names one logical metric slice. The same key is used for
//! cache lookups, loading-state bookkeeping, and error recording, so the
//! mapping is kept in one place.

use crate::metrics::TimeRange;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier for a named metric slice.
///
/// Keys within one category share a prefix (separated by `:`) so that a
/// whole category can be invalidated at once, e.g. every cached trend
/// range under `trend_metrics`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetricKey(String);

impl MetricKey {
    /// The consolidated dashboard aggregate.
    pub fn consolidated() -> Self {
        Self("dashboard_metrics".to_string())
    }

    /// Per-user activity metrics.
    pub fn users() -> Self {
        Self("user_metrics".to_string())
    }

    /// Trend series for one time range.
    pub fn trend(range: TimeRange) -> Self {
        Self(format!("trend_metrics:{}", range.as_str()))
    }

    /// Regional breakdown.
    pub fn regional() -> Self {
        Self("regional_metrics".to_string())
    }

    /// Build a key from an arbitrary identifier.
    pub fn custom(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The category prefix: everything before the first `:`, or the whole
    /// key when it has no parameter suffix.
    pub fn category_prefix(&self) -> &str {
        self.0.split(':').next().unwrap_or(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MetricKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_known_keys() {
        assert_eq!(MetricKey::consolidated().as_str(), "dashboard_metrics");
        assert_eq!(MetricKey::users().as_str(), "user_metrics");
        assert_eq!(MetricKey::regional().as_str(), "regional_metrics");
    }

    #[test]
    fn test_trend_key_embeds_range() {
        let key = MetricKey::trend(TimeRange::Month);
        assert_eq!(key.as_str(), "trend_metrics:30d");
        assert_eq!(key.category_prefix(), "trend_metrics");
    }

    #[test]
    fn test_category_prefix_without_suffix() {
        let key = MetricKey::consolidated();
        assert_eq!(key.category_prefix(), "dashboard_metrics");
    }

    #[test]
    fn test_keys_are_hashable_and_distinct() {
        use std::collections::HashSet;
        let keys: HashSet<MetricKey> = [
            MetricKey::consolidated(),
            MetricKey::users(),
            MetricKey::trend(TimeRange::Week),
            MetricKey::trend(TimeRange::Month),
            MetricKey::regional(),
        ]
        .into_iter()
        .collect();
        assert_eq!(keys.len(), 5);
    }
}

//! Typed metric payloads
//!
//! Strict internal shapes for everything the remote gateway returns. Raw
//! payloads are decoded into these at the boundary (sightline-gateway);
//! nothing downstream touches loosely typed JSON.

use crate::rates::compute_rate;
use serde::{Deserialize, Serialize};

// ============================================================================
// TIME RANGES
// ============================================================================

/// Requestable time range for trend series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeRange {
    /// Last 7 days
    Week,
    /// Last 30 days
    Month,
    /// Last 90 days
    Quarter,
    /// Last 365 days
    Year,
}

impl TimeRange {
    /// Wire identifier used by the backend RPC and in cache keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Week => "7d",
            Self::Month => "30d",
            Self::Quarter => "90d",
            Self::Year => "1y",
        }
    }

    /// Number of days covered by the range.
    pub fn days(&self) -> u32 {
        match self {
            Self::Week => 7,
            Self::Month => 30,
            Self::Quarter => 90,
            Self::Year => 365,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "7d" => Some(Self::Week),
            "30d" => Some(Self::Month),
            "90d" => Some(Self::Quarter),
            "1y" => Some(Self::Year),
            _ => None,
        }
    }
}

// ============================================================================
// CONSOLIDATED METRICS
// ============================================================================

/// Inspection counts by status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectionCounts {
    pub total: u64,
    pub completed: u64,
    pub in_progress: u64,
    pub pending: u64,
    pub cancelled: u64,
}

impl InspectionCounts {
    /// Completion rate as a 0-100 percentage. Zero total yields 0, never NaN.
    pub fn completion_rate(&self) -> f64 {
        compute_rate(self.completed, self.total)
    }
}

/// Turnaround-time analytics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeAnalytics {
    /// Average time from scheduling to completion, in hours.
    pub avg_completion_hours: f64,
    /// Average on-site inspection duration, in minutes.
    pub avg_duration_minutes: f64,
    /// Inspections completed within their scheduled window.
    pub on_time: u64,
    /// Inspections completed late.
    pub late: u64,
}

impl TimeAnalytics {
    pub fn on_time_rate(&self) -> f64 {
        compute_rate(self.on_time, self.on_time + self.late)
    }
}

/// AI checklist-suggestion accuracy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiAccuracy {
    pub suggestions_total: u64,
    pub suggestions_accepted: u64,
}

impl AiAccuracy {
    pub fn accuracy_rate(&self) -> f64 {
        compute_rate(self.suggestions_accepted, self.suggestions_total)
    }
}

/// User activity metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMetrics {
    pub total: u64,
    pub active_last_30d: u64,
    pub inspectors: u64,
    pub admins: u64,
}

/// Revenue metrics, denominated in cents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueMetrics {
    pub total_cents: i64,
    pub this_month_cents: i64,
    pub outstanding_cents: i64,
}

/// The consolidated dashboard aggregate: one fetch populates all of these.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedMetrics {
    pub inspections: InspectionCounts,
    pub time: TimeAnalytics,
    pub ai: AiAccuracy,
    pub users: UserMetrics,
    pub revenue: RevenueMetrics,
}

// ============================================================================
// TREND SERIES
// ============================================================================

/// One day of trend figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    /// Day in `YYYY-MM-DD` form, as returned by the backend.
    pub day: String,
    pub inspections: u64,
    pub revenue_cents: i64,
    /// Average satisfaction score for the day, 0-5 scale.
    pub satisfaction: f64,
}

/// Per-day trend series for one requested time range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSeries {
    pub range: TimeRange,
    pub points: Vec<TrendPoint>,
}

// ============================================================================
// REGIONAL BREAKDOWN
// ============================================================================

/// Aggregates for one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionalMetric {
    pub region: String,
    pub inspection_count: u64,
    pub revenue_cents: i64,
    /// Growth versus the prior period, as a percentage (may be negative).
    pub growth_pct: f64,
}

//! Sightline Core - Dashboard Data Types
//!
//! Pure data structures with no I/O. All other crates depend on this.
//! This crate contains metric payload types, change-event types, error
//! types, and configuration - no orchestration logic.

pub mod config;
pub mod error;
pub mod events;
pub mod health;
pub mod keys;
pub mod metrics;
pub mod rates;

pub use config::DashboardConfig;
pub use error::{
    CacheError, ConfigError, GatewayError, SightlineError, SightlineResult, SubscriptionError,
    ValidationError,
};
pub use events::{ChangeEvent, ChangeKind, Priority, WatchedTable};
pub use health::{HealthSnapshot, HealthStatus};
pub use keys::MetricKey;
pub use metrics::{
    AiAccuracy, ConsolidatedMetrics, InspectionCounts, RegionalMetric, RevenueMetrics,
    TimeAnalytics, TimeRange, TrendPoint, TrendSeries, UserMetrics,
};
pub use rates::{compute_rate, validate_consolidated};

use chrono::{DateTime, Utc};

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

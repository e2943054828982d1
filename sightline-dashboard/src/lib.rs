//! Sightline Dashboard - Metric Loading and Real-Time Invalidation
//!
//! The orchestration layer between the remote gateway and a rendered
//! dashboard: [`MetricLoader`] maintains [`DashboardState`] through
//! guarded loads, [`Invalidator`] turns change notifications into cache
//! invalidations and debounced reloads, and [`HealthMonitor`] keeps a
//! current backend health snapshot. [`Dashboard`] composes the three.

pub mod dashboard;
pub mod invalidator;
pub mod loader;
pub mod monitor;
pub mod state;

pub use dashboard::Dashboard;
pub use invalidator::{Invalidator, Lifecycle};
pub use loader::{LoadOptions, MetricLoader};
pub use monitor::HealthMonitor;
pub use state::{DashboardState, LoadPerformance};

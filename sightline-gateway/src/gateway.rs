//! Remote data gateway trait
//!
//! One method per backend RPC. Responses come back as raw JSON; callers
//! run them through [`crate::decode`] before anything else touches them.

use async_trait::async_trait;
use sightline_core::{GatewayError, TimeRange};

/// Raw response payload from the backend, decoded at the boundary.
pub type RawPayload = serde_json::Value;

/// Result type for gateway calls.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Connectivity probe result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthProbe {
    pub connected: bool,
    pub query_duration_ms: i64,
}

/// Remote-procedure interface to the hosted backend.
///
/// Implementations perform network I/O; every method is a suspension
/// point. Errors are [`GatewayError`] and carry no panics.
#[async_trait]
pub trait DataGateway: Send + Sync {
    /// Consolidated dashboard metrics: counts by status, time analytics,
    /// AI accuracy, user metrics, revenue metrics.
    async fn fetch_consolidated(&self) -> GatewayResult<RawPayload>;

    /// Per-day trend series for the requested time range.
    async fn fetch_trends(&self, range: TimeRange) -> GatewayResult<RawPayload>;

    /// Regional breakdown: region, inspection count, revenue, growth.
    async fn fetch_regional(&self) -> GatewayResult<RawPayload>;

    /// Connection and query-latency probe.
    async fn health_check(&self) -> GatewayResult<HealthProbe>;
}

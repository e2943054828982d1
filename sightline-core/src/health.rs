//! Backend health snapshot types
//!
//! A snapshot is a point-in-time read of backend connectivity and query
//! latency. Snapshots are never mutated; each health check replaces the
//! previous one wholesale.

use crate::Timestamp;
use serde::{Deserialize, Serialize};

/// Health status for the backend connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Backend is reachable and responding within thresholds
    Healthy,
    /// Backend is reachable but slow, or data-health issues were observed
    Degraded,
    /// Backend is unreachable or failing
    Unhealthy,
    /// Not yet checked
    Unknown,
}

/// Point-in-time health reading, replaced wholesale on each check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub status: HealthStatus,
    /// Probe query duration, when the probe succeeded.
    pub query_duration_ms: Option<i64>,
    pub checked_at: Timestamp,
    /// Data-health issues observed since the last check (validation
    /// findings, paused notification channels).
    pub issues: Vec<String>,
}

impl HealthSnapshot {
    pub fn healthy(query_duration_ms: i64) -> Self {
        Self {
            status: HealthStatus::Healthy,
            query_duration_ms: Some(query_duration_ms),
            checked_at: chrono::Utc::now(),
            issues: Vec::new(),
        }
    }

    pub fn degraded(query_duration_ms: i64, issue: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Degraded,
            query_duration_ms: Some(query_duration_ms),
            checked_at: chrono::Utc::now(),
            issues: vec![issue.into()],
        }
    }

    pub fn unhealthy(issue: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            query_duration_ms: None,
            checked_at: chrono::Utc::now(),
            issues: vec![issue.into()],
        }
    }

    /// Fold extra issues into the snapshot, downgrading Healthy to Degraded
    /// when any are present.
    pub fn with_issues(mut self, issues: Vec<String>) -> Self {
        if !issues.is_empty() && self.status == HealthStatus::Healthy {
            self.status = HealthStatus::Degraded;
        }
        self.issues.extend(issues);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_healthy_snapshot() {
        let snap = HealthSnapshot::healthy(12);
        assert_eq!(snap.status, HealthStatus::Healthy);
        assert_eq!(snap.query_duration_ms, Some(12));
        assert!(snap.issues.is_empty());
    }

    #[test]
    fn test_unhealthy_snapshot_has_issue() {
        let snap = HealthSnapshot::unhealthy("connection refused");
        assert_eq!(snap.status, HealthStatus::Unhealthy);
        assert_eq!(snap.query_duration_ms, None);
        assert_eq!(snap.issues.len(), 1);
    }

    #[test]
    fn test_with_issues_downgrades_healthy() {
        let snap = HealthSnapshot::healthy(5).with_issues(vec!["counts disagree".to_string()]);
        assert_eq!(snap.status, HealthStatus::Degraded);
        assert_eq!(snap.issues.len(), 1);
    }

    #[test]
    fn test_with_issues_keeps_unhealthy() {
        let snap = HealthSnapshot::unhealthy("down").with_issues(vec!["extra".to_string()]);
        assert_eq!(snap.status, HealthStatus::Unhealthy);
        assert_eq!(snap.issues.len(), 2);
    }

    #[test]
    fn test_with_empty_issues_is_noop() {
        let snap = HealthSnapshot::healthy(5).with_issues(Vec::new());
        assert_eq!(snap.status, HealthStatus::Healthy);
    }
}

//! Periodic backend health checks
//!
//! An interval task probes the gateway, classifies the result, folds in
//! any data-health issues the loader recorded since the last check, and
//! replaces the state's health snapshot wholesale. The task exits on its
//! own once the loader shuts down.

use std::sync::Arc;

use sightline_core::HealthSnapshot;
use sightline_gateway::DataGateway;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::warn;

use crate::loader::MetricLoader;

/// Handle to the background health-check task.
pub struct HealthMonitor {
    task: Mutex<Option<JoinHandle<()>>>,
}

impl HealthMonitor {
    /// Spawn the interval task. The first check runs immediately so a
    /// freshly mounted dashboard gets a snapshot without waiting a full
    /// interval.
    pub fn start(loader: Arc<MetricLoader>, gateway: Arc<dyn DataGateway>) -> Self {
        let interval = loader.config().health_interval;
        let degraded_latency_ms = loader.config().degraded_latency_ms;
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !loader.alive() {
                    break;
                }
                let snapshot = probe(gateway.as_ref(), degraded_latency_ms).await;
                let snapshot = snapshot.with_issues(loader.take_issues().await);
                loader.set_health(snapshot).await;
            }
        });
        Self {
            task: Mutex::new(Some(task)),
        }
    }

    /// Stop the task. Idempotent.
    pub async fn stop(&self) {
        if let Some(task) = self.task.lock().await.take() {
            task.abort();
            let _ = task.await;
        }
    }
}

/// One probe, classified. Disconnection and probe errors are Unhealthy;
/// a slow probe is Degraded.
async fn probe(gateway: &dyn DataGateway, degraded_latency_ms: i64) -> HealthSnapshot {
    match gateway.health_check().await {
        Ok(result) if !result.connected => HealthSnapshot::unhealthy("backend reports disconnected"),
        Ok(result) if result.query_duration_ms > degraded_latency_ms => HealthSnapshot::degraded(
            result.query_duration_ms,
            format!(
                "probe latency {}ms exceeds {}ms",
                result.query_duration_ms, degraded_latency_ms
            ),
        ),
        Ok(result) => HealthSnapshot::healthy(result.query_duration_ms),
        Err(error) => {
            warn!(%error, "health probe failed");
            HealthSnapshot::unhealthy(error.to_string())
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

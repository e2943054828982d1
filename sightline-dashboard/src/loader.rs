//! Metric loading orchestration
//!
//! [`MetricLoader`] owns the canonical [`DashboardState`] and is the only
//! writer. Every load runs through the same guarded path: mark loading,
//! await the fetch, then apply the completion only if it is still wanted.
//! Two guards decide that:
//!
//! - a per-key monotonic ticket, so a stale completion never overwrites a
//!   newer one (ticket order, not arrival order), and
//! - a liveness flag, so completions arriving after [`MetricLoader::shutdown`]
//!   are discarded without touching state.
//!
//! Load failures convert to recorded per-key errors; previously loaded
//! values stay visible. Callers see `Ok(None)` for a failed or discarded
//! load, never a panic.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use sightline_cache::{CacheMetrics, KeyedCache};
use sightline_core::{
    validate_consolidated, ConsolidatedMetrics, DashboardConfig, HealthSnapshot, MetricKey,
    Priority, RegionalMetric, SightlineError, SightlineResult, TimeRange, TrendSeries,
};
use sightline_gateway::{
    decode_consolidated, decode_regional, decode_trends, DataGateway, RawPayload,
};
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::state::{DashboardState, LoadPerformance};

/// Per-call knobs for one load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Bypass the cache and fetch directly. The fresh result still lands
    /// in the cache afterwards.
    pub skip_cache: bool,
    /// Governs the effective TTL of the fetched entry.
    pub priority: Priority,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            skip_cache: false,
            priority: Priority::Normal,
        }
    }
}

impl LoadOptions {
    /// Options used by explicit refreshes: urgent and uncached.
    pub fn refresh() -> Self {
        Self {
            skip_cache: true,
            priority: Priority::High,
        }
    }
}

#[derive(Default)]
struct KeyTickets {
    issued: u64,
    applied: u64,
}

/// A fetched value, plus the raw payload when the cache was bypassed and
/// the entry still needs storing. Storing happens only after the ticket
/// guard accepts the completion, so a superseded fetch never poisons the
/// cache either.
#[derive(Clone)]
struct Fetched<T> {
    value: T,
    uncached: Option<RawPayload>,
}

/// Loads metrics through the cache and maintains [`DashboardState`].
pub struct MetricLoader {
    gateway: Arc<dyn DataGateway>,
    cache: Arc<KeyedCache<RawPayload>>,
    config: DashboardConfig,
    state: RwLock<DashboardState>,
    tickets: Mutex<HashMap<MetricKey, KeyTickets>>,
    alive: AtomicBool,
    samples: Mutex<VecDeque<f64>>,
    issues: Mutex<Vec<String>>,
}

impl MetricLoader {
    pub fn new(
        gateway: Arc<dyn DataGateway>,
        cache: Arc<KeyedCache<RawPayload>>,
        config: DashboardConfig,
    ) -> Self {
        Self {
            gateway,
            cache,
            config,
            state: RwLock::new(DashboardState::default()),
            tickets: Mutex::new(HashMap::new()),
            alive: AtomicBool::new(true),
            samples: Mutex::new(VecDeque::new()),
            issues: Mutex::new(Vec::new()),
        }
    }

    /// Load the consolidated dashboard aggregate.
    ///
    /// Decoded metrics are cross-checked; findings are recorded for the
    /// next health snapshot but never block display.
    pub async fn load_consolidated(
        &self,
        options: LoadOptions,
    ) -> SightlineResult<Option<ConsolidatedMetrics>> {
        let key = MetricKey::consolidated();
        let ttl = self.config.ttl_for(options.priority);
        let gateway = Arc::clone(&self.gateway);
        let cache = Arc::clone(&self.cache);
        let fetch_key = key.clone();
        let fut = async move {
            if options.skip_cache {
                let raw = gateway.fetch_consolidated().await?;
                let value = decode_consolidated(&raw)?;
                Ok::<_, SightlineError>(Fetched {
                    value,
                    uncached: Some(raw),
                })
            } else {
                let raw = cache
                    .get_or_fetch(&fetch_key, ttl, move || async move {
                        gateway.fetch_consolidated().await
                    })
                    .await?;
                let value = decode_consolidated(&raw)?;
                Ok(Fetched {
                    value,
                    uncached: None,
                })
            }
        };

        let loaded = self
            .load_metric_safely(key.clone(), fut, None, |state, fetched| {
                state.consolidated = Some(fetched.value);
            })
            .await?;
        let Some(fetched) = loaded else {
            return Ok(None);
        };
        if let Some(raw) = fetched.uncached {
            self.cache.set(&key, raw, ttl).await;
        }

        let issues = validate_consolidated(&fetched.value);
        if !issues.is_empty() {
            warn!(
                count = issues.len(),
                "consolidated metrics failed cross checks"
            );
            self.issues.lock().await.extend(issues);
        }
        Ok(Some(fetched.value))
    }

    /// Load the trend series for one time range.
    pub async fn load_trends(
        &self,
        range: TimeRange,
        options: LoadOptions,
    ) -> SightlineResult<Option<TrendSeries>> {
        let key = MetricKey::trend(range);
        let ttl = self.config.ttl_for(options.priority);
        let gateway = Arc::clone(&self.gateway);
        let cache = Arc::clone(&self.cache);
        let fetch_key = key.clone();
        let fut = async move {
            if options.skip_cache {
                let raw = gateway.fetch_trends(range).await?;
                let value = decode_trends(&raw, range)?;
                Ok::<_, SightlineError>(Fetched {
                    value,
                    uncached: Some(raw),
                })
            } else {
                let raw = cache
                    .get_or_fetch(&fetch_key, ttl, move || async move {
                        gateway.fetch_trends(range).await
                    })
                    .await?;
                let value = decode_trends(&raw, range)?;
                Ok(Fetched {
                    value,
                    uncached: None,
                })
            }
        };

        let loaded = self
            .load_metric_safely(key.clone(), fut, None, move |state, fetched| {
                state.trends.insert(range, fetched.value);
            })
            .await?;
        let Some(fetched) = loaded else {
            return Ok(None);
        };
        if let Some(raw) = fetched.uncached {
            self.cache.set(&key, raw, ttl).await;
        }
        Ok(Some(fetched.value))
    }

    /// Load the regional breakdown.
    pub async fn load_regional(
        &self,
        options: LoadOptions,
    ) -> SightlineResult<Option<Vec<RegionalMetric>>> {
        let key = MetricKey::regional();
        let ttl = self.config.ttl_for(options.priority);
        let gateway = Arc::clone(&self.gateway);
        let cache = Arc::clone(&self.cache);
        let fetch_key = key.clone();
        let fut = async move {
            if options.skip_cache {
                let raw = gateway.fetch_regional().await?;
                let value = decode_regional(&raw)?;
                Ok::<_, SightlineError>(Fetched {
                    value,
                    uncached: Some(raw),
                })
            } else {
                let raw = cache
                    .get_or_fetch(&fetch_key, ttl, move || async move {
                        gateway.fetch_regional().await
                    })
                    .await?;
                let value = decode_regional(&raw)?;
                Ok(Fetched {
                    value,
                    uncached: None,
                })
            }
        };

        let loaded = self
            .load_metric_safely(key.clone(), fut, None, |state, fetched| {
                state.regional = Some(fetched.value);
            })
            .await?;
        let Some(fetched) = loaded else {
            return Ok(None);
        };
        if let Some(raw) = fetched.uncached {
            self.cache.set(&key, raw, ttl).await;
        }
        Ok(Some(fetched.value))
    }

    /// Run one load through the per-key guards.
    ///
    /// On failure with a `fallback`, the fallback is substituted into state
    /// and the error is still recorded. Without one, the prior value is
    /// retained. Returns `Ok(None)` when the load failed without fallback
    /// or the completion was discarded (superseded or shut down).
    pub async fn load_metric_safely<T, Fut, Apply>(
        &self,
        key: MetricKey,
        loader_future: Fut,
        fallback: Option<T>,
        apply: Apply,
    ) -> SightlineResult<Option<T>>
    where
        T: Clone,
        Fut: Future<Output = SightlineResult<T>>,
        Apply: FnOnce(&mut DashboardState, T),
    {
        if !self.alive() {
            return Ok(None);
        }
        let ticket = self.issue_ticket(&key).await;
        {
            let mut state = self.state.write().await;
            state.loading.insert(key.clone(), true);
        }

        let started = Instant::now();
        let outcome = loader_future.await;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        if !self.alive() {
            // Shut down while the load was in flight.
            return Ok(None);
        }
        if !self.apply_ticket(&key, ticket).await {
            debug!(key = %key, ticket, "load superseded by a newer request");
            return Ok(None);
        }

        match outcome {
            Ok(value) => {
                self.record_sample(elapsed_ms).await;
                let mut state = self.state.write().await;
                state.loading.insert(key.clone(), false);
                state.errors.remove(&key);
                state.last_updated.insert(key.clone(), chrono::Utc::now());
                state.is_initial_load = false;
                apply(&mut state, value.clone());
                Ok(Some(value))
            }
            Err(error) => {
                warn!(key = %key, %error, "metric load failed");
                let mut state = self.state.write().await;
                state.loading.insert(key.clone(), false);
                state.errors.insert(key.clone(), error.to_string());
                match fallback {
                    Some(value) => {
                        apply(&mut state, value.clone());
                        Ok(Some(value))
                    }
                    None => Ok(None),
                }
            }
        }
    }

    /// Invalidate cache keys then reload them urgently. An empty slice
    /// means everything: the cache is cleared and every loaded surface
    /// refetches.
    pub async fn refresh(&self, keys: &[MetricKey]) {
        let options = LoadOptions::refresh();
        if keys.is_empty() {
            self.cache.clear().await;
            let mut all = vec![MetricKey::consolidated(), MetricKey::regional()];
            let loaded_ranges: Vec<TimeRange> =
                self.state.read().await.trends.keys().copied().collect();
            all.extend(loaded_ranges.into_iter().map(MetricKey::trend));
            self.reload(&all, options).await;
        } else {
            for key in keys {
                self.cache.invalidate(key).await;
            }
            self.reload(keys, options).await;
        }
    }

    /// Re-run loads for every key whose last load failed. Returns how many
    /// keys were retried.
    pub async fn retry_failed(&self) -> usize {
        let failed = self.state.read().await.failed_keys();
        if !failed.is_empty() {
            self.refresh(&failed).await;
        }
        failed.len()
    }

    /// Run the loaders behind a set of keys, deduplicating by category.
    /// Failures are recorded in state, not returned.
    pub async fn reload(&self, keys: &[MetricKey], options: LoadOptions) {
        let mut consolidated = false;
        let mut regional = false;
        let mut ranges: Vec<TimeRange> = Vec::new();
        for key in keys {
            match key.category_prefix() {
                "dashboard_metrics" | "user_metrics" => consolidated = true,
                "regional_metrics" => regional = true,
                "trend_metrics" => {
                    if let Some(range) = key.as_str().split(':').nth(1).and_then(TimeRange::parse) {
                        if !ranges.contains(&range) {
                            ranges.push(range);
                        }
                    }
                }
                other => debug!(category = other, "no loader for key category"),
            }
        }
        if consolidated {
            let _ = self.load_consolidated(options).await;
        }
        for range in ranges {
            let _ = self.load_trends(range, options).await;
        }
        if regional {
            let _ = self.load_regional(options).await;
        }
    }

    /// Drop cache entries for the given keys without reloading.
    pub async fn invalidate_keys(&self, keys: &[MetricKey]) {
        for key in keys {
            self.cache.invalidate(key).await;
        }
    }

    /// Drop every cache entry without reloading anything. The next load
    /// per key refetches. Returns the number of entries removed.
    pub async fn clear_cache(&self) -> usize {
        self.cache.clear().await
    }

    /// Load-performance reading over the recent sample window.
    pub async fn performance(&self) -> LoadPerformance {
        let samples: Vec<f64> = self.samples.lock().await.iter().copied().collect();
        let avg_load_ms = if samples.is_empty() {
            0.0
        } else {
            samples.iter().sum::<f64>() / samples.len() as f64
        };
        LoadPerformance {
            avg_load_ms,
            cache_hit_rate: self.cache.metrics().await.hit_rate(),
            recent_load_ms: samples,
        }
    }

    /// Cheap copy of the current view state.
    pub async fn snapshot(&self) -> DashboardState {
        self.state.read().await.clone()
    }

    pub async fn cache_metrics(&self) -> CacheMetrics {
        self.cache.metrics().await
    }

    /// Stop accepting completions. In-flight loads finish their await but
    /// write nothing.
    pub fn shutdown(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    pub fn alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    /// Replace the health snapshot. Ignored once shut down.
    pub(crate) async fn set_health(&self, snapshot: HealthSnapshot) {
        if !self.alive() {
            return;
        }
        self.state.write().await.health = Some(snapshot);
    }

    /// Drain issues recorded since the last health check.
    pub(crate) async fn take_issues(&self) -> Vec<String> {
        std::mem::take(&mut *self.issues.lock().await)
    }

    /// Record a data-health issue for the next health snapshot.
    pub(crate) async fn record_issue(&self, issue: String) {
        self.issues.lock().await.push(issue);
    }

    async fn issue_ticket(&self, key: &MetricKey) -> u64 {
        let mut tickets = self.tickets.lock().await;
        let entry = tickets.entry(key.clone()).or_default();
        entry.issued += 1;
        entry.issued
    }

    async fn apply_ticket(&self, key: &MetricKey, ticket: u64) -> bool {
        let mut tickets = self.tickets.lock().await;
        let entry = tickets.entry(key.clone()).or_default();
        if ticket > entry.applied {
            entry.applied = ticket;
            true
        } else {
            false
        }
    }

    async fn record_sample(&self, elapsed_ms: f64) {
        let mut samples = self.samples.lock().await;
        samples.push_back(elapsed_ms);
        while samples.len() > self.config.max_load_samples {
            samples.pop_front();
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sightline_gateway::MockGateway;
    use std::time::Duration;

    fn consolidated_payload(total: u64, completed: u64) -> RawPayload {
        json!({
            "inspection_counts": {
                "total": total,
                "completed": completed,
                "in_progress": 0,
                "pending": 0,
                "cancelled": 0
            },
            "time_analytics": {
                "avg_completion_hours": 24.0,
                "avg_duration_minutes": 90.0,
                "on_time": completed,
                "late": 0
            },
            "ai_metrics": { "suggestions_total": 10, "suggestions_accepted": 8 },
            "user_metrics": { "total": 5, "active_last_30d": 4, "inspectors": 3, "admins": 1 },
            "revenue_metrics": {
                "total_cents": 100_000,
                "this_month_cents": 20_000,
                "outstanding_cents": 5_000
            }
        })
    }

    fn make_loader(gateway: Arc<MockGateway>) -> MetricLoader {
        let config = DashboardConfig::default();
        let cache = Arc::new(KeyedCache::new(config.cache_capacity));
        MetricLoader::new(gateway, cache, config)
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_populates_state() {
        let gateway = Arc::new(MockGateway::new());
        gateway.set_consolidated(consolidated_payload(100, 80));
        let loader = make_loader(Arc::clone(&gateway));

        let loaded = loader
            .load_consolidated(LoadOptions::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.inspections.total, 100);

        let state = loader.snapshot().await;
        assert_eq!(state.consolidated.as_ref().unwrap().inspections.completed, 80);
        assert!(!state.is_initial_load);
        assert!(!state.is_loading(&MetricKey::consolidated()));
        assert!(state.last_updated.contains_key(&MetricKey::consolidated()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cached_load_skips_gateway() {
        let gateway = Arc::new(MockGateway::new());
        gateway.set_consolidated(consolidated_payload(10, 5));
        let loader = make_loader(Arc::clone(&gateway));

        loader.load_consolidated(LoadOptions::default()).await.unwrap();
        loader.load_consolidated(LoadOptions::default()).await.unwrap();
        assert_eq!(gateway.consolidated_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_keeps_prior_value_and_records_error() {
        let gateway = Arc::new(MockGateway::new());
        gateway.set_consolidated(consolidated_payload(100, 80));
        let loader = make_loader(Arc::clone(&gateway));
        loader.load_consolidated(LoadOptions::default()).await.unwrap();

        gateway.fail_consolidated(sightline_core::GatewayError::Transport {
            reason: "connection reset".to_string(),
        });
        let result = loader.load_consolidated(LoadOptions::refresh()).await.unwrap();
        assert!(result.is_none());

        let state = loader.snapshot().await;
        // Stale-but-present beats empty.
        assert_eq!(state.consolidated.as_ref().unwrap().inspections.total, 100);
        let error = state.error_for(&MetricKey::consolidated()).unwrap();
        assert!(error.contains("connection reset"));
        assert!(!state.is_loading(&MetricKey::consolidated()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequence_guard_newer_completion_wins() {
        let gateway = Arc::new(MockGateway::new());
        // First request resolves last.
        gateway.enqueue_consolidated(
            Duration::from_millis(100),
            Ok(consolidated_payload(1, 1)),
        );
        gateway.enqueue_consolidated(Duration::from_millis(10), Ok(consolidated_payload(2, 2)));
        let loader = Arc::new(make_loader(Arc::clone(&gateway)));
        let options = LoadOptions::refresh();

        let slow = {
            let loader = Arc::clone(&loader);
            tokio::spawn(async move { loader.load_consolidated(options).await })
        };
        tokio::task::yield_now().await;
        let fast = {
            let loader = Arc::clone(&loader);
            tokio::spawn(async move { loader.load_consolidated(options).await })
        };

        let fast_result = fast.await.unwrap().unwrap().unwrap();
        assert_eq!(fast_result.inspections.total, 2);
        // The slower, older completion is discarded.
        assert!(slow.await.unwrap().unwrap().is_none());

        let state = loader.snapshot().await;
        assert_eq!(state.consolidated.unwrap().inspections.total, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_cached_load_cannot_poison_cache() {
        let gateway = Arc::new(MockGateway::new());
        // The first (cached-path) request resolves after the refresh.
        gateway.enqueue_consolidated(
            Duration::from_millis(100),
            Ok(consolidated_payload(1, 1)),
        );
        gateway.enqueue_consolidated(Duration::from_millis(10), Ok(consolidated_payload(2, 2)));
        let loader = Arc::new(make_loader(Arc::clone(&gateway)));

        let slow = {
            let loader = Arc::clone(&loader);
            tokio::spawn(async move { loader.load_consolidated(LoadOptions::default()).await })
        };
        tokio::task::yield_now().await;
        let fast = {
            let loader = Arc::clone(&loader);
            tokio::spawn(async move { loader.load_consolidated(LoadOptions::refresh()).await })
        };

        let fast_result = fast.await.unwrap().unwrap().unwrap();
        assert_eq!(fast_result.inspections.total, 2);
        assert!(slow.await.unwrap().unwrap().is_none());

        // A later cached load must serve the refresh's payload, not the
        // discarded older fetch. No third gateway call either.
        let third = loader
            .load_consolidated(LoadOptions::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(third.inspections.total, 2);
        assert_eq!(gateway.consolidated_calls(), 2);

        let state = loader.snapshot().await;
        assert_eq!(state.consolidated.as_ref().unwrap().inspections.total, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_cache_forces_refetch_without_reload() {
        let gateway = Arc::new(MockGateway::new());
        gateway.set_consolidated(consolidated_payload(10, 5));
        let loader = make_loader(Arc::clone(&gateway));

        loader.load_consolidated(LoadOptions::default()).await.unwrap();
        assert_eq!(gateway.consolidated_calls(), 1);

        // Clearing drops the entry but triggers no load of its own.
        assert_eq!(loader.clear_cache().await, 1);
        assert_eq!(gateway.consolidated_calls(), 1);
        assert_eq!(loader.cache_metrics().await.size, 0);

        loader.load_consolidated(LoadOptions::default()).await.unwrap();
        assert_eq!(gateway.consolidated_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_discards_inflight_completion() {
        let gateway = Arc::new(MockGateway::new());
        gateway.enqueue_consolidated(Duration::from_millis(50), Ok(consolidated_payload(1, 1)));
        let loader = Arc::new(make_loader(Arc::clone(&gateway)));

        let inflight = {
            let loader = Arc::clone(&loader);
            tokio::spawn(async move { loader.load_consolidated(LoadOptions::refresh()).await })
        };
        tokio::task::yield_now().await;
        loader.shutdown();

        assert!(inflight.await.unwrap().unwrap().is_none());
        let state = loader.snapshot().await;
        assert!(state.consolidated.is_none());
        assert!(state.last_updated.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_after_shutdown_is_silent() {
        let gateway = Arc::new(MockGateway::new());
        let loader = make_loader(Arc::clone(&gateway));
        loader.shutdown();

        let result = loader.load_consolidated(LoadOptions::default()).await.unwrap();
        assert!(result.is_none());
        assert_eq!(gateway.consolidated_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_failed_reloads_errored_keys() {
        let gateway = Arc::new(MockGateway::new());
        gateway.fail_consolidated(sightline_core::GatewayError::Transport {
            reason: "down".to_string(),
        });
        let loader = make_loader(Arc::clone(&gateway));
        loader.load_consolidated(LoadOptions::default()).await.unwrap();
        assert_eq!(loader.snapshot().await.failed_keys().len(), 1);

        gateway.set_consolidated(consolidated_payload(3, 3));
        let retried = loader.retry_failed().await;
        assert_eq!(retried, 1);

        let state = loader.snapshot().await;
        assert!(state.errors.is_empty());
        assert_eq!(state.consolidated.unwrap().inspections.total, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_all_reloads_loaded_surfaces() {
        let gateway = Arc::new(MockGateway::new());
        gateway.set_consolidated(consolidated_payload(10, 5));
        let loader = make_loader(Arc::clone(&gateway));

        loader.load_consolidated(LoadOptions::default()).await.unwrap();
        loader
            .load_trends(TimeRange::Week, LoadOptions::default())
            .await
            .unwrap();
        loader.load_regional(LoadOptions::default()).await.unwrap();

        loader.refresh(&[]).await;
        assert_eq!(gateway.consolidated_calls(), 2);
        assert_eq!(gateway.trend_calls(), 2);
        assert_eq!(gateway.regional_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_single_key_leaves_others_cached() {
        let gateway = Arc::new(MockGateway::new());
        gateway.set_consolidated(consolidated_payload(10, 5));
        let loader = make_loader(Arc::clone(&gateway));

        loader.load_consolidated(LoadOptions::default()).await.unwrap();
        loader.load_regional(LoadOptions::default()).await.unwrap();

        loader.refresh(&[MetricKey::consolidated()]).await;
        assert_eq!(gateway.consolidated_calls(), 2);
        assert_eq!(gateway.regional_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_performance_sample_buffer_is_bounded() {
        let gateway = Arc::new(MockGateway::new());
        gateway.set_consolidated(consolidated_payload(10, 5));
        let config = DashboardConfig {
            max_load_samples: 3,
            ..Default::default()
        };
        let cache = Arc::new(KeyedCache::new(config.cache_capacity));
        let loader = MetricLoader::new(gateway, cache, config);

        for _ in 0..5 {
            loader.load_consolidated(LoadOptions::refresh()).await.unwrap();
        }
        let perf = loader.performance().await;
        assert_eq!(perf.recent_load_ms.len(), 3);
        assert!(perf.avg_load_ms >= 0.0);
        assert!((0.0..=1.0).contains(&perf.cache_hit_rate));
    }

    #[tokio::test(start_paused = true)]
    async fn test_validation_issues_recorded_but_display_proceeds() {
        let gateway = Arc::new(MockGateway::new());
        // More completed than exist: inconsistent, still displayable.
        gateway.set_consolidated(consolidated_payload(10, 25));
        let loader = make_loader(Arc::clone(&gateway));

        let loaded = loader
            .load_consolidated(LoadOptions::default())
            .await
            .unwrap();
        assert!(loaded.is_some());
        assert!(loader.snapshot().await.consolidated.is_some());

        let issues = loader.take_issues().await;
        assert!(!issues.is_empty());
        // Drained once, empty afterwards.
        assert!(loader.take_issues().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_loading_flag_spans_the_load() {
        let gateway = Arc::new(MockGateway::new());
        gateway.enqueue_consolidated(Duration::from_millis(30), Ok(consolidated_payload(1, 1)));
        let loader = Arc::new(make_loader(Arc::clone(&gateway)));

        let inflight = {
            let loader = Arc::clone(&loader);
            tokio::spawn(async move { loader.load_consolidated(LoadOptions::refresh()).await })
        };
        tokio::task::yield_now().await;
        assert!(loader.snapshot().await.is_loading(&MetricKey::consolidated()));

        inflight.await.unwrap().unwrap();
        let state = loader.snapshot().await;
        assert!(!state.is_loading(&MetricKey::consolidated()));
        assert!(!state.is_initial_load);
    }

    #[tokio::test(start_paused = true)]
    async fn test_trends_and_regional_populate_their_slots() {
        let gateway = Arc::new(MockGateway::new());
        gateway.set_trends(json!({
            "range": "30d",
            "points": [
                { "day": "2026-08-01", "inspections": 4, "revenue_cents": 9000, "satisfaction": 4.5 }
            ]
        }));
        gateway.set_regional(json!([
            { "region": "North", "inspection_count": 12, "revenue_cents": 44000, "growth_pct": 3.5 }
        ]));
        let loader = make_loader(Arc::clone(&gateway));

        let series = loader
            .load_trends(TimeRange::Month, LoadOptions::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(series.points.len(), 1);

        let regions = loader
            .load_regional(LoadOptions::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(regions[0].region, "North");

        let state = loader.snapshot().await;
        assert!(state.trends.contains_key(&TimeRange::Month));
        assert_eq!(state.regional.unwrap().len(), 1);
    }
}

//! Composition root
//!
//! Wires cache, loader, invalidator, and health monitor into one mounted
//! dashboard. `mount` is the only place these pieces learn about each
//! other; `unmount` tears everything down in reverse.

use std::sync::Arc;

use sightline_cache::KeyedCache;
use sightline_core::{DashboardConfig, MetricKey, SightlineResult};
use sightline_gateway::{ChangeFeed, DataGateway};
use tracing::info;

use crate::invalidator::Invalidator;
use crate::loader::{LoadOptions, MetricLoader};
use crate::monitor::HealthMonitor;
use crate::state::DashboardState;

/// One mounted dashboard instance.
pub struct Dashboard {
    loader: Arc<MetricLoader>,
    invalidator: Invalidator,
    monitor: HealthMonitor,
}

impl Dashboard {
    /// Validate config, start subscriptions and the health monitor, then
    /// run the initial consolidated load.
    pub async fn mount(
        gateway: Arc<dyn DataGateway>,
        feed: Arc<dyn ChangeFeed>,
        config: DashboardConfig,
    ) -> SightlineResult<Self> {
        config.validate()?;
        let cache = Arc::new(KeyedCache::new(config.cache_capacity));
        let loader = Arc::new(MetricLoader::new(Arc::clone(&gateway), cache, config));

        let invalidator = Invalidator::new(Arc::clone(&loader), feed);
        invalidator.start().await?;
        let monitor = HealthMonitor::start(Arc::clone(&loader), gateway);

        loader.load_consolidated(LoadOptions::default()).await?;
        info!("dashboard mounted");
        Ok(Self {
            loader,
            invalidator,
            monitor,
        })
    }

    pub fn loader(&self) -> &Arc<MetricLoader> {
        &self.loader
    }

    /// Snapshot of the current view state.
    pub async fn state(&self) -> DashboardState {
        self.loader.snapshot().await
    }

    /// Manual refresh; an empty slice refreshes everything loaded.
    pub async fn refresh(&self, keys: &[MetricKey]) {
        self.loader.refresh(keys).await;
    }

    /// Drop every cache entry without reloading. Returns the number
    /// removed; subsequent loads refetch.
    pub async fn clear_cache(&self) -> usize {
        self.loader.clear_cache().await
    }

    /// Tear down: stop accepting completions, close every subscription,
    /// stop the health monitor. Idempotent.
    pub async fn unmount(&self) {
        self.loader.shutdown();
        self.invalidator.stop().await;
        self.monitor.stop().await;
        info!("dashboard unmounted");
    }
}

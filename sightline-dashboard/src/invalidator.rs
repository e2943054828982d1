//! Change-driven cache invalidation
//!
//! One subscription per watched table, one consumer task per subscription.
//! Every change event invalidates the table's dependent cache keys
//! immediately. Reloads are spaced per priority: the first change in a
//! window refetches at once, later ones coalesce into one deferred refetch
//! when the window closes, so the final change of a burst always lands.
//! A closed channel pauses notifications for that table but leaves the
//! loader running.

use std::collections::HashMap;
use std::sync::Arc;

use sightline_core::{
    DashboardConfig, MetricKey, Priority, SightlineResult, SubscriptionError, WatchedTable,
};
use sightline_gateway::{ChangeFeed, ChangeSubscription};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::loader::{LoadOptions, MetricLoader};

/// Subscription lifecycle. `Unsubscribed` is terminal; a stopped
/// invalidator is never restarted, a fresh one is mounted instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Uninitialized,
    Subscribed,
    Unsubscribed,
}

/// Spaces change-driven reloads, tracked per priority. The first change
/// inside a window reloads immediately; later ones fold their keys into a
/// deferred reload that runs when the window closes. Invalidation itself
/// is never debounced, only the refetch.
struct ReloadScheduler {
    loader: Arc<MetricLoader>,
    windows: DashboardConfig,
    slots: Mutex<HashMap<Priority, ReloadSlot>>,
}

#[derive(Default)]
struct ReloadSlot {
    last_run: Option<Instant>,
    pending: Vec<MetricKey>,
    armed: bool,
    timer: Option<JoinHandle<()>>,
}

enum Spacing {
    RunNow,
    Defer(Instant),
    Queued,
}

impl ReloadScheduler {
    fn new(loader: Arc<MetricLoader>) -> Self {
        Self {
            windows: loader.config().clone(),
            loader,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Reload for `keys` now, or fold them into the deferred reload for
    /// this priority's window.
    async fn request(self: Arc<Self>, priority: Priority, keys: &[MetricKey]) {
        let window = self.windows.debounce_for(priority);
        let spacing = {
            let mut slots = self.slots.lock().await;
            let slot = slots.entry(priority).or_default();
            match slot.last_run {
                Some(last) if Instant::now().duration_since(last) < window => {
                    for key in keys {
                        if !slot.pending.contains(key) {
                            slot.pending.push(key.clone());
                        }
                    }
                    if slot.armed {
                        Spacing::Queued
                    } else {
                        slot.armed = true;
                        Spacing::Defer(last + window)
                    }
                }
                _ => {
                    slot.last_run = Some(Instant::now());
                    Spacing::RunNow
                }
            }
        };
        match spacing {
            Spacing::RunNow => {
                self.loader
                    .reload(
                        keys,
                        LoadOptions {
                            skip_cache: false,
                            priority,
                        },
                    )
                    .await;
            }
            Spacing::Defer(deadline) => {
                let scheduler = Arc::clone(&self);
                let timer = tokio::spawn(async move {
                    tokio::time::sleep_until(deadline).await;
                    scheduler.run_deferred(priority).await;
                });
                self.slots.lock().await.entry(priority).or_default().timer = Some(timer);
            }
            Spacing::Queued => {}
        }
    }

    async fn run_deferred(&self, priority: Priority) {
        let keys = {
            let mut slots = self.slots.lock().await;
            let slot = slots.entry(priority).or_default();
            slot.armed = false;
            slot.timer = None;
            slot.last_run = Some(Instant::now());
            std::mem::take(&mut slot.pending)
        };
        if !keys.is_empty() {
            debug!(?priority, keys = keys.len(), "running deferred reload");
            self.loader
                .reload(
                    &keys,
                    LoadOptions {
                        skip_cache: false,
                        priority,
                    },
                )
                .await;
        }
    }

    /// Abort armed timers and drop their queued keys.
    async fn cancel_pending(&self) {
        let mut slots = self.slots.lock().await;
        for slot in slots.values_mut() {
            if let Some(timer) = slot.timer.take() {
                timer.abort();
            }
            slot.armed = false;
            slot.pending.clear();
        }
    }
}

/// Subscribes to change notifications and keeps the cache honest.
pub struct Invalidator {
    loader: Arc<MetricLoader>,
    feed: Arc<dyn ChangeFeed>,
    lifecycle: Mutex<Lifecycle>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    scheduler: Arc<ReloadScheduler>,
}

impl Invalidator {
    pub fn new(loader: Arc<MetricLoader>, feed: Arc<dyn ChangeFeed>) -> Self {
        let scheduler = Arc::new(ReloadScheduler::new(Arc::clone(&loader)));
        Self {
            loader,
            feed,
            lifecycle: Mutex::new(Lifecycle::Uninitialized),
            tasks: Mutex::new(Vec::new()),
            scheduler,
        }
    }

    /// Subscribe to every watched table and start consuming events.
    ///
    /// Callable exactly once. Fails without side effects when any
    /// subscription cannot be opened.
    pub async fn start(&self) -> SightlineResult<()> {
        let mut lifecycle = self.lifecycle.lock().await;
        match *lifecycle {
            Lifecycle::Uninitialized => {}
            Lifecycle::Subscribed => return Err(SubscriptionError::AlreadyStarted.into()),
            Lifecycle::Unsubscribed => return Err(SubscriptionError::Terminated.into()),
        }

        let mut subscriptions = Vec::with_capacity(WatchedTable::ALL.len());
        for table in WatchedTable::ALL {
            match self.feed.subscribe(table).await {
                Ok(subscription) => subscriptions.push(subscription),
                Err(error) => {
                    // Earlier subscriptions drop here, closing their channels.
                    return Err(SubscriptionError::SubscribeFailed {
                        table,
                        reason: error.to_string(),
                    }
                    .into());
                }
            }
        }

        let mut tasks = self.tasks.lock().await;
        for subscription in subscriptions {
            let loader = Arc::clone(&self.loader);
            let scheduler = Arc::clone(&self.scheduler);
            tasks.push(tokio::spawn(consume_changes(subscription, loader, scheduler)));
        }
        *lifecycle = Lifecycle::Subscribed;
        info!(tables = WatchedTable::ALL.len(), "change subscriptions started");
        Ok(())
    }

    /// Tear down every subscription. Idempotent; events in flight are
    /// dropped.
    pub async fn stop(&self) {
        {
            let mut lifecycle = self.lifecycle.lock().await;
            if *lifecycle == Lifecycle::Unsubscribed {
                return;
            }
            *lifecycle = Lifecycle::Unsubscribed;
        }
        let drained: Vec<JoinHandle<()>> = self.tasks.lock().await.drain(..).collect();
        for task in drained {
            task.abort();
            let _ = task.await;
        }
        self.scheduler.cancel_pending().await;
        info!("change subscriptions stopped");
    }

    pub async fn lifecycle(&self) -> Lifecycle {
        *self.lifecycle.lock().await
    }
}

async fn consume_changes(
    mut subscription: ChangeSubscription,
    loader: Arc<MetricLoader>,
    scheduler: Arc<ReloadScheduler>,
) {
    let table = subscription.table();
    let priority = table.priority();
    while let Some(event) = subscription.next().await {
        debug!(?table, kind = ?event.kind, row = %event.row_id, "change event");
        let keys = table.dependent_keys();
        loader.invalidate_keys(&keys).await;
        Arc::clone(&scheduler).request(priority, &keys).await;
    }
    warn!(?table, "change channel closed, notifications paused");
    loader
        .record_issue(format!("change notifications paused for {table:?}"))
        .await;
}

// ============================================================================
// TESTS
// ============================================================================

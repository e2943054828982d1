//! In-memory mocks for the gateway and change feed
//!
//! Used by dashboard tests. Responses are scriptable per endpoint: a queue
//! of one-shot responses (each with an optional artificial delay) is
//! consumed first, then the endpoint's default answer applies. Every call
//! is counted so tests can assert exact fetch counts.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use sightline_core::{ChangeEvent, GatewayError, TimeRange, WatchedTable};
use tokio::sync::mpsc;

use crate::feed::{ChangeFeed, ChangeSubscription};
use crate::gateway::{DataGateway, GatewayResult, HealthProbe, RawPayload};

/// One scripted response: an optional delay, then the result.
struct Scripted<T> {
    delay: Duration,
    result: GatewayResult<T>,
}

struct Endpoint<T: Clone> {
    default: GatewayResult<T>,
    script: VecDeque<Scripted<T>>,
}

impl<T: Clone> Endpoint<T> {
    fn new(default: GatewayResult<T>) -> Self {
        Self {
            default,
            script: VecDeque::new(),
        }
    }

    fn take_next(&mut self) -> (Duration, GatewayResult<T>) {
        match self.script.pop_front() {
            Some(scripted) => (scripted.delay, scripted.result),
            None => (Duration::ZERO, self.default.clone()),
        }
    }
}

/// Scriptable in-memory gateway.
pub struct MockGateway {
    consolidated: Mutex<Endpoint<RawPayload>>,
    trends: Mutex<Endpoint<RawPayload>>,
    regional: Mutex<Endpoint<RawPayload>>,
    health: Mutex<Endpoint<HealthProbe>>,
    consolidated_calls: AtomicU64,
    trend_calls: AtomicU64,
    regional_calls: AtomicU64,
    health_calls: AtomicU64,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self {
            consolidated: Mutex::new(Endpoint::new(Ok(json!({})))),
            trends: Mutex::new(Endpoint::new(Ok(json!({ "points": [] })))),
            regional: Mutex::new(Endpoint::new(Ok(json!([])))),
            health: Mutex::new(Endpoint::new(Ok(HealthProbe {
                connected: true,
                query_duration_ms: 5,
            }))),
            consolidated_calls: AtomicU64::new(0),
            trend_calls: AtomicU64::new(0),
            regional_calls: AtomicU64::new(0),
            health_calls: AtomicU64::new(0),
        }
    }
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default consolidated payload.
    pub fn set_consolidated(&self, payload: RawPayload) {
        self.consolidated.lock().unwrap().default = Ok(payload);
    }

    /// Make every unscripted consolidated call fail.
    pub fn fail_consolidated(&self, error: GatewayError) {
        self.consolidated.lock().unwrap().default = Err(error);
    }

    /// Enqueue a one-shot consolidated response with an artificial delay.
    pub fn enqueue_consolidated(&self, delay: Duration, result: GatewayResult<RawPayload>) {
        self.consolidated
            .lock()
            .unwrap()
            .script
            .push_back(Scripted { delay, result });
    }

    pub fn set_trends(&self, payload: RawPayload) {
        self.trends.lock().unwrap().default = Ok(payload);
    }

    pub fn fail_trends(&self, error: GatewayError) {
        self.trends.lock().unwrap().default = Err(error);
    }

    pub fn set_regional(&self, payload: RawPayload) {
        self.regional.lock().unwrap().default = Ok(payload);
    }

    pub fn fail_regional(&self, error: GatewayError) {
        self.regional.lock().unwrap().default = Err(error);
    }

    pub fn set_health(&self, probe: HealthProbe) {
        self.health.lock().unwrap().default = Ok(probe);
    }

    pub fn fail_health(&self, error: GatewayError) {
        self.health.lock().unwrap().default = Err(error);
    }

    pub fn consolidated_calls(&self) -> u64 {
        self.consolidated_calls.load(Ordering::SeqCst)
    }

    pub fn trend_calls(&self) -> u64 {
        self.trend_calls.load(Ordering::SeqCst)
    }

    pub fn regional_calls(&self) -> u64 {
        self.regional_calls.load(Ordering::SeqCst)
    }

    pub fn health_calls(&self) -> u64 {
        self.health_calls.load(Ordering::SeqCst)
    }

    async fn respond<T: Clone>(endpoint: &Mutex<Endpoint<T>>) -> GatewayResult<T> {
        let (delay, result) = endpoint.lock().unwrap().take_next();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        result
    }
}

#[async_trait]
impl DataGateway for MockGateway {
    async fn fetch_consolidated(&self) -> GatewayResult<RawPayload> {
        self.consolidated_calls.fetch_add(1, Ordering::SeqCst);
        Self::respond(&self.consolidated).await
    }

    async fn fetch_trends(&self, _range: TimeRange) -> GatewayResult<RawPayload> {
        self.trend_calls.fetch_add(1, Ordering::SeqCst);
        Self::respond(&self.trends).await
    }

    async fn fetch_regional(&self) -> GatewayResult<RawPayload> {
        self.regional_calls.fetch_add(1, Ordering::SeqCst);
        Self::respond(&self.regional).await
    }

    async fn health_check(&self) -> GatewayResult<HealthProbe> {
        self.health_calls.fetch_add(1, Ordering::SeqCst);
        Self::respond(&self.health).await
    }
}

/// Mpsc-backed change feed with a push hook for tests.
#[derive(Default)]
pub struct MockChangeFeed {
    senders: Mutex<HashMap<WatchedTable, mpsc::Sender<ChangeEvent>>>,
}

impl MockChangeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push an event to the subscription watching its table. Returns false
    /// when nobody is subscribed or the channel is closed.
    pub fn push(&self, event: ChangeEvent) -> bool {
        let senders = self.senders.lock().unwrap();
        match senders.get(&event.table) {
            Some(tx) => tx.try_send(event).is_ok(),
            None => false,
        }
    }

    /// Number of subscriptions whose receiver is still alive.
    pub fn open_channels(&self) -> usize {
        self.senders
            .lock()
            .unwrap()
            .values()
            .filter(|tx| !tx.is_closed())
            .count()
    }
}

#[async_trait]
impl ChangeFeed for MockChangeFeed {
    async fn subscribe(&self, table: WatchedTable) -> GatewayResult<ChangeSubscription> {
        let (tx, rx) = mpsc::channel(32);
        self.senders.lock().unwrap().insert(table, tx);
        Ok(ChangeSubscription::new(table, rx))
    }
}

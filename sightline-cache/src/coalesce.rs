//! Per-key in-flight guards
//!
//! Concurrent cache misses for the same key must not each hit the backend.
//! Callers acquire the key's guard before fetching; whoever wins fetches
//! and stores, the rest re-check the cache after the guard releases.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Default)]
pub(crate) struct InflightGuards {
    inflight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl InflightGuards {
    pub(crate) async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut inflight = self.inflight.lock().await;
            Arc::clone(
                inflight
                    .entry(key.to_string())
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };
        lock.lock_owned().await
    }

    /// Drop guards nobody is waiting on. Called opportunistically so the
    /// map stays bounded by the live key set.
    pub(crate) async fn prune(&self) {
        let mut inflight = self.inflight.lock().await;
        inflight.retain(|_, lock| Arc::strong_count(lock) > 1);
    }
}

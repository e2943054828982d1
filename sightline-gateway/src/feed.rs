//! Change-notification feed abstraction
//!
//! A message-passing channel view of the backend's real-time notification
//! mechanism. The invalidation logic subscribes per table and consumes
//! [`ChangeEvent`]s; it never sees the underlying transport.

use async_trait::async_trait;
use sightline_core::{ChangeEvent, WatchedTable};
use tokio::sync::mpsc;

use crate::gateway::GatewayResult;

/// Live handle to a change-notification channel for one table.
///
/// Dropping the subscription closes the channel; the sender side observes
/// the closure. At most one subscription per table per mounted dashboard.
pub struct ChangeSubscription {
    table: WatchedTable,
    rx: mpsc::Receiver<ChangeEvent>,
}

impl ChangeSubscription {
    pub fn new(table: WatchedTable, rx: mpsc::Receiver<ChangeEvent>) -> Self {
        Self { table, rx }
    }

    pub fn table(&self) -> WatchedTable {
        self.table
    }

    /// Next change event, or `None` once the channel has closed
    /// (notifications paused).
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        self.rx.recv().await
    }

    /// Close the channel explicitly. Equivalent to dropping the handle.
    pub fn close(&mut self) {
        self.rx.close();
    }
}

/// Source of change-notification subscriptions.
#[async_trait]
pub trait ChangeFeed: Send + Sync {
    /// Open a change-notification channel for one table.
    async fn subscribe(&self, table: WatchedTable) -> GatewayResult<ChangeSubscription>;
}

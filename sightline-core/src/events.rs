//! Change-notification event types
//!
//! The backend pushes a [`ChangeEvent`] whenever a row in a watched table
//! is inserted, updated, or deleted. The invalidation logic is backend
//! agnostic: it only sees these types, never the transport.

use crate::keys::MetricKey;
use crate::metrics::TimeRange;
use crate::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Backend tables the dashboard watches for changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WatchedTable {
    Inspections,
    ChecklistItems,
    Users,
}

impl WatchedTable {
    pub const ALL: [WatchedTable; 3] = [
        WatchedTable::Inspections,
        WatchedTable::ChecklistItems,
        WatchedTable::Users,
    ];

    /// Metric keys whose cached values depend on rows in this table.
    pub fn dependent_keys(&self) -> Vec<MetricKey> {
        match self {
            // The primary entity table feeds every aggregate.
            WatchedTable::Inspections => vec![
                MetricKey::consolidated(),
                MetricKey::trend(TimeRange::Week),
                MetricKey::trend(TimeRange::Month),
                MetricKey::trend(TimeRange::Quarter),
                MetricKey::trend(TimeRange::Year),
                MetricKey::regional(),
            ],
            WatchedTable::ChecklistItems => vec![MetricKey::consolidated()],
            WatchedTable::Users => vec![MetricKey::consolidated(), MetricKey::users()],
        }
    }

    /// Refresh priority for changes to this table. Row-level changes to the
    /// primary entity table are urgent; derived tables are not.
    pub fn priority(&self) -> Priority {
        match self {
            WatchedTable::Inspections => Priority::High,
            WatchedTable::ChecklistItems | WatchedTable::Users => Priority::Normal,
        }
    }
}

/// Kind of row change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// One pushed change notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: WatchedTable,
    pub kind: ChangeKind,
    pub row_id: Uuid,
    pub occurred_at: Timestamp,
}

impl ChangeEvent {
    pub fn new(table: WatchedTable, kind: ChangeKind, row_id: Uuid) -> Self {
        Self {
            table,
            kind,
            row_id,
            occurred_at: chrono::Utc::now(),
        }
    }
}

/// Refresh priority. A tunable parameter, not a fixed protocol: the mapping
/// to effective TTL and skip-cache behavior lives in [`crate::DashboardConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Normal,
    Low,
}

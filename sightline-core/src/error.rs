//! Error types for Sightline operations

use crate::events::WatchedTable;
use thiserror::Error;

/// Remote data gateway errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Transport failure: {reason}")]
    Transport { reason: String },

    #[error("Backend rejected {endpoint} with status {status}: {message}")]
    Backend {
        endpoint: String,
        status: i32,
        message: String,
    },

    #[error("Request to {endpoint} timed out after {elapsed_ms}ms")]
    Timeout { endpoint: String, elapsed_ms: i64 },
}

/// Keyed cache errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Fetch failed for cache key {key}: {source}")]
    FetchFailed {
        key: String,
        #[source]
        source: GatewayError,
    },
}

/// Payload validation errors raised at the gateway boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Payload is not an object: {endpoint}")]
    NotAnObject { endpoint: String },
}

/// Change-notification subscription errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SubscriptionError {
    #[error("Invalidator already started")]
    AlreadyStarted,

    #[error("Invalidator has been stopped and cannot restart")]
    Terminated,

    #[error("Subscribe failed for table {table:?}: {reason}")]
    SubscribeFailed { table: WatchedTable, reason: String },

    #[error("Change channel for table {table:?} closed")]
    ChannelClosed { table: WatchedTable },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all Sightline errors.
#[derive(Debug, Clone, Error)]
pub enum SightlineError {
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Subscription error: {0}")]
    Subscription(#[from] SubscriptionError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for Sightline operations.
pub type SightlineResult<T> = Result<T, SightlineError>;

// =============================================================================
// TESTS
// =============================================================================

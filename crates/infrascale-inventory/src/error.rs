//! Error types for infrascale-inventory

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while building an inventory
#[derive(Error, Debug, Clone)]
pub enum InventoryError {
    /// A required option is missing or invalid
    #[error("invalid configuration: {0}")]
    ConfigError(String),

    /// The document store endpoint could not be reached
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The endpoint is reachable but the logical database does not exist
    #[error("database '{database}' not found on {uri}")]
    DatabaseNotFound {
        /// Endpoint that was queried
        uri: String,
        /// Database that was expected
        database: String,
    },

    /// The aggregation query or cursor failed
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// The store round trip exceeded its time budget
    #[error("inventory collection timed out after {0:?}")]
    Timeout(Duration),
}

impl InventoryError {
    /// Check if error is retryable
    ///
    /// Nothing is retried inside a build; this only tells a caller whether a
    /// fresh invocation could succeed without changing configuration.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            InventoryError::ConnectionFailed(_) | InventoryError::Timeout(_)
        )
    }

    /// Check if the error points at the configuration rather than the store
    #[must_use]
    pub fn is_config_problem(&self) -> bool {
        matches!(
            self,
            InventoryError::ConfigError(_) | InventoryError::DatabaseNotFound { .. }
        )
    }
}

//! Error types for SiteStats operations

use std::time::Duration;
use thiserror::Error;

/// Storage layer errors (data sources and cache backends).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Data source {source_name} unavailable: {reason}")]
    Unavailable { source_name: String, reason: String },

    #[error("Transaction failed: {reason}")]
    TransactionFailed { reason: String },

    #[error("Serialization failed for cache entry {name}: {reason}")]
    Serialization { name: String, reason: String },

    #[error("Deserialization failed for cache entry {name}: {reason}")]
    Deserialization { name: String, reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Errors raised while computing the statistics snapshot.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AggregationError {
    #[error("Aggregation timed out after {after:?}")]
    TimedOut { after: Duration },

    #[error("Aggregation failed: {reason}")]
    Failed { reason: String },
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

/// Page rendering errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("Template not found: {name}")]
    TemplateNotFound { name: String },

    #[error("Rendering {template} failed: {reason}")]
    RenderFailed { template: String, reason: String },
}

/// Master error type for all SiteStats errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SiteStatsError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Aggregation error: {0}")]
    Aggregation(#[from] AggregationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),
}

impl SiteStatsError {
    /// Shorthand for a data source that could not be reached.
    pub fn unavailable(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Storage(StorageError::Unavailable {
            source_name: source_name.into(),
            reason: reason.into(),
        })
    }
}

/// Result type alias for SiteStats operations.
pub type SiteStatsResult<T> = Result<T, SiteStatsError>;

// =============================================================================
// TESTS
// =============================================================================

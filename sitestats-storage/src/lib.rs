//! SiteStats Storage - Data Sources, Cache and Aggregation
//!
//! Defines the data-source traits the statistics page reads from, an
//! in-memory implementation of them, the staleness-gated statistics cache
//! with its in-memory and LMDB backends, and the aggregator that fills it.

pub mod aggregate;
pub mod cache;
pub mod memory;
pub mod sources;

pub use aggregate::StatisticsAggregator;
pub use memory::{InMemorySiteStore, SiteDataSeed};
pub use sources::{
    DataSources, IssueRepository, SubmissionRepository, TenantRegistry, UsageMetricsStore,
};

// Re-export cache types for API integration
pub use cache::{
    AnyCacheBackend, CacheBackend, CacheRead, CacheStats, CacheableValue, InMemoryCacheBackend,
    LmdbCacheBackend, LmdbCacheError, Populate, ReadSource, StalenessGatedCache,
};

/// The statistics cache as wired into the service.
pub type StatisticsCache =
    StalenessGatedCache<AnyCacheBackend, sitestats_core::StatisticsSnapshot>;

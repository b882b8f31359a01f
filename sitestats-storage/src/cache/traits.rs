//! Cache backend traits and cacheable value marker.
//!
//! This module defines the traits that must be implemented by cache backends
//! and values that can be cached.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use sitestats_core::{SiteStatsResult, StatisticsSnapshot, STATISTICS_CACHE_NAME};

/// Marker trait for types that can be cached.
///
/// Each cacheable type owns exactly one named cache entry. The name is the
/// storage key, so it must be stable across releases.
pub trait CacheableValue: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Name of the cache entry holding this value.
    fn cache_name() -> &'static str;
}

impl CacheableValue for StatisticsSnapshot {
    fn cache_name() -> &'static str {
        STATISTICS_CACHE_NAME
    }
}

/// Cache backend trait for pluggable cache implementations.
///
/// Implementations must replace a value atomically: a concurrent `get`
/// sees either the previous value or the new one, never a mix.
///
/// # Serialization
///
/// Implementations are responsible for serializing/deserializing values.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Get a value from the cache.
    ///
    /// Returns the cached value and when it was written, or None if absent.
    async fn get<T: CacheableValue>(&self) -> SiteStatsResult<Option<(T, DateTime<Utc>)>>;

    /// Put a value into the cache, replacing any previous value.
    ///
    /// The `written_at` timestamp is stored alongside the value to support
    /// staleness calculations.
    async fn put<T: CacheableValue>(&self, value: &T, written_at: DateTime<Utc>)
        -> SiteStatsResult<()>;

    /// Remove the entry named `name`. Returns whether anything was removed.
    async fn delete(&self, name: &str) -> SiteStatsResult<bool>;

    /// Get cache statistics.
    async fn stats(&self) -> SiteStatsResult<CacheStats>;
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of entries currently in cache.
    pub entry_count: u64,
    /// Size of the stored records in bytes.
    pub stored_bytes: u64,
    /// Number of successful writes.
    pub writes: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_stats_hit_rate() {
        let stats = CacheStats {
            hits: 80,
            misses: 20,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.8).abs() < 0.001);

        let empty_stats = CacheStats::default();
        assert!((empty_stats.hit_rate() - 0.0).abs() < 0.001);
    }

    #[test]
    fn test_snapshot_cache_name() {
        assert_eq!(StatisticsSnapshot::cache_name(), "siteStatistics");
    }
}

//! Process-local cache backend.
//!
//! Values are stored as encoded records (the same format the LMDB backend
//! writes) so a round trip through this backend exercises serialization
//! exactly like a persisted cache would.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sitestats_core::{SiteStatsError, SiteStatsResult, StorageError};

use super::record::{decode_record, encode_record};
use super::traits::{CacheBackend, CacheStats, CacheableValue};

/// In-memory cache backend keyed by cache name.
#[derive(Debug, Default)]
pub struct InMemoryCacheBackend {
    records: RwLock<HashMap<String, Vec<u8>>>,
    stats: RwLock<CacheStats>,
}

impl InMemoryCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn record_lookup(&self, hit: bool) {
        if let Ok(mut stats) = self.stats.write() {
            if hit {
                stats.hits += 1;
            } else {
                stats.misses += 1;
            }
        }
    }
}

#[async_trait]
impl CacheBackend for InMemoryCacheBackend {
    async fn get<T: CacheableValue>(&self) -> SiteStatsResult<Option<(T, DateTime<Utc>)>> {
        let bytes = {
            let records = self
                .records
                .read()
                .map_err(|_| SiteStatsError::Storage(StorageError::LockPoisoned))?;
            records.get(T::cache_name()).cloned()
        };

        self.record_lookup(bytes.is_some());
        bytes.map(|b| decode_record::<T>(&b)).transpose()
    }

    async fn put<T: CacheableValue>(
        &self,
        value: &T,
        written_at: DateTime<Utc>,
    ) -> SiteStatsResult<()> {
        let record = encode_record(value, written_at)?;
        let size = record.len() as u64;

        let mut records = self
            .records
            .write()
            .map_err(|_| SiteStatsError::Storage(StorageError::LockPoisoned))?;
        let previous = records.insert(T::cache_name().to_string(), record);

        if let Ok(mut stats) = self.stats.write() {
            stats.writes += 1;
            stats.entry_count = records.len() as u64;
            stats.stored_bytes = stats.stored_bytes.saturating_sub(
                previous.map(|p| p.len() as u64).unwrap_or(0),
            ) + size;
        }
        Ok(())
    }

    async fn delete(&self, name: &str) -> SiteStatsResult<bool> {
        let mut records = self
            .records
            .write()
            .map_err(|_| SiteStatsError::Storage(StorageError::LockPoisoned))?;
        let removed = records.remove(name);

        if let Ok(mut stats) = self.stats.write() {
            stats.entry_count = records.len() as u64;
            if let Some(bytes) = &removed {
                stats.stored_bytes = stats.stored_bytes.saturating_sub(bytes.len() as u64);
            }
        }
        Ok(removed.is_some())
    }

    async fn stats(&self) -> SiteStatsResult<CacheStats> {
        Ok(self.stats.read().map(|s| s.clone()).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitestats_core::StatisticsSnapshot;

    #[tokio::test]
    async fn test_put_get_delete() {
        let backend = InMemoryCacheBackend::new();
        let now = Utc::now();
        let snapshot = StatisticsSnapshot {
            issue_count: 4,
            ..Default::default()
        };

        assert!(backend.get::<StatisticsSnapshot>().await.unwrap().is_none());

        backend.put(&snapshot, now).await.unwrap();
        let (cached, written_at) = backend.get::<StatisticsSnapshot>().await.unwrap().unwrap();
        assert_eq!(cached, snapshot);
        assert_eq!(written_at.timestamp_millis(), now.timestamp_millis());

        assert!(backend.delete("siteStatistics").await.unwrap());
        assert!(!backend.delete("siteStatistics").await.unwrap());
        assert!(backend.get::<StatisticsSnapshot>().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_overwrite_replaces_whole_value() {
        let backend = InMemoryCacheBackend::new();
        let first = StatisticsSnapshot {
            journal_count: 1,
            issue_count: 1,
            ..Default::default()
        };
        let second = StatisticsSnapshot {
            journal_count: 2,
            ..Default::default()
        };

        backend.put(&first, Utc::now()).await.unwrap();
        backend.put(&second, Utc::now()).await.unwrap();

        let (cached, _) = backend.get::<StatisticsSnapshot>().await.unwrap().unwrap();
        assert_eq!(cached, second);
    }

    #[tokio::test]
    async fn test_stats() {
        let backend = InMemoryCacheBackend::new();
        let _ = backend.get::<StatisticsSnapshot>().await;
        backend.put(&StatisticsSnapshot::default(), Utc::now()).await.unwrap();
        let _ = backend.get::<StatisticsSnapshot>().await;
        let _ = backend.get::<StatisticsSnapshot>().await;

        let stats = backend.stats().await.unwrap();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.writes, 1);
        assert_eq!(stats.entry_count, 1);
        assert!(stats.stored_bytes > 8);
    }
}

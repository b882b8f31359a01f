//! Staleness-gated cache.
//!
//! Owns one named cache entry and decides on each access whether to reuse
//! the stored value or recompute it through a [`Populate`] implementation.
//!
//! # Access policy
//!
//! [`StalenessGatedCache::fetch`] implements the page policy: if the stored
//! value is older than `max_age` it is flushed, then the entry is read,
//! which repopulates it synchronously because the flush emptied it. There
//! is no background refresh: the request that crosses the staleness
//! boundary pays for the recomputation.
//!
//! # Concurrency
//!
//! With single-flight enabled (the default) a stale or empty entry is
//! repopulated under an async mutex: the first request recomputes, the
//! others wait and then read the fresh value. Fresh reads never touch the
//! mutex. With single-flight disabled, concurrent stale requests may each
//! recompute and write; the last writer wins.
//!
//! # Failure
//!
//! A failed or timed-out population writes nothing. The entry stays empty
//! and the next access tries again. A stored record that cannot be decoded
//! is dropped and treated as empty.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sitestats_core::{
    AggregationError, Clock, SiteStatsError, SiteStatsResult, StatisticsConfig, StorageError,
};
use tokio::sync::Mutex;

use super::freshness::{is_older_than, CacheRead};
use super::traits::{CacheBackend, CacheableValue};

/// Computes the value of a cache entry on a miss.
#[async_trait]
pub trait Populate<T>: Send + Sync {
    async fn populate(&self) -> SiteStatsResult<T>;
}

/// Single named cache entry with staleness-gated repopulation.
pub struct StalenessGatedCache<C, T>
where
    C: CacheBackend,
    T: CacheableValue,
{
    backend: Arc<C>,
    clock: Arc<dyn Clock>,
    populate_timeout: Option<Duration>,
    refresh_guard: Option<Mutex<()>>,
    _value: PhantomData<fn() -> T>,
}

impl<C, T> StalenessGatedCache<C, T>
where
    C: CacheBackend,
    T: CacheableValue,
{
    /// Create a cache with single-flight enabled and no population timeout.
    pub fn new(backend: Arc<C>, clock: Arc<dyn Clock>) -> Self {
        Self {
            backend,
            clock,
            populate_timeout: None,
            refresh_guard: Some(Mutex::new(())),
            _value: PhantomData,
        }
    }

    /// Apply the timeout and single-flight settings from `config`.
    pub fn from_config(backend: Arc<C>, clock: Arc<dyn Clock>, config: &StatisticsConfig) -> Self {
        Self::new(backend, clock)
            .with_populate_timeout(config.aggregation_timeout)
            .with_single_flight(config.single_flight)
    }

    /// Abort populations that take longer than `timeout`.
    pub fn with_populate_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.populate_timeout = timeout;
        self
    }

    pub fn with_single_flight(mut self, enabled: bool) -> Self {
        self.refresh_guard = enabled.then(|| Mutex::new(()));
        self
    }

    /// Name of the managed entry.
    pub fn name(&self) -> &'static str {
        T::cache_name()
    }

    pub fn backend(&self) -> &C {
        &self.backend
    }

    pub fn is_single_flight(&self) -> bool {
        self.refresh_guard.is_some()
    }

    /// Current contents without recomputation.
    ///
    /// A record that no longer decodes (older value layout, corruption) is
    /// deleted and reported as a miss, so the next read repopulates it.
    pub async fn peek(&self) -> SiteStatsResult<Option<CacheRead<T>>> {
        match self.backend.get::<T>().await {
            Ok(entry) => Ok(entry.map(|(value, written_at)| CacheRead::from_cache(value, written_at))),
            Err(SiteStatsError::Storage(StorageError::Deserialization { reason, .. })) => {
                tracing::warn!(
                    cache = T::cache_name(),
                    %reason,
                    "Discarding undecodable cache entry"
                );
                self.backend.delete(T::cache_name()).await?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// When the entry was last written, if it holds a value.
    pub async fn cache_time(&self) -> SiteStatsResult<Option<DateTime<Utc>>> {
        Ok(self.peek().await?.map(|read| read.written_at()))
    }

    /// True iff the entry holds a value older than `max_age`.
    ///
    /// An empty entry is not stale: there is nothing to flush and the next
    /// read populates it anyway.
    pub async fn is_stale(&self, max_age: Duration) -> SiteStatsResult<bool> {
        let now = self.clock.now();
        Ok(self
            .cache_time()
            .await?
            .is_some_and(|written_at| is_older_than(written_at, now, max_age)))
    }

    /// Clear the stored value and its timestamp.
    pub async fn flush(&self) -> SiteStatsResult<()> {
        if self.backend.delete(T::cache_name()).await? {
            tracing::debug!(cache = T::cache_name(), "Cache entry flushed");
        }
        Ok(())
    }

    /// Return the stored value, or populate the entry once and return the
    /// new value.
    pub async fn get_or_populate<P>(&self, populator: &P) -> SiteStatsResult<CacheRead<T>>
    where
        P: Populate<T> + ?Sized,
    {
        if let Some(read) = self.peek().await? {
            return Ok(read);
        }
        self.populate(populator).await
    }

    /// Page policy: flush if older than `max_age`, then read, populating
    /// the entry when it is empty.
    pub async fn fetch<P>(&self, max_age: Duration, populator: &P) -> SiteStatsResult<CacheRead<T>>
    where
        P: Populate<T> + ?Sized,
    {
        if let Some(read) = self.peek().await? {
            if !is_older_than(read.written_at(), self.clock.now(), max_age) {
                return Ok(read);
            }
        }

        let _guard = match &self.refresh_guard {
            Some(guard) => Some(guard.lock().await),
            None => None,
        };

        // Re-checked under the guard: another request may have refreshed
        // the entry while this one waited.
        if self.is_stale(max_age).await? {
            self.flush().await?;
        }
        self.get_or_populate(populator).await
    }

    async fn populate<P>(&self, populator: &P) -> SiteStatsResult<CacheRead<T>>
    where
        P: Populate<T> + ?Sized,
    {
        let started = Instant::now();
        let result = match self.populate_timeout {
            Some(limit) => match tokio::time::timeout(limit, populator.populate()).await {
                Ok(result) => result,
                Err(_) => Err(SiteStatsError::Aggregation(AggregationError::TimedOut {
                    after: limit,
                })),
            },
            None => populator.populate().await,
        };

        let value = match result {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(
                    cache = T::cache_name(),
                    error = %e,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Cache population failed; entry left empty"
                );
                return Err(e);
            }
        };

        let written_at = self.clock.now();
        self.backend.put(&value, written_at).await?;
        tracing::info!(
            cache = T::cache_name(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            %written_at,
            "Cache entry populated"
        );
        Ok(CacheRead::from_population(value, written_at))
    }
}

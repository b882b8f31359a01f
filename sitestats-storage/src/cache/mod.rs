//! Statistics cache with explicit staleness.
//!
//! The site statistics are expensive to compute and change slowly, so they
//! live in a single named cache entry that is recomputed at most once per
//! `max_age`. Reads return [`CacheRead<T>`], which carries the write time
//! and whether the read paid for a population.
//!
//! # Backends
//!
//! - [`InMemoryCacheBackend`]: process-local, lost on restart
//! - [`LmdbCacheBackend`]: persisted with LMDB, survives restarts
//!
//! [`AnyCacheBackend`] picks one of the two at startup.
//!
//! # Example
//!
//! ```ignore
//! let cache = StalenessGatedCache::<_, StatisticsSnapshot>::new(backend, clock);
//! let read = cache.fetch(Duration::from_secs(86_400), &aggregator).await?;
//!
//! if read.was_populated() {
//!     tracing::info!("Statistics recomputed for this request");
//! }
//! ```

pub mod freshness;
pub mod gated;
pub mod lmdb_backend;
pub mod memory_backend;
pub mod record;
pub mod traits;

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sitestats_core::SiteStatsResult;

pub use freshness::{age_at, is_older_than, CacheRead, ReadSource};
pub use gated::{Populate, StalenessGatedCache};
pub use lmdb_backend::{LmdbCacheBackend, LmdbCacheError};
pub use memory_backend::InMemoryCacheBackend;
pub use traits::{CacheBackend, CacheStats, CacheableValue};

/// Cache backend chosen at startup.
///
/// [`CacheBackend`] has generic methods and cannot be used as a trait
/// object, so the runtime choice is an enum that dispatches to the
/// concrete backend.
pub enum AnyCacheBackend {
    Memory(InMemoryCacheBackend),
    Lmdb(LmdbCacheBackend),
}

impl AnyCacheBackend {
    pub fn memory() -> Self {
        Self::Memory(InMemoryCacheBackend::new())
    }

    /// Open (or create) an LMDB cache under `path`.
    pub fn lmdb<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbCacheError> {
        LmdbCacheBackend::new(path, max_size_mb).map(Self::Lmdb)
    }

    /// Short backend name for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Lmdb(_) => "lmdb",
        }
    }
}

#[async_trait]
impl CacheBackend for AnyCacheBackend {
    async fn get<T: CacheableValue>(&self) -> SiteStatsResult<Option<(T, DateTime<Utc>)>> {
        match self {
            Self::Memory(backend) => backend.get::<T>().await,
            Self::Lmdb(backend) => backend.get::<T>().await,
        }
    }

    async fn put<T: CacheableValue>(
        &self,
        value: &T,
        written_at: DateTime<Utc>,
    ) -> SiteStatsResult<()> {
        match self {
            Self::Memory(backend) => backend.put(value, written_at).await,
            Self::Lmdb(backend) => backend.put(value, written_at).await,
        }
    }

    async fn delete(&self, name: &str) -> SiteStatsResult<bool> {
        match self {
            Self::Memory(backend) => backend.delete(name).await,
            Self::Lmdb(backend) => backend.delete(name).await,
        }
    }

    async fn stats(&self) -> SiteStatsResult<CacheStats> {
        match self {
            Self::Memory(backend) => backend.stats().await,
            Self::Lmdb(backend) => backend.stats().await,
        }
    }
}

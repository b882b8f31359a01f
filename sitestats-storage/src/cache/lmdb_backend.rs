//! LMDB-backed cache implementation.
//!
//! Uses the heed crate (Rust bindings for LMDB) to persist the statistics
//! snapshot across restarts. Each cacheable type lives under its cache name
//! as key; the value is an encoded record (see [`super::record`]).
//!
//! # Atomicity
//!
//! LMDB provides ACID transactions. The backend uses:
//! - Read transactions for `get`
//! - One write transaction per `put` or `delete`, so a value is always
//!   replaced as a whole
//! - Statistics are tracked in memory and reset on restart

use std::path::Path;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};
use sitestats_core::{SiteStatsError, SiteStatsResult, StorageError};

use super::record::{decode_record, encode_record};
use super::traits::{CacheBackend, CacheStats, CacheableValue};

/// Error type for LMDB cache operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbCacheError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convert LmdbCacheError to SiteStatsError.
impl From<LmdbCacheError> for SiteStatsError {
    fn from(e: LmdbCacheError) -> Self {
        SiteStatsError::Storage(StorageError::TransactionFailed {
            reason: e.to_string(),
        })
    }
}

/// LMDB-backed cache.
///
/// # Example
///
/// ```ignore
/// use sitestats_storage::cache::LmdbCacheBackend;
///
/// let backend = LmdbCacheBackend::new("/var/cache/sitestats", 16)?;
/// backend.put(&snapshot, Utc::now()).await?;
/// let cached = backend.get::<StatisticsSnapshot>().await?;
/// ```
pub struct LmdbCacheBackend {
    /// The LMDB environment.
    env: Env,
    /// The main database (single unnamed database).
    db: Database<Bytes, Bytes>,
    stats: RwLock<CacheStats>,
}

impl LmdbCacheBackend {
    /// Create a new LMDB cache backend.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files will be stored
    /// * `max_size_mb` - Maximum size of the database in megabytes
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory cannot be created
    /// - LMDB environment cannot be opened
    /// - Database cannot be created
    pub fn new<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbCacheError> {
        let map_size = map_size_bytes(max_size_mb)?;

        // Ensure directory exists
        std::fs::create_dir_all(&path)?;

        // SAFETY: the environment is opened once per directory by this process.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbCacheError::EnvOpen(e.to_string()))?;

        let mut wtxn = env
            .write_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        let db: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| LmdbCacheError::DbOpen(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        // Entries that survived a restart count towards the entry total.
        let entry_count = {
            let rtxn = env
                .read_txn()
                .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;
            db.len(&rtxn)
                .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?
        };

        Ok(Self {
            env,
            db,
            stats: RwLock::new(CacheStats {
                entry_count,
                ..Default::default()
            }),
        })
    }

    fn update_stats(&self, f: impl FnOnce(&mut CacheStats)) {
        if let Ok(mut stats) = self.stats.write() {
            f(&mut stats);
        }
    }

    /// Length of the record under `key`, read inside the caller's write
    /// transaction so the stats match what the transaction replaces.
    fn stored_len(&self, wtxn: &heed::RwTxn<'_>, key: &[u8]) -> Result<Option<u64>, LmdbCacheError> {
        let bytes = self
            .db
            .get(wtxn, key)
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;
        Ok(bytes.map(|b| b.len() as u64))
    }

    fn read_raw(&self, key: &[u8]) -> Result<Option<Vec<u8>>, LmdbCacheError> {
        let rtxn = self
            .env
            .read_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;
        let bytes = self
            .db
            .get(&rtxn, key)
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;
        Ok(bytes.map(<[u8]>::to_vec))
    }
}

/// LMDB map size for `max_size_mb`, rejecting sizes that overflow `usize`.
fn map_size_bytes(max_size_mb: usize) -> Result<usize, LmdbCacheError> {
    max_size_mb
        .checked_mul(1024 * 1024)
        .ok_or_else(|| LmdbCacheError::EnvOpen(format!("map size of {} MB is too large", max_size_mb)))
}

#[async_trait]
impl CacheBackend for LmdbCacheBackend {
    async fn get<T: CacheableValue>(&self) -> SiteStatsResult<Option<(T, DateTime<Utc>)>> {
        match self.read_raw(T::cache_name().as_bytes()) {
            Ok(Some(bytes)) => {
                self.update_stats(|s| s.hits += 1);
                decode_record::<T>(&bytes).map(Some)
            }
            Ok(None) => {
                self.update_stats(|s| s.misses += 1);
                Ok(None)
            }
            Err(e) => {
                self.update_stats(|s| s.misses += 1);
                Err(e.into())
            }
        }
    }

    async fn put<T: CacheableValue>(
        &self,
        value: &T,
        written_at: DateTime<Utc>,
    ) -> SiteStatsResult<()> {
        let key = T::cache_name().as_bytes();
        let record = encode_record(value, written_at)?;

        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;
        let previous_len = self.stored_len(&wtxn, key)?;

        self.db
            .put(&mut wtxn, key, &record)
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        self.update_stats(|s| {
            s.writes += 1;
            if previous_len.is_none() {
                s.entry_count += 1;
            }
            s.stored_bytes = s.stored_bytes.saturating_sub(previous_len.unwrap_or(0))
                + record.len() as u64;
        });

        Ok(())
    }

    async fn delete(&self, name: &str) -> SiteStatsResult<bool> {
        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;
        let previous_len = self.stored_len(&wtxn, name.as_bytes())?;

        let deleted = self
            .db
            .delete(&mut wtxn, name.as_bytes())
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        if deleted {
            self.update_stats(|s| {
                s.entry_count = s.entry_count.saturating_sub(1);
                s.stored_bytes = s.stored_bytes.saturating_sub(previous_len.unwrap_or(0));
            });
        }

        Ok(deleted)
    }

    async fn stats(&self) -> SiteStatsResult<CacheStats> {
        Ok(self.stats.read().map(|s| s.clone()).unwrap_or_default())
    }
}

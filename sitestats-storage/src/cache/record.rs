//! On-disk record format shared by the cache backends.
//!
//! Format: `[written_at: 8 bytes little-endian unix millis][json value]`.

use chrono::{DateTime, Utc};
use sitestats_core::{SiteStatsError, SiteStatsResult, StorageError};

use super::traits::CacheableValue;

const TIMESTAMP_LEN: usize = 8;

/// Serialize a value and its write time into one record.
pub fn encode_record<T: CacheableValue>(value: &T, written_at: DateTime<Utc>) -> SiteStatsResult<Vec<u8>> {
    let value_bytes = serde_json::to_vec(value).map_err(|e| {
        SiteStatsError::Storage(StorageError::Serialization {
            name: T::cache_name().to_string(),
            reason: e.to_string(),
        })
    })?;

    let mut record = Vec::with_capacity(TIMESTAMP_LEN + value_bytes.len());
    record.extend_from_slice(&written_at.timestamp_millis().to_le_bytes());
    record.extend_from_slice(&value_bytes);
    Ok(record)
}

/// Parse a record written by [`encode_record`].
pub fn decode_record<T: CacheableValue>(bytes: &[u8]) -> SiteStatsResult<(T, DateTime<Utc>)> {
    let corrupt = |reason: String| {
        SiteStatsError::Storage(StorageError::Deserialization {
            name: T::cache_name().to_string(),
            reason,
        })
    };

    if bytes.len() < TIMESTAMP_LEN {
        return Err(corrupt(format!("record too short: {} bytes", bytes.len())));
    }

    let timestamp_bytes: [u8; TIMESTAMP_LEN] = bytes[..TIMESTAMP_LEN]
        .try_into()
        .map_err(|_| corrupt("invalid timestamp".to_string()))?;
    let millis = i64::from_le_bytes(timestamp_bytes);
    let written_at = DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| corrupt(format!("timestamp out of range: {}", millis)))?;

    let value: T = serde_json::from_slice(&bytes[TIMESTAMP_LEN..]).map_err(|e| corrupt(e.to_string()))?;
    Ok((value, written_at))
}

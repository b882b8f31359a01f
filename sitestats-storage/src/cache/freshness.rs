//! Freshness metadata for cache reads.
//!
//! Every read from the statistics cache comes back wrapped in a
//! [`CacheRead`] so callers can see when the value was written and whether
//! this request paid for recomputing it.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Age of a value written at `written_at`, as seen at `now`.
///
/// A write timestamp in the future (clock moved backwards) counts as zero.
pub fn age_at(written_at: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    now.signed_duration_since(written_at)
        .to_std()
        .unwrap_or(Duration::ZERO)
}

/// True iff the value is strictly older than `max_age`.
pub fn is_older_than(written_at: DateTime<Utc>, now: DateTime<Utc>, max_age: Duration) -> bool {
    age_at(written_at, now) > max_age
}

/// Where a cache read was served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadSource {
    /// The stored value was reused.
    Cache,
    /// The value was computed for this read and then stored.
    Population,
}

impl ReadSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cache => "hit",
            Self::Population => "populated",
        }
    }
}

/// Result of a cache read, carrying staleness metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheRead<T> {
    value: T,
    written_at: DateTime<Utc>,
    source: ReadSource,
}

impl<T> CacheRead<T> {
    /// Create a new cache read from a cache hit.
    pub fn from_cache(value: T, written_at: DateTime<Utc>) -> Self {
        Self {
            value,
            written_at,
            source: ReadSource::Cache,
        }
    }

    /// Create a new cache read from a fresh population.
    pub fn from_population(value: T, written_at: DateTime<Utc>) -> Self {
        Self {
            value,
            written_at,
            source: ReadSource::Population,
        }
    }

    /// Consume the wrapper and return the underlying value.
    pub fn into_value(self) -> T {
        self.value
    }

    /// Get a reference to the underlying value.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// When the value was written to the cache.
    pub fn written_at(&self) -> DateTime<Utc> {
        self.written_at
    }

    /// How old the value is at `now`.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        age_at(self.written_at, now)
    }

    pub fn source(&self) -> ReadSource {
        self.source
    }

    /// Check if this was a cache hit.
    pub fn was_cache_hit(&self) -> bool {
        self.source == ReadSource::Cache
    }

    /// Check if this read triggered a population.
    pub fn was_populated(&self) -> bool {
        self.source == ReadSource::Population
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_is_older_than_is_strict() {
        let day = Duration::from_secs(86_400);
        let written = noon();

        assert!(!is_older_than(written, written + chrono::Duration::days(1), day));
        assert!(is_older_than(
            written,
            written + chrono::Duration::days(1) + chrono::Duration::seconds(1),
            day
        ));
    }

    #[test]
    fn test_future_write_has_zero_age() {
        let written = noon();
        assert_eq!(age_at(written, written - chrono::Duration::hours(1)), Duration::ZERO);
    }

    #[test]
    fn test_cache_read_from_cache() {
        let read = CacheRead::from_cache("value", noon());

        assert!(read.was_cache_hit());
        assert!(!read.was_populated());
        assert_eq!(read.source().as_str(), "hit");
        assert_eq!(read.written_at(), noon());
        assert_eq!(read.age(noon() + chrono::Duration::seconds(5)), Duration::from_secs(5));
    }

    #[test]
    fn test_cache_read_from_population() {
        let read = CacheRead::from_population(42i32, noon());

        assert!(read.was_populated());
        assert_eq!(read.source().as_str(), "populated");
        assert_eq!(read.into_value(), 42);
    }
}

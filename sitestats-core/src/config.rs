//! Configuration types

use crate::*;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings for computing and caching the site statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticsConfig {
    /// Age after which the cached snapshot is recomputed.
    pub max_age: Duration,
    /// Length of each "most read" ranking.
    pub most_read_limit: usize,
    /// Size of the trailing window for the "last month" ranking, in days.
    pub last_month_days: u32,
    /// Start of the all-time window.
    pub earliest_date: NaiveDate,
    /// Upper bound on one population call. `None` waits forever.
    pub aggregation_timeout: Option<Duration>,
    /// Let only one request repopulate a stale entry at a time.
    pub single_flight: bool,
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            max_age: Duration::from_secs(60 * 60 * 24),
            most_read_limit: 10,
            last_month_days: 30,
            earliest_date: statistics_earliest_date(),
            aggregation_timeout: Some(Duration::from_secs(30)),
            single_flight: true,
        }
    }
}

impl StatisticsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn with_most_read_limit(mut self, limit: usize) -> Self {
        self.most_read_limit = limit;
        self
    }

    pub fn with_last_month_days(mut self, days: u32) -> Self {
        self.last_month_days = days;
        self
    }

    pub fn with_earliest_date(mut self, date: NaiveDate) -> Self {
        self.earliest_date = date;
        self
    }

    pub fn with_aggregation_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.aggregation_timeout = timeout;
        self
    }

    pub fn with_single_flight(mut self, enabled: bool) -> Self {
        self.single_flight = enabled;
        self
    }

    /// Validate the configuration.
    ///
    /// Validates:
    /// - max_age is positive
    /// - most_read_limit > 0
    /// - last_month_days > 0
    /// - aggregation_timeout, when set, is positive
    pub fn validate(&self) -> SiteStatsResult<()> {
        if self.max_age.is_zero() {
            return Err(SiteStatsError::Config(ConfigError::InvalidValue {
                field: "max_age".to_string(),
                value: format!("{:?}", self.max_age),
                reason: "max_age must be positive".to_string(),
            }));
        }

        if self.most_read_limit == 0 {
            return Err(SiteStatsError::Config(ConfigError::InvalidValue {
                field: "most_read_limit".to_string(),
                value: self.most_read_limit.to_string(),
                reason: "most_read_limit must be greater than 0".to_string(),
            }));
        }

        if self.last_month_days == 0 {
            return Err(SiteStatsError::Config(ConfigError::InvalidValue {
                field: "last_month_days".to_string(),
                value: self.last_month_days.to_string(),
                reason: "last_month_days must be greater than 0".to_string(),
            }));
        }

        if let Some(timeout) = self.aggregation_timeout {
            if timeout.is_zero() {
                return Err(SiteStatsError::Config(ConfigError::InvalidValue {
                    field: "aggregation_timeout".to_string(),
                    value: format!("{:?}", timeout),
                    reason: "aggregation_timeout must be positive".to_string(),
                }));
            }
        }

        Ok(())
    }
}

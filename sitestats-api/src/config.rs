//! API Configuration Module
//!
//! Settings for the statistics page, the cache backend and the data seed.
//! Configuration is loaded from `SITESTATS_*` environment variables with
//! defaults suitable for development.

use std::path::PathBuf;
use std::time::Duration;

use sitestats_core::StatisticsConfig;

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// Runtime configuration of the statistics service.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    // ========================================================================
    // Page
    // ========================================================================
    /// Whether `GET /statistics` is mounted at all.
    pub enabled: bool,

    /// Base URL of the hosting site, used to build article links.
    /// Example: "https://journals.example.org"
    pub base_url: String,

    /// Site title shown as the page heading.
    pub site_title: String,

    /// Locale used to pick titles and tenant names.
    pub locale: String,

    /// YAML message catalog overriding the built-in English strings.
    pub catalog_path: Option<PathBuf>,

    // ========================================================================
    // Cache
    // ========================================================================
    /// LMDB directory. `None` keeps the cache in process memory.
    pub cache_dir: Option<PathBuf>,

    /// LMDB map size in megabytes.
    pub cache_max_size_mb: usize,

    /// Age after which the statistics are recomputed.
    pub cache_max_age: Duration,

    /// Upper bound on one recomputation. `None` waits forever.
    pub aggregation_timeout: Option<Duration>,

    /// Let only one request recompute stale statistics at a time.
    pub single_flight: bool,

    // ========================================================================
    // Data
    // ========================================================================
    /// JSON seed for the in-memory site store.
    pub data_path: Option<PathBuf>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        let statistics = StatisticsConfig::default();
        Self {
            enabled: true,
            base_url: "http://localhost:3000".to_string(),
            site_title: "Site Statistics".to_string(),
            locale: "en".to_string(),
            catalog_path: None,
            cache_dir: None,
            cache_max_size_mb: 16,
            cache_max_age: statistics.max_age,
            aggregation_timeout: statistics.aggregation_timeout,
            single_flight: statistics.single_flight,
            data_path: None,
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `SITESTATS_ENABLED`: "false" unmounts the page (default: true)
    /// - `SITESTATS_BASE_URL`: Site base URL (default: http://localhost:3000)
    /// - `SITESTATS_SITE_TITLE`: Page heading (default: "Site Statistics")
    /// - `SITESTATS_LOCALE`: Display locale (default: en)
    /// - `SITESTATS_CATALOG_PATH`: YAML message catalog (default: built-in)
    /// - `SITESTATS_CACHE_DIR`: LMDB directory (default: in-memory cache)
    /// - `SITESTATS_CACHE_MAX_SIZE_MB`: LMDB map size (default: 16)
    /// - `SITESTATS_CACHE_MAX_AGE_SECS`: Refresh interval (default: 86400)
    /// - `SITESTATS_AGGREGATION_TIMEOUT_SECS`: 0 disables (default: 30)
    /// - `SITESTATS_SINGLE_FLIGHT`: "false" disables (default: true)
    /// - `SITESTATS_DATA_PATH`: JSON seed for the site store (default: empty store)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    ///
    /// Unparseable values fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        let flag = |key: &str, default: bool| {
            non_empty(key)
                .map(|s| s.to_lowercase() != "false" && s != "0")
                .unwrap_or(default)
        };

        let enabled = flag("SITESTATS_ENABLED", defaults.enabled);
        let single_flight = flag("SITESTATS_SINGLE_FLIGHT", defaults.single_flight);

        let base_url = non_empty("SITESTATS_BASE_URL")
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or(defaults.base_url);

        let cache_max_size_mb = non_empty("SITESTATS_CACHE_MAX_SIZE_MB")
            .and_then(|s| s.parse().ok())
            .filter(|mb: &usize| *mb > 0)
            .unwrap_or(defaults.cache_max_size_mb);

        let cache_max_age = non_empty("SITESTATS_CACHE_MAX_AGE_SECS")
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.cache_max_age);

        let aggregation_timeout = match non_empty("SITESTATS_AGGREGATION_TIMEOUT_SECS")
            .and_then(|s| s.parse::<u64>().ok())
        {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => defaults.aggregation_timeout,
        };

        Self {
            enabled,
            base_url,
            site_title: non_empty("SITESTATS_SITE_TITLE").unwrap_or(defaults.site_title),
            locale: non_empty("SITESTATS_LOCALE").unwrap_or(defaults.locale),
            catalog_path: non_empty("SITESTATS_CATALOG_PATH").map(PathBuf::from),
            cache_dir: non_empty("SITESTATS_CACHE_DIR").map(PathBuf::from),
            cache_max_size_mb,
            cache_max_age,
            aggregation_timeout,
            single_flight,
            data_path: non_empty("SITESTATS_DATA_PATH").map(PathBuf::from),
        }
    }

    /// Statistics settings derived from this configuration.
    pub fn statistics_config(&self) -> StatisticsConfig {
        StatisticsConfig::default()
            .with_max_age(self.cache_max_age)
            .with_aggregation_timeout(self.aggregation_timeout)
            .with_single_flight(self.single_flight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> ApiConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ApiConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = config_from(&[]);
        assert_eq!(config, ApiConfig::default());
        assert!(config.enabled);
        assert!(config.single_flight);
        assert_eq!(config.cache_max_age, Duration::from_secs(86_400));
        assert_eq!(config.aggregation_timeout, Some(Duration::from_secs(30)));
        assert!(config.cache_dir.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("SITESTATS_ENABLED", "false"),
            ("SITESTATS_BASE_URL", "https://journals.example.org/"),
            ("SITESTATS_LOCALE", "fr_CA"),
            ("SITESTATS_CACHE_DIR", "/var/cache/sitestats"),
            ("SITESTATS_CACHE_MAX_AGE_SECS", "3600"),
            ("SITESTATS_AGGREGATION_TIMEOUT_SECS", "0"),
            ("SITESTATS_SINGLE_FLIGHT", "FALSE"),
        ]);

        assert!(!config.enabled);
        assert_eq!(config.base_url, "https://journals.example.org");
        assert_eq!(config.locale, "fr_CA");
        assert_eq!(config.cache_dir, Some(PathBuf::from("/var/cache/sitestats")));
        assert_eq!(config.cache_max_age, Duration::from_secs(3600));
        assert_eq!(config.aggregation_timeout, None);
        assert!(!config.single_flight);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = config_from(&[
            ("SITESTATS_CACHE_MAX_AGE_SECS", "tomorrow"),
            ("SITESTATS_CACHE_MAX_SIZE_MB", "0"),
            ("SITESTATS_SITE_TITLE", "   "),
        ]);

        assert_eq!(config.cache_max_age, Duration::from_secs(86_400));
        assert_eq!(config.cache_max_size_mb, 16);
        assert_eq!(config.site_title, "Site Statistics");
    }

    #[test]
    fn test_statistics_config_is_valid() {
        let statistics = config_from(&[("SITESTATS_CACHE_MAX_AGE_SECS", "60")]).statistics_config();
        assert_eq!(statistics.max_age, Duration::from_secs(60));
        assert_eq!(statistics.most_read_limit, 10);
        assert!(statistics.validate().is_ok());
    }
}

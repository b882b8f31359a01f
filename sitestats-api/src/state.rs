//! Shared application state for Axum routers.

use std::sync::Arc;
use std::time::Duration;

use sitestats_core::{Clock, SystemClock};
use sitestats_storage::{
    AnyCacheBackend, DataSources, InMemorySiteStore, StatisticsAggregator, StatisticsCache,
};

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::i18n::{MessageCatalog, Translator};
use crate::render::{Renderer, TeraRenderer};
use crate::services::MostReadLocalizer;
use crate::urls::PageUrlBuilder;

/// Static settings of the statistics page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSettings {
    pub site_title: String,
    pub locale: String,
    pub stylesheet_url: String,
    /// Age after which the statistics are recomputed.
    pub max_age: Duration,
}

/// Application-wide state shared across all routes.
///
/// The statistics cache is owned here, not in a global, so every router
/// built from a state instance sees the same cache entry.
#[derive(Clone)]
pub struct AppState {
    /// Staleness-gated cache holding the statistics snapshot.
    pub cache: Arc<StatisticsCache>,
    /// Populator of the cache.
    pub aggregator: Arc<StatisticsAggregator>,
    pub localizer: MostReadLocalizer,
    pub renderer: Arc<dyn Renderer>,
    pub translator: Arc<dyn Translator>,
    pub clock: Arc<dyn Clock>,
    pub page: PageSettings,
}

impl AppState {
    /// Assemble the state from its collaborators.
    pub fn new(
        config: &ApiConfig,
        sources: DataSources,
        backend: AnyCacheBackend,
        clock: Arc<dyn Clock>,
        translator: Arc<dyn Translator>,
        renderer: Arc<dyn Renderer>,
    ) -> ApiResult<Self> {
        let statistics = config.statistics_config();
        statistics.validate()?;

        let urls = Arc::new(PageUrlBuilder::new(config.base_url.clone()));
        let cache = StatisticsCache::from_config(Arc::new(backend), clock.clone(), &statistics);
        let aggregator = StatisticsAggregator::new(sources.clone(), clock.clone(), statistics.clone());

        Ok(Self {
            cache: Arc::new(cache),
            aggregator: Arc::new(aggregator),
            localizer: MostReadLocalizer::new(&sources, urls.clone(), config.locale.clone()),
            renderer,
            translator,
            clock,
            page: PageSettings {
                site_title: config.site_title.clone(),
                locale: config.locale.clone(),
                stylesheet_url: urls.stylesheet_url(),
                max_age: statistics.max_age,
            },
        })
    }

    /// Build the production state described by `config`.
    ///
    /// Opens the LMDB cache when a cache directory is configured, seeds
    /// the site store from the data file when one is given, and loads the
    /// message catalog overrides.
    pub fn from_config(config: &ApiConfig) -> ApiResult<Self> {
        let store = match &config.data_path {
            Some(path) => InMemorySiteStore::from_json_file(path)?,
            None => {
                tracing::warn!("SITESTATS_DATA_PATH not set; serving statistics of an empty site");
                InMemorySiteStore::new()
            }
        };

        let backend = match &config.cache_dir {
            Some(dir) => AnyCacheBackend::lmdb(dir, config.cache_max_size_mb).map_err(|e| {
                ApiError::internal_error(format!("Failed to open cache at {}: {}", dir.display(), e))
            })?,
            None => AnyCacheBackend::memory(),
        };

        let catalog = match &config.catalog_path {
            Some(path) => MessageCatalog::builtin_with_overrides(path)?,
            None => MessageCatalog::builtin()?,
        };

        tracing::info!(
            cache_backend = backend.kind(),
            max_age_secs = config.cache_max_age.as_secs(),
            single_flight = config.single_flight,
            "Statistics state initialized"
        );

        Self::new(
            config,
            DataSources::from_store(Arc::new(store)),
            backend,
            Arc::new(SystemClock),
            Arc::new(catalog),
            Arc::new(TeraRenderer::new()?),
        )
    }
}

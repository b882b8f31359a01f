//! SiteStats API - Public Site Statistics Page
//!
//! Serves `GET /statistics`: site-wide counts of enabled journals, published
//! issues and published articles, all-time downloads, and the most-read
//! articles of all time and of the last month. The aggregate is computed
//! at most once per day and kept in a staleness-gated cache.

pub mod config;
pub mod error;
pub mod i18n;
pub mod render;
pub mod routes;
pub mod services;
pub mod state;
pub mod telemetry;
pub mod urls;

// Re-export commonly used types
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use i18n::{page_labels, MessageCatalog, Translator};
pub use render::{Renderer, TeraRenderer, STATISTICS_TEMPLATE};
pub use routes::create_router;
pub use services::MostReadLocalizer;
pub use state::{AppState, PageSettings};
pub use urls::{PageUrlBuilder, UrlBuilder};

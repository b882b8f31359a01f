//! HTTP Routes Module
//!
//! Composes the statistics page with the metrics endpoint and the
//! observability layers.

pub mod statistics;

use axum::{middleware::from_fn, routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::state::AppState;
use crate::telemetry::{metrics_handler, observability_middleware};

/// Create the service router.
///
/// The statistics routes are mounted only when the page is enabled; a
/// disabled page answers 404 like any unknown path. `/metrics` is mounted
/// when `metrics_enabled` is set.
pub fn create_router(state: AppState, config: &ApiConfig, metrics_enabled: bool) -> Router {
    let mut router = Router::new();

    if config.enabled {
        router = router.merge(statistics::create_router(state));
    } else {
        tracing::info!("Statistics page disabled; /statistics is not mounted");
    }

    if metrics_enabled {
        router = router.route("/metrics", get(metrics_handler));
    }

    router
        .layer(from_fn(observability_middleware))
        .layer(TraceLayer::new_for_http())
}

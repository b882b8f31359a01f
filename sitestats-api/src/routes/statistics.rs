//! Statistics Page Routes
//!
//! - GET /statistics - site-wide statistics page (HTML)
//! - GET /statistics/siteStatistics.css - page stylesheet
//!
//! The page is public and takes no parameters. Counts and rankings come
//! from the staleness-gated cache; the rankings are re-localized on every
//! request so unpublished submissions disappear before the cache expires.

use std::time::Instant;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use serde_json::{json, Value};
use sitestats_core::{
    AggregationError, MostReadEntry, SiteStatsError, StatisticsSnapshot, StorageError,
};
use sitestats_storage::CacheRead;

use crate::error::{ApiError, ApiResult};
use crate::i18n::page_labels;
use crate::render::STATISTICS_TEMPLATE;
use crate::state::{AppState, PageSettings};
use crate::telemetry::METRICS;

/// Path of the page stylesheet, relative to the site root.
pub const STYLESHEET_PATH: &str = "/statistics/siteStatistics.css";

const STYLESHEET: &str = include_str!("../../static/siteStatistics.css");

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /statistics - Render the statistics page
pub async fn statistics_page(State(state): State<AppState>) -> ApiResult<Html<String>> {
    let read = read_snapshot(&state).await?;
    let snapshot = read.value();

    let (all_time, last_month) = tokio::try_join!(
        state.localizer.localize(&snapshot.all_time_most_read),
        state.localizer.localize(&snapshot.last_month_most_read),
    )?;

    let labels = page_labels(state.translator.as_ref());
    let bindings = page_bindings(&state.page, &read, &all_time, &last_month, json!(labels));
    let html = state.renderer.render(STATISTICS_TEMPLATE, &bindings)?;

    Ok(Html(html))
}

/// GET /statistics/siteStatistics.css - Serve the page stylesheet
pub async fn stylesheet() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        STYLESHEET,
    )
}

/// Read the snapshot through the cache, recording cache metrics.
async fn read_snapshot(state: &AppState) -> ApiResult<CacheRead<StatisticsSnapshot>> {
    let start = Instant::now();
    let result = state
        .cache
        .fetch(state.page.max_age, state.aggregator.as_ref())
        .await;

    match result {
        Ok(read) => {
            if let Ok(metrics) = METRICS.as_ref() {
                let age = read.age(state.clock.now());
                metrics.record_cache_read(
                    read.source().as_str(),
                    read.was_populated(),
                    start.elapsed().as_secs_f64(),
                    age.as_secs_f64(),
                );
            }
            Ok(read)
        }
        Err(e) => {
            if let Ok(metrics) = METRICS.as_ref() {
                metrics.record_population_failure(failure_reason(&e));
            }
            Err(ApiError::from(e))
        }
    }
}

fn failure_reason(error: &SiteStatsError) -> &'static str {
    match error {
        SiteStatsError::Aggregation(AggregationError::TimedOut { .. }) => "timeout",
        SiteStatsError::Storage(StorageError::Unavailable { .. }) => "unavailable",
        _ => "error",
    }
}

/// Template bindings of the statistics page.
pub fn page_bindings(
    page: &PageSettings,
    read: &CacheRead<StatisticsSnapshot>,
    all_time_most_read: &[MostReadEntry],
    last_month_most_read: &[MostReadEntry],
    labels: Value,
) -> Value {
    let snapshot = read.value();
    json!({
        "siteName": page.site_title,
        "locale": page.locale,
        "stylesheetUrl": page.stylesheet_url,
        "journalCount": snapshot.journal_count,
        "issueCount": snapshot.issue_count,
        "submissionCount": snapshot.submission_count,
        "allTimeDownloads": snapshot.all_time_downloads,
        "allTimeMostRead": all_time_most_read,
        "lastMonthMostRead": last_month_most_read,
        "lastUpdated": read.written_at().to_rfc3339(),
        "labels": labels,
    })
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create the statistics page router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/statistics", get(statistics_page))
        .route(STYLESHEET_PATH, get(stylesheet))
        .with_state(state)
}

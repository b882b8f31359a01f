//! Prometheus Metrics Definitions
//!
//! Defines the SiteStats metrics with their labels and types.
//! Exposes a /metrics endpoint for Prometheus scraping.

use axum::{http::StatusCode, response::IntoResponse};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge, register_histogram, register_histogram_vec, CounterVec,
    Encoder, Gauge, Histogram, HistogramVec, TextEncoder,
};

use crate::error::{ApiError, ApiResult};

/// HTTP request latency buckets (seconds)
/// Covers: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0,
];

/// Statistics recomputation buckets (seconds); aggregation is slow by nature.
const POPULATION_BUCKETS: &[f64] = &[0.010, 0.050, 0.100, 0.500, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0];

/// Global metrics instance - initialized once at startup
pub static METRICS: Lazy<ApiResult<SiteStatsMetrics>> = Lazy::new(SiteStatsMetrics::new);

/// Container for all SiteStats metrics.
#[derive(Clone)]
pub struct SiteStatsMetrics {
    /// HTTP request counter - labels: method, path, status
    pub http_requests_total: CounterVec,

    /// HTTP request duration histogram - labels: method, path
    pub http_request_duration_seconds: HistogramVec,

    /// Statistics cache reads - labels: outcome (hit/populated)
    pub statistics_cache_reads_total: CounterVec,

    /// Duration of successful statistics recomputations
    pub statistics_population_duration_seconds: Histogram,

    /// Failed statistics reads - labels: reason
    pub statistics_population_failures_total: CounterVec,

    /// Age of the statistics served by the last page request
    pub statistics_age_seconds: Gauge,
}

impl SiteStatsMetrics {
    /// Create and register all metrics with Prometheus.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            http_requests_total: register_counter_vec!(
                "sitestats_http_requests_total",
                "Total number of HTTP requests",
                &["method", "path", "status"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register http_requests_total: {}", e)))?,

            http_request_duration_seconds: register_histogram_vec!(
                "sitestats_http_request_duration_seconds",
                "HTTP request duration in seconds",
                &["method", "path"],
                HTTP_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register http_request_duration_seconds: {}", e)))?,

            statistics_cache_reads_total: register_counter_vec!(
                "sitestats_statistics_cache_reads_total",
                "Statistics cache reads by outcome",
                &["outcome"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register statistics_cache_reads_total: {}", e)))?,

            statistics_population_duration_seconds: register_histogram!(
                "sitestats_statistics_population_duration_seconds",
                "Duration of statistics recomputations in seconds",
                POPULATION_BUCKETS.to_vec()
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register statistics_population_duration_seconds: {}", e)))?,

            statistics_population_failures_total: register_counter_vec!(
                "sitestats_statistics_population_failures_total",
                "Statistics reads that failed, by reason",
                &["reason"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register statistics_population_failures_total: {}", e)))?,

            statistics_age_seconds: register_gauge!(
                "sitestats_statistics_age_seconds",
                "Age of the statistics served by the last page request"
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register statistics_age_seconds: {}", e)))?,
        })
    }

    /// Record an HTTP request.
    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }

    /// Record a statistics cache read.
    ///
    /// `duration_secs` is only observed for reads that recomputed the value.
    pub fn record_cache_read(&self, outcome: &str, populated: bool, duration_secs: f64, age_secs: f64) {
        self.statistics_cache_reads_total
            .with_label_values(&[outcome])
            .inc();
        if populated {
            self.statistics_population_duration_seconds.observe(duration_secs);
        }
        self.statistics_age_seconds.set(age_secs);
    }

    /// Record a failed statistics read.
    pub fn record_population_failure(&self, reason: &str) {
        self.statistics_population_failures_total
            .with_label_values(&[reason])
            .inc();
    }
}

/// Handler for GET /metrics endpoint.
///
/// Returns Prometheus text format metrics.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::core::Collector;

    #[test]
    fn test_metrics_creation() -> Result<(), String> {
        // Force initialization
        let metrics = METRICS
            .as_ref()
            .map_err(|e| format!("Metrics init failed: {}", e.message))?;
        assert!(!metrics.http_requests_total.desc().is_empty());
        Ok(())
    }

    #[test]
    fn test_record_cache_read() -> Result<(), String> {
        let metrics = METRICS
            .as_ref()
            .map_err(|e| format!("Metrics init failed: {}", e.message))?;
        let before = metrics
            .statistics_cache_reads_total
            .with_label_values(&["populated"])
            .get();

        metrics.record_cache_read("populated", true, 0.25, 0.0);
        metrics.record_cache_read("hit", false, 0.0, 120.0);

        let after = metrics
            .statistics_cache_reads_total
            .with_label_values(&["populated"])
            .get();
        assert!(after >= before + 1.0);
        Ok(())
    }

    #[test]
    fn test_record_population_failure() -> Result<(), String> {
        let metrics = METRICS
            .as_ref()
            .map_err(|e| format!("Metrics init failed: {}", e.message))?;
        metrics.record_population_failure("timeout");
        metrics.record_http_request("GET", "/statistics", 504, 30.0);
        Ok(())
    }
}

//! SiteStats Telemetry - Observability Infrastructure
//!
//! Provides structured logging and Prometheus metrics for the API layer.
//! All features work standalone without external collectors.

pub mod metrics;
pub mod middleware;
pub mod tracer;

pub use metrics::{metrics_handler, SiteStatsMetrics, METRICS};
pub use middleware::observability_middleware;
pub use tracer::{init_tracing, TelemetryConfig, DEFAULT_LOG_FILTER};

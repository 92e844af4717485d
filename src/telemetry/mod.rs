//! Logging, request spans and request metrics.
//!
//! - [`logging`]: global `tracing` subscriber and OTLP trace export
//! - [`span`]: per-request span tagged with service identity
//! - [`metrics`]: in-process request metrics registry
//! - [`process`]: CPU, memory and file descriptor gauges
//! - [`layer`]: tower middleware feeding the registry

pub mod layer;
pub mod logging;
pub mod metrics;
pub mod process;
pub mod span;

use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::header::CONTENT_TYPE,
    response::IntoResponse,
    routing::get,
};

pub use layer::{METRICS_PATH, MetricsLayer, MetricsService, UNMATCHED_ROUTE};
pub use logging::{
    DEFAULT_LOG_FILTER, TelemetryError, TelemetryGuard, build_tracer_provider, init_subscriber,
};
pub use metrics::{DURATION_BUCKETS, HttpMetrics, PROMETHEUS_CONTENT_TYPE, RequestLabels};
pub use process::ProcessStats;
pub use span::ServiceSpan;

/// Serves the registry in Prometheus text format.
pub async fn render_metrics(State(metrics): State<Arc<HttpMetrics>>) -> impl IntoResponse {
    ([(CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], metrics.render())
}

/// Router exposing [`METRICS_PATH`], with its own state already applied.
pub fn metrics_router<S>(metrics: Arc<HttpMetrics>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route(METRICS_PATH, get(render_metrics))
        .with_state(metrics)
}

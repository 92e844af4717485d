//! Router assembly.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, put},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{AppState, create_todo, delete_todo, health_check, list_todos, update_todo};
use crate::config::TelemetryConfig;
use crate::telemetry::{HttpMetrics, MetricsLayer, ServiceSpan, metrics_router};

/// Todo and health routes, state not yet applied.
pub fn todo_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/todos", get(list_todos).post(create_todo))
        .route("/todos/{id}", put(update_todo).delete(delete_todo))
}

/// Builds the complete application.
///
/// Layers, innermost first: request metrics (when enabled), request spans,
/// then permissive CORS.
pub fn build_router(state: AppState, telemetry: &TelemetryConfig) -> Router {
    let mut application = todo_routes();

    if telemetry.metrics_enabled {
        let metrics = Arc::new(HttpMetrics::new());
        application = application
            .merge(metrics_router(Arc::clone(&metrics)))
            .layer(MetricsLayer::new(metrics));
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    application
        .layer(TraceLayer::new_for_http().make_span_with(ServiceSpan::from_config(telemetry)))
        .layer(cors)
        .with_state(state)
}

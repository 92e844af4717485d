//! Request span construction for `TraceLayer`.

use axum::extract::MatchedPath;
use axum::http::Request;
use tower_http::trace::MakeSpan;
use tracing::Span;

use crate::config::TelemetryConfig;

/// Builds one `request` span per HTTP request, tagged with the service
/// identity from [`TelemetryConfig`].
#[derive(Debug, Clone)]
pub struct ServiceSpan {
    service_name: String,
    environment: String,
}

impl ServiceSpan {
    /// Creates a span maker with explicit identity fields.
    #[must_use]
    pub fn new(service_name: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            environment: environment.into(),
        }
    }

    /// Creates a span maker from the telemetry settings.
    #[must_use]
    pub fn from_config(config: &TelemetryConfig) -> Self {
        Self::new(config.service_name.clone(), config.environment.clone())
    }
}

impl<B> MakeSpan<B> for ServiceSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        let route = request
            .extensions()
            .get::<MatchedPath>()
            .map_or_else(|| request.uri().path(), MatchedPath::as_str);

        tracing::info_span!(
            "request",
            method = %request.method(),
            uri = %request.uri(),
            route = %route,
            service.name = %self.service_name,
            deployment.environment = %self.environment,
        )
    }
}

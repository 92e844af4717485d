//! Tower middleware recording request duration and count.
//!
//! The layer wraps every route. It reads the matched route template from
//! the request extensions so that `/todos/{id}` is one series regardless of
//! the concrete id. Requests that match no route share the single
//! [`UNMATCHED_ROUTE`] label, so the number of series stays bounded by the
//! route table. Requests to the metrics endpoint itself are not recorded.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::{Request, Response};
use tower::{Layer, Service};

use super::metrics::{HttpMetrics, RequestLabels};

/// Path of the metrics endpoint, excluded from recording.
pub const METRICS_PATH: &str = "/metrics";

/// `route` label for requests that match no route.
pub const UNMATCHED_ROUTE: &str = "<unmatched>";

// =============================================================================
// Metrics Layer
// =============================================================================

/// Tower layer producing [`MetricsService`].
///
/// # Example
///
/// ```ignore
/// let metrics = Arc::new(HttpMetrics::new());
/// let application = Router::new()
///     .route("/todos", get(list_todos))
///     .layer(MetricsLayer::new(Arc::clone(&metrics)));
/// ```
#[derive(Debug, Clone)]
pub struct MetricsLayer {
    metrics: Arc<HttpMetrics>,
}

impl MetricsLayer {
    /// Creates a layer writing into `metrics`.
    #[must_use]
    pub const fn new(metrics: Arc<HttpMetrics>) -> Self {
        Self { metrics }
    }
}

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsService {
            inner,
            metrics: Arc::clone(&self.metrics),
        }
    }
}

// =============================================================================
// Metrics Service
// =============================================================================

/// Service that times the inner service and records the outcome.
#[derive(Debug, Clone)]
pub struct MetricsService<S> {
    inner: S,
    metrics: Arc<HttpMetrics>,
}

impl<S> Service<Request<Body>> for MetricsService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, context: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(context)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        // The ready service is the one in `self`; leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        if request.uri().path() == METRICS_PATH {
            return Box::pin(inner.call(request));
        }

        let method = request.method().to_string();
        let route = request
            .extensions()
            .get::<MatchedPath>()
            .map_or(UNMATCHED_ROUTE, MatchedPath::as_str)
            .to_string();
        let metrics = Arc::clone(&self.metrics);

        Box::pin(async move {
            let started = Instant::now();
            let response = inner.call(request).await?;
            metrics.observe(
                RequestLabels::new(method, route, response.status().as_u16()),
                started.elapsed(),
            );
            Ok(response)
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

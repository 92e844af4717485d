//! Global tracing subscriber and optional OTLP trace export.

use opentelemetry::KeyValue;
use opentelemetry::trace::{TraceError, TracerProvider as _};
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::runtime;
use opentelemetry_sdk::trace::TracerProvider;
use thiserror::Error;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LogFormat, TelemetryConfig};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "todo_service=debug,tower_http=debug";

/// Instrumentation scope name of exported spans.
const TRACER_NAME: &str = env!("CARGO_PKG_NAME");

/// Errors raised while setting up telemetry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The OTLP exporter could not be built.
    #[error("Failed to build OTLP exporter: {0}")]
    Exporter(#[from] TraceError),
}

/// Keeps the tracer provider alive until shutdown.
#[derive(Debug, Default)]
#[must_use = "dropping the guard without shutdown loses buffered spans"]
pub struct TelemetryGuard {
    provider: Option<TracerProvider>,
}

impl TelemetryGuard {
    /// Whether spans are exported over OTLP.
    pub const fn is_exporting(&self) -> bool {
        self.provider.is_some()
    }

    /// Flushes buffered spans and stops the exporter.
    pub async fn shutdown(self) {
        let Some(provider) = self.provider else {
            return;
        };

        // Provider shutdown blocks on the batch processor.
        match tokio::task::spawn_blocking(move || provider.shutdown()).await {
            Ok(Ok(())) => tracing::debug!("Trace exporter flushed"),
            Ok(Err(error)) => tracing::warn!(%error, "Failed to flush trace exporter"),
            Err(error) => tracing::warn!(%error, "Trace exporter shutdown task failed"),
        }
    }
}

/// Builds a batching tracer provider exporting to `endpoint` over OTLP/HTTP.
///
/// `endpoint` is used as-is, so it must include the `/v1/traces` path.
/// Must be called inside a tokio runtime.
///
/// # Errors
///
/// Returns `TelemetryError::Exporter` if the exporter cannot be built.
pub fn build_tracer_provider(
    endpoint: &str,
    service_name: &str,
    environment: &str,
) -> Result<TracerProvider, TelemetryError> {
    let exporter = SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .build()?;

    let resource = Resource::new(vec![
        KeyValue::new("service.name", service_name.to_string()),
        KeyValue::new("deployment.environment", environment.to_string()),
    ]);

    Ok(TracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .with_resource(resource)
        .build())
}

/// Installs the global subscriber.
///
/// `RUST_LOG` overrides [`DEFAULT_LOG_FILTER`]. When `otlp_endpoint` is set,
/// spans are also exported there. Calling this twice leaves the first
/// subscriber in place.
///
/// # Errors
///
/// Returns `TelemetryError` if the OTLP exporter cannot be built.
pub fn init_subscriber(config: &TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let provider = config
        .otlp_endpoint
        .as_deref()
        .map(|endpoint| build_tracer_provider(endpoint, &config.service_name, &config.environment))
        .transpose()?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let otel_layer = provider.as_ref().map(|provider| {
        tracing_opentelemetry::layer().with_tracer(provider.tracer(TRACER_NAME))
    });
    let registry = tracing_subscriber::registry().with(filter).with(otel_layer);

    let result = match config.log_format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .try_init(),
    };

    if let Err(error) = result {
        eprintln!("Warning: tracing subscriber already installed ({error})");
    }

    Ok(TelemetryGuard { provider })
}

//! Todo Service
//!
//! HTTP backend for a todo list.
//!
//! # Environment Variables
//!
//! - `STORAGE_MODE`: `in_memory` (default) | `postgres` | `redis`
//! - `DATABASE_URL`: `PostgreSQL` connection URL (required when `STORAGE_MODE=postgres`)
//! - `REDIS_URL`: Redis connection URL (required when `STORAGE_MODE=redis`)
//! - `RUST_LOG`: Logging level (e.g., `debug`, `info`, `todo_service=debug`)
//! - `LOG_FORMAT`: `pretty` (default) | `json`
//! - `HOST`: Server host address (default: `0.0.0.0`)
//! - `PORT`: Server port (default: `5000`)
//! - `WORKER_THREADS`: Number of tokio worker threads (default: logical CPU count)
//! - `SERVICE_NAME`, `DEPLOYMENT_ENVIRONMENT`: identity on request spans
//! - `METRICS_ENABLED`: Expose `/metrics` (default: `true`)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP/HTTP trace endpoint (unset: no export)

use tokio::net::TcpListener;
use tokio::signal;

use todo_service::api::{AppState, build_router};
use todo_service::config::{
    ServerConfig, TelemetryConfig, max_worker_threads, parse_worker_threads,
};
use todo_service::infrastructure::RepositoryFactory;
use todo_service::telemetry::init_subscriber;

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() {
    dotenvy::dotenv().ok();

    let raw = std::env::var("WORKER_THREADS").ok();
    let result = parse_worker_threads(raw.as_deref(), max_worker_threads());
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();

    if let Some(threads) = result.threads {
        builder.worker_threads(threads);
        if !result.warning_emitted {
            eprintln!("Tokio worker_threads set to: {threads}");
        }
    } else if !result.warning_emitted {
        eprintln!("Tokio worker_threads: using default (logical CPU count)");
    }

    let runtime = match builder.build() {
        Ok(runtime) => runtime,
        Err(error) => {
            eprintln!("Failed to create tokio runtime: {error}");
            std::process::exit(1);
        }
    };
    runtime.block_on(async_main());
}

async fn async_main() {
    let telemetry = match TelemetryConfig::from_env() {
        Ok(telemetry) => telemetry,
        Err(error) => {
            eprintln!("Configuration error: {error}");
            std::process::exit(1);
        }
    };

    let telemetry_guard = match init_subscriber(&telemetry) {
        Ok(guard) => guard,
        Err(error) => {
            eprintln!("Telemetry error: {error}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        service.name = %telemetry.service_name,
        deployment.environment = %telemetry.environment,
        metrics_enabled = telemetry.metrics_enabled,
        trace_export = telemetry_guard.is_exporting(),
        "Starting todo service"
    );

    let server = match ServerConfig::from_env() {
        Ok(server) => server,
        Err(error) => {
            tracing::error!("Configuration error: {}", error);
            std::process::exit(1);
        }
    };

    let factory = match RepositoryFactory::from_env() {
        Ok(factory) => factory,
        Err(error) => {
            tracing::error!("Configuration error: {}", error);
            std::process::exit(1);
        }
    };

    tracing::info!(
        storage_mode = ?factory.config().storage_mode,
        "Repository configuration loaded"
    );

    let todo_repository = match factory.create().await {
        Ok(repository) => {
            tracing::info!("Repository initialized successfully");
            repository
        }
        Err(error) => {
            tracing::error!("Failed to initialize repository: {}", error);
            std::process::exit(1);
        }
    };

    let application = build_router(AppState::new(todo_repository), &telemetry);

    let address = match server.socket_address() {
        Ok(address) => address,
        Err(error) => {
            tracing::error!(%error, "Invalid server address");
            std::process::exit(1);
        }
    };

    let listener = match TcpListener::bind(address).await {
        Ok(listener) => listener,
        Err(error) => {
            tracing::error!(%error, "Failed to bind to address {}", address);
            std::process::exit(1);
        }
    };

    match listener.local_addr() {
        Ok(address) => tracing::info!("Listening on {}", address),
        Err(error) => tracing::warn!(%error, "Could not determine local address"),
    }

    let served = axum::serve(listener, application)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    if let Err(error) = &served {
        tracing::error!(%error, "Server error");
    }

    telemetry_guard.shutdown().await;

    if served.is_err() {
        std::process::exit(1);
    }

    tracing::info!("Server shutdown complete");
}

/// Completes on SIGINT, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::warn!(%error, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::warn!(%error, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}

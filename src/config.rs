//! Process configuration read from the environment.
//!
//! # Environment Variables
//!
//! - `HOST`: Server host address (default: `0.0.0.0`)
//! - `PORT`: Server port (default: `5000`)
//! - `WORKER_THREADS`: Number of tokio worker threads (default: logical CPU count)
//! - `SERVICE_NAME`: `service.name` attached to request spans (default: `todo-backend`)
//! - `DEPLOYMENT_ENVIRONMENT`: `deployment.environment` tag (default: `development`)
//! - `METRICS_ENABLED`: Mount `/metrics` and the metrics middleware (default: `true`)
//! - `LOG_FORMAT`: `pretty` (default) | `json`
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP/HTTP trace endpoint, e.g.
//!   `http://jaeger:4318/v1/traces` (unset: no trace export)
//!
//! Storage selection (`STORAGE_MODE`, `DATABASE_URL`, `REDIS_URL`) is read by
//! [`RepositoryConfig`](crate::infrastructure::RepositoryConfig).

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use thiserror::Error;

/// Default listen port.
pub const DEFAULT_PORT: u16 = 5000;

/// Default `service.name`.
pub const DEFAULT_SERVICE_NAME: &str = "todo-backend";

/// Default `deployment.environment`.
pub const DEFAULT_ENVIRONMENT: &str = "development";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while reading configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// Invalid storage mode value.
    #[error("Invalid storage mode: '{0}'. Expected 'in_memory', 'postgres' or 'redis'")]
    InvalidStorageMode(String),

    /// Missing `DATABASE_URL` when storage mode is Postgres.
    #[error("DATABASE_URL environment variable is required when STORAGE_MODE=postgres")]
    MissingDatabaseUrl,

    /// Missing `REDIS_URL` when storage mode is Redis.
    #[error("REDIS_URL environment variable is required when STORAGE_MODE=redis")]
    MissingRedisUrl,

    /// Host and port do not form a socket address.
    #[error("Invalid server address: '{0}'")]
    InvalidAddress(String),

    /// `PORT` is not a valid port number.
    #[error("Invalid port: '{0}'")]
    InvalidPort(String),

    /// A boolean flag has an unrecognized value.
    #[error("Invalid boolean for {name}: '{value}'. Expected true/false, 1/0 or yes/no")]
    InvalidBoolean { name: &'static str, value: String },

    /// Invalid log format value.
    #[error("Invalid log format: '{0}'. Expected 'pretty' or 'json'")]
    InvalidLogFormat(String),
}

// =============================================================================
// Environment Helpers
// =============================================================================

/// Reads an environment variable, treating empty/whitespace-only as unset.
pub(crate) fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Parses a boolean flag.
fn parse_flag(name: &'static str, value: &str) -> Result<bool, ConfigurationError> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigurationError::InvalidBoolean {
            name,
            value: value.to_string(),
        }),
    }
}

// =============================================================================
// Server Configuration
// =============================================================================

/// Listen address of the HTTP server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host address.
    pub host: String,
    /// Port number.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    /// Reads `HOST` and `PORT`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::InvalidPort` if `PORT` is not a `u16`.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        let defaults = Self::default();
        let host = non_empty_var("HOST").unwrap_or(defaults.host);
        let port = match non_empty_var("PORT") {
            Some(value) => value
                .parse()
                .map_err(|_| ConfigurationError::InvalidPort(value))?,
            None => defaults.port,
        };
        Ok(Self { host, port })
    }

    /// Resolves the socket address to bind.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::InvalidAddress` if the host is not an IP address.
    pub fn socket_address(&self) -> Result<SocketAddr, ConfigurationError> {
        let address = format!("{}:{}", self.host, self.port);
        address
            .parse()
            .map_err(|_| ConfigurationError::InvalidAddress(address))
    }
}

// =============================================================================
// Telemetry Configuration
// =============================================================================

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable multi-field lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigurationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "pretty" | "text" | "plain" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(ConfigurationError::InvalidLogFormat(value.to_string())),
        }
    }
}

/// Settings for logging, request spans and metrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// `service.name` recorded on every request span.
    pub service_name: String,
    /// `deployment.environment` recorded on every request span.
    pub environment: String,
    /// Whether `/metrics` and the metrics middleware are mounted.
    pub metrics_enabled: bool,
    /// Log output format.
    pub log_format: LogFormat,
    /// Full URL spans are exported to over OTLP/HTTP, if any.
    pub otlp_endpoint: Option<String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            environment: DEFAULT_ENVIRONMENT.to_string(),
            metrics_enabled: true,
            log_format: LogFormat::default(),
            otlp_endpoint: None,
        }
    }
}

impl TelemetryConfig {
    /// Reads `SERVICE_NAME`, `DEPLOYMENT_ENVIRONMENT`, `METRICS_ENABLED`,
    /// `LOG_FORMAT` and `OTEL_EXPORTER_OTLP_ENDPOINT`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if `METRICS_ENABLED` or `LOG_FORMAT` is invalid.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        let defaults = Self::default();

        let metrics_enabled = match non_empty_var("METRICS_ENABLED") {
            Some(value) => parse_flag("METRICS_ENABLED", &value)?,
            None => defaults.metrics_enabled,
        };

        let log_format = match non_empty_var("LOG_FORMAT") {
            Some(value) => value.parse()?,
            None => defaults.log_format,
        };

        Ok(Self {
            service_name: non_empty_var("SERVICE_NAME").unwrap_or(defaults.service_name),
            environment: non_empty_var("DEPLOYMENT_ENVIRONMENT").unwrap_or(defaults.environment),
            metrics_enabled,
            log_format,
            otlp_endpoint: non_empty_var("OTEL_EXPORTER_OTLP_ENDPOINT"),
        })
    }
}

// =============================================================================
// Worker Threads
// =============================================================================

/// Result of parsing `WORKER_THREADS` environment variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerThreadsResult {
    /// Thread count to configure, `None` for the runtime default.
    pub threads: Option<usize>,
    /// Whether a warning was already printed for the value.
    pub warning_emitted: bool,
}

/// Interprets a raw `WORKER_THREADS` value.
///
/// Runs before the tracing subscriber exists, so warnings go to stderr.
#[must_use]
pub fn parse_worker_threads(raw: Option<&str>, max_threads: usize) -> WorkerThreadsResult {
    let default = WorkerThreadsResult {
        threads: None,
        warning_emitted: false,
    };

    let Some(trimmed) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return default;
    };

    match trimmed.parse::<usize>() {
        Ok(0) => {
            eprintln!("Warning: WORKER_THREADS=0 is invalid (must be > 0), using default");
            WorkerThreadsResult {
                threads: None,
                warning_emitted: true,
            }
        }
        Ok(n) if n > max_threads => {
            eprintln!(
                "Warning: WORKER_THREADS={n} exceeds recommended limit ({max_threads}), capping to {max_threads}"
            );
            WorkerThreadsResult {
                threads: Some(max_threads),
                warning_emitted: true,
            }
        }
        Ok(n) => WorkerThreadsResult {
            threads: Some(n),
            warning_emitted: false,
        },
        Err(error) => {
            eprintln!(
                "Warning: WORKER_THREADS='{trimmed}' is not a valid number ({error}), using default"
            );
            WorkerThreadsResult {
                threads: None,
                warning_emitted: true,
            }
        }
    }
}

/// Upper bound for `WORKER_THREADS`: four threads per available core.
#[must_use]
pub fn max_worker_threads() -> usize {
    std::thread::available_parallelism()
        .map(|parallelism| parallelism.get().saturating_mul(4))
        .unwrap_or(64)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(None, None, false)]
    #[case(Some(""), None, false)]
    #[case(Some("  "), None, false)]
    #[case(Some("4"), Some(4), false)]
    #[case(Some(" 8 "), Some(8), false)]
    #[case(Some("0"), None, true)]
    #[case(Some("many"), None, true)]
    #[case(Some("1000"), Some(16), true)]
    fn test_parse_worker_threads(
        #[case] raw: Option<&str>,
        #[case] threads: Option<usize>,
        #[case] warning_emitted: bool,
    ) {
        let result = parse_worker_threads(raw, 16);
        assert_eq!(result.threads, threads);
        assert_eq!(result.warning_emitted, warning_emitted);
    }

    #[rstest]
    #[case("true", true)]
    #[case("YES", true)]
    #[case("1", true)]
    #[case("off", false)]
    #[case("False", false)]
    fn test_parse_flag(#[case] value: &str, #[case] expected: bool) {
        assert_eq!(parse_flag("FLAG", value).unwrap(), expected);
    }

    #[rstest]
    fn test_parse_flag_invalid() {
        assert_eq!(
            parse_flag("METRICS_ENABLED", "maybe"),
            Err(ConfigurationError::InvalidBoolean {
                name: "METRICS_ENABLED",
                value: "maybe".to_string(),
            })
        );
    }

    #[rstest]
    #[case("json", LogFormat::Json)]
    #[case("JSON", LogFormat::Json)]
    #[case("pretty", LogFormat::Pretty)]
    #[case("text", LogFormat::Pretty)]
    fn test_log_format_from_str(#[case] value: &str, #[case] expected: LogFormat) {
        assert_eq!(value.parse::<LogFormat>().unwrap(), expected);
    }

    #[rstest]
    fn test_log_format_invalid() {
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[rstest]
    fn test_server_config_default_address() {
        let address = ServerConfig::default().socket_address().unwrap();
        assert_eq!(address.port(), 5000);
        assert!(address.ip().is_unspecified());
    }

    #[rstest]
    fn test_server_config_invalid_host() {
        let config = ServerConfig {
            host: "not a host".to_string(),
            port: 80,
        };
        assert!(matches!(
            config.socket_address(),
            Err(ConfigurationError::InvalidAddress(_))
        ));
    }

    #[rstest]
    fn test_telemetry_config_default() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "todo-backend");
        assert_eq!(config.environment, "development");
        assert!(config.metrics_enabled);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.otlp_endpoint, None);
    }
}

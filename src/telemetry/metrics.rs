//! Request metrics registry and Prometheus text rendering.
//!
//! Two series families are kept per `(method, route, status_code)`:
//!
//! - `http_request_duration_seconds` (histogram)
//! - `http_requests_total` (counter)
//!
//! plus the `process_start_time_seconds` gauge and the resource gauges of
//! [`ProcessStats`].

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use super::process::ProcessStats;

/// Histogram bucket upper bounds, in seconds.
pub const DURATION_BUCKETS: [f64; 9] = [0.1, 0.3, 0.5, 0.7, 1.0, 3.0, 5.0, 7.0, 10.0];

/// Content type of the Prometheus text exposition format.
pub const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

const DURATION_METRIC: &str = "http_request_duration_seconds";
const COUNTER_METRIC: &str = "http_requests_total";
const START_TIME_METRIC: &str = "process_start_time_seconds";

// =============================================================================
// Labels
// =============================================================================

/// Label set identifying one series.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestLabels {
    /// HTTP method (`GET`, `POST`, ...).
    pub method: String,
    /// Matched route template, e.g. `/todos/{id}`.
    pub route: String,
    /// Response status code.
    pub status_code: u16,
}

impl RequestLabels {
    /// Creates a label set.
    #[must_use]
    pub fn new(method: impl Into<String>, route: impl Into<String>, status_code: u16) -> Self {
        Self {
            method: method.into(),
            route: route.into(),
            status_code,
        }
    }

    fn render(&self) -> String {
        format!(
            r#"method="{}",route="{}",status_code="{}""#,
            escape_label_value(&self.method),
            escape_label_value(&self.route),
            self.status_code
        )
    }
}

/// Escapes `\`, `"` and newlines in a label value.
fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for character in value.chars() {
        match character {
            '\\' => escaped.push_str(r"\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str(r"\n"),
            other => escaped.push(other),
        }
    }
    escaped
}

// =============================================================================
// Series
// =============================================================================

/// Accumulated observations for one label set.
#[derive(Debug, Clone, Default, PartialEq)]
struct Series {
    /// Cumulative count per bucket of [`DURATION_BUCKETS`].
    buckets: [u64; DURATION_BUCKETS.len()],
    count: u64,
    sum_seconds: f64,
}

impl Series {
    fn observe(&mut self, seconds: f64) {
        for (bucket, upper_bound) in self.buckets.iter_mut().zip(DURATION_BUCKETS) {
            if seconds <= upper_bound {
                *bucket += 1;
            }
        }
        self.count += 1;
        self.sum_seconds += seconds;
    }
}

// =============================================================================
// Registry
// =============================================================================

/// In-process registry of HTTP request metrics.
///
/// Shared between the metrics middleware (writer) and the `/metrics`
/// handler (reader) through an `Arc`.
#[derive(Debug)]
pub struct HttpMetrics {
    series: Mutex<BTreeMap<RequestLabels, Series>>,
    start_time_seconds: f64,
}

impl Default for HttpMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpMetrics {
    /// Creates an empty registry stamped with the current time.
    #[must_use]
    pub fn new() -> Self {
        let now = chrono::Utc::now();
        #[allow(clippy::cast_precision_loss)]
        let start_time_seconds = now.timestamp_millis() as f64 / 1000.0;
        Self {
            series: Mutex::new(BTreeMap::new()),
            start_time_seconds,
        }
    }

    /// Records one finished request.
    pub fn observe(&self, labels: RequestLabels, duration: Duration) {
        let mut series = self.series.lock().unwrap_or_else(PoisonError::into_inner);
        series
            .entry(labels)
            .or_default()
            .observe(duration.as_secs_f64());
    }

    /// Number of requests recorded for a label set.
    #[must_use]
    pub fn request_count(&self, labels: &RequestLabels) -> u64 {
        let series = self.series.lock().unwrap_or_else(PoisonError::into_inner);
        series.get(labels).map_or(0, |entry| entry.count)
    }

    /// Renders every series in the Prometheus text exposition format.
    #[must_use]
    pub fn render(&self) -> String {
        let snapshot = self
            .series
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let mut output = String::new();

        // Writing to a String cannot fail.
        let _ = writeln!(
            output,
            "# HELP {DURATION_METRIC} Duration of HTTP requests in seconds"
        );
        let _ = writeln!(output, "# TYPE {DURATION_METRIC} histogram");
        for (labels, series) in &snapshot {
            let rendered = labels.render();
            for (count, upper_bound) in series.buckets.iter().zip(DURATION_BUCKETS) {
                let _ = writeln!(
                    output,
                    r#"{DURATION_METRIC}_bucket{{{rendered},le="{upper_bound}"}} {count}"#
                );
            }
            let _ = writeln!(
                output,
                r#"{DURATION_METRIC}_bucket{{{rendered},le="+Inf"}} {}"#,
                series.count
            );
            let _ = writeln!(
                output,
                "{DURATION_METRIC}_sum{{{rendered}}} {}",
                series.sum_seconds
            );
            let _ = writeln!(
                output,
                "{DURATION_METRIC}_count{{{rendered}}} {}",
                series.count
            );
        }

        let _ = writeln!(output, "# HELP {COUNTER_METRIC} Total number of HTTP requests");
        let _ = writeln!(output, "# TYPE {COUNTER_METRIC} counter");
        for (labels, series) in &snapshot {
            let _ = writeln!(output, "{COUNTER_METRIC}{{{}}} {}", labels.render(), series.count);
        }

        let _ = writeln!(
            output,
            "# HELP {START_TIME_METRIC} Start time of the process since unix epoch in seconds."
        );
        let _ = writeln!(output, "# TYPE {START_TIME_METRIC} gauge");
        let _ = writeln!(output, "{START_TIME_METRIC} {}", self.start_time_seconds);

        ProcessStats::collect().render_into(&mut output);

        output
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_observe_counts_per_label_set() {
        let metrics = HttpMetrics::new();
        let list = RequestLabels::new("GET", "/todos", 200);
        let create = RequestLabels::new("POST", "/todos", 201);

        metrics.observe(list.clone(), Duration::from_millis(5));
        metrics.observe(list.clone(), Duration::from_millis(7));
        metrics.observe(create.clone(), Duration::from_millis(9));

        assert_eq!(metrics.request_count(&list), 2);
        assert_eq!(metrics.request_count(&create), 1);
        assert_eq!(
            metrics.request_count(&RequestLabels::new("DELETE", "/todos/{id}", 200)),
            0
        );
    }

    #[rstest]
    fn test_buckets_are_cumulative() {
        let mut series = Series::default();
        series.observe(0.2);
        series.observe(4.0);
        series.observe(20.0);

        assert_eq!(series.buckets, [0, 1, 1, 1, 1, 1, 2, 2, 2]);
        assert_eq!(series.count, 3);
    }

    #[rstest]
    fn test_render_contains_all_families() {
        let metrics = HttpMetrics::new();
        metrics.observe(
            RequestLabels::new("PUT", "/todos/{id}", 404),
            Duration::from_millis(50),
        );

        let output = metrics.render();

        assert!(output.contains("# TYPE http_request_duration_seconds histogram"));
        assert!(output.contains(
            r#"http_request_duration_seconds_bucket{method="PUT",route="/todos/{id}",status_code="404",le="0.1"} 1"#
        ));
        assert!(output.contains(
            r#"http_request_duration_seconds_bucket{method="PUT",route="/todos/{id}",status_code="404",le="+Inf"} 1"#
        ));
        assert!(output.contains(
            r#"http_requests_total{method="PUT",route="/todos/{id}",status_code="404"} 1"#
        ));
        assert!(output.contains("# TYPE process_start_time_seconds gauge"));
    }

    #[cfg(target_os = "linux")]
    #[rstest]
    fn test_render_includes_process_gauges() {
        let output = HttpMetrics::new().render();

        assert!(output.contains("# TYPE process_cpu_seconds_total counter"));
        assert!(output.contains("# TYPE process_resident_memory_bytes gauge"));
        assert!(output.contains("# TYPE process_open_fds gauge"));
    }

    #[rstest]
    fn test_render_empty_registry_has_headers_only() {
        let output = HttpMetrics::new().render();
        assert!(output.contains("# TYPE http_requests_total counter"));
        assert!(!output.contains("http_requests_total{"));
    }

    #[rstest]
    #[case("/plain", "/plain")]
    #[case(r#"/quote"d"#, r#"/quote\"d"#)]
    #[case(r"/back\slash", r"/back\\slash")]
    #[case("/new\nline", r"/new\nline")]
    fn test_escape_label_value(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(escape_label_value(raw), expected);
    }
}

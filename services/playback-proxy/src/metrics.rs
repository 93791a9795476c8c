//! Prometheus metrics exposition
//!
//! Registers and exposes:
//!
//! - `playback_requests_total` (counter): labels `status`, `method`
//! - `playback_request_duration_seconds` (histogram): label `status`
//! - `playback_upstream_errors_total` (counter): label `error_type`
//! - `playback_token_refreshes_total` (counter): label `outcome`

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::time::Instant;

/// In-process counters backing the /health endpoint. The Prometheus recorder
/// is global and write-only; these atomics are what /health reads.
#[derive(Clone)]
pub struct ServiceMetrics {
    pub requests_total: Arc<AtomicU64>,
    pub errors_total: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl ServiceMetrics {
    pub fn new() -> Self {
        Self {
            requests_total: Arc::new(AtomicU64::new(0)),
            errors_total: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }
}

/// Install the Prometheus recorder and return a handle for rendering metrics.
///
/// Configures `playback_request_duration_seconds` with explicit buckets so it
/// renders as a Prometheus histogram (with `_bucket` lines for
/// `histogram_quantile()` queries) rather than the default summary. The range
/// covers fast local handlers up to the upstream timeout.
pub fn install_recorder() -> PrometheusHandle {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            metrics_exporter_prometheus::Matcher::Full(
                "playback_request_duration_seconds".to_string(),
            ),
            &[
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
            ],
        )
        .expect("failed to set histogram buckets")
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

/// Record a completed request with status code and HTTP method labels.
pub fn record_request(status: u16, method: &str, duration_secs: f64) {
    let status_str = status.to_string();
    metrics::counter!("playback_requests_total", "status" => status_str.clone(), "method" => method.to_string())
        .increment(1);
    metrics::histogram!("playback_request_duration_seconds", "status" => status_str)
        .record(duration_secs);
}

/// Record an upstream error, labeled with the probe or the failing route
/// (`probe`, `top_tracks`, `currently_playing`, `pause`, `play`).
pub fn record_upstream_error(error_type: &str) {
    metrics::counter!("playback_upstream_errors_total", "error_type" => error_type.to_string())
        .increment(1);
}

/// Record a token refresh attempt with its outcome (`success` / `failure`).
pub fn record_token_refresh(outcome: &str) {
    metrics::counter!("playback_token_refreshes_total", "outcome" => outcome.to_string())
        .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusRecorder;

    #[test]
    fn record_functions_do_not_panic_without_recorder() {
        // When no recorder is installed, metrics calls are no-ops.
        record_request(200, "GET", 0.05);
        record_upstream_error("transport");
        record_token_refresh("success");
    }

    /// Create an isolated recorder/handle pair for unit tests. Only one
    /// global recorder can exist per process, so tests use a local one.
    fn isolated_recorder() -> (PrometheusRecorder, PrometheusHandle) {
        let recorder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                metrics_exporter_prometheus::Matcher::Full(
                    "playback_request_duration_seconds".to_string(),
                ),
                &[
                    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
                ],
            )
            .expect("failed to set histogram buckets")
            .build_recorder();
        let handle = recorder.handle();
        (recorder, handle)
    }

    #[test]
    fn record_request_increments_counter_and_histogram() {
        let (recorder, handle) = isolated_recorder();
        let _guard = metrics::set_default_local_recorder(&recorder);

        record_request(200, "GET", 0.042);
        record_request(500, "GET", 1.5);

        let output = handle.render();
        assert!(
            output.contains("playback_requests_total"),
            "rendered output must contain playback_requests_total"
        );
        assert!(output.contains("status=\"200\""));
        assert!(output.contains("status=\"500\""));
        assert!(output.contains("method=\"GET\""));
        assert!(
            output.contains("playback_request_duration_seconds_bucket"),
            "histogram must render _bucket lines"
        );
    }

    #[test]
    fn record_token_refresh_carries_outcome_label() {
        let (recorder, handle) = isolated_recorder();
        let _guard = metrics::set_default_local_recorder(&recorder);

        record_token_refresh("success");
        record_token_refresh("failure");

        let output = handle.render();
        assert!(output.contains("playback_token_refreshes_total"));
        assert!(output.contains("outcome=\"success\""));
        assert!(output.contains("outcome=\"failure\""));
    }

    #[test]
    fn record_upstream_error_carries_error_type_label() {
        let (recorder, handle) = isolated_recorder();
        let _guard = metrics::set_default_local_recorder(&recorder);

        record_upstream_error("probe");
        record_upstream_error("status");

        let output = handle.render();
        assert!(output.contains("playback_upstream_errors_total"));
        assert!(output.contains("error_type=\"probe\""));
        assert!(output.contains("error_type=\"status\""));
    }
}

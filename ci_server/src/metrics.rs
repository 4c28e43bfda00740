//! Prometheus metrics for controller observability.

use metrics::{counter, histogram};

use ci_flow::EntryPoint;

/// Initialize metrics exporter (Prometheus).
pub fn init_metrics() {
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    if let Err(e) = builder.install() {
        tracing::warn!("Failed to install Prometheus exporter: {}", e);
    }
}

/// Record an event delivered to an entry point.
pub fn event_received(entry: EntryPoint) {
    counter!("flow_events_received_total", "entry" => entry.as_str()).increment(1);
}

/// Record how an invocation ended.
pub fn outcome(entry: EntryPoint, outcome: &str) {
    counter!("flow_outcomes_total", "entry" => entry.as_str(), "outcome" => outcome.to_string())
        .increment(1);
}

/// Record a build started by the controller.
pub fn build_started(kind: &str) {
    counter!("flow_builds_started_total", "kind" => kind.to_string()).increment(1);
}

/// Record a status comment posted on a pull request.
pub fn comment_posted(build_status: &str) {
    counter!("flow_comments_posted_total", "status" => build_status.to_string()).increment(1);
}

/// Record a failed invocation.
pub fn invocation_failed(entry: EntryPoint, reason: &str) {
    counter!("flow_invocation_errors_total", "entry" => entry.as_str(), "reason" => reason.to_string())
        .increment(1);
}

/// Record invocation duration.
pub fn invocation_duration(entry: EntryPoint, duration_ms: u64) {
    histogram!("flow_invocation_duration_ms", "entry" => entry.as_str()).record(duration_ms as f64);
}

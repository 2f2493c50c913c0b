//! Metrics collection and exposition.
//!
//! # Metrics
//! - `health_checker_runs_total` (counter): runs by status
//! - `health_checker_run_duration_seconds` (histogram): run latency
//! - `health_checker_check_outcomes_total` (counter): per check, kind, ok
//! - `health_checker_coalesced_requests_total` (counter): callers attached to an in-flight run
//! - `health_checker_responses_total` (counter): HTTP responses by status
//! - `health_checker_connection_errors_total` (counter): connections that failed to serve/write

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Duration;

use crate::health::{CheckOutcome, HealthStatus};

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_run(status: HealthStatus, elapsed: Duration) {
    counter!("health_checker_runs_total", "status" => status.as_str()).increment(1);
    histogram!("health_checker_run_duration_seconds").record(elapsed.as_secs_f64());
}

pub fn record_check(outcome: &CheckOutcome) {
    counter!(
        "health_checker_check_outcomes_total",
        "check" => outcome.check_name.clone(),
        "kind" => outcome.kind.as_str(),
        "ok" => if outcome.ok() { "true" } else { "false" }
    )
    .increment(1);
}

pub fn record_coalesced() {
    counter!("health_checker_coalesced_requests_total").increment(1);
}

pub fn record_response(status: u16) {
    counter!("health_checker_responses_total", "status" => status.to_string()).increment(1);
}

pub fn record_connection_error() {
    counter!("health_checker_connection_errors_total").increment(1);
}

//! Mapping of run results to HTTP responses.
//!
//! # Responsibilities
//! - Healthy → 200 "OK", Unhealthy → 504 "At least one health check failed"
//! - Log every outcome (failures at warn, successes at info)
//!
//! # Design Decisions
//! - Body text is part of the contract; monitors may match on it
//! - Logging has no effect on the response

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::health::{HealthStatus, RunResult};
use crate::observability::metrics;

pub const HEALTHY_BODY: &str = "OK";
pub const UNHEALTHY_BODY: &str = "At least one health check failed";

pub fn status_code(status: HealthStatus) -> StatusCode {
    match status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::GATEWAY_TIMEOUT,
    }
}

pub fn body(status: HealthStatus) -> &'static str {
    match status {
        HealthStatus::Healthy => HEALTHY_BODY,
        HealthStatus::Unhealthy => UNHEALTHY_BODY,
    }
}

/// Log per-check outcomes and the verdict for one run.
pub fn log_outcomes(result: &RunResult) {
    for outcome in &result.outcomes {
        match &outcome.error {
            None => tracing::info!(
                run_id = %result.run_id,
                check = %outcome.check_name,
                kind = %outcome.kind,
                elapsed = ?outcome.elapsed,
                "Health check successful"
            ),
            Some(error) => tracing::warn!(
                run_id = %result.run_id,
                check = %outcome.check_name,
                kind = %outcome.kind,
                elapsed = ?outcome.elapsed,
                error = %error,
                "Health check FAILED"
            ),
        }
    }

    let code = status_code(result.status);
    match result.status {
        HealthStatus::Healthy => tracing::info!(
            run_id = %result.run_id,
            "All health checks passed. Returning HTTP {} response.",
            code.as_u16()
        ),
        HealthStatus::Unhealthy => tracing::info!(
            run_id = %result.run_id,
            failed = result.failures().count(),
            "At least one health check failed. Returning HTTP {} response.",
            code.as_u16()
        ),
    }
}

/// Build the HTTP response for a finished run.
pub fn from_run(result: &RunResult) -> Response {
    let code = status_code(result.status);
    metrics::record_response(code.as_u16());
    (code, body(result.status)).into_response()
}

//! Concurrent execution of the configured check set.
//!
//! # Responsibilities
//! - Spawn one task per check and wait for every one of them
//! - Convert panicking check tasks into failures for that check only
//! - Aggregate outcomes into a single healthy/unhealthy verdict

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;
use uuid::Uuid;

use crate::checks::{Check, CheckFailure, CheckKind};
use crate::observability::metrics;

/// Aggregate verdict of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Unhealthy => "unhealthy",
        }
    }
}

/// Result of one check within one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub check_name: String,
    pub kind: CheckKind,
    pub elapsed: Duration,
    pub error: Option<CheckFailure>,
}

impl CheckOutcome {
    pub fn ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Result of executing every configured check once.
///
/// Outcomes are stored in check order; `status` is `Unhealthy` iff any outcome failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    pub run_id: Uuid,
    pub status: HealthStatus,
    pub outcomes: Vec<CheckOutcome>,
    pub elapsed: Duration,
}

impl RunResult {
    pub fn new(run_id: Uuid, outcomes: Vec<CheckOutcome>, elapsed: Duration) -> Self {
        let status = if outcomes.iter().all(CheckOutcome::ok) {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        };
        Self {
            run_id,
            status,
            outcomes,
            elapsed,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }

    pub fn failures(&self) -> impl Iterator<Item = &CheckOutcome> {
        self.outcomes.iter().filter(|outcome| !outcome.ok())
    }
}

/// Fallback timeouts for checks that do not configure their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckTimeouts {
    /// TCP and HTTP checks.
    pub default: Duration,
    /// Script checks.
    pub script: Duration,
}

impl CheckTimeouts {
    pub fn for_check(&self, check: &Check) -> Duration {
        check.timeout().unwrap_or(match check.kind() {
            CheckKind::Script => self.script,
            CheckKind::Tcp | CheckKind::Http => self.default,
        })
    }
}

impl Default for CheckTimeouts {
    fn default() -> Self {
        Self {
            default: Duration::from_secs(5),
            script: Duration::from_secs(5),
        }
    }
}

/// Runs every check concurrently and aggregates the outcomes.
#[derive(Debug)]
pub struct Runner {
    checks: Arc<[Check]>,
    timeouts: CheckTimeouts,
    runs_started: AtomicU64,
}

impl Runner {
    pub fn new(checks: Vec<Check>, timeouts: CheckTimeouts) -> Self {
        Self {
            checks: checks.into(),
            timeouts,
            runs_started: AtomicU64::new(0),
        }
    }

    pub fn checks(&self) -> &[Check] {
        &self.checks
    }

    /// Number of runs started since construction.
    pub fn runs_started(&self) -> u64 {
        self.runs_started.load(Ordering::SeqCst)
    }

    /// Execute all checks and wait for every outcome.
    ///
    /// There is no early exit on the first failure and no global deadline;
    /// each check is bounded only by its own timeout.
    pub async fn run(&self) -> RunResult {
        let run_id = Uuid::new_v4();
        self.runs_started.fetch_add(1, Ordering::SeqCst);
        let started = Instant::now();

        tracing::debug!(run_id = %run_id, checks = self.checks.len(), "Starting health check run");

        let handles: Vec<_> = (0..self.checks.len())
            .map(|index| {
                let checks = Arc::clone(&self.checks);
                let deadline = started + self.timeouts.for_check(&checks[index]);
                tokio::spawn(async move {
                    let check_started = Instant::now();
                    let result = checks[index].execute(deadline).await;
                    (result, check_started.elapsed())
                })
            })
            .collect();

        let outcomes = collect(&self.checks, handles).await;
        let result = RunResult::new(run_id, outcomes, started.elapsed());
        metrics::record_run(result.status, result.elapsed);
        tracing::debug!(
            run_id = %run_id,
            status = result.status.as_str(),
            elapsed = ?result.elapsed,
            "Health check run finished"
        );
        result
    }

    /// A result marking every check as crashed, for runs whose task itself died.
    pub fn crashed(&self, reason: &str) -> RunResult {
        let outcomes = self
            .checks
            .iter()
            .map(|check| CheckOutcome {
                check_name: check.name().to_string(),
                kind: check.kind(),
                elapsed: Duration::ZERO,
                error: Some(CheckFailure::Crashed {
                    reason: reason.to_string(),
                }),
            })
            .collect();
        RunResult::new(Uuid::new_v4(), outcomes, Duration::ZERO)
    }
}

/// What a check task hands back: its result and how long it took.
type Execution = (Result<(), CheckFailure>, Duration);

/// Await every check task in check order, one outcome per check.
async fn collect(checks: &[Check], handles: Vec<JoinHandle<Execution>>) -> Vec<CheckOutcome> {
    let mut outcomes = Vec::with_capacity(handles.len());
    for (check, handle) in checks.iter().zip(handles) {
        let outcome = settle(check, handle.await);
        metrics::record_check(&outcome);
        outcomes.push(outcome);
    }
    outcomes
}

fn settle(check: &Check, joined: Result<Execution, JoinError>) -> CheckOutcome {
    let (error, elapsed) = match joined {
        Ok((result, elapsed)) => (result.err(), elapsed),
        Err(e) => (
            Some(CheckFailure::Crashed {
                reason: describe_join_error(e),
            }),
            Duration::ZERO,
        ),
    };
    CheckOutcome {
        check_name: check.name().to_string(),
        kind: check.kind(),
        elapsed,
        error,
    }
}

/// Human-readable reason for a task that did not complete.
pub(crate) fn describe_join_error(err: JoinError) -> String {
    if !err.is_panic() {
        return "task cancelled".to_string();
    }
    let payload = err.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked".to_string()
    }
}

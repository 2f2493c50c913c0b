//! Failure taxonomy for check execution.

use std::time::Duration;
use thiserror::Error;

/// Why a single check did not pass.
///
/// Failures are always recovered into a [`CheckOutcome`](crate::health::CheckOutcome);
/// they never abort a run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckFailure {
    /// TCP connect, HTTP request or body read failed (including timeouts).
    #[error("connection failed: {reason}")]
    ConnectFailed { reason: String },

    /// HTTP response status outside the accepted set.
    #[error("unexpected status {got}, wanted one of {wanted:?}")]
    UnexpectedStatus { got: u16, wanted: Vec<u16> },

    /// HTTP response body did not contain the expected substring.
    #[error("response body does not contain {wanted:?} (body starts with {got_prefix:?})")]
    BodyMismatch { wanted: String, got_prefix: String },

    /// Script did not exit before its deadline and was killed.
    #[error("timed out after {elapsed:?}")]
    TimedOut { elapsed: Duration },

    /// Script exited unsuccessfully. `None` means it was terminated by a signal.
    #[error("exited with {}", describe_exit(.code))]
    NonZeroExit { code: Option<i32> },

    /// Script could not be started.
    #[error("failed to start: {reason}")]
    SpawnFailed { reason: String },

    /// The task executing the check panicked or was cancelled.
    #[error("check crashed: {reason}")]
    Crashed { reason: String },
}

impl CheckFailure {
    pub(crate) fn connect<E: std::error::Error + ?Sized>(err: &E) -> Self {
        CheckFailure::ConnectFailed {
            reason: error_chain(err),
        }
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {code}"),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

/// Render an error and its sources as `outer: inner: root`.
///
/// hyper and hyper-util wrap the interesting cause (refused, reset, dns) a few
/// levels down, so the top-level message alone is rarely useful in logs.
pub(crate) fn error_chain<E: std::error::Error + ?Sized>(err: &E) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !rendered.ends_with(&cause_text) {
            rendered.push_str(": ");
            rendered.push_str(&cause_text);
        }
        source = cause.source();
    }
    rendered
}

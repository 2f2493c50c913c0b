//! Health check definitions.
//!
//! # Data Flow
//! ```text
//! config file / CLI flags
//!     → TcpCheck | HttpCheck | ScriptCheck (deserialized)
//!     → Check::validate (once, at startup)
//!     → Check::execute (once per run, concurrently)
//!     → Ok(()) | CheckFailure
//! ```
//!
//! # Design Decisions
//! - Checks are plain data; executing one never mutates it
//! - Each execution builds its own connections/processes, nothing is shared
//! - The effective timeout is the check's own timeout capped by the deadline

pub mod error;
pub mod http;
pub mod script;
pub mod tcp;

use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::validation::ValidationError;

pub use error::CheckFailure;
pub use http::HttpCheck;
pub use script::ScriptCheck;
pub use tcp::TcpCheck;

/// The three supported probe types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckKind {
    Tcp,
    Http,
    Script,
}

impl CheckKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckKind::Tcp => "tcp",
            CheckKind::Http => "http",
            CheckKind::Script => "script",
        }
    }
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single configured probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check {
    Tcp(TcpCheck),
    Http(HttpCheck),
    Script(ScriptCheck),
}

impl Check {
    pub fn name(&self) -> &str {
        match self {
            Check::Tcp(check) => &check.name,
            Check::Http(check) => &check.name,
            Check::Script(check) => &check.name,
        }
    }

    pub fn kind(&self) -> CheckKind {
        match self {
            Check::Tcp(_) => CheckKind::Tcp,
            Check::Http(_) => CheckKind::Http,
            Check::Script(_) => CheckKind::Script,
        }
    }

    /// The check's own timeout, if it configures one.
    pub fn timeout(&self) -> Option<Duration> {
        match self {
            Check::Tcp(check) => check.timeout(),
            Check::Http(check) => check.timeout(),
            Check::Script(check) => check.timeout(),
        }
    }

    /// Reject checks missing a required field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Check::Tcp(check) => check.validate(),
            Check::Http(check) => check.validate(),
            Check::Script(check) => check.validate(),
        }
    }

    /// Execute the probe, bounded by `min(own timeout, deadline)`.
    pub async fn execute(&self, deadline: Instant) -> Result<(), CheckFailure> {
        match self {
            Check::Tcp(check) => check.execute(deadline).await,
            Check::Http(check) => check.execute(deadline).await,
            Check::Script(check) => check.execute(deadline).await,
        }
    }
}

impl From<TcpCheck> for Check {
    fn from(check: TcpCheck) -> Self {
        Check::Tcp(check)
    }
}

impl From<HttpCheck> for Check {
    fn from(check: HttpCheck) -> Self {
        Check::Http(check)
    }
}

impl From<ScriptCheck> for Check {
    fn from(check: ScriptCheck) -> Self {
        Check::Script(check)
    }
}

/// Time available to one execution.
pub(crate) fn budget(timeout: Option<Duration>, deadline: Instant) -> Duration {
    let remaining = deadline.saturating_duration_since(Instant::now());
    match timeout {
        Some(timeout) => timeout.min(remaining),
        None => remaining,
    }
}

pub(crate) fn require(
    kind: CheckKind,
    name: &str,
    field: &'static str,
    present: bool,
) -> Result<(), ValidationError> {
    if present {
        Ok(())
    } else {
        Err(ValidationError::MissingField {
            kind,
            name: name.to_string(),
            field,
        })
    }
}

/// A configured timeout of zero would fail the check on every run.
pub(crate) fn non_zero_timeout(
    kind: CheckKind,
    name: &str,
    timeout_ms: Option<u64>,
) -> Result<(), ValidationError> {
    match timeout_ms {
        Some(0) => Err(ValidationError::ZeroCheckTimeout {
            kind,
            name: name.to_string(),
        }),
        _ => Ok(()),
    }
}

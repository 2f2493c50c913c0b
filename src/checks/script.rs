//! External script probe.

use serde::{Deserialize, Serialize};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::{self, Instant};

use super::{budget, non_zero_timeout, require, CheckFailure, CheckKind};
use crate::config::validation::ValidationError;

/// Runs `command args...`; exit code 0 before the deadline is healthy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScriptCheck {
    pub name: String,
    pub command: String,
    pub args: Vec<String>,
    /// Per-check timeout in milliseconds (falls back to `timeouts.script_secs`).
    pub timeout_ms: Option<u64>,
}

impl ScriptCheck {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            ..Self::default()
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    /// Build a check from a single command line such as `"/usr/local/bin/check.sh 1234"`.
    ///
    /// The line is split on whitespace; the whole trimmed line becomes the name.
    pub fn from_command_line(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let command = parts.next()?;
        Some(Self::new(line.trim(), command).with_args(parts))
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require(CheckKind::Script, &self.name, "name", !self.name.is_empty())?;
        require(
            CheckKind::Script,
            &self.name,
            "command",
            !self.command.trim().is_empty(),
        )?;
        non_zero_timeout(CheckKind::Script, &self.name, self.timeout_ms)
    }

    pub async fn execute(&self, deadline: Instant) -> Result<(), CheckFailure> {
        let limit = budget(self.timeout(), deadline);
        tracing::info!(
            check = %self.name,
            command = %self.command,
            args = ?self.args,
            timeout = ?limit,
            "Executing script"
        );

        let started = Instant::now();
        let child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CheckFailure::SpawnFailed {
                reason: e.to_string(),
            })?;

        // On timeout the wait future is dropped, which drops (and kills) the child.
        let output = match time::timeout(limit, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(CheckFailure::SpawnFailed {
                    reason: format!("failed waiting for process: {e}"),
                })
            }
            Err(_) => {
                return Err(CheckFailure::TimedOut {
                    elapsed: started.elapsed(),
                })
            }
        };

        if output.status.success() {
            return Ok(());
        }

        tracing::warn!(
            check = %self.name,
            stdout = %String::from_utf8_lossy(&output.stdout).trim_end(),
            stderr = %String::from_utf8_lossy(&output.stderr).trim_end(),
            "Command output"
        );
        Err(CheckFailure::NonZeroExit {
            code: output.status.code(),
        })
    }
}

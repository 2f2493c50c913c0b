//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the health checker.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::checks::{Check, HttpCheck, ScriptCheck, TcpCheck};
use crate::health::CheckTimeouts;

/// Root configuration.
///
/// Unknown keys are rejected so that misspelled settings surface at startup
/// instead of being silently ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct HealthCheckerConfig {
    /// Listener configuration (bind address, coalescing).
    pub listener: ListenerConfig,

    /// Default timeouts for checks that do not set their own.
    pub timeouts: TimeoutConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,

    /// TCP reachability checks.
    pub tcp: Vec<TcpCheck>,

    /// HTTP status/body checks.
    pub http: Vec<HttpCheck>,

    /// External script checks.
    pub script: Vec<ScriptCheck>,
}

impl HealthCheckerConfig {
    /// All configured checks, in tcp → http → script order.
    pub fn checks(&self) -> Vec<Check> {
        self.tcp
            .iter()
            .cloned()
            .map(Check::from)
            .chain(self.http.iter().cloned().map(Check::from))
            .chain(self.script.iter().cloned().map(Check::from))
            .collect()
    }

    pub fn check_count(&self) -> usize {
        self.tcp.len() + self.http.len() + self.script.len()
    }

    pub fn check_timeouts(&self) -> CheckTimeouts {
        CheckTimeouts {
            default: Duration::from_millis(self.timeouts.check_ms),
            script: Duration::from_secs(self.timeouts.script_secs),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:5500").
    pub bind_address: String,

    /// Share one in-flight run between concurrent requests.
    pub singleflight: bool,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5500".to_string(),
            singleflight: false,
            max_connections: 1024,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimeoutConfig {
    /// Default TCP/HTTP check timeout in milliseconds.
    pub check_ms: u64,

    /// Default script timeout in seconds.
    pub script_secs: u64,

    /// How long shutdown waits for open connections to finish, in seconds.
    pub drain_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            check_ms: 5_000,
            script_secs: 5,
            drain_secs: 10,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines instead of human-readable text.
    pub json_logs: bool,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

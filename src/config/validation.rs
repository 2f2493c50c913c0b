//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Every check carries its required fields
//! - Addresses parse, timeouts are non-zero, log level is known
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: HealthCheckerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use std::str::FromStr;
use thiserror::Error;

use crate::checks::CheckKind;
use crate::config::schema::HealthCheckerConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{kind} check {name:?} is missing required field `{field}`")]
    MissingField {
        kind: CheckKind,
        name: String,
        field: &'static str,
    },

    #[error("The log-level value \"{0}\" is invalid")]
    InvalidLogLevel(String),

    #[error("invalid {field} address \"{value}\"")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),

    #[error("{kind} check {name:?} has timeout_ms = 0")]
    ZeroCheckTimeout { kind: CheckKind, name: String },

    #[error("no checks found: must specify at least one check")]
    NoChecks,
}

pub fn validate_config(config: &HealthCheckerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !is_host_port(&config.listener.bind_address) {
        errors.push(ValidationError::InvalidAddress {
            field: "listener",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::ZeroValue("listener.max_connections"));
    }

    if config.timeouts.check_ms == 0 {
        errors.push(ValidationError::ZeroValue("timeouts.check_ms"));
    }
    if config.timeouts.script_secs == 0 {
        errors.push(ValidationError::ZeroValue("timeouts.script_secs"));
    }

    if tracing::Level::from_str(&config.observability.log_level).is_err() {
        errors.push(ValidationError::InvalidLogLevel(
            config.observability.log_level.clone(),
        ));
    }
    if config.observability.metrics_enabled
        && SocketAddr::from_str(&config.observability.metrics_address).is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "metrics",
            value: config.observability.metrics_address.clone(),
        });
    }

    let checks = config.checks();
    if checks.is_empty() {
        errors.push(ValidationError::NoChecks);
    }
    errors.extend(checks.iter().filter_map(|check| check.validate().err()));

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// `ip:port`, `[ipv6]:port` or `hostname:port`. Hostnames are resolved at bind time.
fn is_host_port(value: &str) -> bool {
    if SocketAddr::from_str(value).is_ok() {
        return true;
    }
    match value.rsplit_once(':') {
        Some((host, port)) => !host.is_empty() && !host.contains(':') && port.parse::<u16>().is_ok(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::{ScriptCheck, TcpCheck};

    fn config_with_tcp() -> HealthCheckerConfig {
        let mut config = HealthCheckerConfig::default();
        config.tcp.push(TcpCheck::new("redis", "localhost", 6379));
        config
    }

    #[test]
    fn accepts_minimal_config() {
        assert_eq!(validate_config(&config_with_tcp()), Ok(()));
    }

    #[test]
    fn rejects_empty_check_set() {
        let errors = validate_config(&HealthCheckerConfig::default()).unwrap_err();
        assert_eq!(errors, vec![ValidationError::NoChecks]);
    }

    #[test]
    fn collects_every_error() {
        let mut config = config_with_tcp();
        config.observability.log_level = "notreally".to_string();
        config.listener.bind_address = "nowhere".to_string();
        config.script.push(ScriptCheck::new("disk", ""));

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&ValidationError::InvalidLogLevel("notreally".to_string())));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::MissingField { field: "command", .. })));
    }

    #[test]
    fn hostname_listener_is_accepted() {
        let mut config = config_with_tcp();
        config.listener.bind_address = "localhost:5500".to_string();
        assert_eq!(validate_config(&config), Ok(()));

        for bad in ["localhost", ":5500", "localhost:http", "::1:5500"] {
            config.listener.bind_address = bad.to_string();
            assert!(validate_config(&config).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn zero_per_check_timeout_is_rejected() {
        let mut config = config_with_tcp();
        config.tcp[0].timeout_ms = Some(0);
        config
            .script
            .push(ScriptCheck::new("disk", "df").with_timeout(std::time::Duration::ZERO));

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::ZeroCheckTimeout {
                    kind: CheckKind::Tcp,
                    name: "redis".to_string(),
                },
                ValidationError::ZeroCheckTimeout {
                    kind: CheckKind::Script,
                    name: "disk".to_string(),
                },
            ]
        );
    }

    #[test]
    fn log_level_message() {
        let err = ValidationError::InvalidLogLevel("loud".to_string());
        assert_eq!(err.to_string(), "The log-level value \"loud\" is invalid");
    }
}

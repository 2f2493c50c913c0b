//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Apply the configured level, with `RUST_LOG` taking precedence
//! - Select text or JSON output

use thiserror::Error;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter: {0}")]
    Filter(#[from] ParseError),

    #[error("failed to install logger: {0}")]
    Init(#[from] TryInitError),
}

/// Filter directives used when `RUST_LOG` is not set.
pub fn default_directives(level: &str) -> String {
    format!("health_checker={level},tower_http={level}")
}

pub fn init(config: &ObservabilityConfig) -> Result<(), LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directives(&config.log_level.to_lowercase()))?,
    };

    let registry = tracing_subscriber::registry().with(filter);
    if config.json_logs {
        registry.with(fmt::layer().json()).try_init()?;
    } else {
        registry.with(fmt::layer()).try_init()?;
    }
    Ok(())
}

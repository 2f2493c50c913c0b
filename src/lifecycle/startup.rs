//! Startup orchestration.
//!
//! # Responsibilities
//! - Resolve configuration from the config file and CLI overrides
//! - Initialize logging and (optionally) metrics
//! - Bind the listener and serve until a shutdown signal
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The listener binds last, so traffic only arrives once everything is ready

use metrics_exporter_prometheus::BuildError;
use std::net::{AddrParseError, SocketAddr};
use std::sync::Arc;
use thiserror::Error;

use crate::cli::Cli;
use crate::config::loader::read_config;
use crate::config::{validate_config, ConfigError, HealthCheckerConfig};
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::net::{Listener, ListenerError};
use crate::observability::{logging, metrics};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Missing required parameter, one of --config, --port, --script")]
    MissingCheckSource,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Logging(#[from] logging::LoggingError),

    #[error("invalid metrics address: {0}")]
    MetricsAddress(#[from] AddrParseError),

    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] BuildError),

    #[error(transparent)]
    Listener(#[from] ListenerError),
}

/// Build the validated configuration from the config file and CLI flags.
pub fn resolve_config(cli: &Cli) -> Result<HealthCheckerConfig, StartupError> {
    if !cli.has_check_source() {
        return Err(StartupError::MissingCheckSource);
    }

    let mut config = match &cli.config {
        Some(path) => read_config(path)?,
        None => HealthCheckerConfig::default(),
    };
    cli.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Run the health checker until SIGINT/SIGTERM.
pub async fn run(cli: Cli) -> Result<(), StartupError> {
    let config = resolve_config(&cli)?;
    logging::init(&config.observability)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        checks = config.check_count(),
        singleflight = config.listener.singleflight,
        "health-checker starting"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let listener = Listener::bind(&config.listener).await?;
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("Listening on {}...", addr);
    }

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        signals::shutdown_signal().await;
        shutdown.trigger();
    });

    HttpServer::new(Arc::new(config))
        .run(listener, server_shutdown)
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidationError;
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("health-checker").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn requires_a_check_source() {
        let err = resolve_config(&cli(&[])).unwrap_err();
        assert!(matches!(err, StartupError::MissingCheckSource));
        assert!(err.to_string().starts_with("Missing required parameter"));
    }

    #[test]
    fn invalid_log_level_is_rejected() {
        let err = resolve_config(&cli(&["--port", "8080", "--log-level", "notreally"])).unwrap_err();
        match err {
            StartupError::Config(ConfigError::Validation(errors)) => {
                assert_eq!(errors, [ValidationError::InvalidLogLevel("notreally".to_string())]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn flags_alone_produce_config() {
        let config = resolve_config(&cli(&["--port", "8080", "--script", "true"])).unwrap();
        assert_eq!(config.check_count(), 2);
        assert_eq!(config.listener.bind_address, "0.0.0.0:5500");
        assert_eq!(config.timeouts.script_secs, 5);
    }

    #[test]
    fn config_file_and_flags_merge() {
        let path = std::env::temp_dir().join(format!("health-checker-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            "[[http]]\nname = \"app\"\nhost = \"localhost\"\nport = 8080\n",
        )
        .unwrap();

        let path_arg = path.to_string_lossy().into_owned();
        let result = resolve_config(&cli(&["--config", &path_arg, "--port", "6379"]));
        std::fs::remove_file(&path).unwrap();

        let config = result.unwrap();
        assert_eq!(config.http.len(), 1);
        assert_eq!(config.tcp.len(), 1);
    }
}

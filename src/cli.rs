//! Command-line interface.

use clap::Parser;
use std::path::PathBuf;

use crate::checks::{ScriptCheck, TcpCheck};
use crate::config::HealthCheckerConfig;

/// A simple HTTP server that returns 200 OK when all configured health checks pass.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "health-checker", version, long_about = None)]
pub struct Cli {
    /// A TOML file containing health checks.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// The address (host:port) on which inbound HTTP connections will be accepted.
    #[arg(long, value_name = "ADDR")]
    pub listener: Option<String>,

    /// Set the log level (trace, debug, info, warn, error).
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Add a TCP check against 127.0.0.1 on this port. May be repeated.
    #[arg(long = "port", value_name = "PORT")]
    pub ports: Vec<u16>,

    /// Add a script check, e.g. "/usr/local/bin/check.sh 1234". May be repeated.
    #[arg(long = "script", value_name = "COMMAND")]
    pub scripts: Vec<String>,

    /// Default timeout for script checks, in seconds.
    #[arg(long, value_name = "SECS")]
    pub script_timeout: Option<u64>,

    /// Share one in-flight run between concurrent requests.
    #[arg(long)]
    pub singleflight: bool,
}

impl Cli {
    /// Whether any source of checks was given.
    pub fn has_check_source(&self) -> bool {
        self.config.is_some() || !self.ports.is_empty() || !self.scripts.is_empty()
    }

    /// Merge command-line overrides into a configuration.
    pub fn apply(&self, config: &mut HealthCheckerConfig) {
        if let Some(listener) = &self.listener {
            config.listener.bind_address = listener.clone();
        }
        if let Some(level) = &self.log_level {
            config.observability.log_level = level.clone();
        }
        if let Some(secs) = self.script_timeout {
            config.timeouts.script_secs = secs;
        }
        if self.singleflight {
            config.listener.singleflight = true;
        }

        config.tcp.extend(
            self.ports
                .iter()
                .map(|port| TcpCheck::new(format!("port-{port}"), "127.0.0.1", *port)),
        );
        config
            .script
            .extend(self.scripts.iter().filter_map(|line| ScriptCheck::from_command_line(line)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("health-checker").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn no_options_has_no_check_source() {
        assert!(!parse(&[]).has_check_source());
    }

    #[test]
    fn multiple_ports_become_tcp_checks() {
        let cli = parse(&["--port", "8080", "--port", "8081"]);
        let mut config = HealthCheckerConfig::default();
        cli.apply(&mut config);

        let ports: Vec<u16> = config.tcp.iter().map(|c| c.port).collect();
        assert_eq!(ports, [8080, 8081]);
        assert_eq!(config.tcp[0].name, "port-8080");
    }

    #[test]
    fn script_with_custom_timeout() {
        let cli = parse(&["--script", "/usr/local/bin/check.sh 1234", "--script-timeout", "11"]);
        let mut config = HealthCheckerConfig::default();
        cli.apply(&mut config);

        assert_eq!(config.timeouts.script_secs, 11);
        assert_eq!(config.script.len(), 1);
        assert_eq!(config.script[0].command, "/usr/local/bin/check.sh");
        assert_eq!(config.script[0].args, ["1234"]);
    }

    #[test]
    fn listener_and_flags_override_config() {
        let cli = parse(&[
            "--config",
            "health-checks.toml",
            "--listener",
            "127.0.0.1:1234",
            "--log-level",
            "debug",
            "--singleflight",
        ]);
        let mut config = HealthCheckerConfig::default();
        cli.apply(&mut config);

        assert!(cli.has_check_source());
        assert_eq!(config.listener.bind_address, "127.0.0.1:1234");
        assert_eq!(config.observability.log_level, "debug");
        assert!(config.listener.singleflight);
    }

    #[test]
    fn listener_flag_requires_value() {
        let result = Cli::try_parse_from(["health-checker", "--listener"]);
        assert!(result.is_err());
    }
}

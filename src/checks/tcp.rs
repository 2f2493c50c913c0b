//! Raw TCP reachability probe.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{self, Instant};

use super::{budget, non_zero_timeout, require, CheckFailure, CheckKind};
use crate::config::validation::ValidationError;

/// Succeeds when a TCP connection to `host:port` can be established.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TcpCheck {
    pub name: String,
    pub host: String,
    pub port: u16,
    /// Per-check timeout in milliseconds (falls back to `timeouts.check_ms`).
    pub timeout_ms: Option<u64>,
}

impl TcpCheck {
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
            timeout_ms: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require(CheckKind::Tcp, &self.name, "name", !self.name.is_empty())?;
        require(CheckKind::Tcp, &self.name, "host", !self.host.is_empty())?;
        require(CheckKind::Tcp, &self.name, "port", self.port != 0)?;
        non_zero_timeout(CheckKind::Tcp, &self.name, self.timeout_ms)
    }

    pub async fn execute(&self, deadline: Instant) -> Result<(), CheckFailure> {
        let limit = budget(self.timeout(), deadline);
        tracing::debug!(
            check = %self.name,
            host = %self.host,
            port = self.port,
            timeout = ?limit,
            "Attempting TCP connection"
        );

        match time::timeout(limit, TcpStream::connect((self.host.as_str(), self.port))).await {
            // No data is exchanged; dropping the stream closes it.
            Ok(Ok(_stream)) => Ok(()),
            Ok(Err(e)) => Err(CheckFailure::connect(&e)),
            Err(_) => Err(CheckFailure::ConnectFailed {
                reason: format!("timed out after {limit:?}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    fn deadline() -> Instant {
        Instant::now() + Duration::from_secs(5)
    }

    #[tokio::test]
    async fn connects_to_listening_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let check = TcpCheck::new("live", "127.0.0.1", port);
        assert_eq!(check.execute(deadline()).await, Ok(()));
    }

    #[tokio::test]
    async fn closed_port_is_connect_failure() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };

        let check = TcpCheck::new("dead", "127.0.0.1", port)
            .with_timeout(Duration::from_secs(2));
        let started = std::time::Instant::now();
        let result = check.execute(deadline()).await;

        assert!(matches!(result, Err(CheckFailure::ConnectFailed { .. })), "{result:?}");
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[test]
    fn validate_requires_host_and_port() {
        let missing_host = TcpCheck::new("db", "", 5432);
        assert!(matches!(
            missing_host.validate(),
            Err(ValidationError::MissingField { field: "host", .. })
        ));

        let missing_port = TcpCheck::new("db", "localhost", 0);
        assert!(matches!(
            missing_port.validate(),
            Err(ValidationError::MissingField { field: "port", .. })
        ));

        assert!(TcpCheck::new("db", "localhost", 5432).validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let check = TcpCheck::new("db", "localhost", 5432).with_timeout(Duration::ZERO);
        assert_eq!(
            check.validate(),
            Err(ValidationError::ZeroCheckTimeout {
                kind: CheckKind::Tcp,
                name: "db".to_string(),
            })
        );
    }
}

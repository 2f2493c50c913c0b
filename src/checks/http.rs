//! HTTP status / body assertion probe.

use axum::body::Body;
use axum::http::{header, Method, Request, Uri};
use futures_util::StreamExt;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::net::IpAddr;
use std::time::Duration;
use tokio::time::{self, Instant};
use url::Url;

use super::{budget, non_zero_timeout, require, CheckFailure, CheckKind};
use crate::config::validation::ValidationError;

/// How much of a mismatching body is kept for the failure message.
const BODY_PREFIX_CHARS: usize = 64;

/// Enough bytes to hold `BODY_PREFIX_CHARS` characters of UTF-8.
const BODY_PREFIX_BYTES: usize = BODY_PREFIX_CHARS * 4;

const USER_AGENT: &str = concat!("health-checker/", env!("CARGO_PKG_VERSION"));

/// Issues `GET http://host:port/` and asserts on the response.
///
/// Success precedence: `success_status_codes` if non-empty, otherwise
/// `body_contains` if non-empty, otherwise status 200.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpCheck {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub success_status_codes: BTreeSet<u16>,
    pub body_contains: String,
    /// Per-check timeout in milliseconds (falls back to `timeouts.check_ms`).
    pub timeout_ms: Option<u64>,
}

impl HttpCheck {
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    pub fn with_status_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.success_status_codes = codes.into_iter().collect();
        self
    }

    pub fn with_body_contains(mut self, needle: impl Into<String>) -> Self {
        self.body_contains = needle.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require(CheckKind::Http, &self.name, "name", !self.name.is_empty())?;
        require(CheckKind::Http, &self.name, "host", !self.host.is_empty())?;
        require(CheckKind::Http, &self.name, "port", self.port != 0)?;
        non_zero_timeout(CheckKind::Http, &self.name, self.timeout_ms)
    }

    /// `http://host:port/`, with IPv6 literals bracketed.
    pub fn target_uri(&self) -> Result<Uri, CheckFailure> {
        let invalid = |reason: String| CheckFailure::ConnectFailed {
            reason: format!("invalid target {}:{}: {reason}", self.host, self.port),
        };

        let mut url = Url::parse("http://localhost/").map_err(|e| invalid(e.to_string()))?;
        match self.host.parse::<IpAddr>() {
            Ok(ip) => url
                .set_ip_host(ip)
                .map_err(|()| invalid("cannot use ip as host".to_string()))?,
            Err(_) => url
                .set_host(Some(&self.host))
                .map_err(|e| invalid(e.to_string()))?,
        }
        url.set_port(Some(self.port))
            .map_err(|()| invalid("cannot set port".to_string()))?;

        url.as_str()
            .parse::<Uri>()
            .map_err(|e| invalid(e.to_string()))
    }

    pub async fn execute(&self, deadline: Instant) -> Result<(), CheckFailure> {
        let limit = budget(self.timeout(), deadline);
        let uri = self.target_uri()?;
        tracing::debug!(check = %self.name, uri = %uri, timeout = ?limit, "Sending HTTP health probe");

        match time::timeout(limit, self.probe(uri)).await {
            Ok(result) => result,
            Err(_) => Err(CheckFailure::ConnectFailed {
                reason: format!("timed out after {limit:?}"),
            }),
        }
    }

    async fn probe(&self, uri: Uri) -> Result<(), CheckFailure> {
        let client: Client<HttpConnector, Body> = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(0)
            .build(HttpConnector::new());

        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .header(header::USER_AGENT, USER_AGENT)
            .body(Body::empty())
            .map_err(|e| CheckFailure::connect(&e))?;

        let response = client
            .request(request)
            .await
            .map_err(|e| CheckFailure::connect(&e))?;
        let status = response.status().as_u16();

        if !self.success_status_codes.is_empty() {
            if self.success_status_codes.contains(&status) {
                return Ok(());
            }
            return Err(CheckFailure::UnexpectedStatus {
                got: status,
                wanted: self.success_status_codes.iter().copied().collect(),
            });
        }

        if !self.body_contains.is_empty() {
            return self.match_body(Body::new(response.into_body())).await;
        }

        if status == 200 {
            Ok(())
        } else {
            Err(CheckFailure::UnexpectedStatus {
                got: status,
                wanted: vec![200],
            })
        }
    }

    /// Stream the body looking for `body_contains`.
    ///
    /// Only a window of `needle.len() - 1` bytes is carried between chunks,
    /// so arbitrarily large bodies are read in full without being buffered.
    async fn match_body(&self, body: Body) -> Result<(), CheckFailure> {
        let needle = self.body_contains.as_bytes();
        let overlap = needle.len().saturating_sub(1);
        let mut window: Vec<u8> = Vec::with_capacity(overlap * 2);
        let mut prefix: Vec<u8> = Vec::with_capacity(BODY_PREFIX_BYTES);

        let mut stream = body.into_data_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| CheckFailure::connect(&e))?;

            if prefix.len() < BODY_PREFIX_BYTES {
                let take = (BODY_PREFIX_BYTES - prefix.len()).min(chunk.len());
                prefix.extend_from_slice(&chunk[..take]);
            }

            window.extend_from_slice(&chunk);
            if contains(&window, needle) {
                return Ok(());
            }
            let excess = window.len().saturating_sub(overlap);
            window.drain(..excess);
        }

        Err(CheckFailure::BodyMismatch {
            wanted: self.body_contains.clone(),
            got_prefix: String::from_utf8_lossy(&prefix)
                .chars()
                .take(BODY_PREFIX_CHARS)
                .collect(),
        })
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

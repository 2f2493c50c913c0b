//! HTTP health check aggregator.
//!
//! Exposes one endpoint whose status code reports the combined health of a set
//! of TCP, HTTP and script checks, executed concurrently on every request.

pub mod checks;
pub mod cli;
pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use checks::Check;
pub use config::HealthCheckerConfig;
pub use health::{HealthStatus, RunCoalescer, RunResult, Runner};
pub use http::HttpServer;
pub use lifecycle::Shutdown;

//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Runner / coalescer / HTTP front end produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (text or JSON lines)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Structured fields (run_id, check, kind) on every check log line
//! - Metric calls are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;

//! Health check execution subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound probe request
//!     → coalesce.rs (start a run, or attach to the one in flight)
//!     → runner.rs (spawn one task per check, join all)
//!     → Check::execute (tcp / http / script)
//!     → RunResult (healthy iff every outcome passed)
//! ```
//!
//! # Design Decisions
//! - Every run re-executes every check; nothing is cached across runs
//! - A failing or panicking check only affects its own outcome
//! - Outcomes are kept in check order regardless of completion order

pub mod coalesce;
pub mod runner;

pub use coalesce::RunCoalescer;
pub use runner::{CheckOutcome, CheckTimeouts, HealthStatus, RunResult, Runner};

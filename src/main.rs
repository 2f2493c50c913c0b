//! health-checker
//!
//! Serves a single HTTP endpoint that answers 200 when every configured check
//! passes and 504 when at least one fails.
//!
//! # Architecture Overview
//!
//! ```text
//!     Probe Request        ┌───────────────────────────────────────────────┐
//!     ─────────────────────┼─▶ net listener ─▶ http server ─▶ coalescer    │
//!                          │                                      │        │
//!                          │                                      ▼        │
//!                          │                                   runner      │
//!                          │                              ┌─────┼─────┐    │
//!                          │                              ▼     ▼     ▼    │
//!                          │                             tcp   http script │
//!     200 OK / 504         │                                               │
//!     ◀────────────────────┼── response ◀── RunResult ◀───────────┘        │
//!                          └───────────────────────────────────────────────┘
//! ```

use clap::Parser;
use health_checker::cli::Cli;
use health_checker::lifecycle::startup;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    startup::run(cli).await?;
    Ok(())
}

//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (hyper connection, Axum router)
//!     → health handler → RunCoalescer::invoke
//!     → response.rs (status code + body, outcome logging)
//!     → Send to client
//! ```

pub mod response;
pub mod server;

pub use server::HttpServer;

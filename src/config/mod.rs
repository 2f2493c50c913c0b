//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) + CLI flags
//!     → loader.rs (parse & deserialize)
//!     → cli overrides merged in
//!     → validation.rs (semantic checks)
//!     → HealthCheckerConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no hot reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::HealthCheckerConfig;
pub use schema::ListenerConfig;
pub use schema::ObservabilityConfig;
pub use schema::TimeoutConfig;
pub use validation::{validate_config, ValidationError};

//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! optional config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (overlay DJANGO_ENV / DJANGO_SUPERUSER_* from the environment)
//!     → validation.rs (semantic checks)
//!     → EntrypointConfig (validated, immutable)
//!     → threaded explicitly into the orchestrator
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; nothing re-reads the environment later
//! - All fields have defaults so no file is needed for the container layout
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{resolve_config, ConfigError};
pub use schema::{
    AdminConfig, BackoffKind, CommandsConfig, DependencyConfig, EntrypointConfig, LogFormat,
    ReadinessConfig, ServerConfig,
};

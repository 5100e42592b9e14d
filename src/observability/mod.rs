//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events on stderr)
//!
//! Consumers:
//!     → container log driver / log aggregation
//! ```
//!
//! # Design Decisions
//! - Structured fields (step, dependency, exit_code) on every event
//! - JSON output selectable for machine parsing

pub mod logging;

pub use logging::init_logging;

//! Dependency readiness subsystem.
//!
//! # Data Flow
//! ```text
//! wait.rs (loop)
//!     → probe.rs (one TCP connect, no payload)
//!     → on failure: resilience::backoff delay
//!     → on success: WaitReport
//! ```
//!
//! # Design Decisions
//! - Connection success is the only readiness signal consumed
//! - Waits are sequential; the cache is only probed once the database is up

pub mod probe;
pub mod wait;

pub use probe::{probe_tcp, ProbeFailure};
pub use wait::{wait_for, ReadinessError, WaitPolicy, WaitReport};

//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Readiness attempt fails:
//!     → backoff.rs (delay before the next attempt)
//!     → readiness::wait (sleep, unless cancelled or past the deadline)
//! ```
//!
//! # Design Decisions
//! - Only the dependency waits retry; management commands never do
//! - Fixed delay by default, exponential as an opt-in
//! - Jitter only applies to exponential backoff

pub mod backoff;

pub use backoff::BackoffPolicy;

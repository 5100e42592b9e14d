//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Wait db → Wait cache → Migrate → Collect static → Seed → Admin → Server
//!
//! Plan (plan.rs):
//!     EntrypointConfig → concrete commands per phase (no side effects)
//!
//! Signals (signals.rs) → Shutdown (shutdown.rs):
//!     SIGTERM/SIGINT before the server → cancel the current step
//!     SIGTERM/SIGINT while the server runs → forward to the server
//! ```
//!
//! # Design Decisions
//! - Ordered startup: dependencies first, server last
//! - Mode is an explicit value threaded in from config, not read globally
//! - Progress lines (progress.rs) are separate from diagnostic logging

pub mod mode;
pub mod plan;
pub mod progress;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use mode::ServerMode;
pub use plan::StartupPlan;
pub use progress::{ProgressSink, RecordingProgress, StdoutProgress};
pub use shutdown::Shutdown;
pub use startup::{Orchestrator, StartupError, Step, StepReport};

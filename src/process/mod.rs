//! Process execution subsystem.
//!
//! # Data Flow
//! ```text
//! CommandSpec (command.rs)
//!     → CommandRunner::run  → CommandOutput (exit code, stdout, stderr, duration)
//!     → CommandRunner::exec → server exit code (signals forwarded)
//! ```
//!
//! # Design Decisions
//! - The runner is a trait so the orchestrator can be driven by a recording fake
//! - Exit codes follow shell conventions (`128 + signal` when killed)

pub mod command;
pub mod runner;

pub use command::{exit_code_of, CommandOutput, CommandSpec};
pub use runner::{CommandRunner, ProcessError, SystemRunner};

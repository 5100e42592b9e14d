//! Container entrypoint for the noticeboard web application.
//!
//! Brings the container from "just started" to "serving requests":
//! waits for the database and cache to accept TCP connections, applies
//! migrations, collects static files, ensures the default administrator
//! exists, then runs the application server in the foreground.

pub mod admin;
pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod process;
pub mod readiness;
pub mod resilience;

pub use config::EntrypointConfig;
pub use lifecycle::{Orchestrator, Shutdown, StartupError};

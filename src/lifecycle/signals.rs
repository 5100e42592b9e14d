//! OS signal handling.
//!
//! # Responsibilities
//! - Register signal handlers (SIGTERM, SIGINT)
//! - Translate signals to `Shutdown::trigger` calls
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Every signal is delivered, so repeated Ctrl-C reaches the server too
//! - Listening runs as a background task for the whole process lifetime

use tokio::task::JoinHandle;

use crate::lifecycle::shutdown::Shutdown;

pub const SIGINT: i32 = 2;
pub const SIGTERM: i32 = 15;

/// Spawn a task feeding SIGINT/SIGTERM into `shutdown`.
#[cfg(unix)]
pub fn spawn_signal_listener(shutdown: Shutdown) -> std::io::Result<JoinHandle<()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    Ok(tokio::spawn(async move {
        loop {
            let received = tokio::select! {
                Some(()) = interrupt.recv() => SIGINT,
                Some(()) = terminate.recv() => SIGTERM,
                else => break,
            };
            tracing::info!(signal = received, "Signal received");
            shutdown.trigger(received);
        }
    }))
}

/// Spawn a task feeding Ctrl-C into `shutdown`.
#[cfg(not(unix))]
pub fn spawn_signal_listener(shutdown: Shutdown) -> std::io::Result<JoinHandle<()>> {
    Ok(tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!(signal = SIGINT, "Signal received");
            shutdown.trigger(SIGINT);
        }
    }))
}

//! Shutdown coordination for the entrypoint.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Coordinator for cancellation and signal forwarding.
///
/// Before the server runs, a trigger cancels whatever step is in progress.
/// While the server runs, every trigger is rebroadcast so the supervisor can
/// forward it to the child.
#[derive(Clone)]
pub struct Shutdown {
    token: CancellationToken,
    /// Broadcast channel carrying raw signal numbers.
    tx: broadcast::Sender<i32>,
    /// First signal received, 0 when none.
    first_signal: Arc<AtomicI32>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(8);
        Self {
            token: CancellationToken::new(),
            tx,
            first_signal: Arc::new(AtomicI32::new(0)),
        }
    }

    /// Token cancelled on the first trigger.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Subscribe to every subsequent signal.
    pub fn subscribe(&self) -> broadcast::Receiver<i32> {
        self.tx.subscribe()
    }

    /// Record `signal`, cancel pending work and notify subscribers.
    pub fn trigger(&self, signal: i32) {
        let _ = self
            .first_signal
            .compare_exchange(0, signal, Ordering::SeqCst, Ordering::SeqCst);
        self.token.cancel();
        let _ = self.tx.send(signal);
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// The signal that caused cancellation, if any.
    pub fn signal(&self) -> Option<i32> {
        match self.first_signal.load(Ordering::SeqCst) {
            0 => None,
            s => Some(s),
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

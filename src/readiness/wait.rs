//! Readiness wait loop.
//!
//! # Responsibilities
//! - Repeatedly probe a dependency until it accepts a connection
//! - Sleep between attempts according to the backoff policy
//! - Stop early on cancellation or when the optional deadline passes
//!
//! # Design Decisions
//! - Without a timeout the loop never gives up (slow dependency startup is normal)
//! - Cancellation is observed both while probing and while sleeping
//! - The deadline also bounds the last probe and the last sleep

use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::config::{DependencyConfig, ReadinessConfig};
use crate::readiness::probe::probe_tcp;
use crate::resilience::BackoffPolicy;

/// Polling contract for one readiness wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub backoff: BackoffPolicy,
    /// `None` waits forever.
    pub timeout: Option<Duration>,
    pub connect_timeout: Duration,
}

impl WaitPolicy {
    pub fn from_config(config: &ReadinessConfig) -> Self {
        Self {
            backoff: BackoffPolicy::from_config(config),
            timeout: config.timeout_secs.map(Duration::from_secs),
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
        }
    }

    /// Same policy with a deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self::from_config(&ReadinessConfig::default())
    }
}

/// Outcome of a successful wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitReport {
    /// Number of probes made, including the successful one.
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Errors that end a readiness wait without success.
#[derive(Debug, Error)]
pub enum ReadinessError {
    #[error("{name} at {address} not reachable after {attempts} attempts ({elapsed:?})")]
    TimedOut {
        name: String,
        address: String,
        attempts: u32,
        elapsed: Duration,
    },

    #[error("wait for {name} cancelled after {attempts} attempts")]
    Cancelled { name: String, attempts: u32 },
}

/// Block until `dependency` accepts a TCP connection.
pub async fn wait_for(
    dependency: &DependencyConfig,
    policy: &WaitPolicy,
    cancel: &CancellationToken,
) -> Result<WaitReport, ReadinessError> {
    let address = dependency.address();
    let started = Instant::now();
    let deadline = policy.timeout.map(|t| started + t);
    let mut attempts = 0u32;

    tracing::debug!(
        dependency = %dependency.name,
        address = %address,
        timeout = ?policy.timeout,
        "Waiting for dependency"
    );

    loop {
        attempts += 1;

        let connect_timeout = match remaining(deadline) {
            Some(left) => policy.connect_timeout.min(left),
            None => policy.connect_timeout,
        };

        let result = tokio::select! {
            _ = cancel.cancelled() => {
                return Err(ReadinessError::Cancelled {
                    name: dependency.name.clone(),
                    attempts,
                });
            }
            result = probe_tcp(&address, connect_timeout) => result,
        };

        match result {
            Ok(()) => {
                let elapsed = started.elapsed();
                tracing::info!(
                    dependency = %dependency.name,
                    address = %address,
                    attempts,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Dependency is accepting connections"
                );
                return Ok(WaitReport { attempts, elapsed });
            }
            Err(e) => {
                tracing::debug!(
                    dependency = %dependency.name,
                    address = %address,
                    attempt = attempts,
                    error = %e,
                    "Dependency not ready"
                );
            }
        }

        let mut delay = policy.backoff.delay(attempts);
        if let Some(deadline) = deadline {
            let now = Instant::now();
            if now >= deadline {
                return Err(timed_out(dependency, address, attempts, started));
            }
            delay = delay.min(deadline - now);
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                return Err(ReadinessError::Cancelled {
                    name: dependency.name.clone(),
                    attempts,
                });
            }
            _ = time::sleep(delay) => {}
        }

        if deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(timed_out(dependency, address, attempts, started));
        }
    }
}

fn remaining(deadline: Option<Instant>) -> Option<Duration> {
    deadline.map(|d| d.saturating_duration_since(Instant::now()))
}

fn timed_out(
    dependency: &DependencyConfig,
    address: String,
    attempts: u32,
    started: Instant,
) -> ReadinessError {
    let elapsed = started.elapsed();
    tracing::warn!(
        dependency = %dependency.name,
        address = %address,
        attempts,
        elapsed_ms = elapsed.as_millis() as u64,
        "Gave up waiting for dependency"
    );
    ReadinessError::TimedOut {
        name: dependency.name.clone(),
        address,
        attempts,
        elapsed,
    }
}

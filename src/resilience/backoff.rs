//! Delay policies between readiness attempts.

use std::time::Duration;

use rand::Rng;

use crate::config::{BackoffKind, ReadinessConfig};

/// How long to sleep after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffPolicy {
    /// Same delay every time, no jitter.
    Fixed(Duration),
    /// Doubling delay capped at `max`, optionally jittered.
    Exponential {
        base: Duration,
        max: Duration,
        jitter: bool,
    },
}

impl BackoffPolicy {
    pub fn from_config(config: &ReadinessConfig) -> Self {
        match config.backoff {
            BackoffKind::Fixed => BackoffPolicy::Fixed(Duration::from_millis(config.interval_ms)),
            BackoffKind::Exponential => BackoffPolicy::Exponential {
                base: Duration::from_millis(config.interval_ms),
                max: Duration::from_millis(config.max_interval_ms),
                jitter: config.jitter,
            },
        }
    }

    /// Delay after the `attempt`-th failure (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            BackoffPolicy::Fixed(interval) => interval,
            BackoffPolicy::Exponential { base, max, jitter } => {
                let base_ms = base.as_millis() as u64;
                let max_ms = max.as_millis() as u64;
                if jitter {
                    calculate_backoff(attempt, base_ms, max_ms)
                } else {
                    Duration::from_millis(exponential_ms(attempt, base_ms, max_ms))
                }
            }
        }
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        BackoffPolicy::Fixed(Duration::from_millis(100))
    }
}

fn exponential_ms(attempt: u32, base_ms: u64, max_ms: u64) -> u64 {
    if attempt == 0 {
        return 0;
    }
    let factor = 2u64.saturating_pow(attempt - 1);
    base_ms.saturating_mul(factor).min(max_ms)
}

/// Calculate exponential backoff delay with jitter.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    let capped_delay = exponential_ms(attempt, base_ms, max_ms);

    // Apply jitter (0 to 10% of the delay)
    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_calculation() {
        let b1 = calculate_backoff(1, 100, 2000);
        assert!(b1.as_millis() >= 100);

        let b2 = calculate_backoff(2, 100, 2000);
        assert!(b2.as_millis() >= 200);

        let max = calculate_backoff(10, 100, 1000);
        assert!(max.as_millis() >= 1000);
        assert!(max.as_millis() < 1100);
    }

    #[test]
    fn test_fixed_policy_is_constant() {
        let policy = BackoffPolicy::default();
        for attempt in 1..50 {
            assert_eq!(policy.delay(attempt), Duration::from_millis(100));
        }
    }

    #[test]
    fn test_exponential_without_jitter_is_exact() {
        let policy = BackoffPolicy::Exponential {
            base: Duration::from_millis(100),
            max: Duration::from_millis(1000),
            jitter: false,
        };
        let delays: Vec<u128> = (1..=6).map(|a| policy.delay(a).as_millis()).collect();
        assert_eq!(delays, vec![100, 200, 400, 800, 1000, 1000]);
    }

    #[test]
    fn test_from_config() {
        let mut config = ReadinessConfig::default();
        assert_eq!(
            BackoffPolicy::from_config(&config),
            BackoffPolicy::Fixed(Duration::from_millis(100))
        );

        config.backoff = BackoffKind::Exponential;
        config.jitter = true;
        assert!(matches!(
            BackoffPolicy::from_config(&config),
            BackoffPolicy::Exponential { jitter: true, .. }
        ));
    }
}

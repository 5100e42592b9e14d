//! Readiness wait behavior against real sockets.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use noticeboard_entrypoint::readiness::{wait_for, ReadinessError, WaitPolicy};
use noticeboard_entrypoint::resilience::BackoffPolicy;

mod common;

#[tokio::test]
async fn test_reachable_dependency_terminates() {
    let addr = common::start_dependency().await;
    let dependency = common::local_dependency("PostgreSQL", addr.port());

    let report = tokio::time::timeout(
        Duration::from_secs(2),
        wait_for(&dependency, &WaitPolicy::default(), &CancellationToken::new()),
    )
    .await
    .expect("wait should finish for a listening port")
    .unwrap();

    assert_eq!(report.attempts, 1);
}

#[tokio::test]
async fn test_unreachable_dependency_does_not_terminate_by_default() {
    let dependency = common::local_dependency("Redis", common::closed_port().await);

    // The default policy has no deadline; the outer timeout is the only bound.
    let outcome = tokio::time::timeout(
        Duration::from_millis(500),
        wait_for(&dependency, &WaitPolicy::default(), &CancellationToken::new()),
    )
    .await;

    assert!(outcome.is_err(), "default wait should still be polling");
}

#[tokio::test]
async fn test_default_policy_polls_every_100ms() {
    let dependency = common::local_dependency("Redis", common::closed_port().await);
    let policy = WaitPolicy::default().with_timeout(Duration::from_millis(550));

    let err = wait_for(&dependency, &policy, &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        ReadinessError::TimedOut { attempts, .. } => {
            assert!((4..=7).contains(&attempts), "attempts = {attempts}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_exponential_policy_makes_fewer_attempts() {
    let dependency = common::local_dependency("Redis", common::closed_port().await);
    let policy = WaitPolicy {
        backoff: BackoffPolicy::Exponential {
            base: Duration::from_millis(50),
            max: Duration::from_secs(1),
            jitter: false,
        },
        timeout: Some(Duration::from_millis(500)),
        connect_timeout: Duration::from_millis(200),
    };

    let err = wait_for(&dependency, &policy, &CancellationToken::new())
        .await
        .unwrap_err();

    // 50 + 100 + 200 = 350ms of sleeping before the 4th attempt; the next
    // delay is cut short by the deadline.
    match err {
        ReadinessError::TimedOut { attempts, .. } => assert!(attempts <= 5, "attempts = {attempts}"),
        other => panic!("unexpected error: {other}"),
    }
}

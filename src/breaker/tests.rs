use super::*;
use std::time::Duration;

fn breaker(threshold: u32, cooldown_secs: u64, policy: ReopenPolicy) -> CircuitBreaker {
    CircuitBreaker::new(
        "test-provider",
        BreakerConfig::new(threshold, Duration::from_secs(cooldown_secs)).with_reopen_policy(policy),
    )
}

#[tokio::test(start_paused = true)]
async fn test_opens_at_exact_threshold() {
    let breaker = breaker(3, 60, ReopenPolicy::Optimistic);

    breaker.record_failure().await;
    breaker.record_failure().await;
    let snapshot = breaker.snapshot().await;
    assert_eq!(snapshot.mode, BreakerMode::Closed);
    assert_eq!(snapshot.consecutive_failures, 2);
    assert!(breaker.can_attempt().await);

    breaker.record_failure().await;
    let snapshot = breaker.snapshot().await;
    assert_eq!(snapshot.mode, BreakerMode::Open);
    assert_eq!(snapshot.times_opened, 1);
    assert!(snapshot.last_failure_at.is_some());
    assert!(!breaker.can_attempt().await);
}

#[tokio::test(start_paused = true)]
async fn test_success_resets_failure_count() {
    let breaker = breaker(3, 60, ReopenPolicy::Optimistic);

    breaker.record_failure().await;
    breaker.record_failure().await;
    breaker.record_success().await;

    let snapshot = breaker.snapshot().await;
    assert_eq!(snapshot.consecutive_failures, 0);
    assert_eq!(snapshot.mode, BreakerMode::Closed);

    // Two more failures are not enough to open again
    breaker.record_failure().await;
    breaker.record_failure().await;
    assert_eq!(breaker.snapshot().await.mode, BreakerMode::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_cooldown_must_be_strictly_exceeded() {
    let breaker = breaker(1, 60, ReopenPolicy::Optimistic);
    breaker.record_failure().await;

    tokio::time::advance(Duration::from_secs(60)).await;
    assert!(!breaker.can_attempt().await);

    tokio::time::advance(Duration::from_millis(1)).await;
    assert!(breaker.can_attempt().await);
    assert_eq!(breaker.snapshot().await.mode, BreakerMode::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_optimistic_reopen_lets_every_caller_through() {
    let breaker = breaker(2, 10, ReopenPolicy::Optimistic);
    breaker.record_failure().await;
    breaker.record_failure().await;

    tokio::time::advance(Duration::from_secs(11)).await;
    assert!(breaker.can_attempt().await);
    assert!(breaker.can_attempt().await);

    // The failure count survives the reopen, so the next failure trips it again
    let snapshot = breaker.snapshot().await;
    assert_eq!(snapshot.consecutive_failures, 2);

    breaker.record_failure().await;
    let snapshot = breaker.snapshot().await;
    assert_eq!(snapshot.mode, BreakerMode::Open);
    assert_eq!(snapshot.times_opened, 2);
}

#[tokio::test(start_paused = true)]
async fn test_single_trial_admits_one_caller() {
    let breaker = breaker(1, 30, ReopenPolicy::SingleTrial);
    breaker.record_failure().await;

    tokio::time::advance(Duration::from_secs(31)).await;
    assert!(breaker.can_attempt().await);
    assert_eq!(breaker.snapshot().await.mode, BreakerMode::HalfOpen);
    assert!(!breaker.can_attempt().await);
    assert!(!breaker.can_attempt().await);

    breaker.record_success().await;
    let snapshot = breaker.snapshot().await;
    assert_eq!(snapshot.mode, BreakerMode::Closed);
    assert_eq!(snapshot.consecutive_failures, 0);
    assert!(breaker.can_attempt().await);
}

#[tokio::test(start_paused = true)]
async fn test_failed_trial_reopens_immediately() {
    let breaker = breaker(3, 30, ReopenPolicy::SingleTrial);
    for _ in 0..3 {
        breaker.record_failure().await;
    }

    tokio::time::advance(Duration::from_secs(31)).await;
    assert!(breaker.can_attempt().await);

    breaker.record_failure().await;
    let snapshot = breaker.snapshot().await;
    assert_eq!(snapshot.mode, BreakerMode::Open);
    assert_eq!(snapshot.consecutive_failures, 4);
    assert!(!breaker.can_attempt().await);
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_trial_lease_expires() {
    let breaker = breaker(1, 5, ReopenPolicy::SingleTrial);
    breaker.record_failure().await;

    tokio::time::advance(Duration::from_secs(6)).await;
    assert!(breaker.can_attempt().await);
    assert!(!breaker.can_attempt().await);

    tokio::time::advance(Duration::from_secs(6)).await;
    assert!(breaker.can_attempt().await);
    assert_eq!(breaker.snapshot().await.mode, BreakerMode::HalfOpen);
}

#[tokio::test(start_paused = true)]
async fn test_failure_while_open_refreshes_cooldown() {
    let breaker = breaker(1, 10, ReopenPolicy::Optimistic);
    breaker.record_failure().await;

    tokio::time::advance(Duration::from_secs(8)).await;
    // A late failure from a call dispatched before the breaker opened
    breaker.record_failure().await;

    tokio::time::advance(Duration::from_secs(5)).await;
    assert!(!breaker.can_attempt().await);
    assert_eq!(breaker.snapshot().await.times_opened, 1);

    tokio::time::advance(Duration::from_secs(6)).await;
    assert!(breaker.can_attempt().await);
}

#[test]
fn test_default_config() {
    let config = BreakerConfig::default();
    assert_eq!(config.failure_threshold, 5);
    assert_eq!(config.cooldown, Duration::from_secs(60));
    assert_eq!(config.reopen_policy, ReopenPolicy::SingleTrial);
}

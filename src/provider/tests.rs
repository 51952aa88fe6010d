use super::*;
use crate::backends::{ScriptStep, ScriptedBackend};
use crate::breaker::{BreakerConfig, BreakerMode, ReopenPolicy};
use std::sync::Arc;
use std::time::Duration;

fn client_with(
    config: ProviderConfig,
    backend: Arc<ScriptedBackend>,
    threshold: u32,
) -> ProviderClient {
    ProviderClient::new(
        config,
        backend,
        BreakerConfig::new(threshold, Duration::from_secs(60))
            .with_reopen_policy(ReopenPolicy::Optimistic),
    )
}

#[tokio::test(start_paused = true)]
async fn test_successful_attempt_computes_cost() {
    let backend = Arc::new(ScriptedBackend::always_ok("primary", 2500));
    let config = ProviderConfig::new("primary", "gpt-4").with_cost_per_1k(0.03);
    let client = client_with(config, backend.clone(), 3);

    let request = CompletionRequest::new("hello there");
    let response = client.attempt(&request).await.unwrap();

    assert_eq!(response.provider, "primary");
    assert_eq!(response.model, "gpt-4");
    assert_eq!(response.units_consumed, 2500);
    assert!((response.cost - 0.075).abs() < 1e-12);
    assert_eq!(response.request_id, request.id);
    assert_eq!(backend.prompts(), vec!["hello there".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_is_classified_and_recorded() {
    let backend = Arc::new(ScriptedBackend::new(
        "slow",
        ScriptStep::succeed("too late", 10).after(Duration::from_secs(5)),
    ));
    let config = ProviderConfig::new("slow", "m").with_timeout(Duration::from_secs(1));
    let client = client_with(config, backend, 3);

    let error = client
        .attempt(&CompletionRequest::new("hi"))
        .await
        .unwrap_err();

    assert_eq!(
        error,
        AttemptError::Timeout {
            provider: "slow".to_string(),
            timeout: Duration::from_secs(1),
        }
    );
    assert_eq!(client.breaker_snapshot().await.consecutive_failures, 1);
}

#[tokio::test(start_paused = true)]
async fn test_override_only_tightens_timeout() {
    let backend = Arc::new(ScriptedBackend::new(
        "p",
        ScriptStep::succeed("ok", 1).after(Duration::from_secs(2)),
    ));
    let config = ProviderConfig::new("p", "m").with_timeout(Duration::from_secs(10));
    let client = client_with(config, backend, 3);

    let tight = CompletionRequest::new("hi").with_overrides(CompletionOverrides {
        timeout: Some(Duration::from_secs(1)),
        ..Default::default()
    });
    assert!(matches!(
        client.attempt(&tight).await,
        Err(AttemptError::Timeout { .. })
    ));

    let loose = CompletionRequest::new("hi").with_overrides(CompletionOverrides {
        timeout: Some(Duration::from_secs(60)),
        ..Default::default()
    });
    assert!(client.attempt(&loose).await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_open_breaker_skips_backend() {
    let backend = Arc::new(ScriptedBackend::always_failing("flaky"));
    let client = client_with(ProviderConfig::new("flaky", "m"), backend.clone(), 1);

    let first = client.attempt(&CompletionRequest::new("hi")).await;
    assert!(matches!(first, Err(AttemptError::ProviderCall { .. })));
    assert_eq!(client.breaker_snapshot().await.mode, BreakerMode::Open);

    let second = client.attempt(&CompletionRequest::new("hi")).await;
    assert_eq!(
        second.unwrap_err(),
        AttemptError::BreakerOpen {
            provider: "flaky".to_string()
        }
    );
    assert_eq!(backend.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_retries_until_success() {
    let backend = Arc::new(
        ScriptedBackend::always_ok("p", 5)
            .then(ScriptStep::fail("boom"))
            .then(ScriptStep::fail("boom again")),
    );
    let config = ProviderConfig::new("p", "m").with_max_retries(2);
    let client = client_with(config, backend.clone(), 5);

    let response = client.attempt(&CompletionRequest::new("hi")).await.unwrap();
    assert_eq!(response.units_consumed, 5);
    assert_eq!(backend.calls(), 3);
    assert_eq!(client.breaker_snapshot().await.consecutive_failures, 0);
}

#[tokio::test(start_paused = true)]
async fn test_non_retryable_error_stops_retrying() {
    let backend = Arc::new(ScriptedBackend::new(
        "p",
        ScriptStep::fail_with(BackendError::InvalidRequest("bad prompt".to_string())),
    ));
    let config = ProviderConfig::new("p", "m").with_max_retries(3);
    let client = client_with(config, backend.clone(), 10);

    let error = client
        .attempt(&CompletionRequest::new("hi"))
        .await
        .unwrap_err();
    assert!(!error.is_retryable());
    assert_eq!(backend.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_breaker_opening_mid_retry_reports_real_failure() {
    let backend = Arc::new(ScriptedBackend::always_failing("p"));
    let config = ProviderConfig::new("p", "m").with_max_retries(5);
    let client = client_with(config, backend.clone(), 2);

    let error = client
        .attempt(&CompletionRequest::new("hi"))
        .await
        .unwrap_err();

    assert!(matches!(error, AttemptError::ProviderCall { .. }));
    assert_eq!(backend.calls(), 2);
    assert_eq!(client.breaker_snapshot().await.mode, BreakerMode::Open);
}

#[tokio::test(start_paused = true)]
async fn test_panicking_backend_counts_as_failure() {
    let backend = Arc::new(ScriptedBackend::new("p", ScriptStep::Panic));
    let client = client_with(ProviderConfig::new("p", "m"), backend, 3);

    let error = client
        .attempt(&CompletionRequest::new("hi"))
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        AttemptError::ProviderCall {
            source: BackendError::Other(_),
            ..
        }
    ));
    assert_eq!(client.breaker_snapshot().await.consecutive_failures, 1);
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_attempt_still_reports_to_breaker() {
    let backend = Arc::new(ScriptedBackend::new(
        "p",
        ScriptStep::fail("late failure").after(Duration::from_secs(10)),
    ));
    let config = ProviderConfig::new("p", "m").with_timeout(Duration::from_secs(30));
    let client = client_with(config, backend, 3);

    let request = CompletionRequest::new("hi");
    let abandoned = tokio::time::timeout(Duration::from_secs(1), client.attempt(&request)).await;
    assert!(abandoned.is_err());
    assert_eq!(client.breaker_snapshot().await.consecutive_failures, 0);

    tokio::time::sleep(Duration::from_secs(15)).await;
    assert_eq!(client.breaker_snapshot().await.consecutive_failures, 1);
}

#[test]
fn test_config_validation() {
    assert!(ProviderConfig::new("a", "m").validate().is_ok());
    assert_eq!(
        ProviderConfig::new(" ", "m").validate(),
        Err(InvalidProviderConfig::EmptyName)
    );
    assert!(matches!(
        ProviderConfig::new("a", "m").with_cost_per_1k(-1.0).validate(),
        Err(InvalidProviderConfig::InvalidCostRate { .. })
    ));
    assert!(matches!(
        ProviderConfig::new("a", "m").with_cost_per_1k(f64::INFINITY).validate(),
        Err(InvalidProviderConfig::InvalidCostRate { .. })
    ));
    assert_eq!(
        ProviderConfig::new("a", "m")
            .with_timeout(Duration::ZERO)
            .validate(),
        Err(InvalidProviderConfig::ZeroTimeout("a".to_string()))
    );
}

#[test]
fn test_estimate_units() {
    assert_eq!(estimate_units(""), 0);
    assert_eq!(estimate_units("  one two\tthree\nfour "), 4);
}

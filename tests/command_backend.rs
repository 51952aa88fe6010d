//! Tests that spawn real processes through the command backend.

use llm_relay::backends::CommandBackend;
use llm_relay::{
    AttemptError, BackendError, BreakerConfig, CompletionBackend, CompletionOverrides,
    CompletionRequest, Gateway, ProviderConfig,
};
use std::sync::Arc;
use std::time::Duration;
use test_tag::tag;

fn sh(script: &str) -> CommandBackend {
    CommandBackend::new("sh", vec!["-c".to_string(), script.to_string()])
        .expect("sh should be on PATH")
}

#[tokio::test]
#[tag(process)]
async fn test_stdout_becomes_completion() {
    let backend = CommandBackend::new("cat", Vec::new()).expect("cat should be on PATH");
    let output = backend
        .complete_once("echo this back", &CompletionOverrides::default())
        .await
        .expect("cat should succeed");

    assert_eq!(output.text, "echo this back");
    // Three words in, three words out
    assert_eq!(output.units_consumed, 6);
}

#[tokio::test]
#[tag(process)]
async fn test_system_message_is_exported() {
    let backend = sh(r#"cat > /dev/null; printf '%s' "$RELAY_SYSTEM_MESSAGE""#);
    let overrides = CompletionOverrides {
        system_message: Some("be brief".to_string()),
        ..Default::default()
    };

    let output = backend
        .complete_once("ignored", &overrides)
        .await
        .expect("script should succeed");
    assert_eq!(output.text, "be brief");
}

#[tokio::test]
#[tag(process)]
async fn test_nonzero_exit_and_empty_output_fail() {
    let failing = sh("cat > /dev/null; echo broken >&2; exit 3");
    let result = failing
        .complete_once("hi", &CompletionOverrides::default())
        .await;
    assert!(matches!(result, Err(BackendError::Unavailable(_))));

    let silent = sh("cat > /dev/null");
    let result = silent
        .complete_once("hi", &CompletionOverrides::default())
        .await;
    assert!(matches!(result, Err(BackendError::InvalidResponse(_))));
}

#[tokio::test]
#[tag(process)]
async fn test_hung_process_times_out_and_falls_back() {
    let gateway = Gateway::builder()
        .breaker_config(BreakerConfig::new(1, Duration::from_secs(60)))
        .provider(
            ProviderConfig::new("hung", "sleep").with_timeout(Duration::from_millis(200)),
            Arc::new(sh("sleep 30")),
        )
        .provider(
            ProviderConfig::new("echo", "cat"),
            Arc::new(CommandBackend::new("cat", Vec::new()).expect("cat should be on PATH")),
        )
        .build()
        .expect("gateway should build");

    let started = std::time::Instant::now();
    let report = gateway.complete_traced(CompletionRequest::new("ping")).await;
    assert!(started.elapsed() < Duration::from_secs(10));

    let response = report.result.expect("cat answers");
    assert_eq!(response.provider, "echo");
    assert_eq!(response.text, "ping");

    let provider = gateway
        .complete_prompt("again")
        .await
        .map(|r| r.provider)
        .expect("cat answers again");
    assert_eq!(provider, "echo");

    let status = gateway.provider_status().await;
    assert_eq!(status[0].breaker.consecutive_failures, 1);
    assert!(report.attempts[0].error.as_deref().is_some_and(|e| e.contains("timed out")));

    let blocked = Gateway::builder()
        .breaker_config(BreakerConfig::new(1, Duration::from_secs(60)))
        .provider(
            ProviderConfig::new("hung", "sleep").with_timeout(Duration::from_millis(100)),
            Arc::new(sh("sleep 30")),
        )
        .build()
        .expect("gateway should build");
    let first = blocked.complete_prompt("x").await.expect_err("times out");
    assert!(matches!(first.errors[0], AttemptError::Timeout { .. }));
    let second = blocked.complete_prompt("x").await.expect_err("breaker open");
    assert!(matches!(second.errors[0], AttemptError::BreakerOpen { .. }));
}

#[tokio::test]
#[tag(process)]
async fn test_prompt_larger_than_pipe_buffer_is_echoed() {
    let gateway = Gateway::builder()
        .provider(
            ProviderConfig::new("local", "cat").with_timeout(Duration::from_secs(10)),
            Arc::new(CommandBackend::new("cat", Vec::new()).expect("cat should be on PATH")),
        )
        .build()
        .expect("gateway should build");

    // Roughly 1 MB, far beyond a pipe buffer in either direction
    let prompt = "word ".repeat(200_000);
    let response = gateway
        .complete_prompt(prompt.clone())
        .await
        .expect("cat should echo a large prompt");

    assert_eq!(response.text, prompt.trim());
    assert_eq!(response.units_consumed, 400_000);

    let status = gateway.provider_status().await;
    assert_eq!(status[0].breaker.consecutive_failures, 0);
}

#[tokio::test]
#[tag(process)]
async fn test_program_ignoring_stdin_still_answers() {
    let backend = sh("echo fixed answer");
    let prompt = "word ".repeat(200_000);

    let output = backend
        .complete_once(&prompt, &CompletionOverrides::default())
        .await
        .expect("exit status decides, not the unread prompt");
    assert_eq!(output.text, "fixed answer");
}

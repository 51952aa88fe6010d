//! One provider in the chain: its descriptor, its breaker and its backend.
//!
//! Every try is gated by the provider's own [`CircuitBreaker`] and bounded by the
//! provider's timeout. The backend call runs on a spawned task that reports the outcome to
//! the breaker before handing the result back, so a caller that gives up on the attempt
//! (outer timeout, dropped future) still leaves the breaker with an accurate count.

use crate::breaker::{BreakerConfig, BreakerSnapshot, CircuitBreaker};
use crate::provider::backend::{BackendError, BackendOutput, CompletionBackend};
use crate::provider::error::AttemptError;
use crate::provider::types::{CompletionRequest, CompletionResponse, ProviderConfig};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

pub struct ProviderClient {
    config: ProviderConfig,
    breaker: Arc<CircuitBreaker>,
    backend: Arc<dyn CompletionBackend>,
}

enum TryOutcome {
    Completed(BackendOutput),
    Failed(BackendError),
    TimedOut,
}

impl ProviderClient {
    pub fn new(
        config: ProviderConfig,
        backend: Arc<dyn CompletionBackend>,
        breaker_config: BreakerConfig,
    ) -> Self {
        let breaker = Arc::new(CircuitBreaker::new(config.name.clone(), breaker_config));
        Self {
            config,
            breaker,
            backend,
        }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub async fn breaker_snapshot(&self) -> BreakerSnapshot {
        self.breaker.snapshot().await
    }

    /// Try this provider, retrying up to `max_retries` times on retryable failures.
    ///
    /// Returns [`AttemptError::BreakerOpen`] without touching the backend when the breaker
    /// rejects the first try. If the breaker opens between retries, the last real failure
    /// is returned instead.
    pub async fn attempt(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, AttemptError> {
        let max_tries = self.config.max_retries.saturating_add(1);
        let mut last_error = None;

        for try_number in 1..=max_tries {
            if !self.breaker.can_attempt().await {
                debug!(provider = %self.config.name, try_number, "Breaker rejected attempt");
                return Err(last_error.unwrap_or_else(|| AttemptError::BreakerOpen {
                    provider: self.config.name.clone(),
                }));
            }

            match self.try_once(request).await {
                Ok(response) => return Ok(response),
                Err(error) => {
                    let retry = try_number < max_tries && error.is_retryable();
                    warn!(
                        provider = %self.config.name,
                        try_number,
                        max_tries,
                        will_retry = retry,
                        "Provider attempt failed: {}",
                        error
                    );
                    last_error = Some(error);
                    if !retry {
                        break;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| AttemptError::BreakerOpen {
            provider: self.config.name.clone(),
        }))
    }

    async fn try_once(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, AttemptError> {
        let timeout = self.config.effective_timeout(&request.overrides);
        let backend = Arc::clone(&self.backend);
        let breaker = Arc::clone(&self.breaker);
        let prompt = request.prompt.clone();
        let overrides = request.overrides.clone();

        debug!(
            provider = %self.config.name,
            backend = self.backend.backend_name(),
            timeout_ms = timeout.as_millis() as u64,
            "Dispatching completion"
        );

        let task = tokio::spawn(async move {
            let started = Instant::now();
            let call = AssertUnwindSafe(backend.complete_once(&prompt, &overrides)).catch_unwind();

            let outcome = match tokio::time::timeout(timeout, call).await {
                Ok(Ok(Ok(output))) => TryOutcome::Completed(output),
                Ok(Ok(Err(error))) => TryOutcome::Failed(error),
                Ok(Err(_)) => TryOutcome::Failed(BackendError::Other("backend panicked".to_string())),
                Err(_) => TryOutcome::TimedOut,
            };

            match outcome {
                TryOutcome::Completed(_) => breaker.record_success().await,
                TryOutcome::Failed(_) | TryOutcome::TimedOut => breaker.record_failure().await,
            }

            (outcome, started.elapsed())
        });

        let (outcome, latency) = task.await.map_err(|e| AttemptError::ProviderCall {
            provider: self.config.name.clone(),
            source: BackendError::Other(format!("attempt task aborted: {}", e)),
        })?;

        match outcome {
            TryOutcome::Completed(output) => Ok(self.build_response(request, output, latency)),
            TryOutcome::Failed(source) => Err(AttemptError::ProviderCall {
                provider: self.config.name.clone(),
                source,
            }),
            TryOutcome::TimedOut => Err(AttemptError::Timeout {
                provider: self.config.name.clone(),
                timeout,
            }),
        }
    }

    fn build_response(
        &self,
        request: &CompletionRequest,
        output: BackendOutput,
        latency: Duration,
    ) -> CompletionResponse {
        let cost = self.config.cost_for(output.units_consumed);

        info!(
            provider = %self.config.name,
            model = %self.config.model,
            units = output.units_consumed,
            latency_ms = latency.as_millis() as u64,
            cost,
            "Provider completed request"
        );

        CompletionResponse {
            request_id: request.id,
            text: output.text,
            model: self.config.model.clone(),
            provider: self.config.name.clone(),
            units_consumed: output.units_consumed,
            latency,
            cost,
        }
    }
}

impl std::fmt::Debug for ProviderClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderClient")
            .field("config", &self.config)
            .field("backend", &self.backend.backend_name())
            .finish()
    }
}

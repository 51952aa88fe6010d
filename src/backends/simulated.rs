use crate::provider::{
    BackendError, BackendOutput, CompletionBackend, CompletionOverrides, estimate_units,
};
use futures::future::BoxFuture;
use std::time::Duration;

/// Stand-in backend with a fixed latency and a random failure rate.
///
/// Units are the whitespace word count of the prompt.
#[derive(Debug, Clone)]
pub struct SimulatedBackend {
    model: String,
    latency: Duration,
    failure_rate: f64,
}

impl SimulatedBackend {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            latency: Duration::from_millis(100),
            failure_rate: 0.05,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Clamped to `0.0..=1.0`.
    pub fn with_failure_rate(mut self, failure_rate: f64) -> Self {
        self.failure_rate = if failure_rate.is_nan() {
            0.0
        } else {
            failure_rate.clamp(0.0, 1.0)
        };
        self
    }

    pub fn failure_rate(&self) -> f64 {
        self.failure_rate
    }
}

impl CompletionBackend for SimulatedBackend {
    fn complete_once<'a>(
        &'a self,
        prompt: &'a str,
        _overrides: &'a CompletionOverrides,
    ) -> BoxFuture<'a, Result<BackendOutput, BackendError>> {
        Box::pin(async move {
            tokio::time::sleep(self.latency).await;

            if rand::random::<f64>() < self.failure_rate {
                return Err(BackendError::Unavailable(format!(
                    "simulated API error from {}",
                    self.model
                )));
            }

            Ok(BackendOutput::new(
                format!("Response from {}", self.model),
                estimate_units(prompt),
            ))
        })
    }

    fn backend_name(&self) -> &str {
        "simulated"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_never_failing_simulation() {
        let backend = SimulatedBackend::new("gpt-4").with_failure_rate(0.0);
        let output = backend
            .complete_once("explain circuit breakers please", &CompletionOverrides::default())
            .await
            .unwrap();

        assert_eq!(output.text, "Response from gpt-4");
        assert_eq!(output.units_consumed, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_failing_simulation() {
        let backend = SimulatedBackend::new("gpt-4").with_failure_rate(1.0);
        let result = backend
            .complete_once("hi", &CompletionOverrides::default())
            .await;

        assert!(matches!(result, Err(BackendError::Unavailable(_))));
    }

    #[test]
    fn test_failure_rate_is_clamped() {
        assert_eq!(SimulatedBackend::new("m").with_failure_rate(3.0).failure_rate(), 1.0);
        assert_eq!(SimulatedBackend::new("m").with_failure_rate(-1.0).failure_rate(), 0.0);
        assert_eq!(SimulatedBackend::new("m").with_failure_rate(f64::NAN).failure_rate(), 0.0);
    }
}

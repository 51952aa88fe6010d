//! Fallback orchestration across an ordered provider chain.
//!
//! A call walks the chain strictly in configuration order and stops at the first provider
//! that answers. Providers whose breaker is open are recorded as blocked without being
//! invoked. Per-provider errors never escape on their own: the caller sees either a
//! response or one [`AllProvidersExhaustedError`] listing what happened with every provider.
//!
//! The gateway is `Send + Sync` and meant to be shared (e.g. behind an `Arc`) by many
//! concurrent callers. No lock is held across a provider attempt.

use crate::breaker::{BreakerConfig, BreakerSnapshot};
use crate::gateway::attempt::{AttemptRecord, CallSummary};
use crate::gateway::error::{AllProvidersExhaustedError, GatewayBuildError};
use crate::gateway::metrics::{GatewayMetrics, MetricsAggregator};
use crate::gateway::observer::GatewayObserver;
use crate::provider::{
    CompletionBackend, CompletionRequest, CompletionResponse, ProviderClient, ProviderConfig,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

pub struct Gateway {
    providers: Vec<ProviderClient>,
    metrics: MetricsAggregator,
    observers: Vec<Arc<dyn GatewayObserver>>,
}

/// Result of a call together with its attempt trail.
#[derive(Debug)]
pub struct CallReport {
    pub result: Result<CompletionResponse, AllProvidersExhaustedError>,
    pub attempts: Vec<AttemptRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderStatus {
    pub config: ProviderConfig,
    pub breaker: BreakerSnapshot,
}

pub struct GatewayBuilder {
    default_breaker: BreakerConfig,
    entries: Vec<ProviderEntry>,
    observers: Vec<Arc<dyn GatewayObserver>>,
}

struct ProviderEntry {
    config: ProviderConfig,
    backend: Arc<dyn CompletionBackend>,
    breaker: Option<BreakerConfig>,
}

impl GatewayBuilder {
    pub fn new() -> Self {
        Self {
            default_breaker: BreakerConfig::default(),
            entries: Vec::new(),
            observers: Vec::new(),
        }
    }

    /// Breaker settings for providers added without their own.
    pub fn breaker_config(mut self, config: BreakerConfig) -> Self {
        self.default_breaker = config;
        self
    }

    /// Append a provider to the end of the chain.
    pub fn provider(mut self, config: ProviderConfig, backend: Arc<dyn CompletionBackend>) -> Self {
        self.entries.push(ProviderEntry {
            config,
            backend,
            breaker: None,
        });
        self
    }

    pub fn provider_with_breaker(
        mut self,
        config: ProviderConfig,
        backend: Arc<dyn CompletionBackend>,
        breaker: BreakerConfig,
    ) -> Self {
        self.entries.push(ProviderEntry {
            config,
            backend,
            breaker: Some(breaker),
        });
        self
    }

    pub fn observer(mut self, observer: Arc<dyn GatewayObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn build(self) -> Result<Gateway, GatewayBuildError> {
        if self.entries.is_empty() {
            return Err(GatewayBuildError::NoProviders);
        }

        let mut seen = HashSet::new();
        let mut providers = Vec::with_capacity(self.entries.len());

        for entry in self.entries {
            entry.config.validate()?;
            if !seen.insert(entry.config.name.clone()) {
                return Err(GatewayBuildError::DuplicateProvider(entry.config.name));
            }

            let breaker = entry.breaker.unwrap_or_else(|| self.default_breaker.clone());
            if breaker.failure_threshold == 0 {
                return Err(GatewayBuildError::InvalidThreshold(entry.config.name));
            }

            debug!(
                provider = %entry.config.name,
                model = %entry.config.model,
                threshold = breaker.failure_threshold,
                "Registered provider"
            );
            providers.push(ProviderClient::new(entry.config, entry.backend, breaker));
        }

        info!("Gateway initialized with {} providers", providers.len());

        Ok(Gateway {
            providers,
            metrics: MetricsAggregator::new(),
            observers: self.observers,
        })
    }
}

impl Default for GatewayBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Gateway {
    pub fn builder() -> GatewayBuilder {
        GatewayBuilder::new()
    }

    /// Build a gateway where every provider shares the same breaker settings.
    pub fn new(
        providers: Vec<(ProviderConfig, Arc<dyn CompletionBackend>)>,
        breaker: BreakerConfig,
    ) -> Result<Self, GatewayBuildError> {
        providers
            .into_iter()
            .fold(
                GatewayBuilder::new().breaker_config(breaker),
                |builder, (config, backend)| builder.provider(config, backend),
            )
            .build()
    }

    pub async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, AllProvidersExhaustedError> {
        self.complete_traced(request).await.result
    }

    pub async fn complete_prompt(
        &self,
        prompt: impl Into<String>,
    ) -> Result<CompletionResponse, AllProvidersExhaustedError> {
        self.complete(CompletionRequest::new(prompt)).await
    }

    /// Like [`complete`](Self::complete) but also hands back the attempt trail.
    pub async fn complete_traced(&self, request: CompletionRequest) -> CallReport {
        self.metrics.record_request().await;

        let call_started = Instant::now();
        let mut attempts = Vec::with_capacity(self.providers.len());
        let mut errors = Vec::new();

        for (index, provider) in self.providers.iter().enumerate() {
            debug!(request_id = %request.id, provider = %provider.name(), index, "Attempting provider");
            let started = Instant::now();

            match provider.attempt(&request).await {
                Ok(response) => {
                    let record = AttemptRecord::success(request.id, index, &response, started.elapsed());
                    self.notify_attempt(&record);
                    attempts.push(record);

                    let fallback = index > 0;
                    self.metrics
                        .record_success(&response.provider, response.cost, fallback)
                        .await;

                    if fallback {
                        info!(
                            request_id = %request.id,
                            provider = %response.provider,
                            index,
                            "Fallback successful"
                        );
                    }

                    self.notify_call_complete(&CallSummary {
                        request_id: request.id,
                        provider: Some(response.provider.clone()),
                        attempts: attempts.len(),
                        fallback,
                        cost: response.cost,
                        total_latency: call_started.elapsed(),
                    });

                    return CallReport {
                        result: Ok(response),
                        attempts,
                    };
                }
                Err(error) => {
                    let record = AttemptRecord::failure(request.id, index, &error, started.elapsed());
                    self.notify_attempt(&record);
                    attempts.push(record);

                    self.metrics
                        .record_failure(provider.name(), error.is_blocked())
                        .await;

                    if index + 1 < self.providers.len() {
                        debug!(request_id = %request.id, "Falling back to next provider: {}", error);
                    }
                    errors.push(error);
                }
            }
        }

        self.metrics.record_exhausted().await;
        warn!(
            request_id = %request.id,
            providers = errors.len(),
            "All providers failed"
        );

        self.notify_call_complete(&CallSummary {
            request_id: request.id,
            provider: None,
            attempts: attempts.len(),
            fallback: false,
            cost: 0.0,
            total_latency: call_started.elapsed(),
        });

        CallReport {
            result: Err(AllProvidersExhaustedError { errors }),
            attempts,
        }
    }

    pub async fn metrics(&self) -> GatewayMetrics {
        self.metrics.snapshot().await
    }

    pub async fn provider_status(&self) -> Vec<ProviderStatus> {
        let mut statuses = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            statuses.push(ProviderStatus {
                config: provider.config().clone(),
                breaker: provider.breaker_snapshot().await,
            });
        }
        statuses
    }

    pub fn providers(&self) -> impl Iterator<Item = &ProviderConfig> {
        self.providers.iter().map(|p| p.config())
    }

    fn notify_attempt(&self, record: &AttemptRecord) {
        for observer in &self.observers {
            observer.on_attempt(record);
        }
    }

    fn notify_call_complete(&self, summary: &CallSummary) {
        for observer in &self.observers {
            observer.on_call_complete(summary);
        }
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("providers", &self.providers)
            .field("observers", &self.observers.len())
            .finish()
    }
}

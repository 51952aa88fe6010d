use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::Mutex;

/// Snapshot of gateway-wide counters.
///
/// Returned by value; mutating it has no effect on the gateway.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GatewayMetrics {
    pub total_requests: u64,
    /// Sum of `cost` over every successful response
    pub total_cost: f64,
    /// Successful completions per provider
    pub provider_usage: BTreeMap<String, u64>,
    /// Successes served by a provider other than the first in the chain
    pub fallback_count: u64,
    /// Calls that ended in an aggregate failure
    pub exhausted_count: u64,
    /// Failed (invoked) attempts per provider
    pub provider_failures: BTreeMap<String, u64>,
    pub blocked_attempts: u64,
    pub first_request: Option<DateTime<Utc>>,
    pub last_request: Option<DateTime<Utc>>,
}

impl GatewayMetrics {
    pub fn successful_requests(&self) -> u64 {
        self.provider_usage.values().sum()
    }

    /// Share of finished calls that produced a response.
    pub fn success_rate(&self) -> f64 {
        let successes = self.successful_requests();
        let finished = successes + self.exhausted_count;
        if finished == 0 {
            return 0.0;
        }
        successes as f64 / finished as f64
    }

    pub fn average_cost_per_success(&self) -> f64 {
        let successes = self.successful_requests();
        if successes == 0 {
            return 0.0;
        }
        self.total_cost / successes as f64
    }
}

/// Shared accumulator behind the gateway. Each update takes the lock once.
#[derive(Debug, Default)]
pub struct MetricsAggregator {
    data: Mutex<GatewayMetrics>,
}

impl MetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record_request(&self) {
        let mut data = self.data.lock().await;
        let now = Utc::now();

        data.total_requests += 1;
        if data.first_request.is_none() {
            data.first_request = Some(now);
        }
        data.last_request = Some(now);
    }

    pub async fn record_success(&self, provider: &str, cost: f64, fallback: bool) {
        let mut data = self.data.lock().await;

        *data.provider_usage.entry(provider.to_string()).or_insert(0) += 1;
        data.total_cost += cost;
        if fallback {
            data.fallback_count += 1;
        }
    }

    pub async fn record_failure(&self, provider: &str, blocked: bool) {
        let mut data = self.data.lock().await;

        if blocked {
            data.blocked_attempts += 1;
        } else {
            *data.provider_failures.entry(provider.to_string()).or_insert(0) += 1;
        }
    }

    pub async fn record_exhausted(&self) {
        let mut data = self.data.lock().await;
        data.exhausted_count += 1;
    }

    pub async fn snapshot(&self) -> GatewayMetrics {
        let data = self.data.lock().await;
        data.clone()
    }
}

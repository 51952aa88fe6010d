use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Kind of backend a provider talks to. Descriptive only; identity is [`ProviderConfig::name`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAI,
    Anthropic,
    Cohere,
    Local,
    Custom(String),
}

/// Immutable description of one provider in the fallback chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub name: String,
    pub kind: ProviderKind,
    pub model: String,
    pub cost_per_1k_units: f64,
    pub timeout: Duration,
    pub max_retries: u32,
}

/// Per-call knobs passed through to the backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionOverrides {
    /// Tightens the provider timeout for this call. Never loosens it.
    pub timeout: Option<Duration>,
    pub max_units: Option<u64>,
    pub temperature: Option<f32>,
    pub system_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub id: Uuid,
    pub prompt: String,
    pub overrides: CompletionOverrides,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub request_id: Uuid,
    pub text: String,
    pub model: String,
    pub provider: String,
    pub units_consumed: u64,
    pub latency: Duration,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvalidProviderConfig {
    #[error("provider name must not be empty")]
    EmptyName,
    #[error("provider '{0}' has no model label")]
    EmptyModel(String),
    #[error("provider '{name}' has invalid cost rate {rate}")]
    InvalidCostRate { name: String, rate: f64 },
    #[error("provider '{0}' has a zero timeout")]
    ZeroTimeout(String),
}

impl ProviderConfig {
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ProviderKind::Custom("generic".to_string()),
            model: model.into(),
            cost_per_1k_units: 0.002,
            timeout: Duration::from_secs(30),
            max_retries: 0,
        }
    }

    pub fn with_kind(mut self, kind: ProviderKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_cost_per_1k(mut self, rate: f64) -> Self {
        self.cost_per_1k_units = rate;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn validate(&self) -> Result<(), InvalidProviderConfig> {
        if self.name.trim().is_empty() {
            return Err(InvalidProviderConfig::EmptyName);
        }
        if self.model.trim().is_empty() {
            return Err(InvalidProviderConfig::EmptyModel(self.name.clone()));
        }
        if !self.cost_per_1k_units.is_finite() || self.cost_per_1k_units < 0.0 {
            return Err(InvalidProviderConfig::InvalidCostRate {
                name: self.name.clone(),
                rate: self.cost_per_1k_units,
            });
        }
        if self.timeout.is_zero() {
            return Err(InvalidProviderConfig::ZeroTimeout(self.name.clone()));
        }
        Ok(())
    }

    /// Cost of `units` at this provider's per-1k rate.
    pub fn cost_for(&self, units: u64) -> f64 {
        (units as f64 / 1000.0) * self.cost_per_1k_units
    }

    /// Timeout for one try, given the caller's overrides.
    pub fn effective_timeout(&self, overrides: &CompletionOverrides) -> Duration {
        match overrides.timeout {
            Some(timeout) => timeout.min(self.timeout),
            None => self.timeout,
        }
    }
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            prompt: prompt.into(),
            overrides: CompletionOverrides::default(),
        }
    }

    pub fn with_overrides(mut self, overrides: CompletionOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn estimated_units(&self) -> u64 {
        estimate_units(&self.prompt)
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::OpenAI => write!(f, "openai"),
            ProviderKind::Anthropic => write!(f, "anthropic"),
            ProviderKind::Cohere => write!(f, "cohere"),
            ProviderKind::Local => write!(f, "local"),
            ProviderKind::Custom(label) => write!(f, "{}", label),
        }
    }
}

/// Rough unit count: one unit per whitespace-separated word.
pub fn estimate_units(text: &str) -> u64 {
    text.split_whitespace().count() as u64
}

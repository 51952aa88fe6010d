use crate::provider::{AttemptError, InvalidProviderConfig};

/// Every provider in the chain failed or was blocked.
///
/// Carries one entry per provider, in chain order.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("All {} providers failed: {}", .errors.len(), summarize(.errors))]
pub struct AllProvidersExhaustedError {
    pub errors: Vec<AttemptError>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GatewayBuildError {
    #[error("Gateway needs at least one provider")]
    NoProviders,
    #[error("Duplicate provider name '{0}'")]
    DuplicateProvider(String),
    #[error("Invalid provider configuration: {0}")]
    InvalidProvider(#[from] InvalidProviderConfig),
    #[error("Breaker failure threshold for provider '{0}' must be at least 1")]
    InvalidThreshold(String),
}

impl AllProvidersExhaustedError {
    pub fn blocked_count(&self) -> usize {
        self.errors.iter().filter(|e| e.is_blocked()).count()
    }

    pub fn providers(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.provider()).collect()
    }
}

fn summarize(errors: &[AttemptError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

use crate::provider::backend::BackendError;
use std::time::Duration;

/// Why a single provider did not produce a completion.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AttemptError {
    #[error("Circuit breaker open for provider '{provider}'")]
    BreakerOpen { provider: String },
    #[error("Provider '{provider}' timed out after {timeout:?}")]
    Timeout { provider: String, timeout: Duration },
    #[error("Provider '{provider}' failed: {source}")]
    ProviderCall {
        provider: String,
        #[source]
        source: BackendError,
    },
}

impl AttemptError {
    pub fn provider(&self) -> &str {
        match self {
            AttemptError::BreakerOpen { provider }
            | AttemptError::Timeout { provider, .. }
            | AttemptError::ProviderCall { provider, .. } => provider,
        }
    }

    /// True when the provider was skipped without being invoked.
    pub fn is_blocked(&self) -> bool {
        matches!(self, AttemptError::BreakerOpen { .. })
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            AttemptError::BreakerOpen { .. } => false,
            AttemptError::Timeout { .. } => true,
            AttemptError::ProviderCall { source, .. } => source.is_retryable(),
        }
    }
}

use crate::provider::types::CompletionOverrides;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

/// The external capability behind a provider: produce a completion for a prompt.
///
/// The gateway does not care how the backend reaches its model (HTTP, a local process, an
/// in-memory fake). Timeouts are enforced by the caller; implementations may simply run
/// until they finish.
pub trait CompletionBackend: Send + Sync {
    fn complete_once<'a>(
        &'a self,
        prompt: &'a str,
        overrides: &'a CompletionOverrides,
    ) -> BoxFuture<'a, Result<BackendOutput, BackendError>>;

    /// Short label used in logs
    fn backend_name(&self) -> &str {
        "backend"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendOutput {
    pub text: String,
    pub units_consumed: u64,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackendError {
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Backend error: {0}")]
    Other(String),
}

impl BackendError {
    /// Whether trying the same backend again could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, BackendError::InvalidRequest(_))
    }
}

impl BackendOutput {
    pub fn new(text: impl Into<String>, units_consumed: u64) -> Self {
        Self {
            text: text.into(),
            units_consumed,
        }
    }
}

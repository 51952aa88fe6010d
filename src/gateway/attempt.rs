use crate::provider::{AttemptError, CompletionResponse};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    Failure,
    Blocked,
}

/// What happened with one provider during one gateway call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub request_id: Uuid,
    /// Position of the provider in the chain
    pub index: usize,
    pub provider: String,
    pub outcome: AttemptOutcome,
    pub error: Option<String>,
    pub latency: Duration,
}

/// One-line summary emitted when a gateway call finishes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallSummary {
    pub request_id: Uuid,
    /// Provider that answered, `None` when the chain was exhausted
    pub provider: Option<String>,
    pub attempts: usize,
    pub fallback: bool,
    pub cost: f64,
    pub total_latency: Duration,
}

impl AttemptRecord {
    pub(crate) fn success(request_id: Uuid, index: usize, response: &CompletionResponse, latency: Duration) -> Self {
        Self {
            request_id,
            index,
            provider: response.provider.clone(),
            outcome: AttemptOutcome::Success,
            error: None,
            latency,
        }
    }

    pub(crate) fn failure(request_id: Uuid, index: usize, error: &AttemptError, latency: Duration) -> Self {
        let outcome = if error.is_blocked() {
            AttemptOutcome::Blocked
        } else {
            AttemptOutcome::Failure
        };

        Self {
            request_id,
            index,
            provider: error.provider().to_string(),
            outcome,
            error: Some(error.to_string()),
            latency,
        }
    }
}

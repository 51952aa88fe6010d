use crate::provider::CompletionRequest;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use uuid::Uuid;

const WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub max_requests_per_minute: u64,
    pub max_units_per_minute: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatePermit {
    pub permit_id: Uuid,
    pub granted_at: DateTime<Utc>,
    pub units_reserved: u64,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RateLimitError {
    #[error("Request rate limit exceeded, resets in {reset_in:?}")]
    Requests { reset_in: Duration },
    #[error("Unit rate limit exceeded: need {needed}, have {available}, resets in {reset_in:?}")]
    Units {
        needed: u64,
        available: u64,
        reset_in: Duration,
    },
}

#[derive(Debug, Clone)]
pub struct RateLimiterStatus {
    pub available_units: u64,
    pub available_requests: u64,
}

/// Fixed-window limiter consulted before a request is handed to the gateway.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    state: Mutex<RateLimiterState>,
}

#[derive(Debug)]
struct RateLimiterState {
    window_start: Instant,
    requests_used: u64,
    units_used: u64,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            state: Mutex::new(RateLimiterState {
                window_start: Instant::now(),
                requests_used: 0,
                units_used: 0,
            }),
        }
    }

    /// Reserve capacity for `request`. Units are estimated from the prompt unless the
    /// request caps them explicitly.
    pub async fn acquire_permit(
        &self,
        request: &CompletionRequest,
    ) -> Result<RatePermit, RateLimitError> {
        let needed = request
            .overrides
            .max_units
            .unwrap_or_else(|| request.estimated_units());

        let mut state = self.state.lock().await;
        let now = Instant::now();
        Self::refill(&mut state, now);
        let reset_in = WINDOW.saturating_sub(now.duration_since(state.window_start));

        if state.requests_used >= self.config.max_requests_per_minute {
            return Err(RateLimitError::Requests { reset_in });
        }

        let available = self.config.max_units_per_minute.saturating_sub(state.units_used);
        if needed > available {
            return Err(RateLimitError::Units {
                needed,
                available,
                reset_in,
            });
        }

        state.requests_used += 1;
        state.units_used += needed;

        Ok(RatePermit {
            permit_id: Uuid::new_v4(),
            granted_at: Utc::now(),
            units_reserved: needed,
        })
    }

    pub async fn status(&self) -> RateLimiterStatus {
        let mut state = self.state.lock().await;
        Self::refill(&mut state, Instant::now());
        RateLimiterStatus {
            available_units: self.config.max_units_per_minute.saturating_sub(state.units_used),
            available_requests: self
                .config
                .max_requests_per_minute
                .saturating_sub(state.requests_used),
        }
    }

    fn refill(state: &mut RateLimiterState, now: Instant) {
        if now.duration_since(state.window_start) >= WINDOW {
            state.window_start = now;
            state.requests_used = 0;
            state.units_used = 0;
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests_per_minute: 60,
            max_units_per_minute: 10000,
        }
    }
}

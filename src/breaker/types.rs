use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How an open breaker lets traffic back in once its cooldown has elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReopenPolicy {
    /// Open -> Closed on the first check after the cooldown. Every caller that checks
    /// before the trial reports is let through as well.
    Optimistic,
    /// Open -> HalfOpen on the first check after the cooldown. Exactly one trial call is
    /// admitted; everyone else is rejected until it reports back.
    #[default]
    SingleTrial,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerConfig {
    pub failure_threshold: u32,
    pub cooldown: Duration,
    pub reopen_policy: ReopenPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerMode {
    Closed,
    Open,
    HalfOpen,
}

/// Point-in-time copy of a breaker's state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerSnapshot {
    pub mode: BreakerMode,
    pub consecutive_failures: u32,
    pub failure_threshold: u32,
    pub cooldown: Duration,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub times_opened: u64,
}

impl BreakerConfig {
    pub fn new(failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            failure_threshold,
            cooldown,
            reopen_policy: ReopenPolicy::default(),
        }
    }

    pub fn with_reopen_policy(mut self, policy: ReopenPolicy) -> Self {
        self.reopen_policy = policy;
        self
    }
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown: Duration::from_secs(60),
            reopen_policy: ReopenPolicy::default(),
        }
    }
}

impl std::fmt::Display for BreakerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BreakerMode::Closed => write!(f, "closed"),
            BreakerMode::Open => write!(f, "open"),
            BreakerMode::HalfOpen => write!(f, "half-open"),
        }
    }
}

use crate::breaker::types::{BreakerConfig, BreakerMode, BreakerSnapshot, ReopenPolicy};
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Per-provider failure tracker.
///
/// The mode only ever changes through [`record_success`](Self::record_success),
/// [`record_failure`](Self::record_failure) and [`can_attempt`](Self::can_attempt); there is
/// no way to force it open or closed from the outside.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: BreakerConfig,
    state: Mutex<BreakerState>,
}

#[derive(Debug)]
struct BreakerState {
    mode: BreakerMode,
    consecutive_failures: u32,
    last_failure: Option<Instant>,
    last_failure_at: Option<DateTime<Utc>>,
    trial_started: Option<Instant>,
    times_opened: u64,
}

impl BreakerState {
    fn cooldown_elapsed(&self, now: Instant, cooldown: Duration) -> bool {
        self.last_failure
            .is_none_or(|failed_at| now.duration_since(failed_at) > cooldown)
    }
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: BreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            state: Mutex::new(BreakerState {
                mode: BreakerMode::Closed,
                consecutive_failures: 0,
                last_failure: None,
                last_failure_at: None,
                trial_started: None,
                times_opened: 0,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }

    /// Whether a call may be dispatched right now.
    ///
    /// An open breaker stays closed to traffic until strictly more than the cooldown has
    /// passed since the last recorded failure. What happens next depends on the
    /// [`ReopenPolicy`].
    pub async fn can_attempt(&self) -> bool {
        let mut state = self.state.lock().await;
        let now = Instant::now();

        match state.mode {
            BreakerMode::Closed => true,
            BreakerMode::Open => {
                if !state.cooldown_elapsed(now, self.config.cooldown) {
                    return false;
                }

                match self.config.reopen_policy {
                    ReopenPolicy::Optimistic => {
                        state.mode = BreakerMode::Closed;
                        info!(provider = %self.name, "Circuit breaker cooldown elapsed, reopening optimistically");
                    }
                    ReopenPolicy::SingleTrial => {
                        state.mode = BreakerMode::HalfOpen;
                        state.trial_started = Some(now);
                        info!(provider = %self.name, "Circuit breaker half-open, admitting one trial call");
                    }
                }
                true
            }
            BreakerMode::HalfOpen => {
                // A trial that never reported back within a full cooldown is treated as lost.
                let lease_expired = state
                    .trial_started
                    .is_none_or(|started| now.duration_since(started) > self.config.cooldown);

                if lease_expired {
                    state.trial_started = Some(now);
                    warn!(provider = %self.name, "Trial call lease expired, admitting a new trial");
                    true
                } else {
                    debug!(provider = %self.name, "Trial call in flight, rejecting");
                    false
                }
            }
        }
    }

    pub async fn record_success(&self) {
        let mut state = self.state.lock().await;

        if state.mode != BreakerMode::Closed {
            info!(provider = %self.name, from = %state.mode, "Circuit breaker closed after success");
        }

        state.consecutive_failures = 0;
        state.mode = BreakerMode::Closed;
        state.trial_started = None;
    }

    pub async fn record_failure(&self) {
        let mut state = self.state.lock().await;

        state.consecutive_failures = state.consecutive_failures.saturating_add(1);
        state.last_failure = Some(Instant::now());
        state.last_failure_at = Some(Utc::now());
        state.trial_started = None;

        if state.consecutive_failures >= self.config.failure_threshold.max(1)
            && state.mode != BreakerMode::Open
        {
            state.mode = BreakerMode::Open;
            state.times_opened += 1;
            warn!(
                provider = %self.name,
                failures = state.consecutive_failures,
                cooldown_secs = self.config.cooldown.as_secs_f64(),
                "Circuit breaker OPEN"
            );
        } else {
            debug!(
                provider = %self.name,
                failures = state.consecutive_failures,
                mode = %state.mode,
                "Recorded provider failure"
            );
        }
    }

    pub async fn snapshot(&self) -> BreakerSnapshot {
        let state = self.state.lock().await;
        BreakerSnapshot {
            mode: state.mode,
            consecutive_failures: state.consecutive_failures,
            failure_threshold: self.config.failure_threshold,
            cooldown: self.config.cooldown,
            last_failure_at: state.last_failure_at,
            times_opened: state.times_opened,
        }
    }
}

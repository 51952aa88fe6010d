//! Deterministic backend for exercising breaker and fallback behaviour.
//!
//! Steps are consumed in order; once the script runs out the fallback step repeats forever.

use crate::provider::{BackendError, BackendOutput, CompletionBackend, CompletionOverrides};
use futures::future::BoxFuture;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum ScriptStep {
    Succeed {
        text: String,
        units: u64,
        delay: Duration,
    },
    Fail {
        error: BackendError,
        delay: Duration,
    },
    Panic,
}

#[derive(Debug)]
pub struct ScriptedBackend {
    name: String,
    steps: Mutex<VecDeque<ScriptStep>>,
    fallback: ScriptStep,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptStep {
    pub fn succeed(text: impl Into<String>, units: u64) -> Self {
        ScriptStep::Succeed {
            text: text.into(),
            units,
            delay: Duration::ZERO,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        ScriptStep::Fail {
            error: BackendError::Unavailable(message.into()),
            delay: Duration::ZERO,
        }
    }

    pub fn fail_with(error: BackendError) -> Self {
        ScriptStep::Fail {
            error,
            delay: Duration::ZERO,
        }
    }

    pub fn after(self, delay: Duration) -> Self {
        match self {
            ScriptStep::Succeed { text, units, .. } => ScriptStep::Succeed { text, units, delay },
            ScriptStep::Fail { error, .. } => ScriptStep::Fail { error, delay },
            ScriptStep::Panic => ScriptStep::Panic,
        }
    }
}

impl ScriptedBackend {
    pub fn new(name: impl Into<String>, fallback: ScriptStep) -> Self {
        Self {
            name: name.into(),
            steps: Mutex::new(VecDeque::new()),
            fallback,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Always succeeds with `units` units.
    pub fn always_ok(name: impl Into<String>, units: u64) -> Self {
        let name = name.into();
        let text = format!("Response from {}", name);
        Self::new(name, ScriptStep::succeed(text, units))
    }

    pub fn always_failing(name: impl Into<String>) -> Self {
        let name = name.into();
        let message = format!("API error from {}", name);
        Self::new(name, ScriptStep::fail(message))
    }

    pub fn then(self, step: ScriptStep) -> Self {
        self.steps
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_back(step);
        self
    }

    /// Number of times the backend was actually invoked.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn next_step(&self) -> ScriptStep {
        self.steps
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

impl CompletionBackend for ScriptedBackend {
    fn complete_once<'a>(
        &'a self,
        prompt: &'a str,
        _overrides: &'a CompletionOverrides,
    ) -> BoxFuture<'a, Result<BackendOutput, BackendError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(prompt.to_string());
        let step = self.next_step();

        Box::pin(async move {
            match step {
                ScriptStep::Succeed { text, units, delay } => {
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    Ok(BackendOutput::new(text, units))
                }
                ScriptStep::Fail { error, delay } => {
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    Err(error)
                }
                ScriptStep::Panic => panic!("scripted backend '{}' panicked", self.name),
            }
        })
    }

    fn backend_name(&self) -> &str {
        &self.name
    }
}

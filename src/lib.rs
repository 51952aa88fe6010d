//! # LLM Relay
//!
//! A resilient completion gateway. A request is routed across an ordered list of
//! interchangeable providers; each provider has its own circuit breaker so providers that
//! keep failing stop being called, and the fallback chain keeps the overall call succeeding
//! as long as any provider is healthy.
//!
//! ## Architecture Overview
//!
//! - **[`breaker`]**: Per-provider failure/recovery state machine
//! - **[`provider`]**: Provider descriptors, the backend capability trait, and the client
//!   that applies timeouts, retries and cost accounting
//! - **[`gateway`]**: The fallback orchestrator, its metrics and observer sinks
//! - **[`backends`]**: Simulated, scripted and command-line backends
//! - **[`limiter`]**: Rate limiter consulted before requests enter the gateway
//! - **[`cli`]**: Argument parsing and TOML configuration discovery
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use llm_relay::backends::SimulatedBackend;
//! use llm_relay::{BreakerConfig, Gateway, ProviderConfig};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let gateway = Gateway::builder()
//!         .breaker_config(BreakerConfig::new(5, Duration::from_secs(60)))
//!         .provider(
//!             ProviderConfig::new("primary", "gpt-4").with_cost_per_1k(0.03),
//!             Arc::new(SimulatedBackend::new("gpt-4")),
//!         )
//!         .provider(
//!             ProviderConfig::new("backup", "gpt-3.5-turbo").with_cost_per_1k(0.002),
//!             Arc::new(SimulatedBackend::new("gpt-3.5-turbo")),
//!         )
//!         .build()?;
//!
//!     let response = gateway.complete_prompt("Explain circuit breakers").await?;
//!     println!("{} answered: {}", response.provider, response.text);
//!     println!("{:?}", gateway.metrics().await);
//!     Ok(())
//! }
//! ```

/// Per-provider circuit breaker.
pub mod breaker;

/// Provider descriptors, backend capability and provider client.
pub mod provider;

/// Fallback orchestration, metrics aggregation and observers.
pub mod gateway;

/// Ready-made backends.
pub mod backends;

/// Admission control collaborators.
pub mod limiter;

/// Environment constants and path utilities.
pub mod env;

// CLI module for command-line interface
pub mod cli;

pub use breaker::{BreakerConfig, BreakerMode, BreakerSnapshot, CircuitBreaker, ReopenPolicy};
pub use gateway::{
    AllProvidersExhaustedError, AttemptOutcome, AttemptRecord, CallReport, Gateway,
    GatewayBuildError, GatewayBuilder, GatewayMetrics,
};
pub use provider::{
    AttemptError, BackendError, BackendOutput, CompletionBackend, CompletionOverrides,
    CompletionRequest, CompletionResponse, ProviderConfig, ProviderKind,
};

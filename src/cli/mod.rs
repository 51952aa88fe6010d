//! CLI-specific functionality for the relay
//!
//! This module contains argument parsing and configuration file discovery.

pub mod args;
pub mod config;

pub use args::{Args, CompleteConfig, ExecutionMode, InteractiveConfig};
pub use config::{BackendSpec, BreakerSection, ConfigDiscovery, ConfigError, GatewayFileConfig, ProviderEntry};

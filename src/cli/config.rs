//! Configuration file format and discovery
//!
//! The gateway is described by a TOML file:
//!
//! ```toml
//! [breaker]
//! failure_threshold = 5
//! cooldown_secs = 60.0
//! reopen_policy = "single_trial"
//!
//! [rate_limits]
//! max_requests_per_minute = 60
//! max_units_per_minute = 10000
//!
//! [[providers]]
//! name = "openai-gpt-4"
//! kind = "openai"
//! model = "gpt-4"
//! cost_per_1k_tokens = 0.03
//! timeout_secs = 30.0
//!
//! [providers.backend]
//! type = "simulated"
//! latency_ms = 100
//! failure_rate = 0.05
//! ```
//!
//! Discovery hierarchy:
//! 1. `$RELAY_CONFIG`
//! 2. Current directory: ./relay.toml or ./.relay/config.toml
//! 3. User config: ~/.relay/config.toml
//! 4. System config: /etc/relay/config.toml
//! 5. Built-in defaults

use crate::backends::{CommandBackend, SimulatedBackend};
use crate::breaker::{BreakerConfig, ReopenPolicy};
use crate::env;
use crate::gateway::{Gateway, GatewayBuildError, GatewayObserver};
use crate::limiter::{RateLimitConfig, RateLimiter};
use crate::provider::{BackendError, CompletionBackend, ProviderConfig, ProviderKind};
use serde::{Deserialize, Serialize};
use std::env as std_env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayFileConfig {
    #[serde(default)]
    pub breaker: BreakerSection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limits: Option<RateLimitConfig>,
    pub providers: Vec<ProviderEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerSection {
    pub failure_threshold: u32,
    pub cooldown_secs: f64,
    #[serde(default)]
    pub reopen_policy: ReopenPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderEntry {
    pub name: String,
    pub kind: ProviderKind,
    pub model: String,
    #[serde(default = "default_cost_per_1k")]
    pub cost_per_1k_tokens: f64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: f64,
    #[serde(default)]
    pub max_retries: u32,
    /// Overrides the top-level `[breaker]` section for this provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breaker: Option<BreakerSection>,
    pub backend: BackendSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackendSpec {
    Simulated {
        #[serde(default = "default_latency_ms")]
        latency_ms: u64,
        #[serde(default)]
        failure_rate: f64,
    },
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Invalid duration for {field}: {value}")]
    InvalidDuration { field: String, value: f64 },
    #[error("Backend for provider '{provider}' could not be created: {source}")]
    Backend {
        provider: String,
        #[source]
        source: BackendError,
    },
    #[error(transparent)]
    Build(#[from] GatewayBuildError),
}

fn default_cost_per_1k() -> f64 {
    0.002
}

fn default_timeout_secs() -> f64 {
    30.0
}

fn default_latency_ms() -> u64 {
    100
}

fn secs_to_duration(field: &str, value: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(value).map_err(|_| ConfigError::InvalidDuration {
        field: field.to_string(),
        value,
    })
}

impl Default for BreakerSection {
    fn default() -> Self {
        let defaults = BreakerConfig::default();
        Self {
            failure_threshold: defaults.failure_threshold,
            cooldown_secs: defaults.cooldown.as_secs_f64(),
            reopen_policy: defaults.reopen_policy,
        }
    }
}

impl BreakerSection {
    pub fn to_breaker_config(&self) -> Result<BreakerConfig, ConfigError> {
        Ok(BreakerConfig {
            failure_threshold: self.failure_threshold,
            cooldown: secs_to_duration("breaker.cooldown_secs", self.cooldown_secs)?,
            reopen_policy: self.reopen_policy,
        })
    }
}

impl ProviderEntry {
    fn simulated(name: &str, kind: ProviderKind, model: &str, cost_per_1k_tokens: f64) -> Self {
        Self {
            name: name.to_string(),
            kind,
            model: model.to_string(),
            cost_per_1k_tokens,
            timeout_secs: default_timeout_secs(),
            max_retries: 0,
            breaker: None,
            backend: BackendSpec::Simulated {
                latency_ms: default_latency_ms(),
                failure_rate: 0.05,
            },
        }
    }

    pub fn to_provider_config(&self) -> Result<ProviderConfig, ConfigError> {
        let timeout = secs_to_duration(
            &format!("providers.{}.timeout_secs", self.name),
            self.timeout_secs,
        )?;

        Ok(ProviderConfig::new(self.name.clone(), self.model.clone())
            .with_kind(self.kind.clone())
            .with_cost_per_1k(self.cost_per_1k_tokens)
            .with_timeout(timeout)
            .with_max_retries(self.max_retries))
    }

    pub fn create_backend(&self) -> Result<Arc<dyn CompletionBackend>, ConfigError> {
        match &self.backend {
            BackendSpec::Simulated {
                latency_ms,
                failure_rate,
            } => Ok(Arc::new(
                SimulatedBackend::new(self.model.clone())
                    .with_latency(Duration::from_millis(*latency_ms))
                    .with_failure_rate(*failure_rate),
            )),
            BackendSpec::Command { program, args } => {
                let backend = CommandBackend::new(program, args.clone()).map_err(|source| {
                    ConfigError::Backend {
                        provider: self.name.clone(),
                        source,
                    }
                })?;
                Ok(Arc::new(backend))
            }
        }
    }
}

impl Default for GatewayFileConfig {
    /// Expensive/capable first, cheaper models behind it.
    fn default() -> Self {
        Self {
            breaker: BreakerSection::default(),
            rate_limits: None,
            providers: vec![
                ProviderEntry::simulated("openai-gpt-4", ProviderKind::OpenAI, "gpt-4", 0.03),
                ProviderEntry::simulated(
                    "openai-gpt-3.5-turbo",
                    ProviderKind::OpenAI,
                    "gpt-3.5-turbo",
                    0.002,
                ),
                ProviderEntry::simulated(
                    "anthropic-claude-2",
                    ProviderKind::Anthropic,
                    "claude-2",
                    0.008,
                ),
            ],
        }
    }
}

impl GatewayFileConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load from TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Save to TOML file
    pub fn to_toml_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Build the gateway described by this file.
    pub fn build_gateway(
        &self,
        observers: Vec<Arc<dyn GatewayObserver>>,
    ) -> Result<Gateway, ConfigError> {
        let mut builder = Gateway::builder().breaker_config(self.breaker.to_breaker_config()?);

        for entry in &self.providers {
            let config = entry.to_provider_config()?;
            let backend = entry.create_backend()?;
            builder = match entry.breaker {
                Some(ref section) => {
                    builder.provider_with_breaker(config, backend, section.to_breaker_config()?)
                }
                None => builder.provider(config, backend),
            };
        }

        for observer in observers {
            builder = builder.observer(observer);
        }

        Ok(builder.build()?)
    }

    pub fn rate_limiter(&self) -> Option<RateLimiter> {
        self.rate_limits.clone().map(RateLimiter::new)
    }
}

/// Configuration discovery system
pub struct ConfigDiscovery;

impl ConfigDiscovery {
    /// Discover and load configuration using the hierarchy
    pub fn discover_config() -> Result<GatewayFileConfig, ConfigError> {
        if let Some(config_path) = Self::find_config_file() {
            info!("Loading configuration from: {:?}", config_path);
            return GatewayFileConfig::from_toml_file(config_path);
        }

        info!("No configuration file found, using defaults");
        Ok(GatewayFileConfig::default())
    }

    /// Find configuration file using discovery hierarchy
    pub fn find_config_file() -> Option<PathBuf> {
        for candidate in Self::get_config_candidates() {
            debug!("Checking for config file: {:?}", candidate);
            if candidate.is_file() {
                debug!("Found config file: {:?}", candidate);
                return Some(candidate);
            }
        }

        debug!("No config file found in discovery hierarchy");
        None
    }

    fn get_config_candidates() -> Vec<PathBuf> {
        Self::candidates_from(
            std_env::var_os(env::CONFIG_ENV_VAR).map(PathBuf::from),
            std_env::current_dir().ok(),
            Self::get_home_dir(),
        )
    }

    /// Candidate paths in priority order
    pub fn candidates_from(
        explicit: Option<PathBuf>,
        current_dir: Option<PathBuf>,
        home_dir: Option<PathBuf>,
    ) -> Vec<PathBuf> {
        let mut candidates = Vec::new();

        if let Some(path) = explicit {
            candidates.push(path);
        }

        if let Some(current_dir) = current_dir {
            candidates.push(env::project_config_file_path(&current_dir));
            candidates.push(env::local_config_file_path(&current_dir));
        }

        if let Some(home_dir) = home_dir {
            candidates.push(env::user_config_file_path(&home_dir));
        }

        #[cfg(unix)]
        candidates.push(PathBuf::from(env::SYSTEM_CONFIG_PATH));

        candidates
    }

    fn get_home_dir() -> Option<PathBuf> {
        std_env::var("HOME")
            .ok()
            .or_else(|| std_env::var("USERPROFILE").ok())
            .map(PathBuf::from)
    }

    /// Write the built-in defaults to `path` unless a file already exists there.
    pub fn create_default_config(path: &Path) -> Result<bool, ConfigError> {
        if path.exists() {
            warn!("Configuration file already exists: {:?}", path);
            return Ok(false);
        }

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        GatewayFileConfig::default().to_toml_file(path)?;
        info!("Created default configuration file: {:?}", path);
        Ok(true)
    }

    /// Show configuration discovery information for debugging
    pub fn show_discovery_info() {
        println!("Configuration Discovery Hierarchy:");
        println!();

        for (i, candidate) in Self::get_config_candidates().iter().enumerate() {
            let status = if candidate.exists() {
                if candidate.is_file() {
                    "✓ EXISTS"
                } else {
                    "✗ NOT A FILE"
                }
            } else {
                "✗ NOT FOUND"
            };

            println!("  {}. {:?} - {}", i + 1, candidate, status);
        }

        println!();
        match Self::find_config_file() {
            Some(found) => println!("Active configuration: {:?}", found),
            None => println!("Active configuration: Built-in defaults"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_serialization() {
        let config = GatewayFileConfig::default();
        let toml_string = toml::to_string(&config).unwrap();

        let deserialized: GatewayFileConfig = toml::from_str(&toml_string).unwrap();
        assert_eq!(deserialized.providers.len(), 3);
        assert_eq!(deserialized.providers[0].model, "gpt-4");
        assert_eq!(deserialized.providers[2].kind, ProviderKind::Anthropic);
        assert_eq!(deserialized.providers[1].backend, config.providers[1].backend);
    }

    #[test]
    fn test_config_file_operations() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("relay.toml");

        assert!(ConfigDiscovery::create_default_config(&config_path).unwrap());
        assert!(!ConfigDiscovery::create_default_config(&config_path).unwrap());

        let loaded = GatewayFileConfig::from_toml_file(&config_path).unwrap();
        assert_eq!(loaded.breaker.failure_threshold, 5);
        assert_eq!(loaded.providers.len(), 3);
    }

    #[test]
    fn test_candidates_order() {
        let candidates = ConfigDiscovery::candidates_from(
            Some(PathBuf::from("/explicit/relay.toml")),
            Some(PathBuf::from("/project")),
            Some(PathBuf::from("/home/user")),
        );

        assert_eq!(candidates[0], PathBuf::from("/explicit/relay.toml"));
        assert_eq!(candidates[1], PathBuf::from("/project/relay.toml"));
        assert_eq!(candidates[2], PathBuf::from("/project/.relay/config.toml"));
        assert_eq!(candidates[3], PathBuf::from("/home/user/.relay/config.toml"));
    }

    #[test]
    fn test_negative_cooldown_is_rejected() {
        let section = BreakerSection {
            failure_threshold: 3,
            cooldown_secs: -1.0,
            reopen_policy: ReopenPolicy::Optimistic,
        };
        assert!(matches!(
            section.to_breaker_config(),
            Err(ConfigError::InvalidDuration { .. })
        ));
    }

    #[test]
    fn test_missing_command_fails_gateway_build() {
        let config = GatewayFileConfig::from_toml_str(
            r#"
            [[providers]]
            name = "local"
            kind = "local"
            model = "llama"

            [providers.backend]
            type = "command"
            program = "definitely-not-a-real-relay-binary"
            "#,
        )
        .unwrap();

        assert!(matches!(
            config.build_gateway(Vec::new()),
            Err(ConfigError::Backend { .. })
        ));
    }
}

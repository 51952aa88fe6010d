//! Command line argument parsing
//!
//! Subcommands:
//! - `complete`: Send one prompt through the fallback chain (optionally many times)
//! - `interactive`: Read prompts from stdin until `quit`
//! - `status`: Show the configured chain
//! - `show-config`: Show configuration discovery information
//! - `init-config`: Write the built-in defaults to a config file

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug)]
pub enum ExecutionMode {
    Complete(CompleteConfig),
    Interactive(InteractiveConfig),
    Status { config_override: Option<PathBuf> },
    ShowConfig,
    InitConfig { path: Option<PathBuf> },
}

#[derive(Debug)]
pub struct CompleteConfig {
    pub prompt: String,
    pub config_override: Option<PathBuf>,
    pub repeat: usize,
    pub concurrency: usize,
    pub json: bool,
    pub audit_log: Option<PathBuf>,
    pub system_message: Option<String>,
    pub timeout_secs: Option<f64>,
}

#[derive(Debug)]
pub struct InteractiveConfig {
    pub config_override: Option<PathBuf>,
    pub audit_log: Option<PathBuf>,
    pub verbose: bool,
}

#[derive(Debug, Parser)]
#[command(name = "relay")]
#[command(author = "LLM Relay Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Route completions across a chain of LLM providers with circuit breakers and fallback"
)]
#[command(long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Send a prompt through the provider chain
    Complete {
        /// Prompt text (multiple words are joined with spaces)
        #[arg(required = true)]
        prompt: Vec<String>,
        /// Configuration file path
        #[arg(short = 'c', long = "config")]
        config: Option<PathBuf>,
        /// Number of times to send the prompt
        #[arg(short = 'n', long = "repeat", default_value_t = 1)]
        repeat: usize,
        /// How many requests may be in flight at once
        #[arg(short = 'j', long = "concurrency", default_value_t = 1)]
        concurrency: usize,
        /// Print responses and metrics as JSON
        #[arg(long = "json")]
        json: bool,
        /// Append attempt records to this JSON lines file
        #[arg(long = "audit-log", value_name = "FILE")]
        audit_log: Option<PathBuf>,
        /// System message forwarded to the backend
        #[arg(long = "system", value_name = "TEXT")]
        system_message: Option<String>,
        /// Per-call timeout in seconds (can only tighten provider timeouts)
        #[arg(long = "timeout", value_name = "SECS")]
        timeout_secs: Option<f64>,
    },
    /// Read prompts from stdin
    Interactive {
        /// Configuration file path
        #[arg(short = 'c', long = "config")]
        config: Option<PathBuf>,
        /// Append attempt records to this JSON lines file
        #[arg(long = "audit-log", value_name = "FILE")]
        audit_log: Option<PathBuf>,
        /// Enable verbose output
        #[arg(short = 'v', long = "verbose")]
        verbose: bool,
    },
    /// Show the configured provider chain
    Status {
        /// Configuration file path
        #[arg(short = 'c', long = "config")]
        config: Option<PathBuf>,
    },
    /// Show configuration discovery information
    ShowConfig,
    /// Write a default configuration file
    InitConfig {
        /// Target path (defaults to ~/.relay/config.toml)
        path: Option<PathBuf>,
    },
}

impl Args {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn mode(&self) -> Result<ExecutionMode, String> {
        match &self.command {
            Some(Commands::Complete {
                prompt,
                config,
                repeat,
                concurrency,
                json,
                audit_log,
                system_message,
                timeout_secs,
            }) => {
                let prompt = prompt.join(" ");
                if prompt.trim().is_empty() {
                    return Err("Prompt must not be empty".to_string());
                }
                if *repeat == 0 {
                    return Err("--repeat must be at least 1".to_string());
                }
                if let Some(secs) = timeout_secs
                    && !(secs.is_finite() && *secs > 0.0)
                {
                    return Err(format!("--timeout must be a positive number, got {}", secs));
                }

                Ok(ExecutionMode::Complete(CompleteConfig {
                    prompt,
                    config_override: config.clone(),
                    repeat: *repeat,
                    concurrency: (*concurrency).max(1),
                    json: *json,
                    audit_log: audit_log.clone(),
                    system_message: system_message.clone(),
                    timeout_secs: *timeout_secs,
                }))
            }
            Some(Commands::Interactive {
                config,
                audit_log,
                verbose,
            }) => Ok(ExecutionMode::Interactive(InteractiveConfig {
                config_override: config.clone(),
                audit_log: audit_log.clone(),
                verbose: *verbose,
            })),
            Some(Commands::Status { config }) => Ok(ExecutionMode::Status {
                config_override: config.clone(),
            }),
            Some(Commands::ShowConfig) => Ok(ExecutionMode::ShowConfig),
            Some(Commands::InitConfig { path }) => {
                Ok(ExecutionMode::InitConfig { path: path.clone() })
            }
            None => Err(
                "No command specified. Use 'relay --help' to see available commands.".to_string(),
            ),
        }
    }
}

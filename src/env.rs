//! Environment constants and path utilities for the relay.
//!
//! Centralizes the file names, directory names and environment variables the gateway and
//! CLI look at, so they are defined exactly once.

use std::path::{Path, PathBuf};

/// Main application directory name (hidden directory like .git, .vscode)
pub const RELAY_DIR_NAME: &str = ".relay";

/// Configuration file name inside the relay directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Configuration file name at the root of a project
pub const LOCAL_CONFIG_FILE_NAME: &str = "relay.toml";

/// System-wide configuration file (Unix-like systems)
pub const SYSTEM_CONFIG_PATH: &str = "/etc/relay/config.toml";

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV_VAR: &str = "RELAY_CONFIG";

/// Environment variable holding the tracing filter
pub const LOG_ENV_VAR: &str = "RELAY_LOG";

/// Filter used when [`LOG_ENV_VAR`] is unset
pub const DEFAULT_LOG_FILTER: &str = "llm_relay=info,relay=info";

/// Build the .relay directory path from a base directory
pub fn relay_dir_path(base: &Path) -> PathBuf {
    base.join(RELAY_DIR_NAME)
}

/// Build config file path in user's home directory
pub fn user_config_file_path(home_dir: &Path) -> PathBuf {
    relay_dir_path(home_dir).join(CONFIG_FILE_NAME)
}

/// Build the `./relay.toml` path for a project directory
pub fn project_config_file_path(current_dir: &Path) -> PathBuf {
    current_dir.join(LOCAL_CONFIG_FILE_NAME)
}

/// Build the `./.relay/config.toml` path for a project directory
pub fn local_config_file_path(current_dir: &Path) -> PathBuf {
    relay_dir_path(current_dir).join(CONFIG_FILE_NAME)
}

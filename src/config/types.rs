//! Core configuration types and loading.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

use super::chat::ChatConfig;
use super::defaults::{
    default_channel_capacity, default_database_path, default_metrics_port,
    default_prune_interval,
};
use super::seed::{ProjectBlock, RoleBlock, UserBlock};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server identity and listeners.
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Project chat configuration.
    #[serde(default)]
    pub chat: ChatConfig,
    /// Realtime room configuration.
    #[serde(default)]
    pub realtime: RealtimeConfig,
    /// Roles and their grants.
    #[serde(default)]
    pub roles: Vec<RoleBlock>,
    /// API users.
    #[serde(default)]
    pub users: Vec<UserBlock>,
    /// Projects and their members.
    #[serde(default)]
    pub projects: Vec<ProjectBlock>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Server identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Instance name, used in logs.
    pub name: String,
    /// Address the API listens on (e.g., "127.0.0.1:8000").
    pub listen: SocketAddr,
    /// Prometheus metrics HTTP port (default: 9090, 0 disables).
    #[serde(default = "default_metrics_port")]
    pub metrics_port: Option<u16>,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file, or ":memory:".
    #[serde(default = "default_database_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

/// Realtime room configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeConfig {
    /// Buffered events per room before slow subscribers start skipping.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// Seconds between idle-room sweeps.
    #[serde(default = "default_prune_interval")]
    pub prune_interval_secs: u64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            prune_interval_secs: default_prune_interval(),
        }
    }
}

//! Process configuration
//!
//! Loaded once at startup from a JSON file (default `config.json`,
//! overridable with `--config <path>`). Every section carries serde
//! defaults so a missing file yields a working local setup.
use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default config file path
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub websocket: WebsocketConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database path; ":memory:" runs without a file
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebsocketConfig {
    /// Per-connection outbound queue capacity; full queues drop broadcasts
    pub client_buffer_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "data/scope.db".to_string(),
        }
    }
}

impl Default for WebsocketConfig {
    fn default() -> Self {
        Self {
            client_buffer_size: 256,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file
    ///
    /// A missing file is not an error; defaults are used so the hub can
    /// run with zero setup.
    pub fn load(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path))?;
        let config: Config = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path))?;
        Ok(config)
    }
}

// Global config (set once during startup)
static CONFIG: OnceCell<Config> = OnceCell::new();

/// Install the loaded configuration; later calls are ignored
pub fn init(config: Config) {
    CONFIG.set(config).ok();
}

/// Access the global configuration (defaults if never initialized)
pub fn with_config<F, R>(f: F) -> R
where
    F: FnOnce(&Config) -> R,
{
    f(CONFIG.get_or_init(Config::default))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.database.path, "data/scope.db");
        assert_eq!(config.websocket.client_buffer_size, 256);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let raw = r#"{ "server": { "host": "0.0.0.0", "port": 9000 } }"#;
        let config: Config = serde_json::from_str(raw).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.websocket.client_buffer_size, 256);
    }

    #[test]
    fn test_missing_file_is_default() {
        let config = Config::load("definitely/not/here.json").unwrap();
        assert_eq!(config.server.port, 3001);
    }
}

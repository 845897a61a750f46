//! Configuration for simterm.
//!
//! This module provides:
//! - TOML configuration file loading from `~/.simterm/config.toml`
//! - Built-in defaults for every setting
//!
//! # Configuration File
//!
//! The configuration file is located at `~/.simterm/config.toml`:
//!
//! ```toml
//! # Simulator endpoint
//! host = "localhost"
//! port = 8080
//!
//! [script]
//! commands = ["M105", "M114", "G28"]
//! delay_ms = 1000
//!
//! [connect]
//! timeout_secs = 10
//! ```
//!
//! A missing or malformed file falls back to the defaults. Command line
//! flags override config file values.

use std::fs;
use std::path::PathBuf;
use serde::{Deserialize, Serialize};

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Simulator host
    pub host: String,
    /// Simulator TCP port
    pub port: u16,
    /// Scripted command phase settings
    pub script: ScriptConfig,
    /// Connection settings
    pub connect: ConnectConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8080,
            script: ScriptConfig::default(),
            connect: ConnectConfig::default(),
        }
    }
}

/// Scripted command phase configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    /// Commands sent automatically after connecting
    pub commands: Vec<String>,
    /// Pause after each command, in milliseconds
    pub delay_ms: u64,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            commands: vec![
                "M105".to_string(),
                "M114".to_string(),
                "G28".to_string(),
            ],
            delay_ms: 1000,
        }
    }
}

/// Connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectConfig {
    /// Connect timeout per resolved address, in seconds
    pub timeout_secs: u64,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self { timeout_secs: 10 }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load() -> Self {
        if let Some(path) = Self::get_config_path() {
            if path.exists() {
                if let Ok(content) = fs::read_to_string(&path) {
                    if let Ok(config) = toml::from_str(&content) {
                        return config;
                    }
                }
            }
        }
        Self::default()
    }

    /// Save configuration to file
    #[allow(dead_code)]
    pub fn save(&self) -> Result<(), String> {
        if let Some(path) = Self::get_config_path() {
            let content = toml::to_string_pretty(self)
                .map_err(|e| format!("Failed to serialize config: {}", e))?;
            fs::write(&path, content)
                .map_err(|e| format!("Failed to write config: {}", e))?;
            Ok(())
        } else {
            Err("Could not determine config path".to_string())
        }
    }

    /// Get config file path
    fn get_config_path() -> Option<PathBuf> {
        if let Some(home) = home_dir() {
            let simterm_dir = home.join(".simterm");
            if !simterm_dir.exists() {
                let _ = fs::create_dir_all(&simterm_dir);
            }
            return Some(simterm_dir.join("config.toml"));
        }
        None
    }
}

/// Get home directory
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("USERPROFILE")
        .or_else(|| std::env::var_os("HOME"))
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 8080);
        assert_eq!(config.script.commands, vec!["M105", "M114", "G28"]);
        assert_eq!(config.script.delay_ms, 1000);
        assert_eq!(config.connect.timeout_secs, 10);
    }

    #[test]
    fn test_parse_full_file() {
        let text = r#"
host = "192.168.1.50"
port = 9100

[script]
commands = ["M115"]
delay_ms = 250

[connect]
timeout_secs = 3
"#;
        let config: Config = toml::from_str(text).unwrap();
        assert_eq!(config.host, "192.168.1.50");
        assert_eq!(config.port, 9100);
        assert_eq!(config.script.commands, vec!["M115"]);
        assert_eq!(config.script.delay_ms, 250);
        assert_eq!(config.connect.timeout_secs, 3);
    }

    #[test]
    fn test_parse_partial_file_uses_defaults() {
        let config: Config = toml::from_str("port = 9100").unwrap();
        assert_eq!(config.port, 9100);
        assert_eq!(config.host, "localhost");
        assert_eq!(config.script.commands, vec!["M105", "M114", "G28"]);
        assert_eq!(config.connect.timeout_secs, 10);
    }
}

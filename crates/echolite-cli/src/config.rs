//! Configuration file handling for the echolite CLI

use anyhow::{Context, Result};
use echolite_client::ClientConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Contents of the TOML configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Client settings (`[client]` table)
    pub client: ClientConfig,
    /// Discovery settings (`[discovery]` table)
    pub discovery: DiscoverySettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoverySettings {
    /// Seconds to keep collecting responses after a multicast discovery
    pub wait_secs: u64,
    /// Seconds between property polls in `monitor`
    pub poll_secs: u64,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            wait_secs: 3,
            poll_secs: 30,
        }
    }
}

impl CliConfig {
    /// Load from `path`, or from the default location when none is given
    ///
    /// A missing default file yields the defaults; a missing explicit file
    /// is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (default_config_file(), false),
        };

        if !explicit && !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// Get the default config file path
pub fn default_config_file() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("echolite")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = CliConfig::parse("").unwrap();
        assert_eq!(config, CliConfig::default());
        assert_eq!(config.discovery.wait_secs, 3);
    }

    #[test]
    fn test_partial_tables() {
        let config = CliConfig::parse(
            r#"
            [client]
            bind = "0.0.0.0:3610"
            multicast_interface = "192.168.1.2"
            max_polls = 50

            [discovery]
            poll_secs = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.client.multicast_interface, Ipv4Addr::new(192, 168, 1, 2));
        assert_eq!(config.client.max_polls, 50);
        assert_eq!(config.client.poll_interval_ms, 100);
        assert_eq!(config.discovery.poll_secs, 5);
        assert_eq!(config.discovery.wait_secs, 3);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(CliConfig::parse("[client\nbind = 1").is_err());
    }

    #[test]
    fn test_missing_explicit_file() {
        let result = CliConfig::load(Some(Path::new("/nonexistent/echolite.toml")));
        assert!(result.is_err());
    }
}

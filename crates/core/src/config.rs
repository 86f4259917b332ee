//! Configuration management.

use crate::error::{Error, Result};
use crate::network::Network;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Address of the rendezvous broker the transport should register with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Broker hostname.
    pub host: String,
    /// Broker port.
    pub port: u16,
    /// Mount path on the broker.
    pub path: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 9000,
            path: "/".to_string(),
        }
    }
}

/// Application manifest forwarded to the signer connector on init.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestConfig {
    /// Developer contact address.
    pub email: String,
    /// Application URL.
    pub app_url: String,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            email: "dev@sigchat.invalid".to_string(),
            app_url: "http://localhost:8080".to_string(),
        }
    }
}

/// Main configuration struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Default network for newly hosted sessions.
    #[serde(default)]
    pub network: Network,

    /// Rendezvous broker address.
    #[serde(default)]
    pub broker: BrokerConfig,

    /// Signer connector manifest.
    #[serde(default)]
    pub manifest: ManifestConfig,
}

impl Config {
    /// Load configuration from a file, or defaults if the file is absent.
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Load configuration with environment overrides applied on top.
    ///
    /// Recognized variables: `SIGCHAT_NETWORK`, `SIGCHAT_BROKER_HOST`,
    /// `SIGCHAT_BROKER_PORT`, `SIGCHAT_BROKER_PATH`,
    /// `SIGCHAT_MANIFEST_EMAIL`, `SIGCHAT_MANIFEST_URL`.
    pub fn load_with_env(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Config::default(),
        };

        if let Ok(tag) = std::env::var("SIGCHAT_NETWORK") {
            config.network = Network::from_tag(&tag);
        }
        if let Ok(host) = std::env::var("SIGCHAT_BROKER_HOST") {
            config.broker.host = host;
        }
        if let Ok(port) = std::env::var("SIGCHAT_BROKER_PORT") {
            config.broker.port = port
                .parse()
                .map_err(|_| Error::Config(format!("invalid broker port: {port:?}")))?;
        }
        if let Ok(path) = std::env::var("SIGCHAT_BROKER_PATH") {
            config.broker.path = path;
        }
        if let Ok(email) = std::env::var("SIGCHAT_MANIFEST_EMAIL") {
            config.manifest.email = email;
        }
        if let Ok(url) = std::env::var("SIGCHAT_MANIFEST_URL") {
            config.manifest.app_url = url;
        }

        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;

        Ok(())
    }
}

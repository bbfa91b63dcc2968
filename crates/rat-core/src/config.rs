//! Peer configuration: defaults, then environment, then a TOML file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use rat_crypto::{KeyPair, KeyStore, DEFAULT_KEY_BITS};
use rat_proto::validation::sizes::MAX_TEXT_SIZE;

use crate::handshake::LocalPeer;
use crate::identity::Identity;

/// Default chat port. The directory and relay follow it.
pub const CHAT_PORT: u16 = 42666;
pub const NAMESERVER_PORT: u16 = 42667;
pub const RELAY_PORT: u16 = 42670;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AboutConfig {
    pub name: String,
    pub group: String,
    pub status: String,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CryptoConfig {
    pub pepper: String,
    pub key_bits: usize,
    pub key_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortConfig {
    pub chat: u16,
    pub nameserver: u16,
    pub relay: u16,
}

/// Everything a peer needs to know about itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerConfig {
    pub about: AboutConfig,
    pub crypto: CryptoConfig,
    pub ports: PortConfig,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            about: AboutConfig {
                name: "anonymous".to_string(),
                group: "rats".to_string(),
                status: "online".to_string(),
                address: String::new(),
            },
            crypto: CryptoConfig {
                pepper: "rat".to_string(),
                key_bits: DEFAULT_KEY_BITS,
                key_path: PathBuf::from("~/.rat/key.pem"),
            },
            ports: PortConfig {
                chat: CHAT_PORT,
                nameserver: NAMESERVER_PORT,
                relay: RELAY_PORT,
            },
        }
    }
}

// Shape of the TOML file: every key optional, absent keys keep their value.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    #[serde(default)]
    about: FileAbout,
    #[serde(default)]
    crypto: FileCrypto,
    #[serde(default)]
    ports: FilePorts,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileAbout {
    name: Option<String>,
    group: Option<String>,
    status: Option<String>,
    address: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileCrypto {
    pepper: Option<String>,
    key_bits: Option<usize>,
    key_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FilePorts {
    chat: Option<u16>,
    nameserver: Option<u16>,
    relay: Option<u16>,
}

impl PeerConfig {
    /// Load configuration from environment variables and TOML file
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// [`load`](Self::load) with an injectable environment lookup.
    pub fn load_with<F>(env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(name) = env("RAT_NAME") {
            config.about.name = name;
        }
        if let Some(group) = env("RAT_GROUP") {
            config.about.group = group;
        }
        if let Some(status) = env("RAT_STATUS") {
            config.about.status = status;
        }
        if let Some(address) = env("RAT_ADDRESS") {
            config.about.address = address;
        }
        if let Some(pepper) = env("RAT_PEPPER") {
            config.crypto.pepper = pepper;
        }
        if let Some(bits) = env("RAT_KEY_BITS") {
            config.crypto.key_bits = bits
                .parse()
                .map_err(|e| ConfigError::Invalid(format!("Invalid RAT_KEY_BITS: {}", e)))?;
        }
        if let Some(path) = env("RAT_KEY_PATH") {
            config.crypto.key_path = PathBuf::from(path);
        }

        // Load from TOML config file (if specified)
        if let Some(path) = env("RAT_CONFIG") {
            config.load_from_toml(Path::new(&path))?;
        }

        config.crypto.key_path = expand_home(&config.crypto.key_path, env("HOME"))?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay the keys present in a TOML file.
    pub fn load_from_toml(&mut self, path: &Path) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(path)?;
        self.merge_toml(&content)
    }

    fn merge_toml(&mut self, content: &str) -> Result<(), ConfigError> {
        let file: FileConfig = toml::from_str(content)?;

        let about = &mut self.about;
        if let Some(v) = file.about.name {
            about.name = v;
        }
        if let Some(v) = file.about.group {
            about.group = v;
        }
        if let Some(v) = file.about.status {
            about.status = v;
        }
        if let Some(v) = file.about.address {
            about.address = v;
        }

        if let Some(v) = file.crypto.pepper {
            self.crypto.pepper = v;
        }
        if let Some(v) = file.crypto.key_bits {
            self.crypto.key_bits = v;
        }
        if let Some(v) = file.crypto.key_path {
            self.crypto.key_path = v;
        }

        if let Some(v) = file.ports.chat {
            self.ports.chat = v;
        }
        if let Some(v) = file.ports.nameserver {
            self.ports.nameserver = v;
        }
        if let Some(v) = file.ports.relay {
            self.ports.relay = v;
        }
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.about.name.is_empty() {
            return Err(ConfigError::Invalid("about.name must not be empty".to_string()));
        }
        for (field, value) in [
            ("about.name", &self.about.name),
            ("about.group", &self.about.group),
            ("about.status", &self.about.status),
            ("about.address", &self.about.address),
        ] {
            if value.len() > MAX_TEXT_SIZE {
                return Err(ConfigError::Invalid(format!(
                    "{} must be at most {} bytes",
                    field, MAX_TEXT_SIZE
                )));
            }
        }

        if self.crypto.pepper.is_empty() {
            return Err(ConfigError::Invalid("crypto.pepper must not be empty".to_string()));
        }
        let bits = self.crypto.key_bits;
        if !(512..=8192).contains(&bits) || bits % 8 != 0 {
            return Err(ConfigError::Invalid(
                "crypto.key_bits must be a multiple of 8 between 512 and 8192".to_string(),
            ));
        }

        let p = &self.ports;
        if p.chat == 0 || p.nameserver == 0 || p.relay == 0 {
            return Err(ConfigError::Invalid("ports must be non-zero".to_string()));
        }
        if p.chat == p.nameserver || p.chat == p.relay || p.nameserver == p.relay {
            return Err(ConfigError::Invalid("ports must be distinct".to_string()));
        }
        Ok(())
    }

    /// Key store backed by the configured PEM file.
    pub fn key_store(&self) -> KeyStore {
        KeyStore::pem_file(&self.crypto.key_path)
    }

    /// Our identity and pepper, bound to `keys`.
    pub fn local_peer(&self, keys: Arc<KeyPair>) -> LocalPeer {
        let identity = Identity::new(self.about.name.clone(), keys.verifying().clone())
            .with_group(self.about.group.clone())
            .with_address(self.about.address.clone())
            .with_status(self.about.status.clone());
        LocalPeer::new(keys, identity, self.crypto.pepper.as_bytes())
    }
}

fn expand_home(path: &Path, home: Option<String>) -> Result<PathBuf, ConfigError> {
    let Ok(rest) = path.strip_prefix("~") else {
        return Ok(path.to_path_buf());
    };
    match home.filter(|h| !h.is_empty()) {
        Some(home) => Ok(PathBuf::from(home).join(rest)),
        None => Err(ConfigError::Invalid(format!(
            "crypto.key_path {} needs HOME to be set",
            path.display()
        ))),
    }
}

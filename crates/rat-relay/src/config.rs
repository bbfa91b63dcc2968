//! Configuration management

use std::net::{Ipv4Addr, SocketAddr};

use rat_core::config::{ConfigError, PeerConfig};

/// Relay configuration: the peer identity it signs as plus where it
/// listens.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub peer: PeerConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables, command line, and TOML file
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|key| std::env::var(key).ok(), std::env::args().skip(1))
    }

    pub fn load_with<F, I>(env: F, args: I) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
        I: IntoIterator<Item = String>,
    {
        let peer = PeerConfig::load_with(&env)?;
        let mut config = Self {
            listen_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, peer.ports.relay)),
            peer,
        };

        if let Some(addr) = env("RAT_RELAY_LISTEN_ADDR") {
            config.listen_addr = addr
                .parse()
                .map_err(|e| ConfigError::Invalid(format!("Invalid listen_addr: {}", e)))?;
        }

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--listen-addr" | "-l" => {
                    let value = args.next().ok_or_else(|| {
                        ConfigError::Invalid("--listen-addr requires a value".to_string())
                    })?;
                    config.listen_addr = value
                        .parse()
                        .map_err(|e| ConfigError::Invalid(format!("Invalid listen_addr: {}", e)))?;
                }
                other => {
                    return Err(ConfigError::Invalid(format!("unknown argument: {}", other)));
                }
            }
        }

        Ok(config)
    }
}

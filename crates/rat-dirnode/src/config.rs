//! Configuration management

use std::net::{Ipv4Addr, SocketAddr};

use rat_core::config::{ConfigError, PeerConfig};

/// Nameserver configuration: the peer identity it runs as plus where it
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
            listen_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, peer.ports.nameserver)),
            peer,
        };

        if let Some(addr) = env("RAT_DIRNODE_LISTEN_ADDR") {
            config.listen_addr = addr
                .parse()
                .map_err(|e| ConfigError::Invalid(format!("Invalid listen_addr: {}", e)))?;
        }

        config.load_from_args(args)?;
        Ok(config)
    }

    fn load_from_args<I>(&mut self, args: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--listen-addr" | "-l" => {
                    let value = args.next().ok_or_else(|| {
                        ConfigError::Invalid("--listen-addr requires a value".to_string())
                    })?;
                    self.listen_addr = value
                        .parse()
                        .map_err(|e| ConfigError::Invalid(format!("Invalid listen_addr: {}", e)))?;
                }
                other => {
                    return Err(ConfigError::Invalid(format!("unknown argument: {}", other)));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(key: &str) -> Option<String> {
        (key == "HOME").then(|| "/home/rat".to_string())
    }

    #[test]
    fn test_default_listens_on_nameserver_port() {
        let config = ServerConfig::load_with(no_env, Vec::new()).unwrap();
        assert_eq!(config.listen_addr.port(), 42667);
    }

    #[test]
    fn test_env_then_args() {
        let env = |key: &str| match key {
            "RAT_DIRNODE_LISTEN_ADDR" => Some("127.0.0.1:5000".to_string()),
            other => no_env(other),
        };
        let config = ServerConfig::load_with(env, Vec::new()).unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:5000".parse().unwrap());

        let args = vec!["--listen-addr".to_string(), "127.0.0.1:6000".to_string()];
        let config = ServerConfig::load_with(env, args).unwrap();
        assert_eq!(config.listen_addr.port(), 6000);
    }

    #[test]
    fn test_bad_args_rejected() {
        assert!(ServerConfig::load_with(no_env, vec!["--listen-addr".to_string()]).is_err());
        assert!(ServerConfig::load_with(no_env, vec!["--bogus".to_string()]).is_err());
    }
}

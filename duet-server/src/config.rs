//! Signaling server configuration.
//!
//! Loaded from environment variables, then optionally overridden by the
//! command-line flags of the `duet-server` binary.

use duet_core::IceServerConfig;
use duet_core::utils::{DEFAULT_SIGNALING_PORT, DEFAULT_STUN_ADDR};
use std::collections::HashMap;
use std::env;
use std::net::SocketAddr;
use thiserror::Error;

/// Default interface to bind.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default member cap per room. Calls are strictly one-to-one.
pub const DEFAULT_MAX_ROOM_MEMBERS: usize = 2;

/// Default capacity of the hub command queue.
pub const DEFAULT_COMMAND_BUFFER: usize = 100;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// `None` means rooms accept any number of members.
    pub max_room_members: Option<usize>,
    /// Advertised to every client in its `welcome` frame.
    pub ice_servers: Vec<IceServerConfig>,
    pub command_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_SIGNALING_PORT,
            max_room_members: Some(DEFAULT_MAX_ROOM_MEMBERS),
            ice_servers: vec![IceServerConfig::stun(DEFAULT_STUN_ADDR)],
            command_buffer: DEFAULT_COMMAND_BUFFER,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid port: {0}")]
    InvalidPort(String),

    #[error("Invalid max room members: {0}")]
    InvalidMaxRoomMembers(String),

    #[error("Invalid bind address: {0}")]
    InvalidBindAddress(String),

    #[error("TURN credentials given without DUET_TURN_URL")]
    OrphanTurnCredentials,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a map of variables (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let host = vars.get("DUET_HOST").cloned().unwrap_or(defaults.host);

        let port = match vars.get("DUET_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(raw.clone()))?,
            None => defaults.port,
        };

        let max_room_members = match vars.get("DUET_MAX_ROOM_MEMBERS") {
            Some(raw) => match raw.parse::<usize>() {
                Ok(0) => None,
                Ok(n) => Some(n),
                Err(_) => return Err(ConfigError::InvalidMaxRoomMembers(raw.clone())),
            },
            None => defaults.max_room_members,
        };

        let mut ice_servers = match vars.get("DUET_STUN_URLS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(IceServerConfig::stun)
                .collect(),
            None => defaults.ice_servers,
        };

        let turn_username = vars.get("DUET_TURN_USERNAME").cloned();
        let turn_credential = vars.get("DUET_TURN_CREDENTIAL").cloned();
        match vars.get("DUET_TURN_URL") {
            Some(url) => ice_servers.push(IceServerConfig {
                urls: vec![url.clone()],
                username: turn_username,
                credential: turn_credential,
            }),
            None if turn_username.is_some() || turn_credential.is_some() => {
                return Err(ConfigError::OrphanTurnCredentials);
            }
            None => {}
        }

        Ok(Self {
            host,
            port,
            max_room_members,
            ice_servers,
            command_buffer: defaults.command_buffer,
        })
    }

    pub fn bind_address(&self) -> Result<SocketAddr, ConfigError> {
        let raw = format!("{}:{}", self.host, self.port);
        raw.parse()
            .map_err(|_| ConfigError::InvalidBindAddress(raw))
    }
}

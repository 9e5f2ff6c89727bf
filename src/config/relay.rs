//! Relay configuration types
//!
//! Defines the file-facing configuration and its conversion into the
//! typed role configurations consumed by the adapters.

use crate::error::RelayError;
use crate::relay::{ClientConfig, ServerConfig};
use crate::supervisor::OutputPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default for mirroring relay output to standard output
fn default_log_output() -> bool {
    true
}

/// Root configuration structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Relay process configuration
    pub relay: RelayConfig,
}

/// Which role this host runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelayRole {
    /// Accept gateway peers and forward to a destination
    Server,
    /// Expose a local SOCKS endpoint and forward over the gateway
    Client,
}

/// Relay process configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RelayConfig {
    /// Role of this relay instance
    pub role: RelayRole,

    /// Remote gateway peer ("host:port")
    pub peer_addr: String,

    /// UDP listen port (server role)
    #[serde(default)]
    pub listen_port: Option<u16>,

    /// Local SOCKS4 port (client role)
    #[serde(default)]
    pub socks_port: Option<u16>,

    /// UDP transport port (client role)
    #[serde(default)]
    pub relay_port: Option<u16>,

    /// Path to the relay binary, overriding the default payload provider
    #[serde(default)]
    pub relay_bin: Option<PathBuf>,

    /// Mirror relay output to standard output
    #[serde(default = "default_log_output")]
    pub log_output: bool,

    /// Policy applied to stream copy failures
    #[serde(default)]
    pub output_policy: OutputPolicy,
}

impl RelayConfig {
    /// Typed server-role configuration
    pub fn server_config(&self) -> Result<ServerConfig, RelayError> {
        let listen_port = self
            .listen_port
            .ok_or_else(|| RelayError::Config("server role requires listen_port".to_string()))?;
        Ok(ServerConfig {
            listen_port,
            peer_addr: self.peer_addr.clone(),
        })
    }

    /// Typed client-role configuration
    pub fn client_config(&self) -> Result<ClientConfig, RelayError> {
        let socks_port = self
            .socks_port
            .ok_or_else(|| RelayError::Config("client role requires socks_port".to_string()))?;
        let relay_port = self
            .relay_port
            .ok_or_else(|| RelayError::Config("client role requires relay_port".to_string()))?;
        Ok(ClientConfig {
            socks_port,
            relay_port,
            peer_addr: self.peer_addr.clone(),
        })
    }

    /// Validate role-specific fields
    pub fn validate(&self) -> Result<(), RelayError> {
        if self.peer_addr.is_empty() {
            return Err(RelayError::Config("peer_addr must not be empty".to_string()));
        }
        match self.role {
            RelayRole::Server => self.server_config().map(|_| ()),
            RelayRole::Client => self.client_config().map(|_| ()),
        }
    }
}

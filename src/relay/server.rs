//! Server role adapter
//!
//! The server role accepts incoming gateway peers on a UDP port and
//! forwards their traffic to a fixed destination.

use crate::asset::{default_source, AssetSource};
use crate::error::RelayError;
use crate::supervisor::{DebugSink, OutputPolicy, StopHandle, Supervisor};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

/// Immutable configuration for the server role
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    /// UDP port the relay listens on for gateway peers
    pub listen_port: u16,
    /// Destination the relay forwards to ("host:port")
    pub peer_addr: String,
}

impl ServerConfig {
    /// Argument vector for the relay binary in server mode
    ///
    /// Server mode, zero retransmission-window parameters, listen on
    /// `listen_port`, peer with `peer_addr`. The format is a wire contract
    /// with the relay binary and must stay bit-exact.
    pub fn params(&self) -> Vec<String> {
        vec![
            "-S".to_string(),
            "-N".to_string(),
            "-N".to_string(),
            "0".to_string(),
            self.listen_port.to_string(),
            self.peer_addr.clone(),
        ]
    }
}

/// UDT gateway server role
pub struct Server {
    config: ServerConfig,
    source: Box<dyn AssetSource>,
    stop: StopHandle,
    debug_out: Option<DebugSink>,
    policy: OutputPolicy,
}

impl Server {
    /// Create a server role from its configuration
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            source: default_source(),
            stop: StopHandle::new(),
            debug_out: None,
            policy: OutputPolicy::default(),
        }
    }

    /// Use `source` instead of the default payload provider
    pub fn asset_source(mut self, source: Box<dyn AssetSource>) -> Self {
        self.source = source;
        self
    }

    /// Attach a sink receiving the relay's stdout and stderr
    pub fn debug_out(mut self, sink: DebugSink) -> Self {
        self.debug_out = Some(sink);
        self
    }

    /// Policy applied to stream copy failures
    pub fn output_policy(mut self, policy: OutputPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Handle for requesting termination
    ///
    /// Valid in every state: before `run` and after the relay exits it is
    /// a no-op, while the relay runs it sends the platform interrupt.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Run the relay in server mode until it exits
    ///
    /// Blocks until the relay process exits and returns its exit result. A
    /// message on `shutdown` interrupts the process. Consumes the adapter;
    /// a second run requires a new `Server` value.
    pub async fn run(self, shutdown: broadcast::Receiver<bool>) -> Result<(), RelayError> {
        let params = self.config.params();
        debug!("starting relay server role on UDP port {}", self.config.listen_port);
        let supervisor = Supervisor::with_handle(self.source, self.stop);
        supervisor
            .run(&params, self.debug_out, self.policy, shutdown)
            .await
    }
}

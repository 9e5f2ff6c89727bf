//! Client role adapter
//!
//! The client role exposes a local SOCKS4 endpoint and forwards accepted
//! connections over the gateway transport to a remote peer. The adapter
//! derives a dialing capability bound to that endpoint and a readiness
//! signal that resolves once the relay has actually bound its SOCKS port.

use crate::asset::{default_source, AssetSource};
use crate::error::RelayError;
use crate::socks::Socks4Dialer;
use crate::supervisor::{DebugSink, OutputPolicy, StopHandle, Supervisor};
use backoff::ExponentialBackoff;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, watch};
use tracing::debug;

/// Immutable configuration for the client role
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientConfig {
    /// TCP port of the local SOCKS4 endpoint the relay exposes
    pub socks_port: u16,
    /// UDP port the relay uses for gateway transport
    pub relay_port: u16,
    /// Remote gateway peer ("host:port")
    pub peer_addr: String,
}

impl ClientConfig {
    /// Argument vector for the relay binary in client mode
    ///
    /// Client mode, local SOCKS endpoint on `socks_port`, transport on
    /// `relay_port`, peer with `peer_addr`. The format is a wire contract
    /// with the relay binary and must stay bit-exact.
    pub fn params(&self) -> Vec<String> {
        vec![
            "-C".to_string(),
            self.socks_port.to_string(),
            self.relay_port.to_string(),
            self.peer_addr.clone(),
        ]
    }

    /// Local address of the relay's SOCKS4 endpoint
    pub fn socks_addr(&self) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], self.socks_port))
    }
}

/// UDT gateway SOCKS client role
pub struct Client {
    config: ClientConfig,
    source: Box<dyn AssetSource>,
    stop: StopHandle,
    debug_out: Option<DebugSink>,
    policy: OutputPolicy,
    ready_tx: watch::Sender<bool>,
    ready_rx: watch::Receiver<bool>,
}

impl Client {
    /// Create a client role from its configuration
    pub fn new(config: ClientConfig) -> Self {
        let (ready_tx, ready_rx) = watch::channel(false);
        Self {
            config,
            source: default_source(),
            stop: StopHandle::new(),
            debug_out: None,
            policy: OutputPolicy::default(),
            ready_tx,
            ready_rx,
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

    /// SOCKS4 dialing capability bound to the relay's local endpoint
    ///
    /// Derived purely from the configuration and available at any time;
    /// dialing only succeeds once the relay has bound its SOCKS port, so
    /// callers should await [`ready`](Client::ready) first.
    pub fn dialer(&self) -> Socks4Dialer {
        Socks4Dialer::new(self.config.socks_addr())
    }

    /// Readiness signal for the relay's local SOCKS endpoint
    ///
    /// The receiver observes `true` once a TCP probe confirms the relay
    /// has bound its SOCKS port. Probing starts when `run` is called; if
    /// the relay never binds the port the value stays `false`.
    pub fn ready(&self) -> watch::Receiver<bool> {
        self.ready_rx.clone()
    }

    /// Run the relay in client mode until it exits
    ///
    /// Blocks until the relay process exits and returns its exit result. A
    /// message on `shutdown` interrupts the process. Consumes the adapter;
    /// a second run requires a new `Client` value.
    pub async fn run(self, shutdown: broadcast::Receiver<bool>) -> Result<(), RelayError> {
        let params = self.config.params();
        let socks_addr = self.config.socks_addr();
        debug!(
            "starting relay client role, SOCKS endpoint {} transport port {}",
            socks_addr, self.config.relay_port
        );

        let ready_tx = self.ready_tx;
        let probe = tokio::spawn(async move {
            if await_listener(socks_addr).await {
                debug!("relay SOCKS endpoint ready at {}", socks_addr);
                let _ = ready_tx.send(true);
            }
        });

        let supervisor = Supervisor::with_handle(self.source, self.stop);
        let result = supervisor
            .run(&params, self.debug_out, self.policy, shutdown)
            .await;
        probe.abort();
        result
    }
}

/// Probe `addr` until something accepts a TCP connection
///
/// Returns `false` once the backoff budget is exhausted.
async fn await_listener(addr: SocketAddr) -> bool {
    let strategy = ExponentialBackoff {
        initial_interval: Duration::from_millis(50),
        max_interval: Duration::from_secs(1),
        max_elapsed_time: Some(Duration::from_secs(30)),
        ..Default::default()
    };
    backoff::future::retry(strategy, || async {
        TcpStream::connect(addr)
            .await
            .map(|_| ())
            .map_err(backoff::Error::transient)
    })
    .await
    .is_ok()
}

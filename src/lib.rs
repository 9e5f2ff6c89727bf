//! # Udtgate - UDT Gateway Relay Supervisor
//!
//! Udtgate wraps the external `udtrelay` gateway binary in a supervised
//! process lifecycle. It exposes the relay as either a server role
//! (accepting gateway peers on UDP and forwarding to a destination) or a
//! client role (exposing a local SOCKS4 endpoint whose connections travel
//! over the gateway transport to a remote peer).
//!
//! ## Features
//!
//! - **Process Supervision**: materializes the relay payload, pumps its
//!   stdout/stderr into an optional sink and blocks until it exits
//! - **Race-Free Shutdown**: idempotent stop handles and per-instance
//!   shutdown channels instead of process-global signal state
//! - **SOCKS4 Dialing**: a dial capability bound to the client role's
//!   local SOCKS endpoint, with the SOCKS4a hostname extension
//! - **Readiness Signal**: a watch channel that resolves once the client
//!   role's SOCKS port is observably bound
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tokio::sync::broadcast;
//! use udtgate::relay::{Client, ClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = Client::new(ClientConfig {
//!         socks_port: 1080,
//!         relay_port: 9000,
//!         peer_addr: "10.0.0.1:9001".to_string(),
//!     });
//!
//!     let dialer = client.dialer();
//!     let mut ready = client.ready();
//!     let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
//!
//!     tokio::spawn(async move {
//!         let _ = ready.changed().await;
//!         let stream = dialer.dial("tcp", "example.com:80").await;
//!         // ...
//!     });
//!
//!     client.run(shutdown_rx).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! SOCKS4 Client -> udtrelay (client role) ~~UDP~~ udtrelay (server role) -> Target
//!                       ^ supervised here              ^ supervised here
//! ```
//!
//! The relay binary itself is a black box; this crate supervises it and
//! speaks SOCKS4 to its local endpoint.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod asset;
pub mod config;
pub mod error;
pub mod exec;
pub mod relay;
pub mod socks;
pub mod supervisor;

// Re-export commonly used items
pub use config::{load_config, Config};
pub use error::{RelayError, Socks4Error};
pub use relay::{Client, ClientConfig, Server, ServerConfig};
pub use socks::Socks4Dialer;
pub use supervisor::{OutputPolicy, StopHandle, Supervisor};

/// Version of the Udtgate library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the application
pub const NAME: &str = env!("CARGO_PKG_NAME");

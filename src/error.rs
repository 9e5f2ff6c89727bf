//! Error types for Udtgate
//!
//! This module defines all custom error types used throughout the crate.
//! Each failure category of a relay run is a distinct variant so callers
//! can branch on what went wrong instead of parsing error text.

use std::io;
use std::process::ExitStatus;
use thiserror::Error;

/// Main error type for Udtgate operations
#[derive(Error, Debug)]
pub enum RelayError {
    /// The relay executable payload could not be retrieved
    ///
    /// Fatal and reported before any process or OS resource is created.
    #[error("relay asset {name:?} unavailable: {source}")]
    AssetUnavailable {
        /// Logical name of the asset that was requested
        name: String,
        /// Underlying lookup failure
        #[source]
        source: io::Error,
    },

    /// The payload bytes could not be turned into a runnable executable
    #[error("failed to materialize relay executable: {0}")]
    Materialize(#[source] io::Error),

    /// The OS refused to start the relay process
    #[error("failed to spawn relay process: {0}")]
    Spawn(#[source] io::Error),

    /// A standard stream pipe was missing after spawn
    #[error("failed to set up {stream} pipe for relay process")]
    PipeSetup {
        /// Which stream was missing ("stdout" or "stderr")
        stream: &'static str,
    },

    /// Waiting on the relay process failed
    #[error("failed to wait on relay process: {0}")]
    Wait(#[source] io::Error),

    /// The relay process exited abnormally
    ///
    /// Carries the child's own exit status verbatim, including
    /// terminated-by-signal statuses on Unix.
    #[error("relay process exited with {0}")]
    ChildExit(ExitStatus),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// SOCKS4 dial error
    #[error("SOCKS4 error: {0}")]
    Socks4(#[from] Socks4Error),
}

/// SOCKS4 dial specific errors
#[derive(Error, Debug)]
pub enum Socks4Error {
    /// SOCKS4 carries TCP streams only
    #[error("unsupported network: {0}")]
    UnsupportedNetwork(String),

    /// Destination address could not be parsed
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// The proxy rejected the CONNECT request
    #[error("request rejected by proxy: code {0}")]
    RequestRejected(u8),

    /// The proxy reply was truncated
    #[error("short reply from proxy")]
    ShortReply,

    /// The proxy answered with an unexpected version byte
    #[error("unexpected reply version: {0}")]
    BadVersion(u8),

    /// IO error while talking to the proxy
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

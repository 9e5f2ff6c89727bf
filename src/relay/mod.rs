//! Relay role adapters
//!
//! This module translates user-facing role configuration into the argument
//! vector the relay binary understands, and runs the binary under
//! supervision. Configuration is an immutable value; runtime artifacts
//! (stop handle, readiness signal, dial capability) are obtained through
//! separate accessors, and `run` consumes the adapter so one value drives
//! exactly one process lifecycle.

mod client;
mod server;

pub use client::{Client, ClientConfig};
pub use server::{Server, ServerConfig};

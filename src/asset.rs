//! Relay executable payload providers
//!
//! The relay binary is treated as an opaque byte payload keyed by a fixed
//! logical name. This module defines the provider seam and the stock
//! providers used by the command line front-end. A provider failure is a
//! hard fail-fast condition: no process or OS resource is created after it.

use crate::error::RelayError;
use std::io;
use std::path::PathBuf;

/// Logical asset name of the relay binary
pub const RELAY_ASSET: &str = "udtrelay";

/// Environment variable naming the relay binary on disk
pub const RELAY_BIN_ENV: &str = "UDTGATE_RELAY_BIN";

/// Provider of executable payload bytes, keyed by logical asset name
pub trait AssetSource: Send + Sync {
    /// Return the payload bytes for `name`
    fn asset(&self, name: &str) -> Result<Vec<u8>, RelayError>;
}

fn unknown_asset(name: &str) -> RelayError {
    RelayError::AssetUnavailable {
        name: name.to_string(),
        source: io::Error::new(io::ErrorKind::NotFound, "unknown asset name"),
    }
}

/// Payload provider reading the relay binary from a file on disk
pub struct FileAsset {
    path: PathBuf,
}

impl FileAsset {
    /// Create a provider serving the file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl AssetSource for FileAsset {
    fn asset(&self, name: &str) -> Result<Vec<u8>, RelayError> {
        if name != RELAY_ASSET {
            return Err(unknown_asset(name));
        }
        std::fs::read(&self.path).map_err(|source| RelayError::AssetUnavailable {
            name: name.to_string(),
            source,
        })
    }
}

/// Payload provider resolving the relay binary from [`RELAY_BIN_ENV`]
pub struct EnvAsset;

impl AssetSource for EnvAsset {
    fn asset(&self, name: &str) -> Result<Vec<u8>, RelayError> {
        if name != RELAY_ASSET {
            return Err(unknown_asset(name));
        }
        let path = std::env::var_os(RELAY_BIN_ENV).ok_or_else(|| RelayError::AssetUnavailable {
            name: name.to_string(),
            source: io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} is not set", RELAY_BIN_ENV),
            ),
        })?;
        std::fs::read(&path).map_err(|source| RelayError::AssetUnavailable {
            name: name.to_string(),
            source,
        })
    }
}

/// Payload compiled into the crate at build time
///
/// Requires the `bundled` cargo feature and a `payload/udtrelay` file in
/// the crate root at compile time.
#[cfg(feature = "bundled")]
pub struct BundledAsset;

#[cfg(feature = "bundled")]
impl AssetSource for BundledAsset {
    fn asset(&self, name: &str) -> Result<Vec<u8>, RelayError> {
        if name != RELAY_ASSET {
            return Err(unknown_asset(name));
        }
        Ok(include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/payload/udtrelay")).to_vec())
    }
}

/// The provider used when the configuration does not name one
pub fn default_source() -> Box<dyn AssetSource> {
    #[cfg(feature = "bundled")]
    {
        Box::new(BundledAsset)
    }
    #[cfg(not(feature = "bundled"))]
    {
        Box::new(EnvAsset)
    }
}

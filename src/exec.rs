//! Executable materialization
//!
//! Turns an opaque byte payload into a runnable command: the bytes are
//! written to a private temp file, the execute bit is set, and the file is
//! removed again when the handle is dropped.

use crate::error::RelayError;
use std::io::{self, Write};
use std::path::Path;
use tempfile::{NamedTempFile, TempPath};
use tokio::process::Command;

/// A byte payload materialized as an executable temp file
#[derive(Debug)]
pub struct ByteExecutable {
    path: TempPath,
}

impl ByteExecutable {
    /// Materialize `bytes` as an executable in the system temp directory
    pub fn new(bytes: &[u8]) -> Result<Self, RelayError> {
        let file = tempfile::Builder::new()
            .prefix("udtgate-")
            .suffix(std::env::consts::EXE_SUFFIX)
            .tempfile();
        Self::from_tempfile(file, bytes)
    }

    /// Materialize `bytes` as an executable under `dir`
    pub fn new_in(dir: impl AsRef<Path>, bytes: &[u8]) -> Result<Self, RelayError> {
        let file = tempfile::Builder::new()
            .prefix("udtgate-")
            .suffix(std::env::consts::EXE_SUFFIX)
            .tempfile_in(dir);
        Self::from_tempfile(file, bytes)
    }

    fn from_tempfile(file: io::Result<NamedTempFile>, bytes: &[u8]) -> Result<Self, RelayError> {
        let mut file = file.map_err(RelayError::Materialize)?;
        file.write_all(bytes).map_err(RelayError::Materialize)?;
        file.flush().map_err(RelayError::Materialize)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(0o755))
                .map_err(RelayError::Materialize)?;
        }

        // Drop the write handle before any spawn. Executing a file that is
        // still open for writing fails with ETXTBSY on Linux.
        Ok(Self {
            path: file.into_temp_path(),
        })
    }

    /// Build a process command bound to the materialized executable
    ///
    /// Only the program and arguments are configured here; stream wiring is
    /// the supervisor's concern.
    pub fn command<I, S>(&self, args: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        let mut cmd = Command::new(self.path.as_os_str());
        cmd.args(args);
        cmd
    }

    /// Path of the materialized executable
    pub fn path(&self) -> &Path {
        &self.path
    }
}
